//! pollhook HTTP listener.
//!
//! Exposes one endpoint per registered provider adapter and turns each inbound
//! call into a [`dispatch::Notification`] plus a match predicate, which it
//! hands to the [`dispatch::Dispatcher`].
//!
//! # Endpoints
//!
//! - `GET|POST /{url-name}` - provider webhook, e.g. `/cloudforge-webhook`.
//!   Always answers 200 once the endpoint exists.
//! - `GET|POST /{url-name}/notifyCommit` - the same webhook under the path
//!   existing CloudForge senders are configured with.
//! - `GET /health` - returns 200 if the server is running.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details live here. The provider adapters
//! own field parsing and the dispatcher owns matching.

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use dispatch::Dispatcher;
use providers::ProviderRegistry;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

/// Request body limit used unless [`AppState::with_max_body_bytes`] says
/// otherwise. Large commits list every changed path in the body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state, passed to handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    max_body_bytes: usize,
}

struct AppStateInner {
    dispatcher: Dispatcher,
    providers: ProviderRegistry,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, providers: ProviderRegistry) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                dispatcher,
                providers,
            }),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Sets the largest request body the webhook endpoints will read.
    ///
    /// Bodies over the limit are still acknowledged with 200, but not
    /// dispatched.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.inner.providers
    }
}

/// Builds the axum router with all endpoints.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::routing::get;

    let body_limit = DefaultBodyLimit::max(state.max_body_bytes());

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/:hook", get(webhook_handler).post(webhook_handler))
        .route(
            "/:hook/notifyCommit",
            get(webhook_handler).post(webhook_handler),
        )
        .layer(body_limit)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    notification_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish before this returns.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let endpoints: Vec<String> = state
        .providers()
        .url_names()
        .flat_map(|name| [format!("/{name}"), format!("/{name}/notifyCommit")])
        .collect();
    info!(
        address = %listener.local_addr()?,
        endpoints = ?endpoints,
        "Listening for notifications"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch::fakes::InMemoryJobRegistry;

    #[test]
    fn app_state_is_cheap_to_clone() {
        let registry = Arc::new(InMemoryJobRegistry::default());
        let state = AppState::new(Dispatcher::new(registry), ProviderRegistry::new());
        let cloned = state.clone();

        assert!(Arc::ptr_eq(&state.inner, &cloned.inner));
        assert!(cloned.providers().is_empty());
    }

    #[test]
    fn body_limit_defaults_and_can_be_overridden() {
        let registry = Arc::new(InMemoryJobRegistry::default());
        let state = AppState::new(Dispatcher::new(registry), ProviderRegistry::new());
        assert_eq!(state.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);

        let state = state.with_max_body_bytes(1024);
        assert_eq!(state.max_body_bytes(), 1024);
    }
}
