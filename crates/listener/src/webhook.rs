//! Provider webhook handler.
//!
//! Turns one inbound call into a dispatch. Nothing the caller sends can make
//! this endpoint fail: malformed or unidentifiable notifications are logged
//! and acknowledged like any other.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dispatch::{Notification, NotificationId};
use providers::RequestParams;
use tracing::{debug, warn};

use crate::AppState;

/// Webhook handler for every provider endpoint.
///
/// # Request
///
/// - Method: GET or POST
/// - Path: `/{url-name}` or `/{url-name}/notifyCommit` of a registered provider
/// - Parameters: query string and/or `application/x-www-form-urlencoded` body
///
/// # Response
///
/// - `200 OK` once the notification has been handled, whatever its content.
///   This includes bodies that could not be read or exceed the size limit.
/// - `404 Not Found` if no provider is registered under the path
pub async fn webhook_handler(
    State(state): State<AppState>,
    Path(hook): Path<String>,
    RawQuery(query): RawQuery,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let Some(adapter) = state.providers().get(&hook) else {
        debug!(hook = %hook, "No provider registered for endpoint");
        return (StatusCode::NOT_FOUND, "Unknown endpoint").into_response();
    };

    let id = NotificationId::new_random();
    tracing::Span::current().record("notification_id", tracing::field::display(id));

    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(
                provider = %adapter.name(),
                status = %e.status(),
                error = %e,
                "Ignoring notification with unreadable body"
            );
            return acknowledge();
        }
    };
    let params = RequestParams::from_parts(query.as_deref(), &body);

    let affected_paths = match adapter.extract_affected_paths(&params) {
        Ok(paths) => paths,
        Err(e) => {
            warn!(
                provider = %adapter.name(),
                error = %e,
                "Ignoring malformed notification"
            );
            return acknowledge();
        }
    };
    let revision = adapter.extract_revision(&params);
    let predicate = adapter.build_match_predicate(&params);

    let notification = Notification::with_id(id, adapter.name().clone(), affected_paths, revision);
    debug!(
        provider = %notification.provider(),
        revision = %notification.revision(),
        paths = notification.affected_paths().len(),
        "Received notification"
    );

    state.dispatcher().dispatch(&notification, predicate);

    acknowledge()
}

fn acknowledge() -> Response {
    (StatusCode::OK, "OK").into_response()
}
