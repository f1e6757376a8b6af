//! pollhook entry point.
//!
//! This binary is the composition root:
//!
//! 1. **Parse configuration**: load the TOML file and apply CLI overrides.
//! 2. **Wire observability**: install the `tracing-subscriber` stack and the
//!    optional OpenTelemetry OTLP exporter.
//! 3. **Construct the pipeline**: provider registry, job registry, poll queue,
//!    poll worker and dispatcher, injected into the HTTP listener.
//! 4. **Serve** until Ctrl-C or SIGTERM, then drain the poll queue. SIGHUP
//!    re-reads the `[[jobs]]` tables from the configuration file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dispatch::Dispatcher;
use jobs::{CommandPoller, PollQueue, PollWorker, StaticJobRegistry};
use listener::AppState;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod config;
mod observability;

use config::Config;

const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "pollhook", version, about = "Subversion push notifications to build-job polls")]
struct Args {
    /// Path to the TOML configuration file; defaults are used when omitted.
    #[arg(short, long, env = "POLLHOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides `server.bind`.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Log as JSON, overrides `logging.json`.
    #[arg(long)]
    json: bool,

    /// Log at debug level, overrides `logging.filter`.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Run the webhook listener and poll worker.
    Serve,
    /// Print the effective configuration.
    Config,
}

impl Args {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if self.json {
            config.logging.json = true;
        }
        if self.verbose {
            config.logging.filter = "debug".to_string();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    match args.command {
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Serve => {
            let telemetry = observability::init(&config.logging)?;
            let result = serve(config, args.config).await;
            if let Err(e) = &result {
                tracing::error!(error = %format!("{e:#}"), "pollhook stopped with an error");
            }
            telemetry.shutdown();
            result
        }
    }
}

async fn serve(config: Config, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let providers = config
        .providers
        .build_registry()
        .context("invalid provider configuration")?;

    let (queue, receiver) = jobs::poll_queue(config.poll.queue_capacity);
    let configured = jobs::build_jobs(&config.jobs, &queue).context("invalid job configuration")?;
    info!(jobs = configured.len(), "Loaded job configuration");

    let worker = tokio::spawn(
        PollWorker::new(
            receiver,
            Arc::new(CommandPoller::new()),
            config.poll.max_concurrent_polls,
        )
        .run(),
    );

    let registry = Arc::new(StaticJobRegistry::new(configured));
    // The worker stops once every sender is gone: the triggers' and the reloader's.
    let reloader = tokio::spawn(reload_on_hangup(config_path, queue, Arc::clone(&registry)));

    let dispatcher = Dispatcher::new(registry);
    let state = AppState::new(dispatcher, providers)
        .with_max_body_bytes(config.server.max_body_bytes);

    let listener = TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    listener::serve(listener, state, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    reloader.abort();
    if let Err(e) = reloader.await {
        if e.is_panic() {
            warn!(error = %e, "Job reloader panicked");
        }
    }

    info!("Listener stopped; waiting for queued polls");
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Poll worker panicked"),
        Err(_) => warn!(
            timeout_secs = WORKER_DRAIN_TIMEOUT.as_secs(),
            "Poll worker did not drain in time; abandoning running polls"
        ),
    }

    Ok(())
}

/// Re-reads `[[jobs]]` on every SIGHUP. A configuration that fails to load
/// leaves the running job set untouched.
#[cfg(unix)]
async fn reload_on_hangup(
    path: Option<PathBuf>,
    queue: PollQueue,
    registry: Arc<StaticJobRegistry>,
) {
    let mut hangup =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGHUP; job reload disabled");
                return;
            }
        };

    while hangup.recv().await.is_some() {
        match reload_jobs(path.as_deref(), &queue, &registry) {
            Ok(count) => info!(jobs = count, "Reloaded job configuration"),
            Err(e) => warn!(
                error = %format!("{e:#}"),
                "Job reload failed; keeping the previous jobs"
            ),
        }
    }
}

#[cfg(not(unix))]
async fn reload_on_hangup(
    _path: Option<PathBuf>,
    _queue: PollQueue,
    _registry: Arc<StaticJobRegistry>,
) {
}

fn reload_jobs(
    path: Option<&Path>,
    queue: &PollQueue,
    registry: &StaticJobRegistry,
) -> anyhow::Result<usize> {
    let config = Config::load(path)?;
    let configured = jobs::build_jobs(&config.jobs, queue).context("invalid job configuration")?;
    let count = configured.len();
    registry.replace(configured);
    Ok(count)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "pollhook",
            "--bind",
            "0.0.0.0:9999",
            "--json",
            "--verbose",
            "serve",
        ])
        .unwrap();
        let mut config = Config::default();

        args.apply_overrides(&mut config);

        assert_eq!(config.server.bind.port(), 9999);
        assert!(config.logging.json);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn no_flags_keep_config() {
        let args = Args::try_parse_from(["pollhook", "config"]).unwrap();
        let mut config = Config::default();

        args.apply_overrides(&mut config);

        assert_eq!(config, Config::default());
        assert!(matches!(args.command, Command::Config));
    }

    fn jobs_file(names: &[&str]) -> tempfile::NamedTempFile {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        for name in names {
            writeln!(
                file,
                "[[jobs]]\nname = \"{name}\"\n[jobs.poll]\ncommand = [\"true\"]\n"
            )
            .unwrap();
        }
        file
    }

    #[test]
    fn reload_swaps_in_the_new_jobs() {
        let (queue, _rx) = jobs::poll_queue(4);
        let registry = StaticJobRegistry::default();
        let file = jobs_file(&["app", "docs"]);

        let count = reload_jobs(Some(file.path()), &queue, &registry).unwrap();

        assert_eq!(count, 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn failed_reload_keeps_the_previous_jobs() {
        let (queue, _rx) = jobs::poll_queue(4);
        let registry = StaticJobRegistry::default();
        let good = jobs_file(&["app"]);
        reload_jobs(Some(good.path()), &queue, &registry).unwrap();

        let duplicate = jobs_file(&["app", "app"]);
        let err = reload_jobs(Some(duplicate.path()), &queue, &registry).unwrap_err();

        assert!(format!("{err:#}").contains("invalid job configuration"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Args::try_parse_from(["pollhook"]).is_err());
    }
}
