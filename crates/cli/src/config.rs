//! Configuration file handling.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::Context;
use jobs::{JobConfig, PollSettings};
use providers::ProvidersConfig;
use serde::{Deserialize, Serialize};

/// Complete daemon configuration. Every section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub poll: PollSettings,
    pub providers: ProvidersConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the webhook listener binds to.
    pub bind: SocketAddr,

    /// Largest webhook body read before the notification is dropped.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            max_body_bytes: listener::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub filter: String,

    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,

    /// OTLP gRPC endpoint for span export. Export is off when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
            otlp_endpoint: None,
        }
    }
}

impl Config {
    /// Loads the configuration at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(raw)?;
        if config.poll.max_concurrent_polls == 0 {
            anyhow::bail!("poll.max_concurrent_polls must be at least 1");
        }
        Ok(config)
    }

    /// Renders the effective configuration as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("failed to serialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_path_gives_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(config.server.max_body_bytes, 16 * 1024 * 1024);
        assert_eq!(config.poll.queue_capacity, 256);
        assert!(config.providers.cloudforge.enabled);
    }

    #[test]
    fn loads_file_with_jobs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [server]
            bind = "0.0.0.0:9000"
            max_body_bytes = 65536

            [logging]
            json = true

            [providers.cloudforge]
            domain_suffix = "svn.example.net"

            [[jobs]]
            name = "app"

            [[jobs.locations]]
            remote = "https://acme.svn.example.net/app/trunk"
            repository_root = "https://acme.svn.example.net/app"

            [jobs.poll]
            command = ["svn", "update"]
            "#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.server.max_body_bytes, 65536);
        assert!(config.logging.json);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.providers.cloudforge.domain_suffix, "svn.example.net");
        assert!(config.providers.svn.enabled);
        assert_eq!(config.jobs.len(), 1);
        assert_eq!(config.jobs[0].locations.len(), 1);
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = Config::load(Some(&path)).unwrap_err();

        assert!(format!("{err:#}").contains("missing.toml"));
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(Config::parse("[sever]\nbind = \"127.0.0.1:1\"").is_err());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(Config::parse("[poll]\nmax_concurrent_polls = 0").is_err());
    }

    #[test]
    fn effective_config_parses_back() {
        let mut config = Config::default();
        config.logging.otlp_endpoint = Some("http://localhost:4317".to_string());

        let rendered = config.to_toml().unwrap();

        assert_eq!(Config::parse(&rendered).unwrap(), config);
    }
}
