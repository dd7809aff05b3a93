//! Process-wide configuration, read once from the environment at startup.
//!
//! Mirrors the four knobs the original listener exposed (`HOST`, `PORT`,
//! `TIMEOUT`, `DEBUG`), plus `SINK_PATH` for where the default JSON-lines
//! sink writes its output. There is no config file: every deployment of
//! this server is a single process behind a handful of environment
//! variables, same as the system it replaces.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 12347;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SINK_PATH: &str = "parsed_data.jsonl";

/// Runtime configuration for the ingestion server.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub idle_timeout: Duration,
    pub debug: bool,
    pub sink_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            idle_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            debug: true,
            sink_path: PathBuf::from(DEFAULT_SINK_PATH),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment, falling back to
    /// defaults for any variable that is unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }

        if let Ok(port) = std::env::var("PORT") {
            config.port = port.parse().map_err(|_| Error::InvalidConfig {
                key: "PORT".to_string(),
                value: port,
            })?;
        }

        if let Ok(timeout) = std::env::var("TIMEOUT") {
            let secs: u64 = timeout.parse().map_err(|_| Error::InvalidConfig {
                key: "TIMEOUT".to_string(),
                value: timeout,
            })?;
            config.idle_timeout = Duration::from_secs(secs);
        }

        if let Ok(debug) = std::env::var("DEBUG") {
            config.debug = parse_bool(&debug);
        }

        if let Ok(sink_path) = std::env::var("SINK_PATH") {
            config.sink_path = PathBuf::from(sink_path);
        }

        Ok(config)
    }

    /// The socket address the server should bind to, as a `host:port` string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Truthy-string semantics matching the original `DEBUG` env var handling:
/// anything but an explicit falsy token counts as enabled.
fn parse_bool(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}
