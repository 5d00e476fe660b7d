//! Daemon configuration.
//!
//! Every flag can also be set through the environment, which is how the
//! DaemonSet manifest configures the daemon.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::auth::DEFAULT_AUDIENCE;
use crate::runtime::{RuntimeBackend, RuntimeOptions};

/// freezer-daemon configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "freezer-daemon", version, about)]
pub struct Config {
    /// Container runtime on this node
    #[arg(long, env = "RUNTIME_TYPE", value_enum)]
    pub runtime_type: RuntimeBackend,

    /// Runtime socket (defaults to the runtime's well-known path)
    #[arg(long, env = "RUNTIME_SOCKET")]
    pub runtime_socket: Option<PathBuf>,

    /// Docker engine API version (e.g. 1.41)
    #[arg(long, env = "DOCKERAPI_VERSION", value_parser = parse_api_version)]
    pub docker_api_version: Option<(usize, usize)>,

    /// Listen address for the HTTP API
    #[arg(short, long, env = "FREEZER_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Audience required on caller tokens
    #[arg(long, env = "FREEZER_TOKEN_AUDIENCE", default_value = DEFAULT_AUDIENCE)]
    pub token_audience: String,

    /// Log level for freezer-daemon (RUST_LOG overrides)
    #[arg(long, env = "FREEZER_LOGGING_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Ceiling for connecting to the runtime socket at startup, in seconds
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub dial_timeout_secs: u64,

    /// Timeout for each Docker engine request, in seconds
    #[arg(long, default_value = "120", value_parser = clap::value_parser!(u64).range(1..))]
    pub docker_request_timeout_secs: u64,
}

impl Config {
    /// Socket to dial for the configured runtime.
    pub fn socket(&self) -> PathBuf {
        self.runtime_socket
            .clone()
            .unwrap_or_else(|| self.runtime_type.default_socket())
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            socket: self.socket(),
            dial_timeout: Duration::from_secs(self.dial_timeout_secs),
            docker_request_timeout: Duration::from_secs(self.docker_request_timeout_secs),
            docker_api_version: self.docker_api_version,
        }
    }
}

fn parse_api_version(s: &str) -> Result<(usize, usize), String> {
    let (major, minor) = s
        .trim_start_matches('v')
        .split_once('.')
        .ok_or("Expected format: major.minor".to_string())?;
    let major = major.parse().map_err(|_| "Invalid major version".to_string())?;
    let minor = minor.parse().map_err(|_| "Invalid minor version".to_string())?;
    Ok((major, minor))
}
