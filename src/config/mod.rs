//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through its environment variable;
//! flags win. Defaults match a local development setup.

use std::time::Duration;

use clap::{ArgAction, Parser};
use thiserror::Error;

/// Catalog endpoint used when none is configured.
pub const DEFAULT_CATALOG_URL: &str = "https://api.jsonbin.io/v3/b/683bdfad8960c979a5a3b4b9";

/// `User-Agent` sent to the catalog endpoint unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("qr-catalog/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },

    #[error("catalog URL must start with http:// or https://, got `{0}`")]
    CatalogUrl(String),
}

/// Resolve scanned product QR codes against a cached remote catalog.
#[derive(Parser, Debug, Clone)]
#[command(name = "qr-catalog")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// URL of the JSON product catalog
    #[arg(long, env = "JSON_DATA_URL", default_value = DEFAULT_CATALOG_URL)]
    pub catalog_url: String,

    /// Seconds a catalog snapshot stays fresh; also the background refresh cadence
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value_t = 10)]
    pub refresh_interval_secs: u64,

    /// Seconds before an outbound catalog request is abandoned
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// User-Agent header sent with catalog requests
    #[arg(long, env = "CATALOG_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Increase verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    /// Checks values clap cannot express as types.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a zero interval or timeout, or a catalog
    /// URL without an HTTP scheme.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                name: "refresh interval",
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                name: "fetch timeout",
            });
        }
        if !(self.catalog_url.starts_with("http://") || self.catalog_url.starts_with("https://")) {
            return Err(ConfigError::CatalogUrl(self.catalog_url.clone()));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// `host:port` for [`Server::bind`](crate::server::Server::bind).
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Default `tracing` filter directive for the `-v` level.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "qr_catalog=info",
            1 => "qr_catalog=debug",
            _ => "qr_catalog=trace",
        }
    }
}
