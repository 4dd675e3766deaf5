//! Remote catalog fetcher.
//!
//! Pulls the whole product list from a configured JSON endpoint. The body is
//! either a bare array of records or an envelope object carrying the array
//! under [`WRAPPER_FIELD`] (JSONBin-style `{"record": [...]}`); any other
//! valid JSON decodes to an empty snapshot.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{Product, Snapshot};

/// Envelope key under which wrapped catalogs carry their records.
pub const WRAPPER_FIELD: &str = "record";

/// Maximum number of body characters echoed into errors and logs.
const PREVIEW_CHARS: usize = 200;

/// Errors produced while fetching the remote catalog.
///
/// All variants are recovered by the cache, which keeps serving the previous
/// snapshot; the split exists for logging.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("catalog request to {url} failed: {source}")]
    Transport {
        url: String,
        timed_out: bool,
        #[source]
        source: reqwest::Error,
    },

    #[error("catalog endpoint {url} responded with status {status}: {preview}")]
    Status {
        url: String,
        status: u16,
        preview: String,
    },

    #[error("catalog body from {url} is not valid JSON: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    fn transport(url: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_owned(),
            timed_out: source.is_timeout(),
            source,
        }
    }

    /// Short label for the failure class, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { timed_out: true, .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::Parse { .. } => "parse",
        }
    }
}

/// Anything that can produce a fresh catalog snapshot.
///
/// The cache only talks to this trait, so tests can swap the HTTP fetcher
/// for an in-memory source.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches the complete current catalog.
    async fn fetch(&self) -> Result<Snapshot, FetchError>;
}

/// Shapes a catalog body may take. Tried in declaration order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogBody {
    Bare(Vec<Value>),
    Wrapped { record: Vec<Value> },
    Unrecognized(IgnoredAny),
}

impl CatalogBody {
    fn into_records(self) -> Option<Vec<Value>> {
        match self {
            Self::Bare(records) | Self::Wrapped { record: records } => Some(records),
            Self::Unrecognized(_) => None,
        }
    }
}

/// Decodes a response body into a snapshot.
///
/// Fails only when the body is not JSON at all. A JSON body of an unexpected
/// shape yields an empty snapshot. Records without a usable identifier are
/// dropped.
pub fn decode_snapshot(body: &[u8]) -> Result<Snapshot, serde_json::Error> {
    let Some(records) = serde_json::from_slice::<CatalogBody>(body)?.into_records() else {
        warn!(
            preview = %preview(body),
            "catalog body is neither an array nor a `{WRAPPER_FIELD}` envelope; using empty catalog"
        );
        return Ok(Snapshot::empty());
    };

    let total = records.len();
    let snapshot: Snapshot = records.into_iter().filter_map(Product::from_record).collect();

    let dropped = total - snapshot.len();
    if dropped > 0 {
        warn!(dropped, total, "skipped catalog records without a usable identifier");
    }

    Ok(snapshot)
}

fn preview(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(PREVIEW_CHARS)
        .collect()
}

/// [`CatalogSource`] backed by a single HTTP `GET`.
#[derive(Debug, Clone)]
pub struct HttpCatalogFetcher {
    url: String,
    client: reqwest::Client,
}

impl HttpCatalogFetcher {
    /// Creates a fetcher for `url`.
    ///
    /// Every request carries `user_agent` and is abandoned after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`reqwest::Error`] if the HTTP client cannot be
    /// built (e.g. the TLS backend fails to initialise).
    pub fn new(
        url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogFetcher {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        info!(url = %self.url, "fetching product catalog");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::transport(&self.url, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(&self.url, e))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
                preview: preview(&body),
            });
        }

        let snapshot = decode_snapshot(&body).map_err(|source| FetchError::Parse {
            url: self.url.clone(),
            source,
        })?;

        debug!(products = snapshot.len(), bytes = body.len(), "catalog decoded");
        Ok(snapshot)
    }
}
