//! # qr-catalog
//!
//! Resolves scanned product QR codes (version-4 UUIDs) against a cached copy
//! of a remote JSON catalog and serves the matching product page.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use qr_catalog::app;
//! use qr_catalog::background::spawn_refresher;
//! use qr_catalog::cache::CatalogCache;
//! use qr_catalog::catalog::HttpCatalogFetcher;
//! use qr_catalog::lookup::LookupService;
//! use qr_catalog::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ttl = Duration::from_secs(10);
//!     let fetcher = HttpCatalogFetcher::new(
//!         "https://example.com/catalog.json",
//!         "qr-catalog/0.1",
//!         Duration::from_secs(10),
//!     )?;
//!     let cache = Arc::new(CatalogCache::new(fetcher, ttl));
//!     let _refresher = spawn_refresher(Arc::clone(&cache), ttl);
//!
//!     let pipeline = app::pipeline(LookupService::new(cache));
//!     let server = Server::bind("127.0.0.1:3000").await?;
//!     server
//!         .run(move |req| {
//!             let pipeline = pipeline.clone();
//!             async move { pipeline.handle(req).await }
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

// ── Catalog core ──────────────────────────────────────────────────────────────
pub mod background;
pub mod cache;
pub mod catalog;
pub mod lookup;

// ── HTTP surface ──────────────────────────────────────────────────────────────
pub mod app;
pub mod context;
pub mod http;
pub mod middleware;
pub mod pages;
pub mod router;
pub mod server;

pub mod config;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
