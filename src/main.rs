//! qr-catalog server entry point.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use qr_catalog::app;
use qr_catalog::background::spawn_refresher;
use qr_catalog::cache::CatalogCache;
use qr_catalog::catalog::HttpCatalogFetcher;
use qr_catalog::config::Config;
use qr_catalog::lookup::LookupService;
use qr_catalog::server::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    config.validate()?;

    let fetcher = HttpCatalogFetcher::new(
        config.catalog_url.as_str(),
        &config.user_agent,
        config.fetch_timeout(),
    )?;
    let cache = Arc::new(CatalogCache::new(fetcher, config.refresh_interval()));
    let refresher = spawn_refresher(Arc::clone(&cache), config.refresh_interval());

    let pipeline = app::pipeline(LookupService::new(cache));
    let server = Server::bind(config.listen_addr()).await?;
    info!(
        address = %server.local_addr(),
        catalog = %config.catalog_url,
        refresh_interval = ?config.refresh_interval(),
        "QR catalog service ready"
    );

    server
        .run_until(
            move |req| {
                let pipeline = pipeline.clone();
                async move { pipeline.handle(req).await }
            },
            async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl-c");
                    std::future::pending::<()>().await;
                }
            },
        )
        .await?;

    refresher.abort();
    Ok(())
}
