//! Shopping assistant HTTP server binary

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zuhall_assist::{
    server, Assistant, AssistantConfig, CachedGenerator, CatalogCache, HttpCatalogSource, HttpOpeningGenerator,
    InMemoryResponseCache, InMemorySessionStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AssistantConfig::from_env()?;

    // RUST_LOG wins over LOG_LEVEL when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();

    info!("Zuhall shopping assistant v{}", env!("CARGO_PKG_VERSION"));
    info!("Catalog source: {}", config.catalog_base_url);

    let source = HttpCatalogSource::new(
        config.catalog_base_url.clone(),
        config.catalog_product_limit,
        config.catalog_timeout,
    )?;
    match source.health_check().await {
        Ok(true) => info!("Catalog API is healthy"),
        Ok(false) => warn!("Catalog API returned a non-success status"),
        Err(e) => warn!("Catalog API unreachable, starting with empty snapshots: {}", e),
    }

    let catalog = Arc::new(CatalogCache::new(Arc::new(source), config.catalog_ttl));
    let sessions = Arc::new(InMemorySessionStore::new(config.session_ttl, config.session_capacity));

    let mut assistant = Assistant::new(catalog.clone(), sessions).with_default_lang(config.default_lang);

    match config.generator_url {
        Some(ref url) => {
            info!("Generation service: {}", url);
            let http = HttpOpeningGenerator::new(url.clone(), config.generator_timeout)?;
            match http.health_check().await {
                Ok(true) => info!("Generation service is healthy"),
                Ok(false) => warn!("Generation service returned a non-success status"),
                Err(e) => warn!("Generation service unreachable, openings fall back until it recovers: {}", e),
            }
            let cached = CachedGenerator::new(
                Arc::new(http),
                Arc::new(InMemoryResponseCache::default()),
                config.response_cache_ttl,
            );
            assistant = assistant.with_generator(Arc::new(cached));
        }
        None => warn!("GENERATOR_URL not set, openings use the fixed fallback text"),
    }

    // Warm the snapshot before accepting requests
    let snapshot = catalog.refresh().await;
    info!("Initial catalog: {} products", snapshot.products.len());

    server::run_server(Arc::new(assistant), config.port).await?;

    Ok(())
}
