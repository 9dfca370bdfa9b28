use dotenv::dotenv;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use valuation_dashboard::config::AppConfig;
use valuation_dashboard::routes;
use valuation_dashboard::services::price_probe::{PriceProbe, QuotePageProbe};
use valuation_dashboard::services::store::SnapshotStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize the logger
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = AppConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    info!("Using PORT: {}", config.port);

    let store = Arc::new(SnapshotStore::open(config.store_path.clone()).await?);
    info!(
        "Snapshot store at {} holds {} snapshots",
        config.store_path.display(),
        store.len().await
    );

    let probe: Arc<dyn PriceProbe> = Arc::new(QuotePageProbe::new(
        config.quote_page_url.clone(),
        config.price_timeout,
    )?);
    info!(
        "Live prices from {} (timeout {:?})",
        config.quote_page_url, config.price_timeout
    );

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Will bind to: {}", addr);

    // Set up CORS
    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST"]);

    let api = routes::routes(store, probe).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
