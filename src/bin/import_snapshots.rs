// src/bin/import_snapshots.rs
use anyhow::Context;
use chrono::Utc;
use dotenv::dotenv;
use log::info;
use serde_json::Value;
use std::fs;

use valuation_dashboard::config::AppConfig;
use valuation_dashboard::services::import::import_document;
use valuation_dashboard::services::store::SnapshotStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .context("usage: import_snapshots <analysis.json>")?;

    let config = AppConfig::from_env()?;
    let document: Value = serde_json::from_str(
        &fs::read_to_string(&path).with_context(|| format!("reading {}", path))?,
    )
    .with_context(|| format!("parsing {}", path))?;

    let store = SnapshotStore::open(config.store_path.clone()).await?;
    let summary = import_document(&store, &document, Utc::now()).await?;

    for key in &summary.imported {
        info!("Imported {}", key);
    }
    for ticker in &summary.skipped {
        info!("Skipped {:?}", ticker);
    }
    println!(
        "Imported {} snapshots into {} ({} skipped)",
        summary.imported.len(),
        config.store_path.display(),
        summary.skipped.len()
    );
    Ok(())
}
