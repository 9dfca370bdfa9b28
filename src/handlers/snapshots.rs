// src/handlers/snapshots.rs
use chrono::Utc;
use log::{error, info};
use serde_json::{json, Value};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::services::import::{import_document, ImportError};
use crate::services::store::SnapshotStore;

pub async fn import_snapshots(
    document: Value,
    store: Arc<SnapshotStore>,
) -> Result<Json, Rejection> {
    info!("Handling snapshot import");

    match import_document(&store, &document, Utc::now()).await {
        Ok(summary) => {
            info!("Imported {} snapshots", summary.imported.len());
            Ok(warp::reply::json(&summary))
        }
        Err(ImportError::NotAnObject) => Err(warp::reject::custom(ApiError::invalid_input(
            ImportError::NotAnObject.to_string(),
        ))),
        Err(ImportError::Store(e)) => {
            error!("Failed to persist imported snapshots: {}", e);
            Err(warp::reject::custom(ApiError::database_error(e.to_string())))
        }
    }
}

pub async fn get_periods(ticker: String, store: Arc<SnapshotStore>) -> Result<Json, Rejection> {
    info!("Handling period listing for {}", ticker);
    let ticker = ticker.trim();
    let periods = store.periods(ticker).await;
    Ok(warp::reply::json(&json!({
        "ticker": ticker,
        "periods": periods,
    })))
}
