// src/handlers/price.rs
use log::info;
use serde_json::json;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::services::price_probe::PriceProbe;

pub async fn get_price(ticker: String, probe: Arc<dyn PriceProbe>) -> Result<Json, Rejection> {
    info!("Handling live price request for {}", ticker);
    let price = probe.fetch_price(ticker.trim()).await;
    Ok(warp::reply::json(&json!({
        "ticker": ticker.trim(),
        "price": price,
    })))
}
