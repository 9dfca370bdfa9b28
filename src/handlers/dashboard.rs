// src/handlers/dashboard.rs
use log::info;
use serde::Serialize;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::{resolve_for_request, PeriodQuery};
use crate::models::Period;
use crate::services::dashboard::{project_dashboard, Dashboard};
use crate::services::store::SnapshotStore;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub ticker: String,
    pub name: String,
    pub period: Period,
    pub requested: Option<Period>,
    pub notice: Option<String>,
    pub dashboard: Dashboard,
}

pub async fn get_dashboard(
    ticker: String,
    query: PeriodQuery,
    store: Arc<SnapshotStore>,
) -> Result<Json, Rejection> {
    info!("Handling dashboard request for {}", ticker);

    let period = query.period().map_err(warp::reject::custom)?;
    let resolution = resolve_for_request(&store, &ticker, period).await?;
    let notice = resolution.notice();
    let requested = resolution.requested();
    let snapshot = match resolution.snapshot() {
        Some(snapshot) => snapshot,
        None => return Err(warp::reject::not_found()),
    };

    let response = DashboardResponse {
        ticker: snapshot.key.ticker.clone(),
        name: snapshot.name.clone(),
        period: snapshot.key.period(),
        requested,
        notice,
        dashboard: project_dashboard(&snapshot.payload),
    };
    Ok(warp::reply::json(&response))
}
