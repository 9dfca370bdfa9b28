// src/handlers/simulation.rs
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use super::{resolve_for_request, PeriodQuery};
use crate::models::Period;
use crate::services::price_probe::PriceProbe;
use crate::services::simulation::{simulate, OverrideInput, SimulationResult, TraceStep};
use crate::services::store::SnapshotStore;

pub const PRICE_UNAVAILABLE: &str =
    "Live price unavailable; upside, downside and risk-reward were not computed";

#[derive(Debug, Default, Deserialize)]
pub struct SimulationQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub growth: Option<String>,
    pub margin: Option<String>,
    pub low_multiple: Option<String>,
    pub high_multiple: Option<String>,
}

impl SimulationQuery {
    fn period_query(&self) -> PeriodQuery {
        PeriodQuery {
            year: self.year,
            month: self.month,
        }
    }

    fn overrides(&self) -> OverrideInput {
        OverrideInput {
            growth: self.growth.clone(),
            margin: self.margin.clone(),
            low_multiple: self.low_multiple.clone(),
            high_multiple: self.high_multiple.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RenderedStep {
    pub label: &'static str,
    pub formula: String,
    pub result: Option<f64>,
}

impl From<&TraceStep> for RenderedStep {
    fn from(step: &TraceStep) -> Self {
        RenderedStep {
            label: step.label(),
            formula: step.formula(),
            result: step.result,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationResponse {
    pub ticker: String,
    pub name: String,
    pub period: Period,
    pub requested: Option<Period>,
    pub notice: Option<String>,
    pub price_notice: Option<&'static str>,
    pub simulation: SimulationResult,
    pub steps: Vec<RenderedStep>,
}

pub async fn get_simulation(
    ticker: String,
    query: SimulationQuery,
    store: Arc<SnapshotStore>,
    probe: Arc<dyn PriceProbe>,
) -> Result<Json, Rejection> {
    info!("Handling simulation request for {}", ticker);

    // Bad overrides are reported before any lookup or network call.
    let overrides = query.overrides().parse().map_err(|e| {
        error!("Rejecting simulation for {}: {}", ticker, e);
        warp::reject::custom(ApiError::invalid_input(e.to_string()))
    })?;
    let period = query.period_query().period().map_err(warp::reject::custom)?;

    let resolution = resolve_for_request(&store, &ticker, period).await?;
    let notice = resolution.notice();
    let requested = resolution.requested();
    let snapshot = match resolution.snapshot() {
        Some(snapshot) => snapshot,
        None => return Err(warp::reject::not_found()),
    };

    let live_price = probe.fetch_price(&snapshot.key.ticker).await;
    let price_notice = if live_price.is_none() {
        warn!("Simulating {} without a live price", snapshot.key.ticker);
        Some(PRICE_UNAVAILABLE)
    } else {
        None
    };

    let simulation = simulate(&snapshot.payload, &overrides, live_price);
    let steps = simulation.trace.iter().map(RenderedStep::from).collect();

    Ok(warp::reply::json(&SimulationResponse {
        ticker: snapshot.key.ticker.clone(),
        name: snapshot.name.clone(),
        period: snapshot.key.period(),
        requested,
        notice,
        price_notice,
        simulation,
        steps,
    }))
}
