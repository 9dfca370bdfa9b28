// src/routes.rs
use std::convert::Infallible;
use std::sync::Arc;

use log::info;
use warp::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject::{InvalidQuery, Rejection};
use warp::{Filter, Reply};

use crate::handlers::dashboard::get_dashboard;
use crate::handlers::error::ApiError;
use crate::handlers::menu::get_menu;
use crate::handlers::price::get_price;
use crate::handlers::simulation::{get_simulation, SimulationQuery};
use crate::handlers::snapshots::{get_periods, import_snapshots};
use crate::handlers::PeriodQuery;
use crate::services::price_probe::PriceProbe;
use crate::services::store::SnapshotStore;

const MAX_IMPORT_BYTES: u64 = 16 * 1024 * 1024;

// Turns rejections into JSON error bodies
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, kind, message) = if let Some(api_error) = err.find::<ApiError>() {
        let kind = serde_json::to_value(api_error.kind).unwrap_or_default();
        (api_error.status(), kind, api_error.message.clone())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found".into(), "Not Found".to_string())
    } else if let Some(e) = err.find::<InvalidQuery>() {
        (StatusCode::BAD_REQUEST, "invalid_input".into(), e.to_string())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "invalid_input".into(), e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "invalid_input".into(),
            "Import document too large".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "invalid_input".into(),
            "Method Not Allowed".to_string(),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal".into(),
            "Internal Server Error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
            "kind": kind,
        })),
        code,
    ))
}

pub fn routes(
    store: Arc<SnapshotStore>,
    probe: Arc<dyn PriceProbe>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let store_filter = warp::any().map(move || store.clone());
    let probe_filter = warp::any().map(move || probe.clone());

    let menu_route = warp::path!("api" / "v1" / "menu")
        .and(warp::get())
        .and_then(get_menu);

    let periods_route = warp::path!("api" / "v1" / "stocks" / String / "periods")
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(get_periods);

    let dashboard_route = warp::path!("api" / "v1" / "stocks" / String / "dashboard")
        .and(warp::get())
        .and(warp::query::<PeriodQuery>())
        .and(store_filter.clone())
        .and_then(get_dashboard);

    let simulation_route = warp::path!("api" / "v1" / "stocks" / String / "simulation")
        .and(warp::get())
        .and(warp::query::<SimulationQuery>())
        .and(store_filter.clone())
        .and(probe_filter.clone())
        .and_then(get_simulation);

    let price_route = warp::path!("api" / "v1" / "stocks" / String / "price")
        .and(warp::get())
        .and(probe_filter.clone())
        .and_then(get_price);

    let import_route = warp::path!("api" / "v1" / "snapshots")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_IMPORT_BYTES))
        .and(warp::body::json())
        .and(store_filter.clone())
        .and_then(import_snapshots);

    info!("All routes configured successfully.");

    menu_route
        .or(periods_route)
        .or(dashboard_route)
        .or(simulation_route)
        .or(price_route)
        .or(import_route)
        .recover(handle_rejection)
}
