// src/handlers/mod.rs
pub mod dashboard;
pub mod error;
pub mod menu;
pub mod price;
pub mod simulation;
pub mod snapshots;

use log::{error, info};
use serde::Deserialize;
use warp::Rejection;

use crate::models::Period;
use crate::services::resolver::{resolve, Resolution};
use crate::services::store::SnapshotStore;
use error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl PeriodQuery {
    /// Both parts or neither; a lone year or month is a caller mistake.
    pub fn period(&self) -> Result<Option<Period>, ApiError> {
        match (self.year, self.month) {
            (Some(year), Some(month)) if (1..=12).contains(&month) => {
                Ok(Some(Period::new(year, month)))
            }
            (Some(_), Some(month)) => Err(ApiError::invalid_input(format!(
                "month must be between 1 and 12, got {}",
                month
            ))),
            (None, None) => Ok(None),
            _ => Err(ApiError::invalid_input(
                "year and month must be given together",
            )),
        }
    }
}

/// Resolves a snapshot for a request, rejecting when the ticker has none at all.
pub(crate) async fn resolve_for_request(
    store: &SnapshotStore,
    ticker: &str,
    period: Option<Period>,
) -> Result<Resolution, Rejection> {
    if ticker.trim().is_empty() {
        return Err(warp::reject::custom(ApiError::invalid_input("ticker is empty")));
    }

    match resolve(store, ticker, period).await {
        Resolution::NotFound => {
            error!("No snapshot stored for {}", ticker);
            Err(warp::reject::custom(ApiError::not_found(format!(
                "No data stored for {}; import a snapshot first",
                ticker.trim()
            ))))
        }
        resolution => {
            if let Some(notice) = resolution.notice() {
                info!("{}", notice);
            }
            Ok(resolution)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_query_needs_both_parts() {
        let full = PeriodQuery { year: Some(2025), month: Some(6) };
        assert_eq!(full.period().unwrap(), Some(Period::new(2025, 6)));
        assert_eq!(PeriodQuery::default().period().unwrap(), None);
        assert!(PeriodQuery { year: Some(2025), month: None }.period().is_err());
        assert!(PeriodQuery { year: Some(2025), month: Some(13) }.period().is_err());
    }
}
