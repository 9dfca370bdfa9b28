// src/services/resolver.rs
use log::{info, warn};

use crate::models::{Period, Snapshot, SnapshotKey};
use crate::services::store::SnapshotStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Exact(Snapshot),
    /// The requested period was missing; the latest stored snapshot stands in.
    Fallback { snapshot: Snapshot, requested: Period },
    NotFound,
}

impl Resolution {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Resolution::Exact(snapshot) | Resolution::Fallback { snapshot, .. } => Some(snapshot),
            Resolution::NotFound => None,
        }
    }

    pub fn requested(&self) -> Option<Period> {
        match self {
            Resolution::Fallback { requested, .. } => Some(*requested),
            Resolution::Exact(snapshot) => Some(snapshot.key.period()),
            Resolution::NotFound => None,
        }
    }

    /// Message telling the caller the shown period differs from the requested one.
    pub fn notice(&self) -> Option<String> {
        match self {
            Resolution::Fallback { snapshot, requested } => Some(format!(
                "No data for {} in {}; showing {} instead",
                snapshot.key.ticker,
                requested,
                snapshot.key.period()
            )),
            _ => None,
        }
    }
}

/// Exact (ticker, year, month) lookup, falling back to the ticker's latest
/// snapshot. Without a period the latest snapshot is the answer.
pub async fn resolve(store: &SnapshotStore, ticker: &str, period: Option<Period>) -> Resolution {
    let ticker = ticker.trim();

    if let Some(requested) = period {
        let key = SnapshotKey::new(ticker, requested.year, requested.month);
        if let Some(snapshot) = store.get(&key).await {
            return Resolution::Exact(snapshot);
        }
        return match store.latest(ticker).await {
            Some(snapshot) => {
                warn!(
                    "No snapshot for {} at {}, falling back to {}",
                    ticker,
                    requested,
                    snapshot.key.period()
                );
                Resolution::Fallback { snapshot, requested }
            }
            None => {
                info!("No snapshots stored for {}", ticker);
                Resolution::NotFound
            }
        };
    }

    match store.latest(ticker).await {
        Some(snapshot) => Resolution::Exact(snapshot),
        None => Resolution::NotFound,
    }
}
