// src/services/import.rs
use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Asia::Taipei;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{fields, AnalysisPayload, Period, Snapshot, SnapshotKey};
use crate::services::store::{SnapshotStore, StoreError};

pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import document must be a JSON object keyed by ticker")]
    NotAnObject,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: Vec<SnapshotKey>,
    pub skipped: Vec<String>,
}

/// The market's calendar month at `now`.
pub fn current_period(now: DateTime<Utc>) -> Period {
    let local = now.with_timezone(&Taipei);
    Period::new(local.year(), local.month())
}

/// Period named in the payload's metadata, or `fallback` when either part is
/// missing or out of range.
pub fn target_period(payload: &AnalysisPayload, fallback: Period) -> Period {
    let year = payload
        .lookup(fields::META_YEAR)
        .and_then(integer)
        .filter(|y| *y > 0 && *y <= i32::MAX as i64);
    let month = payload
        .lookup(fields::META_MONTH)
        .and_then(integer)
        .filter(|m| (1..=12).contains(m));

    match (year, month) {
        (Some(year), Some(month)) => Period::new(year as i32, month as u32),
        _ => fallback,
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn stock_name(payload: &AnalysisPayload) -> String {
    payload
        .lookup(fields::STOCK_NAME)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_NAME)
        .to_string()
}

/// Upserts one snapshot per top-level ticker key.
pub async fn import_document(
    store: &SnapshotStore,
    document: &Value,
    now: DateTime<Utc>,
) -> Result<ImportSummary, ImportError> {
    let entries = document.as_object().ok_or(ImportError::NotAnObject)?;
    let fallback = current_period(now);

    let mut summary = ImportSummary::default();
    let mut batch = Vec::with_capacity(entries.len());
    for (ticker, content) in entries {
        let ticker = ticker.trim();
        if ticker.is_empty() || !content.is_object() {
            warn!("Skipping import entry {:?}: not a ticker object", ticker);
            summary.skipped.push(ticker.to_string());
            continue;
        }

        let payload = AnalysisPayload::new(content.clone());
        let period = target_period(&payload, fallback);
        let key = SnapshotKey::new(ticker, period.year, period.month);
        summary.imported.push(key.clone());
        batch.push(Snapshot {
            key,
            name: stock_name(&payload),
            payload,
            imported_at: now,
        });
    }

    let replaced = store.upsert_all(batch).await?;
    info!(
        "Imported {} snapshots ({} replaced, {} skipped)",
        summary.imported.len(),
        replaced,
        summary.skipped.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        // 2025-06-30 20:00 UTC is already July in Taipei
        Utc.with_ymd_and_hms(2025, 6, 30, 20, 0, 0).unwrap()
    }

    #[test]
    fn current_period_uses_market_timezone() {
        assert_eq!(current_period(now()), Period::new(2025, 7));
    }

    #[test]
    fn metadata_period_accepts_numbers_and_strings() {
        let payload = AnalysisPayload::new(json!({"Meta": {"Year": "2024", "Month": 11.0}}));
        assert_eq!(target_period(&payload, Period::new(2025, 7)), Period::new(2024, 11));
    }

    #[test]
    fn malformed_metadata_uses_fallback() {
        let fallback = Period::new(2025, 7);
        for meta in [
            json!({"Year": 2024, "Month": 13}),
            json!({"Year": "soon", "Month": 3}),
            json!({"Year": 2024}),
            json!({}),
        ] {
            let payload = AnalysisPayload::new(json!({ "Meta": meta }));
            assert_eq!(target_period(&payload, fallback), fallback);
        }
    }

    #[tokio::test]
    async fn import_upserts_each_ticker() {
        let store = SnapshotStore::in_memory();
        let document = json!({
            "2330": {"Meta": {"StockName": "TSMC", "Year": 2025, "Month": 5}},
            "2317": {"Meta": {}},
            "bad": [1, 2, 3]
        });

        let summary = import_document(&store, &document, now()).await.unwrap();
        assert_eq!(summary.imported.len(), 2);
        assert_eq!(summary.skipped, vec!["bad".to_string()]);

        let tsmc = store.get(&SnapshotKey::new("2330", 2025, 5)).await.unwrap();
        assert_eq!(tsmc.name, "TSMC");
        let hon_hai = store.get(&SnapshotKey::new("2317", 2025, 7)).await.unwrap();
        assert_eq!(hon_hai.name, UNKNOWN_NAME);
    }

    #[tokio::test]
    async fn reimport_overwrites_payload() {
        let store = SnapshotStore::in_memory();
        let first = json!({
            "2330": {"Meta": {"Year": 2025, "Month": 5}, "QuarterFacts": {"Capital": 1}}
        });
        let second = json!({
            "2330": {"Meta": {"Year": 2025, "Month": 5}, "QuarterFacts": {"Capital": 2}}
        });
        import_document(&store, &first, now()).await.unwrap();
        import_document(&store, &second, now()).await.unwrap();

        assert_eq!(store.len().await, 1);
        let snapshot = store.get(&SnapshotKey::new("2330", 2025, 5)).await.unwrap();
        assert_eq!(snapshot.payload.number(fields::CAPITAL), 2.0);
    }

    #[tokio::test]
    async fn non_object_document_is_rejected() {
        let store = SnapshotStore::in_memory();
        let err = import_document(&store, &json!([1]), now()).await.unwrap_err();
        assert!(matches!(err, ImportError::NotAnObject));
    }
}
