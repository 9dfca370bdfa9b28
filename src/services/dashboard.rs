// src/services/dashboard.rs
use serde::Serialize;

use crate::models::{fields, AnalysisPayload, Cell};
use crate::services::simulation::round2;

/// Placeholder used for both cells of a checklist separator row.
pub const SEPARATOR: &str = "----------";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRow {
    pub label: String,
    pub high: f64,
    pub low: f64,
    pub eps: f64,
    pub high_pe: Cell,
    pub low_pe: Cell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRow {
    pub name: Cell,
    pub value: Cell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistEntry {
    pub label: String,
    pub value: Cell,
}

impl ChecklistEntry {
    fn new(label: &str, value: Cell) -> Self {
        ChecklistEntry {
            label: label.to_string(),
            value,
        }
    }

    fn separator() -> Self {
        ChecklistEntry {
            label: SEPARATOR.to_string(),
            value: Cell::Text(SEPARATOR.to_string()),
        }
    }

    pub fn is_separator(&self) -> bool {
        self.label == SEPARATOR
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub historical: Vec<HistoricalRow>,
    pub revenue: Vec<SeriesRow>,
    pub growth: Vec<SeriesRow>,
    pub net_income: Vec<SeriesRow>,
    pub quarter_checklist: Vec<ChecklistEntry>,
}

pub fn project_dashboard(payload: &AnalysisPayload) -> Dashboard {
    Dashboard {
        historical: historical_rows(payload),
        revenue: series_rows(payload, fields::REVENUE_NAMES, fields::REVENUE_VALUES),
        growth: series_rows(payload, fields::GROWTH_NAMES, fields::GROWTH_VALUES),
        net_income: series_rows(payload, fields::NET_INCOME_NAMES, fields::NET_INCOME_VALUES),
        quarter_checklist: quarter_checklist(payload),
    }
}

/// One row per trailing year, bounded by the shortest of high/low/EPS.
/// Multiples may run shorter; missing ones show as a dash.
pub fn historical_rows(payload: &AnalysisPayload) -> Vec<HistoricalRow> {
    let highs = payload.numbers(fields::HIGH_PRICE);
    let lows = payload.numbers(fields::LOW_PRICE);
    let eps = payload.numbers(fields::EPS);
    let high_pe = payload.cells(fields::HIGH_PE);
    let low_pe = payload.cells(fields::LOW_PE);

    let current_year = payload.number(fields::CURRENT_YEAR) as i64;
    let current_local_year = payload.number(fields::CURRENT_LOCAL_YEAR) as i64;

    let rows = highs.len().min(lows.len()).min(eps.len());
    (0..rows)
        .map(|i| {
            let offset = 1 + i as i64;
            HistoricalRow {
                label: format!(
                    "{}/{}",
                    current_year - offset,
                    current_local_year - offset
                ),
                high: highs[i],
                low: lows[i],
                eps: eps[i],
                high_pe: high_pe.get(i).cloned().unwrap_or_else(Cell::dash),
                low_pe: low_pe.get(i).cloned().unwrap_or_else(Cell::dash),
            }
        })
        .collect()
}

/// One row per name. Series are not cross-checked against each other.
pub fn series_rows(payload: &AnalysisPayload, names: &[&str], values: &[&str]) -> Vec<SeriesRow> {
    let values = payload.cells(values);
    payload
        .cells(names)
        .into_iter()
        .enumerate()
        .map(|(i, name)| SeriesRow {
            name,
            value: values.get(i).cloned().unwrap_or_else(Cell::dash),
        })
        .collect()
}

pub fn quarter_checklist(payload: &AnalysisPayload) -> Vec<ChecklistEntry> {
    let q1 = payload.number(fields::Q1_EPS);
    let q2 = payload.number(fields::Q2_EPS);
    let q3 = payload.number(fields::Q3_EPS);
    let avg_margin = payload
        .lookup(fields::AVG_NET_MARGIN)
        .map(Cell::from)
        .unwrap_or(Cell::Number(0.0));

    vec![
        ChecklistEntry::new("Q1 EPS (actual)", Cell::Number(q1)),
        ChecklistEntry::new("Q2 EPS (actual)", Cell::Number(q2)),
        ChecklistEntry::new("Q3 EPS (actual)", Cell::Number(q3)),
        ChecklistEntry::new("Q1-Q3 EPS total", Cell::Number(round2(q1 + q2 + q3))),
        ChecklistEntry::new(
            "Detection status",
            Cell::Text(payload.text(fields::DETECTION_STATUS)),
        ),
        ChecklistEntry::new(
            "Latest reported quarter",
            Cell::Text(payload.text(fields::LATEST_QUARTER)),
        ),
        ChecklistEntry::separator(),
        ChecklistEntry::new(
            "Prior-year Q4 revenue (actual)",
            Cell::Number(payload.number(fields::PRIOR_Q4_REVENUE)),
        ),
        ChecklistEntry::new("Average net margin", avg_margin),
        ChecklistEntry::new("Capital", Cell::Number(payload.number(fields::CAPITAL))),
        ChecklistEntry::separator(),
        ChecklistEntry::new(
            "Q4 EPS (estimate)",
            Cell::Number(payload.number(fields::EST_Q4_EPS)),
        ),
        ChecklistEntry::new(
            "Full-year EPS (estimate)",
            Cell::Number(payload.number(fields::EST_FULL_YEAR_EPS)),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> AnalysisPayload {
        AnalysisPayload::new(json!({
            "Historical": {
                "HighPrice": [650.0, 600.0, 580.0, 540.0],
                "LowPrice": [480.0, 430.0, 400.0],
                "EPS": [32.3, 39.2, 23.0, 19.4, 17.0],
                "HighPE": [20.1, 15.3, 25.2, 27.8, 30.0, 31.0],
                "LowPE": [14.9],
                "CurrentYear": 2025,
                "CurrentLocalYear": 114
            },
            "Revenue": {"Names": ["2022", "2023", "2024"], "Values": [2263.9, 2161.7]},
            "Growth": {"Names": ["2023", "2024"], "Values": ["-4.5%", "33.9%"]},
            "NetIncome": {"Names": ["2024"], "Values": [1173.3, 999.0]},
            "QuarterFacts": {
                "Q1EPS": 13.94,
                "Q2EPS": 15.36,
                "Q3EPS": 17.691,
                "DetectionStatus": "Q3 reported",
                "LatestQuarter": "2025Q3",
                "PriorQ4Revenue": 8684.7,
                "AvgNetMargin": "40.2%",
                "Capital": 2593.0,
                "EstQ4EPS": 17.2,
                "EstFullYearEPS": 64.19
            }
        }))
    }

    #[test]
    fn historical_rows_stop_at_shortest_core_series() {
        let rows = historical_rows(&sample_payload());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].label, "2024/113");
        assert_eq!(rows[2].label, "2022/111");
        assert_eq!(rows[1].eps, 39.2);
        assert_eq!(rows[0].low_pe, Cell::Number(14.9));
        assert_eq!(rows[1].low_pe, Cell::dash());
        assert_eq!(rows[2].high_pe, Cell::Number(25.2));
    }

    #[test]
    fn series_rows_follow_their_own_names() {
        let dashboard = project_dashboard(&sample_payload());
        assert_eq!(dashboard.revenue.len(), 3);
        assert_eq!(dashboard.revenue[2].value, Cell::dash());
        assert_eq!(dashboard.growth.len(), 2);
        assert_eq!(dashboard.growth[1].value, Cell::Text("33.9%".into()));
        assert_eq!(dashboard.net_income.len(), 1);
        assert_eq!(dashboard.net_income[0].value, Cell::Number(1173.3));
    }

    #[test]
    fn checklist_has_fixed_shape() {
        let checklist = quarter_checklist(&sample_payload());
        assert_eq!(checklist.len(), 13);
        let separators: Vec<usize> = checklist
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_separator())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(separators, vec![6, 10]);
        assert_eq!(checklist[6].value, Cell::Text(SEPARATOR.into()));
        assert_eq!(checklist[3].value, Cell::Number(46.99));
        assert_eq!(checklist[5].value, Cell::Text("2025Q3".into()));
        assert_eq!(checklist[8].value, Cell::Text("40.2%".into()));
        assert_eq!(checklist[12].value, Cell::Number(64.19));
    }

    #[test]
    fn empty_payload_still_renders_every_group() {
        let dashboard = project_dashboard(&AnalysisPayload::default());
        assert!(dashboard.historical.is_empty());
        assert!(dashboard.revenue.is_empty());
        assert!(dashboard.growth.is_empty());
        assert!(dashboard.net_income.is_empty());
        assert_eq!(dashboard.quarter_checklist.len(), 13);
        assert_eq!(dashboard.quarter_checklist[0].value, Cell::Number(0.0));
        assert_eq!(dashboard.quarter_checklist[4].value, Cell::Text("-".into()));
    }
}
