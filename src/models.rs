// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::services::percent::{parse_number, parse_percent};

/// Paths into the analysis document as the producer writes it.
pub mod fields {
    pub const STOCK_NAME: &[&str] = &["Meta", "StockName"];
    pub const META_YEAR: &[&str] = &["Meta", "Year"];
    pub const META_MONTH: &[&str] = &["Meta", "Month"];

    pub const HIGH_PRICE: &[&str] = &["Historical", "HighPrice"];
    pub const LOW_PRICE: &[&str] = &["Historical", "LowPrice"];
    pub const EPS: &[&str] = &["Historical", "EPS"];
    pub const HIGH_PE: &[&str] = &["Historical", "HighPE"];
    pub const LOW_PE: &[&str] = &["Historical", "LowPE"];
    pub const CURRENT_YEAR: &[&str] = &["Historical", "CurrentYear"];
    pub const CURRENT_LOCAL_YEAR: &[&str] = &["Historical", "CurrentLocalYear"];

    pub const REVENUE_NAMES: &[&str] = &["Revenue", "Names"];
    pub const REVENUE_VALUES: &[&str] = &["Revenue", "Values"];
    pub const GROWTH_NAMES: &[&str] = &["Growth", "Names"];
    pub const GROWTH_VALUES: &[&str] = &["Growth", "Values"];
    pub const NET_INCOME_NAMES: &[&str] = &["NetIncome", "Names"];
    pub const NET_INCOME_VALUES: &[&str] = &["NetIncome", "Values"];

    pub const Q1_EPS: &[&str] = &["QuarterFacts", "Q1EPS"];
    pub const Q2_EPS: &[&str] = &["QuarterFacts", "Q2EPS"];
    pub const Q3_EPS: &[&str] = &["QuarterFacts", "Q3EPS"];
    pub const DETECTION_STATUS: &[&str] = &["QuarterFacts", "DetectionStatus"];
    pub const LATEST_QUARTER: &[&str] = &["QuarterFacts", "LatestQuarter"];
    pub const PRIOR_Q4_REVENUE: &[&str] = &["QuarterFacts", "PriorQ4Revenue"];
    pub const AVG_NET_MARGIN: &[&str] = &["QuarterFacts", "AvgNetMargin"];
    pub const CAPITAL: &[&str] = &["QuarterFacts", "Capital"];
    pub const EST_Q4_EPS: &[&str] = &["QuarterFacts", "EstQ4EPS"];
    pub const EST_FULL_YEAR_EPS: &[&str] = &["QuarterFacts", "EstFullYearEPS"];
    pub const FORWARD_EPS: &[&str] = &["QuarterFacts", "ForwardEPS"];
    pub const FORWARD_GROWTH: &[&str] = &["QuarterFacts", "ForwardGrowth"];
    pub const FORWARD_MARGIN: &[&str] = &["QuarterFacts", "ForwardMargin"];
    pub const FORWARD_LOW_PE: &[&str] = &["QuarterFacts", "ForwardLowPE"];
    pub const FORWARD_HIGH_PE: &[&str] = &["QuarterFacts", "ForwardHighPE"];
    pub const FORWARD_REVENUE: &[&str] = &["QuarterFacts", "ForwardRevenue"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        Period { year, month }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{:02}", self.year, self.month)
    }
}

/// Field order gives the (ticker, year, month) ordering used by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub ticker: String,
    pub year: i32,
    pub month: u32,
}

impl SnapshotKey {
    pub fn new(ticker: impl Into<String>, year: i32, month: u32) -> Self {
        SnapshotKey {
            ticker: ticker.into().trim().to_string(),
            year,
            month,
        }
    }

    pub fn period(&self) -> Period {
        Period::new(self.year, self.month)
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.ticker, self.period())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub key: SnapshotKey,
    pub name: String,
    pub payload: AnalysisPayload,
    pub imported_at: DateTime<Utc>,
}

/// A display value: either a number or the text the producer stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub const DASH: &'static str = "-";

    pub fn dash() -> Self {
        Cell::Text(Self::DASH.to_string())
    }
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or_else(Cell::dash),
            Value::String(s) => Cell::Text(s.clone()),
            Value::Null => Cell::dash(),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Stored analysis document. Every accessor is total: a missing or mistyped
/// field reads as zero, an empty list or a dash, never as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisPayload(Value);

impl AnalysisPayload {
    pub fn new(value: Value) -> Self {
        AnalysisPayload(value)
    }

    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.0, |node, key| node.get(*key))
    }

    pub fn number(&self, path: &[&str]) -> f64 {
        self.lookup(path).map(parse_number).unwrap_or(0.0)
    }

    pub fn percent(&self, path: &[&str]) -> f64 {
        self.lookup(path).map(parse_percent).unwrap_or(0.0)
    }

    pub fn numbers(&self, path: &[&str]) -> Vec<f64> {
        self.array(path).iter().map(parse_number).collect()
    }

    pub fn cells(&self, path: &[&str]) -> Vec<Cell> {
        self.array(path).iter().map(Cell::from).collect()
    }

    pub fn text(&self, path: &[&str]) -> String {
        match self.lookup(path) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => Cell::DASH.to_string(),
        }
    }

    fn array(&self, path: &[&str]) -> &[Value] {
        self.lookup(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
