// src/services/simulation.rs
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{fields, AnalysisPayload};
use crate::services::percent::{parse_number_text, parse_percent_text};

/// Capital is stated in units ten times the EPS share unit.
const CAPITAL_UNIT_FACTOR: f64 = 10.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("invalid {field} override: {value:?} is not a number")]
    InvalidOverride { field: &'static str, value: String },
}

/// Raw override text as the caller typed it. Blank fields count as not supplied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverrideInput {
    pub growth: Option<String>,
    pub margin: Option<String>,
    pub low_multiple: Option<String>,
    pub high_multiple: Option<String>,
}

impl OverrideInput {
    /// Growth and margin are percentages (`"10"` or `"10%"` both mean 0.10);
    /// multiples are plain numbers.
    pub fn parse(&self) -> Result<SimulationOverrides, SimulationError> {
        Ok(SimulationOverrides {
            growth: parse_field("growth", &self.growth, parse_percent_text)?,
            margin: parse_field("margin", &self.margin, parse_percent_text)?,
            low_multiple: parse_field("low_multiple", &self.low_multiple, parse_number_text)?,
            high_multiple: parse_field("high_multiple", &self.high_multiple, parse_number_text)?,
        })
    }
}

fn parse_field(
    field: &'static str,
    raw: &Option<String>,
    parse: fn(&str) -> Option<f64>,
) -> Result<Option<f64>, SimulationError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse(text)
            .map(Some)
            .ok_or_else(|| SimulationError::InvalidOverride {
                field,
                value: text.to_string(),
            }),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SimulationOverrides {
    pub growth: Option<f64>,
    pub margin: Option<f64>,
    pub low_multiple: Option<f64>,
    pub high_multiple: Option<f64>,
}

/// The producer's forward estimate, read from the stored payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForwardAssumptions {
    pub revenue: f64,
    pub growth: f64,
    pub margin: f64,
    pub low_multiple: f64,
    pub high_multiple: f64,
    pub capital: f64,
    /// Shown next to the assumptions for comparison; never fed into the arithmetic.
    pub eps: f64,
}

impl ForwardAssumptions {
    pub fn from_payload(payload: &AnalysisPayload) -> Self {
        ForwardAssumptions {
            revenue: payload.number(fields::FORWARD_REVENUE),
            growth: payload.percent(fields::FORWARD_GROWTH),
            margin: payload.percent(fields::FORWARD_MARGIN),
            low_multiple: payload.number(fields::FORWARD_LOW_PE),
            high_multiple: payload.number(fields::FORWARD_HIGH_PE),
            capital: payload.number(fields::CAPITAL),
            eps: payload.number(fields::FORWARD_EPS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    BaseRevenue,
    Assumptions,
    ProjectedRevenue,
    NetIncome,
    Eps,
    TargetHigh,
    TargetLow,
    Upside,
    Downside,
    RiskReward,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operand {
    pub name: &'static str,
    pub value: f64,
}

/// One calculation step. `guarded` marks a step that hit a zero denominator
/// and fell back to its defined value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    pub kind: StepKind,
    pub operands: Vec<Operand>,
    pub result: Option<f64>,
    pub guarded: bool,
}

impl TraceStep {
    fn new(kind: StepKind, operands: &[(&'static str, f64)], result: Option<f64>) -> Self {
        TraceStep {
            kind,
            operands: operands
                .iter()
                .map(|&(name, value)| Operand { name, value })
                .collect(),
            result,
            guarded: false,
        }
    }

    fn guarded(mut self, guarded: bool) -> Self {
        self.guarded = guarded;
        self
    }

    fn operand(&self, index: usize) -> String {
        self.operands
            .get(index)
            .map(|o| format_number(o.value))
            .unwrap_or_else(|| "?".to_string())
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            StepKind::BaseRevenue => "Base revenue",
            StepKind::Assumptions => "Assumptions",
            StepKind::ProjectedRevenue => "Projected revenue",
            StepKind::NetIncome => "Projected net income",
            StepKind::Eps => "Projected EPS",
            StepKind::TargetHigh => "Target price (high)",
            StepKind::TargetLow => "Target price (low)",
            StepKind::Upside => "Upside",
            StepKind::Downside => "Downside",
            StepKind::RiskReward => "Risk-reward ratio",
        }
    }

    /// Formula with the actual numbers substituted in.
    pub fn formula(&self) -> String {
        let op = |i| self.operand(i);
        match self.kind {
            StepKind::BaseRevenue if self.guarded => {
                format!("{} (1 + {} = 0, kept as stored)", op(0), op(1))
            }
            StepKind::BaseRevenue => format!("{} / (1 + {})", op(0), op(1)),
            StepKind::Assumptions => format!(
                "growth {}, margin {}, multiples {} ~ {} (stored forward EPS {})",
                op(0),
                op(1),
                op(2),
                op(3),
                op(4)
            ),
            StepKind::ProjectedRevenue => format!("{} * (1 + {})", op(0), op(1)),
            StepKind::NetIncome => format!("{} * {}", op(0), op(1)),
            StepKind::Eps if self.guarded => format!("capital {} is zero, EPS set to 0", op(1)),
            StepKind::Eps => format!("round({} / {} * 10, 2)", op(0), op(1)),
            StepKind::TargetHigh | StepKind::TargetLow => {
                format!("round({} * {}, 2)", op(0), op(1))
            }
            StepKind::Upside | StepKind::Downside => {
                format!("({} - {}) / {}", op(0), op(1), op(1))
            }
            StepKind::RiskReward if self.guarded => "downside is 0, ratio set to 0".to_string(),
            StepKind::RiskReward => format!("|{} / {}|", op(0), op(1)),
        }
    }
}

/// Numbers in a formula: at most four decimals, trailing zeros dropped.
fn format_number(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub live_price: Option<f64>,
    pub growth_pct: f64,
    pub margin_pct: f64,
    pub low_multiple: f64,
    pub high_multiple: f64,
    pub base_revenue: f64,
    pub revenue: f64,
    pub net_income: f64,
    pub eps: f64,
    pub target_high: f64,
    pub target_low: f64,
    pub upside_pct: Option<f64>,
    pub downside_pct: Option<f64>,
    pub risk_reward: Option<f64>,
    pub trace: Vec<TraceStep>,
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Undoes the growth baked into the stored forward revenue.
/// Returns the revenue unchanged when `1 + growth` is zero.
pub fn reconstruct_base_revenue(forward_revenue: f64, forward_growth: f64) -> f64 {
    let denominator = 1.0 + forward_growth;
    if denominator == 0.0 {
        forward_revenue
    } else {
        forward_revenue / denominator
    }
}

pub fn simulate(
    payload: &AnalysisPayload,
    overrides: &SimulationOverrides,
    live_price: Option<f64>,
) -> SimulationResult {
    let stored = ForwardAssumptions::from_payload(payload);
    let mut trace = Vec::with_capacity(10);

    let base_guarded = 1.0 + stored.growth == 0.0;
    let base_revenue = reconstruct_base_revenue(stored.revenue, stored.growth);
    trace.push(
        TraceStep::new(
            StepKind::BaseRevenue,
            &[("forward_revenue", stored.revenue), ("forward_growth", stored.growth)],
            Some(base_revenue),
        )
        .guarded(base_guarded),
    );

    let growth = overrides.growth.unwrap_or(stored.growth);
    let margin = overrides.margin.unwrap_or(stored.margin);
    let low_multiple = overrides.low_multiple.unwrap_or(stored.low_multiple);
    let high_multiple = overrides.high_multiple.unwrap_or(stored.high_multiple);
    trace.push(TraceStep::new(
        StepKind::Assumptions,
        &[
            ("growth", growth),
            ("margin", margin),
            ("low_multiple", low_multiple),
            ("high_multiple", high_multiple),
            ("forward_eps", stored.eps),
        ],
        None,
    ));

    let revenue = base_revenue * (1.0 + growth);
    trace.push(TraceStep::new(
        StepKind::ProjectedRevenue,
        &[("base_revenue", base_revenue), ("growth", growth)],
        Some(revenue),
    ));

    let net_income = revenue * margin;
    trace.push(TraceStep::new(
        StepKind::NetIncome,
        &[("revenue", revenue), ("margin", margin)],
        Some(net_income),
    ));

    let eps_guarded = stored.capital == 0.0;
    let eps = if eps_guarded {
        0.0
    } else {
        round2(net_income / stored.capital * CAPITAL_UNIT_FACTOR)
    };
    trace.push(
        TraceStep::new(
            StepKind::Eps,
            &[("net_income", net_income), ("capital", stored.capital)],
            Some(eps),
        )
        .guarded(eps_guarded),
    );

    let target_high = round2(eps * high_multiple);
    trace.push(TraceStep::new(
        StepKind::TargetHigh,
        &[("eps", eps), ("high_multiple", high_multiple)],
        Some(target_high),
    ));
    let target_low = round2(eps * low_multiple);
    trace.push(TraceStep::new(
        StepKind::TargetLow,
        &[("eps", eps), ("low_multiple", low_multiple)],
        Some(target_low),
    ));

    let live_price = live_price.filter(|p| p.is_finite() && *p > 0.0);
    let (upside_pct, downside_pct, risk_reward) = match live_price {
        Some(price) => {
            let upside = (target_high - price) / price;
            trace.push(TraceStep::new(
                StepKind::Upside,
                &[("target_high", target_high), ("live_price", price)],
                Some(upside),
            ));
            let downside = (target_low - price) / price;
            trace.push(TraceStep::new(
                StepKind::Downside,
                &[("target_low", target_low), ("live_price", price)],
                Some(downside),
            ));
            let rr_guarded = downside == 0.0;
            let ratio = if rr_guarded {
                0.0
            } else {
                (upside / downside).abs()
            };
            trace.push(
                TraceStep::new(
                    StepKind::RiskReward,
                    &[("upside", upside), ("downside", downside)],
                    Some(ratio),
                )
                .guarded(rr_guarded),
            );
            (
                Some(round2(upside * 100.0)),
                Some(round2(downside * 100.0)),
                Some(round2(ratio)),
            )
        }
        None => {
            debug!("No live price; return metrics not available");
            (None, None, None)
        }
    };

    SimulationResult {
        live_price,
        growth_pct: round_to(growth * 100.0, 4),
        margin_pct: round_to(margin * 100.0, 4),
        low_multiple,
        high_multiple,
        base_revenue,
        revenue,
        net_income,
        eps,
        target_high,
        target_low,
        upside_pct,
        downside_pct,
        risk_reward,
        trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn payload() -> AnalysisPayload {
        AnalysisPayload::new(json!({
            "QuarterFacts": {
                "ForwardRevenue": 1200.0,
                "ForwardGrowth": 0.20,
                "ForwardMargin": "12%",
                "ForwardLowPE": 10.0,
                "ForwardHighPE": 15.0,
                "Capital": 50.0,
                "ForwardEPS": 28.5
            }
        }))
    }

    fn run_simulation(
        payload: &AnalysisPayload,
        input: &OverrideInput,
        live_price: Option<f64>,
    ) -> Result<SimulationResult, SimulationError> {
        let overrides = input.parse()?;
        Ok(simulate(payload, &overrides, live_price))
    }

    fn overrides(growth: &str, margin: &str) -> OverrideInput {
        OverrideInput {
            growth: Some(growth.to_string()),
            margin: Some(margin.to_string()),
            ..OverrideInput::default()
        }
    }

    #[test]
    fn base_revenue_undoes_forward_growth() {
        assert!(close(reconstruct_base_revenue(1200.0, 0.20), 1000.0));
        assert_eq!(reconstruct_base_revenue(1200.0, -1.0), 1200.0);
    }

    #[test]
    fn full_scenario_with_live_price() {
        let result = run_simulation(&payload(), &overrides("10", "15%"), Some(300.0)).unwrap();

        assert!(close(result.base_revenue, 1000.0));
        assert!(close(result.revenue, 1100.0));
        assert!(close(result.net_income, 165.0));
        assert_eq!(result.eps, 33.0);
        assert_eq!(result.target_low, 330.0);
        assert_eq!(result.target_high, 495.0);
        assert_eq!(result.upside_pct, Some(65.0));
        assert_eq!(result.downside_pct, Some(10.0));
        assert_eq!(result.risk_reward, Some(6.5));
        assert_eq!(result.growth_pct, 10.0);
        assert_eq!(result.margin_pct, 15.0);
    }

    #[test]
    fn trace_follows_execution_order() {
        let result = run_simulation(&payload(), &OverrideInput::default(), Some(300.0)).unwrap();
        let kinds: Vec<StepKind> = result.trace.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::BaseRevenue,
                StepKind::Assumptions,
                StepKind::ProjectedRevenue,
                StepKind::NetIncome,
                StepKind::Eps,
                StepKind::TargetHigh,
                StepKind::TargetLow,
                StepKind::Upside,
                StepKind::Downside,
                StepKind::RiskReward,
            ]
        );
        assert_eq!(result.trace[0].formula(), "1200 / (1 + 0.2)");
        assert_eq!(result.trace[5].label(), "Target price (high)");
    }

    #[test]
    fn assumptions_step_shows_stored_forward_eps() {
        let result = run_simulation(&payload(), &overrides("10", "15"), None).unwrap();
        let step = &result.trace[1];
        assert_eq!(step.kind, StepKind::Assumptions);
        assert_eq!(step.result, None);
        let eps = step.operands.iter().find(|o| o.name == "forward_eps").unwrap();
        assert_eq!(eps.value, 28.5);
        assert_eq!(
            step.formula(),
            "growth 0.1, margin 0.15, multiples 10 ~ 15 (stored forward EPS 28.5)"
        );
        // the stored figure does not replace the projected one
        assert_eq!(result.eps, 33.0);
    }

    #[test]
    fn omitted_overrides_use_stored_assumptions() {
        let stored = ForwardAssumptions::from_payload(&payload());
        let result = simulate(&payload(), &SimulationOverrides::default(), None);
        assert_eq!(result.low_multiple, stored.low_multiple);
        assert_eq!(result.high_multiple, stored.high_multiple);
        assert!(close(result.margin_pct, 12.0));
        assert!(close(result.growth_pct, 20.0));
        // with stored values reconstruction and projection cancel out
        assert_eq!(round_to(result.revenue, 6), round_to(stored.revenue, 6));
    }

    #[test]
    fn projection_inverts_reconstruction() {
        for growth in [-0.5, 0.0, 0.07, 0.2, 1.5] {
            let base = reconstruct_base_revenue(987.65, growth);
            assert_eq!(round_to(base * (1.0 + growth), 6), round_to(987.65, 6));
        }
    }

    #[test]
    fn missing_live_price_keeps_projection() {
        let result = run_simulation(&payload(), &overrides("10", "15"), None).unwrap();
        assert_eq!(result.live_price, None);
        assert_eq!(result.upside_pct, None);
        assert_eq!(result.downside_pct, None);
        assert_eq!(result.risk_reward, None);
        assert_eq!(result.eps, 33.0);
        assert_eq!(result.target_high, 495.0);
        assert_eq!(result.trace.len(), 7);
    }

    #[test]
    fn zero_downside_gives_zero_ratio() {
        let result = run_simulation(&payload(), &overrides("10", "15"), Some(330.0)).unwrap();
        assert_eq!(result.downside_pct, Some(0.0));
        assert_eq!(result.risk_reward, Some(0.0));
        let last = result.trace.last().unwrap();
        assert!(last.guarded);
        assert_eq!(last.formula(), "downside is 0, ratio set to 0");
    }

    #[test]
    fn degenerate_growth_keeps_forward_revenue() {
        let payload = AnalysisPayload::new(json!({
            "QuarterFacts": {"ForwardRevenue": 500.0, "ForwardGrowth": "-100%", "Capital": 10.0}
        }));
        let result = simulate(&payload, &SimulationOverrides::default(), None);
        assert_eq!(result.base_revenue, 500.0);
        assert!(result.trace[0].guarded);
    }

    #[test]
    fn zero_capital_does_not_divide() {
        let payload = AnalysisPayload::new(json!({"QuarterFacts": {"ForwardRevenue": 500.0}}));
        let result = simulate(&payload, &SimulationOverrides::default(), Some(10.0));
        assert_eq!(result.eps, 0.0);
        assert!(result.trace[4].guarded);
        assert_eq!(result.upside_pct, Some(-100.0));
    }

    #[test]
    fn non_positive_live_price_is_unavailable() {
        let result = simulate(&payload(), &SimulationOverrides::default(), Some(0.0));
        assert_eq!(result.live_price, None);
        assert_eq!(result.risk_reward, None);
    }

    #[test]
    fn bad_override_is_reported_not_defaulted() {
        let input = OverrideInput {
            high_multiple: Some("fifteen".to_string()),
            ..OverrideInput::default()
        };
        let err = run_simulation(&payload(), &input, Some(300.0)).unwrap_err();
        assert_eq!(
            err,
            SimulationError::InvalidOverride {
                field: "high_multiple",
                value: "fifteen".to_string()
            }
        );
    }

    #[test]
    fn blank_override_counts_as_omitted() {
        let input = OverrideInput {
            growth: Some("   ".to_string()),
            low_multiple: Some("8".to_string()),
            ..OverrideInput::default()
        };
        let parsed = input.parse().unwrap();
        assert_eq!(parsed.growth, None);
        assert_eq!(parsed.low_multiple, Some(8.0));
    }

    #[test]
    fn formula_numbers_are_trimmed() {
        assert_eq!(format_number(1200.0), "1200");
        assert_eq!(format_number(0.155), "0.155");
        assert_eq!(format_number(-0.00001), "0");
    }
}
