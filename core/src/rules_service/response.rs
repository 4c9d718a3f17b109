//! Decoding rules service decisions into storage slots.
//!
//! The service decorates several values with prose (`"S130 x 0.5"`,
//! `"Winter Only Discount 0.5"`). The parsing helpers here are the only
//! place that knows those formats.

use crate::attributes::{AttrValue, Attributes};
use crate::error::{ChargingError, ChargingResult};
use crate::types::Ruleset;
use serde::Deserialize;
use serde_json::Value;

/// Abatement value the service returns when no s126 reduction applies.
pub const NO_S126_ADJUSTMENT: &str = "S126 x 1.0";

const RESPONSE_KEY: &str = "WRLSChargingResponse";

/// Convert pounds to whole pence.
pub fn to_pence(pounds: f64) -> i64 {
    (pounds * 100.0).round() as i64
}

/// Trailing number of a decorated factor string: the last space-separated
/// token. `None` when absent or not numeric.
pub fn extract_factor(decorated: Option<&str>) -> Option<f64> {
    decorated?.split(' ').last()?.trim().parse().ok()
}

/// `"50%"` gives `50`.
pub fn parse_percentage(raw: Option<&str>) -> Option<i64> {
    let trimmed = raw?.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number
        .parse::<i64>()
        .ok()
        .or_else(|| number.parse::<f64>().ok().map(|f| f.round() as i64))
}

/// Which agreement to report: an s127 adjustment wins, then an s126
/// abatement unless it is the no-op value.
pub fn agreement_adjustment<'a>(
    s127_agreement: Option<&'a str>,
    abatement_adjustment: Option<&'a str>,
) -> Option<&'a str> {
    let present = |v: &&str| !v.trim().is_empty();
    s127_agreement
        .filter(present)
        .or_else(|| abatement_adjustment.filter(present).filter(|v| *v != NO_S126_ADJUSTMENT))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Decision {
    charge_value: f64,
    #[serde(default)]
    suc_factor: Option<f64>,
    #[serde(default)]
    source_factor: Option<f64>,
    #[serde(default)]
    season_factor: Option<f64>,
    #[serde(default)]
    loss_factor: Option<f64>,
    #[serde(default)]
    abatement_adjustment: Option<String>,
    #[serde(default)]
    s127_agreement: Option<String>,
    #[serde(default)]
    s130_agreement: Option<String>,
    #[serde(default)]
    eiuc_source_factor: Option<f64>,
    #[serde(default)]
    eiuc_factor: Option<f64>,
    #[serde(default)]
    baseline_charge: Option<f64>,
    #[serde(default)]
    water_company_charge: Option<f64>,
    #[serde(default)]
    supported_source_charge: Option<f64>,
    #[serde(default)]
    winter_only_adjustment: Option<String>,
    #[serde(default)]
    compensation_charge_percentage: Option<String>,
}

/// A decoded decision.
#[derive(Debug, Clone, PartialEq)]
pub struct RulesOutcome {
    /// Unsigned charge in pence.
    pub charge_value: i64,
    /// Calculation results in their storage slots.
    pub attributes: Attributes,
    /// The response body as received, kept for audit.
    pub charge_calculation: String,
}

fn float(v: Option<f64>) -> Option<AttrValue> {
    v.map(AttrValue::Float)
}

fn pence(v: Option<f64>) -> Option<AttrValue> {
    v.map(|p| AttrValue::Int(to_pence(p)))
}

fn text(v: Option<&str>) -> Option<AttrValue> {
    v.map(|s| AttrValue::Text(s.to_string()))
}

fn presroc_attributes(d: &Decision) -> Attributes {
    let mut a = Attributes::new();
    a.set_opt("line_attr_4", pence(d.suc_factor));
    a.set_opt("line_attr_6", float(d.source_factor));
    a.set_opt("line_attr_7", float(d.season_factor));
    a.set_opt("line_attr_8", float(d.loss_factor));
    a.set_opt("line_attr_9", text(d.s130_agreement.as_deref()));
    a.set_opt(
        "line_attr_10",
        text(agreement_adjustment(
            d.s127_agreement.as_deref(),
            d.abatement_adjustment.as_deref(),
        )),
    );
    a.set_opt("line_attr_13", float(d.eiuc_source_factor));
    a.set_opt("line_attr_14", float(d.eiuc_factor));
    a
}

fn sroc_attributes(d: &Decision) -> Attributes {
    let mut a = Attributes::new();
    a.set_opt("line_attr_4", pence(d.baseline_charge));
    a.set_opt("line_attr_5", pence(d.water_company_charge));
    a.set_opt("line_attr_6", pence(d.supported_source_charge));
    a.set_opt(
        "line_attr_7",
        float(extract_factor(d.winter_only_adjustment.as_deref())),
    );
    a.set_opt("line_attr_8", float(extract_factor(d.s130_agreement.as_deref())));
    a.set_opt(
        "line_attr_9",
        float(extract_factor(agreement_adjustment(
            d.s127_agreement.as_deref(),
            d.abatement_adjustment.as_deref(),
        ))),
    );
    a.set_opt(
        "line_attr_10",
        parse_percentage(d.compensation_charge_percentage.as_deref()).map(AttrValue::Int),
    );
    a
}

/// Decode a response body. A missing decision object or charge value is a
/// response error, distinct from the service being unreachable.
pub fn decode(ruleset: Ruleset, body: &Value) -> ChargingResult<RulesOutcome> {
    let decision = body.get(RESPONSE_KEY).ok_or_else(|| {
        ChargingError::RulesServiceResponse(format!("\"{RESPONSE_KEY}\" is required"))
    })?;
    let decision: Decision = serde_json::from_value(decision.clone())
        .map_err(|e| ChargingError::RulesServiceResponse(e.to_string()))?;

    let attributes = match ruleset {
        Ruleset::Presroc => presroc_attributes(&decision),
        Ruleset::Sroc => sroc_attributes(&decision),
    };

    Ok(RulesOutcome {
        charge_value: to_pence(decision.charge_value),
        attributes,
        charge_calculation: serde_json::to_string(body)?,
    })
}
