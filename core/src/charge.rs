//! Charge calculation: translate, ask the rules service, merge.
//!
//! No persistence happens here. The same inputs and the same rules
//! service answer always give the same result.

use crate::attributes::Attributes;
use crate::error::ChargingResult;
use crate::presenters::calculation;
use crate::rules_service::{self, RulesService};
use crate::translator::{self, TranslatedCharge};
use crate::types::Ruleset;
use chrono::NaiveDate;
use serde_json::Value;

/// A translated request merged with the rules service's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedCharge {
    pub ruleset: Ruleset,
    pub charge_period_start: NaiveDate,
    pub charge_period_end: NaiveDate,
    pub charge_financial_year: i32,
    pub charge_credit: bool,
    /// Unsigned pence.
    pub charge_value: i64,
    pub compensation_charge: bool,
    pub charge_calculation: String,
    pub attributes: Attributes,
}

impl CalculatedCharge {
    pub fn signed_value(&self) -> i64 {
        if self.charge_credit {
            -self.charge_value
        } else {
            self.charge_value
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    /// Client-facing calculation fields.
    Response(Value),
    /// Everything needed to persist a transaction.
    Charge(CalculatedCharge),
}

pub struct CalculateCharge<'a> {
    rules: &'a dyn RulesService,
}

impl<'a> CalculateCharge<'a> {
    pub fn new(rules: &'a dyn RulesService) -> Self {
        Self { rules }
    }

    pub fn go(&self, payload: &Value, regime: &str, want_presenter: bool) -> ChargingResult<ChargeOutcome> {
        let translated = translator::translate_charge(payload)?;
        log::debug!(
            "calculating charge: regime={regime} ruleset={} financial_year={}",
            translated.ruleset,
            translated.charge_financial_year
        );
        let charge = self.calculate(translated)?;

        if want_presenter {
            Ok(ChargeOutcome::Response(calculation::present(&charge)))
        } else {
            Ok(ChargeOutcome::Charge(charge))
        }
    }

    /// Call the rules service for an already translated request. Values
    /// from the service replace any client value in the same slot.
    pub fn calculate(&self, translated: TranslatedCharge) -> ChargingResult<CalculatedCharge> {
        let request = rules_service::build_request(&translated);
        let body = self.rules.calculate(
            translated.ruleset,
            translated.charge_financial_year,
            &request,
        )?;
        let outcome = rules_service::decode(translated.ruleset, &body)?;

        let mut attributes = translated.attributes;
        attributes.merge(outcome.attributes);

        Ok(CalculatedCharge {
            ruleset: translated.ruleset,
            charge_period_start: translated.charge_period_start,
            charge_period_end: translated.charge_period_end,
            charge_financial_year: translated.charge_financial_year,
            charge_credit: translated.charge_credit,
            charge_value: outcome.charge_value,
            compensation_charge: translated.compensation_charge,
            charge_calculation: outcome.charge_calculation,
            attributes,
        })
    }
}
