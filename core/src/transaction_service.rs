//! Adding charge transactions to a bill run.
//!
//! Translate, calculate, then persist the line and its tallies in one
//! SQLite transaction. Nothing is written when any step fails.

use crate::charge::CalculateCharge;
use crate::error::{ChargingError, ChargingResult, ValidationError};
use crate::records::ChargeTransaction;
use crate::rules_service::RulesService;
use crate::store::ChargingStore;
use crate::translator;
use crate::types::BillRunStatus;
use serde_json::Value;

pub struct TransactionService<'a> {
    store: &'a ChargingStore,
    rules: &'a dyn RulesService,
}

impl<'a> TransactionService<'a> {
    pub fn new(store: &'a ChargingStore, rules: &'a dyn RulesService) -> Self {
        Self { store, rules }
    }

    pub fn add_transaction(&self, bill_run_id: &str, payload: &Value) -> ChargingResult<ChargeTransaction> {
        let bill_run = self.store.get_bill_run(bill_run_id)?;
        if !bill_run.status.is_editable() {
            return Err(ChargingError::InvalidState(format!(
                "Bill run {} cannot be edited because its status is {}.",
                bill_run.bill_run_number, bill_run.status
            )));
        }

        let translated = translator::translate_transaction(payload)?;
        if translated.charge.ruleset != bill_run.ruleset {
            return Err(ValidationError::single(
                "ruleset",
                format!("must match the bill run ruleset {}", bill_run.ruleset),
            )
            .into());
        }
        if translated.region != bill_run.region {
            return Err(ValidationError::single(
                "region",
                format!("must match the bill run region {}", bill_run.region),
            )
            .into());
        }

        let charge = CalculateCharge::new(self.rules).calculate(translated.charge)?;

        let transaction = ChargeTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            regime_id: bill_run.regime_id.clone(),
            bill_run_id: bill_run.id.clone(),
            invoice_id: None,
            licence_id: None,
            ruleset: charge.ruleset,
            region: translated.region,
            customer_reference: translated.customer_reference,
            licence_number: translated.licence_number,
            line_description: translated.line_description,
            area_code: translated.area_code,
            client_id: translated.client_id,
            charge_period_start: charge.charge_period_start,
            charge_period_end: charge.charge_period_end,
            charge_financial_year: charge.charge_financial_year,
            charge_credit: charge.charge_credit,
            charge_value: charge.charge_value,
            subject_to_minimum_charge: translated.subject_to_minimum_charge,
            minimum_charge_adjustment: false,
            new_licence: translated.new_licence,
            compensation_charge: charge.compensation_charge,
            transaction_reference: None,
            charge_calculation: Some(charge.charge_calculation),
            attributes: charge.attributes,
        };

        let saved = self.store.in_transaction(|store| {
            // New lines invalidate a previous generate.
            if bill_run.status == BillRunStatus::Generated {
                store.set_bill_run_status(&bill_run.id, BillRunStatus::Initialised)?;
            }
            store.apply_transaction(&transaction)
        })?;

        log::info!(
            "transaction added: bill_run={} id={} customer={} licence={} value={}",
            bill_run.bill_run_number,
            saved.id,
            saved.customer_reference,
            saved.licence_number,
            saved.signed_value()
        );
        Ok(saved)
    }
}
