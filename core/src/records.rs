//! Persisted billing records.

use crate::attributes::Attributes;
use crate::types::{BillRunStatus, EntityId, Ruleset};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Running totals kept on bill runs, invoices and licences. Values are
/// unsigned pence; the bucket says which way they point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub credit_line_count: i64,
    pub credit_line_value: i64,
    pub debit_line_count: i64,
    pub debit_line_value: i64,
    pub zero_line_count: i64,
    pub subject_to_minimum_charge_count: i64,
    pub subject_to_minimum_charge_credit_value: i64,
    pub subject_to_minimum_charge_debit_value: i64,
}

impl Totals {
    /// Debits less credits.
    pub fn net_total(&self) -> i64 {
        self.debit_line_value - self.credit_line_value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regime {
    pub id: EntityId,
    pub slug: String,
    pub name: String,
    pub file_prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BillRun {
    pub id: EntityId,
    pub regime_id: EntityId,
    pub region: String,
    pub ruleset: Ruleset,
    pub bill_run_number: i64,
    pub status: BillRunStatus,
    pub file_reference: Option<String>,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: EntityId,
    pub bill_run_id: EntityId,
    pub customer_reference: String,
    pub financial_year: i32,
    pub totals: Totals,
    pub zero_value_invoice: bool,
    pub deminimis_invoice: bool,
    pub minimum_charge_invoice: bool,
    pub transaction_reference: Option<String>,
}

impl Invoice {
    /// Invoices whose net value is negative are sent as credit notes.
    pub fn is_credit_note(&self) -> bool {
        self.totals.net_total() < 0
    }

    pub fn is_billable(&self) -> bool {
        !self.zero_value_invoice && !self.deminimis_invoice
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Licence {
    pub id: EntityId,
    pub invoice_id: EntityId,
    pub bill_run_id: EntityId,
    pub licence_number: String,
    pub totals: Totals,
}

/// A charge line. `charge_value` is the unsigned magnitude in pence;
/// `charge_credit` gives its direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeTransaction {
    pub id: EntityId,
    pub regime_id: EntityId,
    pub bill_run_id: EntityId,
    pub invoice_id: Option<EntityId>,
    pub licence_id: Option<EntityId>,
    pub ruleset: Ruleset,
    pub region: String,
    pub customer_reference: String,
    pub licence_number: String,
    pub line_description: String,
    pub area_code: String,
    pub client_id: Option<String>,
    pub charge_period_start: NaiveDate,
    pub charge_period_end: NaiveDate,
    pub charge_financial_year: i32,
    pub charge_credit: bool,
    pub charge_value: i64,
    pub subject_to_minimum_charge: bool,
    pub minimum_charge_adjustment: bool,
    pub new_licence: bool,
    pub compensation_charge: bool,
    pub transaction_reference: Option<String>,
    /// Raw rules service response, absent for generated adjustments.
    pub charge_calculation: Option<String>,
    pub attributes: Attributes,
}

impl ChargeTransaction {
    /// Value as it appears to the customer: credits are negative.
    pub fn signed_value(&self) -> i64 {
        if self.charge_credit {
            -self.charge_value
        } else {
            self.charge_value
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: EntityId,
    pub regime_id: EntityId,
    pub region: String,
    pub customer_reference: String,
    pub customer_name: String,
    pub address_lines: [Option<String>; 6],
    pub postcode: Option<String>,
    /// Set once the change has been written to a customer file.
    pub customer_file_id: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerFileStatus {
    Initialised,
    Exported,
    Failed,
}

impl CustomerFileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerFileStatus::Initialised => "initialised",
            CustomerFileStatus::Exported => "exported",
            CustomerFileStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "initialised" => Some(CustomerFileStatus::Initialised),
            "exported" => Some(CustomerFileStatus::Exported),
            "failed" => Some(CustomerFileStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerFile {
    pub id: EntityId,
    pub regime_id: EntityId,
    pub region: String,
    pub file_reference: String,
    pub status: CustomerFileStatus,
    pub exported_at: Option<String>,
}
