//! Transaction tally engine.
//!
//! A transaction contributes counts and values to its bill run, invoice
//! and licence. The contribution is expressed three ways so the store can
//! apply it atomically whatever the target:
//!
//! - `insert_fields`: column values for the first insert of an aggregate.
//! - `update_statements`: `ON CONFLICT DO UPDATE` assignments adding the
//!   excluded row's values to the stored ones.
//! - `patch_fields`: `col = <expr>` increments for a plain `UPDATE`
//!   (bill runs, which always exist before their transactions).
//!
//! RULE: aggregates are only ever changed by adding a tally. Never read a
//! total, change it in Rust and write it back.

use crate::records::ChargeTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Credit,
    Debit,
    Zero,
}

impl Bucket {
    /// Exactly one bucket per transaction. A credit stays a credit even
    /// at zero value.
    pub fn classify(charge_credit: bool, charge_value: i64) -> Self {
        if charge_credit {
            Bucket::Credit
        } else if charge_value == 0 {
            Bucket::Zero
        } else {
            Bucket::Debit
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub insert_fields: Vec<(&'static str, i64)>,
    pub update_statements: Vec<String>,
    pub patch_fields: Vec<(&'static str, String)>,
}

fn increments(charge_credit: bool, charge_value: i64, subject_to_minimum_charge: bool) -> Vec<(&'static str, i64)> {
    let mut out = Vec::with_capacity(4);
    let bucket = Bucket::classify(charge_credit, charge_value);

    match bucket {
        Bucket::Credit => {
            out.push(("credit_line_count", 1));
            if charge_value != 0 {
                out.push(("credit_line_value", charge_value));
            }
        }
        Bucket::Debit => {
            out.push(("debit_line_count", 1));
            out.push(("debit_line_value", charge_value));
        }
        Bucket::Zero => out.push(("zero_line_count", 1)),
    }

    if subject_to_minimum_charge {
        out.push(("subject_to_minimum_charge_count", 1));
        match bucket {
            Bucket::Credit if charge_value != 0 => {
                out.push(("subject_to_minimum_charge_credit_value", charge_value));
            }
            Bucket::Debit => out.push(("subject_to_minimum_charge_debit_value", charge_value)),
            _ => {}
        }
    }
    out
}

/// Tally of `transaction` against aggregate table `table_name`.
pub fn tally(transaction: &ChargeTransaction, table_name: &str) -> Tally {
    let fields = increments(
        transaction.charge_credit,
        transaction.charge_value,
        transaction.subject_to_minimum_charge,
    );

    Tally {
        update_statements: fields
            .iter()
            .map(|(col, _)| format!("{col} = {table_name}.{col} + excluded.{col}"))
            .collect(),
        patch_fields: fields
            .iter()
            .map(|(col, value)| (*col, format!("{col} + {value}")))
            .collect(),
        insert_fields: fields,
    }
}

impl Tally {
    /// Patch that takes this contribution back out again.
    pub fn reversal_fields(&self) -> Vec<(&'static str, String)> {
        self.insert_fields
            .iter()
            .map(|(col, value)| (*col, format!("{col} - {value}")))
            .collect()
    }

}
