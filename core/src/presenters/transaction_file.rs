//! Transaction file lines.
//!
//! Head and tail are shared; the body layout is per ruleset. The
//! blanking rules below are part of the file contract with the
//! settlement system and differ between the two layouts:
//!
//! - presroc: col28..col35 are empty for compensation charges and for
//!   minimum charge adjustments; col37..col38 are empty unless the line
//!   is a compensation charge.
//! - sroc: col28..col37 are empty for compensation charges only;
//!   col38..col39 are empty unless the line is a compensation charge;
//!   col40 flags minimum charge adjustments.

use super::format::{blank, blank_if, file_date, pad_index, signed_value};
use crate::file::{Columns, FilePresenter};
use crate::records::ChargeTransaction;
use crate::types::Ruleset;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct TransactionFileContext {
    pub file_prefix: String,
    pub region: String,
    pub file_reference: String,
    pub bill_run_number: i64,
    pub file_date: NaiveDate,
    /// Sum of invoice nets, pence.
    pub invoice_total: i64,
    /// Sum of credit note nets, pence (negative).
    pub credit_total: i64,
}

#[derive(Debug, Clone)]
pub struct TransactionFileRow {
    pub transaction: ChargeTransaction,
    /// The transaction's invoice nets below zero.
    pub credit_note: bool,
}

pub struct TransactionFilePresenter {
    ruleset: Ruleset,
}

impl TransactionFilePresenter {
    pub fn new(ruleset: Ruleset) -> Self {
        Self { ruleset }
    }
}

fn attr(t: &ChargeTransaction, slot: &str) -> String {
    blank(t.attributes.text(slot).as_deref())
}

/// Columns every body layout starts with.
fn common_body(ctx: &TransactionFileContext, row: &TransactionFileRow, index: usize) -> Columns {
    let t = &row.transaction;
    Columns::from([
        ("col01", "D".to_string()),
        ("col02", pad_index(index)),
        ("col03", t.customer_reference.clone()),
        ("col04", file_date(ctx.file_date)),
        ("col05", if row.credit_note { "C" } else { "I" }.to_string()),
        ("col06", blank(t.transaction_reference.as_deref())),
        ("col07", String::new()),
        ("col08", "GBP".to_string()),
        ("col09", String::new()),
        ("col10", file_date(ctx.file_date)),
        ("col11", String::new()),
        ("col12", String::new()),
        ("col13", String::new()),
        ("col14", String::new()),
        ("col15", signed_value(t.charge_credit, t.charge_value)),
        ("col16", String::new()),
        ("col17", t.area_code.clone()),
        ("col18", t.line_description.clone()),
        ("col19", "A".to_string()),
        ("col20", String::new()),
        ("col21", attr(t, "line_attr_1")),
        ("col22", attr(t, "line_attr_2")),
        ("col23", attr(t, "line_attr_3")),
    ])
}

fn presroc_body(ctx: &TransactionFileContext, row: &TransactionFileRow, index: usize) -> Columns {
    let t = &row.transaction;
    let factors_hidden = t.compensation_charge || t.minimum_charge_adjustment;
    let eiuc_hidden = !t.compensation_charge;

    let mut columns = common_body(ctx, row, index);
    columns.extend([
        ("col24", attr(t, "line_attr_4")),
        ("col25", attr(t, "line_attr_5")),
        ("col26", attr(t, "line_attr_6")),
        ("col27", attr(t, "line_attr_7")),
        ("col28", blank_if(factors_hidden, attr(t, "line_attr_8"))),
        ("col29", blank_if(factors_hidden, attr(t, "line_attr_9"))),
        ("col30", blank_if(factors_hidden, attr(t, "line_attr_10"))),
        ("col31", blank_if(factors_hidden, attr(t, "regime_value_4"))),
        ("col32", blank_if(factors_hidden, attr(t, "regime_value_5"))),
        ("col33", blank_if(factors_hidden, attr(t, "regime_value_7"))),
        ("col34", blank_if(factors_hidden, attr(t, "regime_value_8"))),
        ("col35", blank_if(factors_hidden, attr(t, "regime_value_9"))),
        ("col36", "1".to_string()),
        ("col37", blank_if(eiuc_hidden, attr(t, "line_attr_13"))),
        ("col38", blank_if(eiuc_hidden, attr(t, "line_attr_14"))),
        ("col39", "Each".to_string()),
        ("col40", attr(t, "regime_value_15")),
        ("col41", t.charge_financial_year.to_string()),
    ]);
    columns
}

fn sroc_body(ctx: &TransactionFileContext, row: &TransactionFileRow, index: usize) -> Columns {
    let t = &row.transaction;
    let compensation = t.compensation_charge;

    let mut columns = common_body(ctx, row, index);
    columns.extend([
        ("col24", attr(t, "regime_value_3")),
        ("col25", attr(t, "header_attr_1")),
        ("col26", attr(t, "line_attr_4")),
        ("col27", attr(t, "regime_value_6")),
        ("col28", blank_if(compensation, attr(t, "line_attr_5"))),
        ("col29", blank_if(compensation, attr(t, "line_attr_6"))),
        ("col30", blank_if(compensation, attr(t, "regime_value_14"))),
        ("col31", blank_if(compensation, attr(t, "line_attr_7"))),
        ("col32", blank_if(compensation, attr(t, "line_attr_8"))),
        ("col33", blank_if(compensation, attr(t, "line_attr_9"))),
        ("col34", blank_if(compensation, attr(t, "header_attr_2"))),
        ("col35", blank_if(compensation, attr(t, "header_attr_3"))),
        ("col36", blank_if(compensation, attr(t, "regime_value_20"))),
        ("col37", blank_if(compensation, attr(t, "regime_value_9"))),
        ("col38", blank_if(!compensation, attr(t, "line_attr_10"))),
        ("col39", blank_if(!compensation, attr(t, "regime_value_15"))),
        ("col40", if t.minimum_charge_adjustment { "Y" } else { "" }.to_string()),
        ("col41", "1".to_string()),
        ("col42", "Each".to_string()),
    ]);
    columns
}

impl FilePresenter for TransactionFilePresenter {
    type Context = TransactionFileContext;
    type Record = TransactionFileRow;

    fn head(&self, ctx: &TransactionFileContext, index: usize) -> Columns {
        Columns::from([
            ("col01", "H".to_string()),
            ("col02", pad_index(index)),
            ("col03", ctx.file_prefix.to_uppercase()),
            ("col04", ctx.region.clone()),
            ("col05", "I".to_string()),
            ("col06", ctx.file_reference.clone()),
            ("col07", ctx.bill_run_number.to_string()),
            ("col08", file_date(ctx.file_date)),
        ])
    }

    fn body(&self, ctx: &TransactionFileContext, row: &TransactionFileRow, index: usize) -> Columns {
        match self.ruleset {
            Ruleset::Presroc => presroc_body(ctx, row, index),
            Ruleset::Sroc => sroc_body(ctx, row, index),
        }
    }

    fn tail(&self, ctx: &TransactionFileContext, index: usize) -> Columns {
        Columns::from([
            ("col01", "T".to_string()),
            ("col02", pad_index(index)),
            ("col03", (index + 1).to_string()),
            ("col04", ctx.invoice_total.to_string()),
            ("col05", ctx.credit_total.to_string()),
        ])
    }
}
