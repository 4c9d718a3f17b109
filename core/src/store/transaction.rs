use super::{new_id, now, patch_clause, ChargingStore};
use crate::attributes::{slot_names, AttrValue, Attributes};
use crate::error::{ChargingError, ChargingResult};
use crate::presenters::TransactionFileRow;
use crate::records::ChargeTransaction;
use crate::tally::{tally, Tally};
use crate::types::Ruleset;
use chrono::NaiveDate;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, ErrorCode, OptionalExtension};

const CORE_COLUMNS: [&str; 23] = [
    "id",
    "regime_id",
    "bill_run_id",
    "invoice_id",
    "licence_id",
    "ruleset",
    "region",
    "customer_reference",
    "licence_number",
    "line_description",
    "area_code",
    "client_id",
    "charge_period_start",
    "charge_period_end",
    "charge_financial_year",
    "charge_credit",
    "charge_value",
    "subject_to_minimum_charge",
    "minimum_charge_adjustment",
    "new_licence",
    "compensation_charge",
    "transaction_reference",
    "charge_calculation",
];

/// Every transaction column, each prefixed with `prefix`.
fn select_columns(prefix: &str) -> String {
    CORE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(slot_names())
        .map(|c| format!("{prefix}{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn stored_date(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn flag(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    Ok(row.get::<_, i32>(idx)? != 0)
}

fn transaction_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChargeTransaction> {
    let ruleset: String = row.get(5)?;
    let mut attributes = Attributes::new();
    for (offset, slot) in slot_names().iter().enumerate() {
        let value: Option<String> = row.get(CORE_COLUMNS.len() + offset)?;
        attributes.set_opt(slot, value.map(AttrValue::Text));
    }
    Ok(ChargeTransaction {
        id: row.get(0)?,
        regime_id: row.get(1)?,
        bill_run_id: row.get(2)?,
        invoice_id: row.get(3)?,
        licence_id: row.get(4)?,
        ruleset: Ruleset::parse(&ruleset).unwrap_or(Ruleset::Presroc),
        region: row.get(6)?,
        customer_reference: row.get(7)?,
        licence_number: row.get(8)?,
        line_description: row.get(9)?,
        area_code: row.get(10)?,
        client_id: row.get(11)?,
        charge_period_start: stored_date(row, 12)?,
        charge_period_end: stored_date(row, 13)?,
        charge_financial_year: row.get(14)?,
        charge_credit: flag(row, 15)?,
        charge_value: row.get(16)?,
        subject_to_minimum_charge: flag(row, 17)?,
        minimum_charge_adjustment: flag(row, 18)?,
        new_licence: flag(row, 19)?,
        compensation_charge: flag(row, 20)?,
        transaction_reference: row.get(21)?,
        charge_calculation: row.get(22)?,
        attributes,
    })
}

fn text(v: &str) -> Value {
    Value::Text(v.to_string())
}

fn opt_text(v: Option<&str>) -> Value {
    v.map(text).unwrap_or(Value::Null)
}

fn bit(b: bool) -> Value {
    Value::Integer(i64::from(b))
}

/// Bound values in `select_columns` order.
fn row_values(t: &ChargeTransaction, invoice_id: &str, licence_id: &str) -> Vec<Value> {
    let mut values = vec![
        text(&t.id),
        text(&t.regime_id),
        text(&t.bill_run_id),
        text(invoice_id),
        text(licence_id),
        text(t.ruleset.as_str()),
        text(&t.region),
        text(&t.customer_reference),
        text(&t.licence_number),
        text(&t.line_description),
        text(&t.area_code),
        opt_text(t.client_id.as_deref()),
        Value::Text(t.charge_period_start.format("%Y-%m-%d").to_string()),
        Value::Text(t.charge_period_end.format("%Y-%m-%d").to_string()),
        Value::Integer(i64::from(t.charge_financial_year)),
        bit(t.charge_credit),
        Value::Integer(t.charge_value),
        bit(t.subject_to_minimum_charge),
        bit(t.minimum_charge_adjustment),
        bit(t.new_licence),
        bit(t.compensation_charge),
        opt_text(t.transaction_reference.as_deref()),
        opt_text(t.charge_calculation.as_deref()),
    ];
    values.extend(
        slot_names()
            .iter()
            .map(|slot| opt_text(t.attributes.text(slot).as_deref())),
    );
    values
}

/// `(cols, values)` lists for a tally's first insert.
fn insert_lists(t: &Tally) -> (String, String) {
    let cols = t.insert_fields.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(", ");
    let vals = t
        .insert_fields
        .iter()
        .map(|(_, v)| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    (cols, vals)
}

fn client_id_conflict(e: rusqlite::Error, t: &ChargeTransaction) -> ChargingError {
    match &e {
        rusqlite::Error::SqliteFailure(err, Some(message))
            if err.code == ErrorCode::ConstraintViolation && message.contains("client_id") =>
        {
            ChargingError::Conflict(format!(
                "A transaction with Client ID '{}' for Regime '{}' already exists.",
                t.client_id.as_deref().unwrap_or_default(),
                t.regime_id
            ))
        }
        _ => e.into(),
    }
}

impl ChargingStore {
    // ── Charge transaction ─────────────────────────────────────────

    /// Persist a transaction and add its tally to its invoice, licence and
    /// bill run, all in one SQLite transaction.
    pub fn record_transaction(&self, transaction: &ChargeTransaction) -> ChargingResult<ChargeTransaction> {
        self.in_transaction(|store| store.apply_transaction(transaction))
    }

    /// `record_transaction` for callers already inside `in_transaction`.
    pub(crate) fn apply_transaction(&self, transaction: &ChargeTransaction) -> ChargingResult<ChargeTransaction> {
        let invoice_id = self.upsert_invoice_tally(transaction)?;
        let licence_id = self.upsert_licence_tally(transaction, &invoice_id)?;

        let values = row_values(transaction, &invoice_id, &licence_id);
        let placeholders = (1..=values.len())
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO charge_transaction ({}, created_at) VALUES ({placeholders}, '{}')",
            select_columns(""),
            now()
        );
        self.conn
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(|e| client_id_conflict(e, transaction))?;

        let bill_run_tally = tally(transaction, "bill_run");
        self.patch_bill_run(&transaction.bill_run_id, &bill_run_tally.patch_fields)?;

        log::debug!(
            "transaction recorded: id={} bill_run={} value={} credit={}",
            transaction.id,
            transaction.bill_run_id,
            transaction.charge_value,
            transaction.charge_credit
        );

        Ok(ChargeTransaction {
            invoice_id: Some(invoice_id),
            licence_id: Some(licence_id),
            ..transaction.clone()
        })
    }

    fn upsert_invoice_tally(&self, t: &ChargeTransaction) -> ChargingResult<String> {
        let invoice_tally = tally(t, "invoice");
        let (cols, vals) = insert_lists(&invoice_tally);
        let sql = format!(
            "INSERT INTO invoice (id, bill_run_id, customer_reference, financial_year, {cols})
             VALUES (?1, ?2, ?3, ?4, {vals})
             ON CONFLICT (bill_run_id, customer_reference, financial_year)
             DO UPDATE SET {}
             RETURNING id",
            invoice_tally.update_statements.join(", ")
        );
        let id = self.conn.query_row(
            &sql,
            params![new_id(), &t.bill_run_id, &t.customer_reference, t.charge_financial_year],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn upsert_licence_tally(&self, t: &ChargeTransaction, invoice_id: &str) -> ChargingResult<String> {
        let licence_tally = tally(t, "licence");
        let (cols, vals) = insert_lists(&licence_tally);
        let sql = format!(
            "INSERT INTO licence (id, invoice_id, bill_run_id, licence_number, {cols})
             VALUES (?1, ?2, ?3, ?4, {vals})
             ON CONFLICT (invoice_id, licence_number)
             DO UPDATE SET {}
             RETURNING id",
            licence_tally.update_statements.join(", ")
        );
        let id = self.conn.query_row(
            &sql,
            params![new_id(), invoice_id, &t.bill_run_id, &t.licence_number],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Delete a transaction and take its tally back out of every aggregate.
    pub(crate) fn remove_transaction(&self, t: &ChargeTransaction) -> ChargingResult<()> {
        let reversal = tally(t, "bill_run").reversal_fields();
        if let Some(invoice_id) = &t.invoice_id {
            self.conn.execute(
                &format!("UPDATE invoice SET {} WHERE id = ?1", patch_clause(&reversal)),
                params![invoice_id],
            )?;
        }
        if let Some(licence_id) = &t.licence_id {
            self.conn.execute(
                &format!("UPDATE licence SET {} WHERE id = ?1", patch_clause(&reversal)),
                params![licence_id],
            )?;
        }
        self.patch_bill_run(&t.bill_run_id, &reversal)?;
        self.conn
            .execute("DELETE FROM charge_transaction WHERE id = ?1", params![&t.id])?;
        Ok(())
    }

    pub fn get_transaction(&self, id: &str) -> ChargingResult<ChargeTransaction> {
        let sql = format!(
            "SELECT {} FROM charge_transaction WHERE id = ?1",
            select_columns("")
        );
        self.conn
            .query_row(&sql, params![id], transaction_row_mapper)
            .optional()?
            .ok_or_else(|| ChargingError::not_found("Transaction", id))
    }

    pub fn transactions_for_bill_run(&self, bill_run_id: &str) -> ChargingResult<Vec<ChargeTransaction>> {
        let sql = format!(
            "SELECT {} FROM charge_transaction WHERE bill_run_id = ?1
             ORDER BY customer_reference, licence_number, created_at",
            select_columns("")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![bill_run_id], transaction_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Generated minimum charge adjustments of a bill run.
    pub fn minimum_charge_adjustments(&self, bill_run_id: &str) -> ChargingResult<Vec<ChargeTransaction>> {
        let sql = format!(
            "SELECT {} FROM charge_transaction
             WHERE bill_run_id = ?1 AND minimum_charge_adjustment = 1",
            select_columns("")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![bill_run_id], transaction_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// A transaction of `licence_id` that is subject to minimum charge, used
    /// as the template for an adjustment line.
    pub fn minimum_charge_template(&self, licence_id: &str) -> ChargingResult<Option<ChargeTransaction>> {
        let sql = format!(
            "SELECT {} FROM charge_transaction
             WHERE licence_id = ?1 AND subject_to_minimum_charge = 1
               AND minimum_charge_adjustment = 0
             ORDER BY created_at LIMIT 1",
            select_columns("")
        );
        self.conn
            .query_row(&sql, params![licence_id], transaction_row_mapper)
            .optional()
            .map_err(Into::into)
    }

    /// Stream the body rows of a bill run's transaction file to `f`.
    ///
    /// Only billable invoices are included. Order is transaction
    /// reference, then licence number, then compensation charges last.
    pub fn with_transaction_file_rows<T>(
        &self,
        bill_run_id: &str,
        f: impl FnOnce(&mut dyn Iterator<Item = ChargingResult<TransactionFileRow>>) -> ChargingResult<T>,
    ) -> ChargingResult<T> {
        let sql = format!(
            "SELECT {}, (i.debit_line_value - i.credit_line_value) < 0
             FROM charge_transaction t
             JOIN invoice i ON i.id = t.invoice_id
             WHERE t.bill_run_id = ?1
               AND i.zero_value_invoice = 0
               AND i.deminimis_invoice = 0
             ORDER BY t.transaction_reference, t.line_attr_1, t.compensation_charge ASC",
            select_columns("t.")
        );
        let credit_note_idx = CORE_COLUMNS.len() + slot_names().len();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![bill_run_id], |row| {
            Ok(TransactionFileRow {
                transaction: transaction_row_mapper(row)?,
                credit_note: flag(row, credit_note_idx)?,
            })
        })?;
        let mut rows = rows.map(|r| r.map_err(ChargingError::from));
        f(&mut rows)
    }
}
