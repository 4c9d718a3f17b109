use super::{totals_from_row, ChargingStore, TALLY_SELECT};
use crate::error::ChargingResult;
use crate::records::{Invoice, Licence};
use rusqlite::params;

fn invoice_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invoice> {
    Ok(Invoice {
        id: row.get(0)?,
        bill_run_id: row.get(1)?,
        customer_reference: row.get(2)?,
        financial_year: row.get(3)?,
        zero_value_invoice: row.get::<_, i32>(4)? != 0,
        deminimis_invoice: row.get::<_, i32>(5)? != 0,
        minimum_charge_invoice: row.get::<_, i32>(6)? != 0,
        transaction_reference: row.get(7)?,
        totals: totals_from_row(row, 8)?,
    })
}

fn licence_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Licence> {
    Ok(Licence {
        id: row.get(0)?,
        invoice_id: row.get(1)?,
        bill_run_id: row.get(2)?,
        licence_number: row.get(3)?,
        totals: totals_from_row(row, 4)?,
    })
}

impl ChargingStore {
    // ── Invoice ────────────────────────────────────────────────────

    pub fn invoices_for_bill_run(&self, bill_run_id: &str) -> ChargingResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT id, bill_run_id, customer_reference, financial_year,
                    zero_value_invoice, deminimis_invoice, minimum_charge_invoice,
                    transaction_reference, {TALLY_SELECT}
             FROM invoice WHERE bill_run_id = ?1
             ORDER BY customer_reference, financial_year"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![bill_run_id], invoice_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn set_invoice_flags(
        &self,
        invoice_id: &str,
        zero_value: bool,
        deminimis: bool,
        minimum_charge: bool,
    ) -> ChargingResult<()> {
        self.conn.execute(
            "UPDATE invoice
             SET zero_value_invoice = ?2, deminimis_invoice = ?3, minimum_charge_invoice = ?4
             WHERE id = ?1",
            params![invoice_id, zero_value as i32, deminimis as i32, minimum_charge as i32],
        )?;
        Ok(())
    }

    /// Give an invoice its reference and stamp it on every line.
    pub fn set_invoice_transaction_reference(&self, invoice_id: &str, reference: &str) -> ChargingResult<()> {
        self.conn.execute(
            "UPDATE invoice SET transaction_reference = ?2 WHERE id = ?1",
            params![invoice_id, reference],
        )?;
        self.conn.execute(
            "UPDATE charge_transaction SET transaction_reference = ?2 WHERE invoice_id = ?1",
            params![invoice_id, reference],
        )?;
        Ok(())
    }

    // ── Licence ────────────────────────────────────────────────────

    /// Licences with at least one line subject to minimum charge.
    pub fn minimum_charge_licences(&self, bill_run_id: &str) -> ChargingResult<Vec<Licence>> {
        let sql = format!(
            "SELECT id, invoice_id, bill_run_id, licence_number, {TALLY_SELECT}
             FROM licence
             WHERE bill_run_id = ?1 AND subject_to_minimum_charge_count > 0
             ORDER BY licence_number"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![bill_run_id], licence_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn licences_for_invoice(&self, invoice_id: &str) -> ChargingResult<Vec<Licence>> {
        let sql = format!(
            "SELECT id, invoice_id, bill_run_id, licence_number, {TALLY_SELECT}
             FROM licence WHERE invoice_id = ?1
             ORDER BY licence_number"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![invoice_id], licence_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
