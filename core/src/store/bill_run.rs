use super::{new_id, now, patch_clause, totals_from_row, ChargingStore, TALLY_SELECT};
use crate::error::{ChargingError, ChargingResult};
use crate::records::{BillRun, Totals};
use crate::types::{BillRunStatus, Ruleset};
use rusqlite::{params, OptionalExtension};

fn bill_run_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<BillRun> {
    let ruleset: String = row.get(3)?;
    let status: String = row.get(5)?;
    Ok(BillRun {
        id: row.get(0)?,
        regime_id: row.get(1)?,
        region: row.get(2)?,
        ruleset: Ruleset::parse(&ruleset).unwrap_or(Ruleset::Presroc),
        bill_run_number: row.get(4)?,
        status: BillRunStatus::parse(&status).unwrap_or(BillRunStatus::Initialised),
        file_reference: row.get(6)?,
        totals: totals_from_row(row, 7)?,
    })
}

impl ChargingStore {
    // ── Bill run ───────────────────────────────────────────────────

    pub fn insert_bill_run(
        &self,
        regime_id: &str,
        region: &str,
        ruleset: Ruleset,
        bill_run_number: i64,
    ) -> ChargingResult<BillRun> {
        let id = new_id();
        let ts = now();
        self.conn.execute(
            "INSERT INTO bill_run (
                id, regime_id, region, ruleset, bill_run_number, status, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                &id,
                regime_id,
                region,
                ruleset.as_str(),
                bill_run_number,
                BillRunStatus::Initialised.as_str(),
                ts,
            ],
        )?;
        Ok(BillRun {
            id,
            regime_id: regime_id.to_string(),
            region: region.to_string(),
            ruleset,
            bill_run_number,
            status: BillRunStatus::Initialised,
            file_reference: None,
            totals: Totals::default(),
        })
    }

    pub fn get_bill_run(&self, id: &str) -> ChargingResult<BillRun> {
        let sql = format!(
            "SELECT id, regime_id, region, ruleset, bill_run_number, status, file_reference,
                    {TALLY_SELECT}
             FROM bill_run WHERE id = ?1"
        );
        self.conn
            .query_row(&sql, params![id], bill_run_row_mapper)
            .optional()?
            .ok_or_else(|| ChargingError::not_found("Bill run", id))
    }

    pub fn set_bill_run_status(&self, id: &str, status: BillRunStatus) -> ChargingResult<()> {
        let changed = self.conn.execute(
            "UPDATE bill_run SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), now()],
        )?;
        if changed == 0 {
            return Err(ChargingError::not_found("Bill run", id));
        }
        Ok(())
    }

    pub fn set_bill_run_file_reference(&self, id: &str, file_reference: &str) -> ChargingResult<()> {
        self.conn.execute(
            "UPDATE bill_run SET file_reference = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, file_reference, now()],
        )?;
        Ok(())
    }

    /// Apply tally patch expressions (`col = col + n`) to a bill run.
    pub(crate) fn patch_bill_run(&self, id: &str, fields: &[(&'static str, String)]) -> ChargingResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "UPDATE bill_run SET {}, updated_at = ?2 WHERE id = ?1",
            patch_clause(fields)
        );
        self.conn.execute(&sql, params![id, now()])?;
        Ok(())
    }
}
