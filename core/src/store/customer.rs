use super::{new_id, now, ChargingStore};
use crate::error::{ChargingError, ChargingResult};
use crate::records::{Customer, CustomerFile, CustomerFileStatus};
use crate::translator::TranslatedCustomer;
use rusqlite::{params, OptionalExtension};

fn customer_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        regime_id: row.get(1)?,
        region: row.get(2)?,
        customer_reference: row.get(3)?,
        customer_name: row.get(4)?,
        address_lines: [
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
            row.get(10)?,
        ],
        postcode: row.get(11)?,
        customer_file_id: row.get(12)?,
    })
}

fn customer_file_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<CustomerFile> {
    let status: String = row.get(4)?;
    Ok(CustomerFile {
        id: row.get(0)?,
        regime_id: row.get(1)?,
        region: row.get(2)?,
        file_reference: row.get(3)?,
        status: CustomerFileStatus::parse(&status).unwrap_or(CustomerFileStatus::Initialised),
        exported_at: row.get(5)?,
    })
}

const CUSTOMER_COLUMNS: &str = "id, regime_id, region, customer_reference, customer_name,
     address_line_1, address_line_2, address_line_3, address_line_4, address_line_5,
     address_line_6, postcode, customer_file_id";

impl ChargingStore {
    // ── Customer changes ───────────────────────────────────────────

    /// Store a customer change, replacing any change for the same customer
    /// that has not been exported yet. Exported changes are never touched.
    pub fn replace_customer_change(&self, regime_id: &str, c: &TranslatedCustomer) -> ChargingResult<Customer> {
        self.in_transaction(|store| {
            store.conn.execute(
                "DELETE FROM customer
                 WHERE regime_id = ?1 AND region = ?2 AND customer_reference = ?3
                   AND customer_file_id IS NULL",
                params![regime_id, &c.region, &c.customer_reference],
            )?;
            let id = new_id();
            let [l1, l2, l3, l4, l5, l6] = &c.address_lines;
            store.conn.execute(
                "INSERT INTO customer (
                    id, regime_id, region, customer_reference, customer_name,
                    address_line_1, address_line_2, address_line_3, address_line_4,
                    address_line_5, address_line_6, postcode, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    &id,
                    regime_id,
                    &c.region,
                    &c.customer_reference,
                    &c.customer_name,
                    l1,
                    l2,
                    l3,
                    l4,
                    l5,
                    l6,
                    &c.postcode,
                    now(),
                ],
            )?;
            Ok(Customer {
                id,
                regime_id: regime_id.to_string(),
                region: c.region.clone(),
                customer_reference: c.customer_reference.clone(),
                customer_name: c.customer_name.clone(),
                address_lines: c.address_lines.clone(),
                postcode: c.postcode.clone(),
                customer_file_id: None,
            })
        })
    }

    pub fn unexported_customers(&self, regime_id: &str, region: &str) -> ChargingResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer
             WHERE regime_id = ?1 AND region = ?2 AND customer_file_id IS NULL
             ORDER BY customer_reference"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![regime_id, region], customer_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Regions of a regime with customer changes waiting for a file.
    pub fn regions_with_unexported_customers(&self, regime_id: &str) -> ChargingResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT region FROM customer
             WHERE regime_id = ?1 AND customer_file_id IS NULL
             ORDER BY region",
        )?;
        let rows = stmt.query_map(params![regime_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Customer file ──────────────────────────────────────────────

    pub fn insert_customer_file(
        &self,
        regime_id: &str,
        region: &str,
        file_reference: &str,
    ) -> ChargingResult<CustomerFile> {
        let id = new_id();
        self.conn.execute(
            "INSERT INTO customer_file (id, regime_id, region, file_reference, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &id,
                regime_id,
                region,
                file_reference,
                CustomerFileStatus::Initialised.as_str(),
                now(),
            ],
        )?;
        Ok(CustomerFile {
            id,
            regime_id: regime_id.to_string(),
            region: region.to_string(),
            file_reference: file_reference.to_string(),
            status: CustomerFileStatus::Initialised,
            exported_at: None,
        })
    }

    /// Attach every unexported change of a region to a file. Returns how
    /// many were linked.
    pub fn link_unexported_customers(&self, regime_id: &str, region: &str, customer_file_id: &str) -> ChargingResult<usize> {
        let linked = self.conn.execute(
            "UPDATE customer SET customer_file_id = ?3
             WHERE regime_id = ?1 AND region = ?2 AND customer_file_id IS NULL",
            params![regime_id, region, customer_file_id],
        )?;
        Ok(linked)
    }

    pub fn set_customer_file_status(&self, id: &str, status: CustomerFileStatus) -> ChargingResult<()> {
        let exported_at = (status == CustomerFileStatus::Exported).then(now);
        self.conn.execute(
            "UPDATE customer_file SET status = ?2, exported_at = COALESCE(?3, exported_at)
             WHERE id = ?1",
            params![id, status.as_str(), exported_at],
        )?;
        Ok(())
    }

    pub fn get_customer_file(&self, id: &str) -> ChargingResult<CustomerFile> {
        self.conn
            .query_row(
                "SELECT id, regime_id, region, file_reference, status, exported_at
                 FROM customer_file WHERE id = ?1",
                params![id],
                customer_file_row_mapper,
            )
            .optional()?
            .ok_or_else(|| ChargingError::not_found("Customer file", id))
    }

    pub fn customer_files(&self, regime_id: &str) -> ChargingResult<Vec<CustomerFile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, regime_id, region, file_reference, status, exported_at
             FROM customer_file WHERE regime_id = ?1
             ORDER BY file_reference",
        )?;
        let rows = stmt.query_map(params![regime_id], customer_file_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Stream the customers linked to a file, by customer reference.
    pub fn with_customer_file_rows<T>(
        &self,
        customer_file_id: &str,
        f: impl FnOnce(&mut dyn Iterator<Item = ChargingResult<Customer>>) -> ChargingResult<T>,
    ) -> ChargingResult<T> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer
             WHERE customer_file_id = ?1
             ORDER BY customer_reference"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![customer_file_id], customer_row_mapper)?;
        let mut rows = rows.map(|r| r.map_err(ChargingError::from));
        f(&mut rows)
    }
}
