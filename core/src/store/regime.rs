use super::{new_id, now, ChargingStore};
use crate::config::RegimeConfig;
use crate::error::{ChargingError, ChargingResult};
use crate::records::Regime;
use rusqlite::{params, OptionalExtension};

/// Counter columns of `sequence_counter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    BillRun,
    TransactionFile,
    CustomerFile,
    TransactionReference,
}

impl Counter {
    fn column(&self) -> &'static str {
        match self {
            Counter::BillRun => "bill_run_number",
            Counter::TransactionFile => "file_number",
            Counter::CustomerFile => "customer_file_number",
            Counter::TransactionReference => "transaction_number",
        }
    }
}

fn regime_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Regime> {
    Ok(Regime {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        file_prefix: row.get(3)?,
    })
}

impl ChargingStore {
    // ── Regime ─────────────────────────────────────────────────────

    /// Insert the regime and one sequence counter per region if missing.
    /// Existing counters are left alone.
    pub fn ensure_regime(&self, config: &RegimeConfig) -> ChargingResult<Regime> {
        self.in_transaction(|store| {
            store.conn.execute(
                "INSERT INTO regime (id, slug, name, file_prefix, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (slug) DO NOTHING",
                params![new_id(), &config.slug, &config.name, &config.file_prefix, now()],
            )?;
            let regime = store.regime_by_slug(&config.slug)?;

            for region in &config.regions {
                store.conn.execute(
                    "INSERT INTO sequence_counter (
                        regime_id, region, bill_run_number, file_number,
                        customer_file_number, transaction_number
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT (regime_id, region) DO NOTHING",
                    params![
                        &regime.id,
                        region.to_uppercase(),
                        config.initial_bill_run_number,
                        config.initial_file_number,
                        config.initial_file_number,
                        config.initial_transaction_number,
                    ],
                )?;
            }
            log::info!(
                "regime ready: slug={} regions={}",
                regime.slug,
                config.regions.join(",")
            );
            Ok(regime)
        })
    }

    pub fn regime_by_slug(&self, slug: &str) -> ChargingResult<Regime> {
        self.conn
            .query_row(
                "SELECT id, slug, name, file_prefix FROM regime WHERE slug = ?1",
                params![slug],
                regime_row_mapper,
            )
            .optional()?
            .ok_or_else(|| ChargingError::not_found("Regime", slug))
    }

    pub fn regime_by_id(&self, id: &str) -> ChargingResult<Regime> {
        self.conn
            .query_row(
                "SELECT id, slug, name, file_prefix FROM regime WHERE id = ?1",
                params![id],
                regime_row_mapper,
            )
            .optional()?
            .ok_or_else(|| ChargingError::not_found("Regime", id))
    }

    // ── Sequence counters ──────────────────────────────────────────

    /// Increment a counter and return the new value in one statement. A
    /// missing (regime, region) row is an error, never a fresh count.
    pub fn next_number(&self, regime_id: &str, region: &str, counter: Counter) -> ChargingResult<i64> {
        let column = counter.column();
        let sql = format!(
            "UPDATE sequence_counter SET {column} = {column} + 1
             WHERE regime_id = ?1 AND region = ?2
             RETURNING {column}"
        );
        self.conn
            .query_row(&sql, params![regime_id, region], |row| row.get(0))
            .optional()?
            .ok_or_else(|| ChargingError::not_found("Sequence counter", format!("{regime_id}/{region}")))
    }
}
