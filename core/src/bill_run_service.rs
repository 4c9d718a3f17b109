//! Bill run lifecycle: create, generate, approve, send.
//!
//! initialised → generated → approved → pending → billed, or
//! approved → billing_not_required when no invoice needs sending.

use crate::config::ExportConfig;
use crate::error::{ChargingError, ChargingResult, ValidationError};
use crate::file::{self, GeneratedFile};
use crate::presenters::{TransactionFileContext, TransactionFilePresenter};
use crate::records::{BillRun, ChargeTransaction};
use crate::sequencer;
use crate::store::{ChargingStore, Counter};
use crate::translator::schema::match_choice;
use crate::translator::transaction::REGIONS;
use crate::types::{BillRunStatus, FileKind, Ruleset};
use crate::upload::{self, ObjectStore};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs;

/// Lines subject to minimum charge are topped up to this, in pence.
pub const MINIMUM_CHARGE: i64 = 2500;
/// Presroc invoices netting below this, in pence, are not sent.
pub const DEMINIMIS_LIMIT: i64 = 500;
pub const MINIMUM_CHARGE_DESCRIPTION: &str =
    "Minimum Charge Calculation - raised under Schedule 23 of the Environment Act 1995";

pub struct BillRunService<'a> {
    store: &'a ChargingStore,
    objects: &'a dyn ObjectStore,
    export: &'a ExportConfig,
}

fn require_status(bill_run: &BillRun, expected: BillRunStatus, action: &str) -> ChargingResult<()> {
    if bill_run.status != expected {
        return Err(ChargingError::InvalidState(format!(
            "Bill run {} cannot be {action} because its status is {}.",
            bill_run.bill_run_number, bill_run.status
        )));
    }
    Ok(())
}

/// Adjustment line topping `template`'s licence up to the minimum charge.
fn minimum_charge_adjustment(template: &ChargeTransaction, credit: bool, shortfall: i64) -> ChargeTransaction {
    ChargeTransaction {
        id: uuid::Uuid::new_v4().to_string(),
        invoice_id: None,
        licence_id: None,
        line_description: MINIMUM_CHARGE_DESCRIPTION.to_string(),
        client_id: None,
        charge_credit: credit,
        charge_value: shortfall,
        subject_to_minimum_charge: true,
        minimum_charge_adjustment: true,
        new_licence: false,
        compensation_charge: false,
        transaction_reference: None,
        charge_calculation: None,
        ..template.clone()
    }
}

impl<'a> BillRunService<'a> {
    pub fn new(store: &'a ChargingStore, objects: &'a dyn ObjectStore, export: &'a ExportConfig) -> Self {
        Self {
            store,
            objects,
            export,
        }
    }

    pub fn create_bill_run(&self, regime_slug: &str, region: &str, ruleset: Ruleset) -> ChargingResult<BillRun> {
        let region = match_choice(region, REGIONS).ok_or_else(|| {
            ValidationError::single("region", format!("must be one of [{}]", REGIONS.join(", ")))
        })?;
        let regime = self.store.regime_by_slug(regime_slug)?;

        let bill_run = self.store.in_transaction(|store| {
            let number = store.next_number(&regime.id, region, Counter::BillRun)?;
            store.insert_bill_run(&regime.id, region, ruleset, number)
        })?;

        log::info!(
            "bill run created: regime={} region={region} ruleset={ruleset} number={}",
            regime.slug,
            bill_run.bill_run_number
        );
        Ok(bill_run)
    }

    /// Add minimum charge adjustments and flag zero-value and deminimis
    /// invoices. Adjustments from an earlier generate are replaced.
    pub fn generate(&self, bill_run_id: &str) -> ChargingResult<BillRun> {
        let bill_run = self.store.get_bill_run(bill_run_id)?;
        require_status(&bill_run, BillRunStatus::Initialised, "generated")?;

        self.store.in_transaction(|store| {
            for old in store.minimum_charge_adjustments(&bill_run.id)? {
                store.remove_transaction(&old)?;
            }

            let mut adjusted_invoices = HashSet::new();
            for licence in store.minimum_charge_licences(&bill_run.id)? {
                let sides = [
                    (false, licence.totals.subject_to_minimum_charge_debit_value),
                    (true, licence.totals.subject_to_minimum_charge_credit_value),
                ];
                for (credit, value) in sides {
                    if value <= 0 || value >= MINIMUM_CHARGE {
                        continue;
                    }
                    let Some(template) = store.minimum_charge_template(&licence.id)? else {
                        continue;
                    };
                    let adjustment = minimum_charge_adjustment(&template, credit, MINIMUM_CHARGE - value);
                    let saved = store.apply_transaction(&adjustment)?;
                    log::debug!(
                        "minimum charge adjustment: licence={} credit={credit} value={}",
                        licence.licence_number,
                        saved.charge_value
                    );
                    adjusted_invoices.extend(saved.invoice_id);
                }
            }

            for invoice in store.invoices_for_bill_run(&bill_run.id)? {
                let net = invoice.totals.net_total();
                let zero_value = net == 0;
                let deminimis =
                    bill_run.ruleset == Ruleset::Presroc && net > 0 && net < DEMINIMIS_LIMIT;
                store.set_invoice_flags(
                    &invoice.id,
                    zero_value,
                    deminimis,
                    adjusted_invoices.contains(&invoice.id),
                )?;
            }

            store.set_bill_run_status(&bill_run.id, BillRunStatus::Generated)
        })?;

        let generated = self.store.get_bill_run(bill_run_id)?;
        log::info!(
            "bill run generated: number={} net={}",
            generated.bill_run_number,
            generated.totals.net_total()
        );
        Ok(generated)
    }

    pub fn approve(&self, bill_run_id: &str) -> ChargingResult<BillRun> {
        let bill_run = self.store.get_bill_run(bill_run_id)?;
        require_status(&bill_run, BillRunStatus::Generated, "approved")?;
        self.store
            .set_bill_run_status(&bill_run.id, BillRunStatus::Approved)?;
        log::info!("bill run approved: number={}", bill_run.bill_run_number);
        self.store.get_bill_run(bill_run_id)
    }

    /// Reference every billable invoice, write the transaction file and
    /// upload it. References and the file reference are taken in one
    /// SQLite transaction together with the move to `pending`.
    pub fn send(&self, bill_run_id: &str, file_date: NaiveDate) -> ChargingResult<BillRun> {
        let bill_run = self.store.get_bill_run(bill_run_id)?;
        require_status(&bill_run, BillRunStatus::Approved, "sent")?;
        let regime = self.store.regime_by_id(&bill_run.regime_id)?;

        let billable: Vec<_> = self
            .store
            .invoices_for_bill_run(&bill_run.id)?
            .into_iter()
            .filter(|i| i.is_billable())
            .collect();

        if billable.is_empty() {
            self.store
                .set_bill_run_status(&bill_run.id, BillRunStatus::BillingNotRequired)?;
            log::info!(
                "bill run needs no billing: number={}",
                bill_run.bill_run_number
            );
            return self.store.get_bill_run(bill_run_id);
        }

        let file_reference = self.store.in_transaction(|store| {
            for invoice in &billable {
                let reference = sequencer::next_transaction_reference(
                    store,
                    &regime,
                    &bill_run.region,
                    invoice.is_credit_note(),
                    bill_run.ruleset,
                )?;
                store.set_invoice_transaction_reference(&invoice.id, &reference)?;
            }
            let file_reference = sequencer::next_file_reference(
                store,
                &regime,
                &bill_run.region,
                FileKind::Transaction,
                Some(bill_run.ruleset),
            )?;
            store.set_bill_run_file_reference(&bill_run.id, &file_reference)?;
            store.set_bill_run_status(&bill_run.id, BillRunStatus::Pending)?;
            Ok(file_reference)
        })?;

        let (credit_notes, invoices): (Vec<_>, Vec<_>) =
            billable.iter().partition(|i| i.is_credit_note());
        let ctx = TransactionFileContext {
            file_prefix: regime.file_prefix.clone(),
            region: bill_run.region.clone(),
            file_reference: file_reference.clone(),
            bill_run_number: bill_run.bill_run_number,
            file_date,
            invoice_total: invoices.iter().map(|i| i.totals.net_total()).sum(),
            credit_total: credit_notes.iter().map(|i| i.totals.net_total()).sum(),
        };

        let generated = match self.write_and_upload(&bill_run, &regime.slug, &ctx) {
            Ok(generated) => generated,
            Err(e) => {
                log::error!(
                    "bill run file failed, left pending: bill_run={} file={file_reference} error={e}",
                    bill_run.bill_run_number
                );
                return Err(e);
            }
        };

        self.store
            .set_bill_run_status(&bill_run.id, BillRunStatus::Billed)?;
        log::info!(
            "bill run sent: number={} file={file_reference} lines={}",
            bill_run.bill_run_number,
            generated.body_lines
        );
        self.store.get_bill_run(bill_run_id)
    }

    fn write_and_upload(
        &self,
        bill_run: &BillRun,
        regime_slug: &str,
        ctx: &TransactionFileContext,
    ) -> ChargingResult<GeneratedFile> {
        fs::create_dir_all(&self.export.temp_dir)?;
        let path = self.export.temp_dir.join(file::file_name(&ctx.file_reference));
        let presenter = TransactionFilePresenter::new(bill_run.ruleset);
        let generated = self.store.with_transaction_file_rows(&bill_run.id, |rows| {
            file::generate(&presenter, ctx, rows, &path)
        })?;
        upload::send_file(self.objects, self.export, regime_slug, FileKind::Transaction, &generated.path)?;
        Ok(generated)
    }
}
