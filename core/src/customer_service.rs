//! Customer changes and the customer files that carry them.
//!
//! Files are sent per region. A region that fails is logged and skipped;
//! the others still go.

use crate::config::ExportConfig;
use crate::error::ChargingResult;
use crate::file;
use crate::presenters::{CustomerFileContext, CustomerFilePresenter};
use crate::records::{Customer, CustomerFile, CustomerFileStatus, Regime};
use crate::sequencer;
use crate::store::ChargingStore;
use crate::translator;
use crate::types::FileKind;
use crate::upload::{self, ObjectStore};
use chrono::NaiveDate;
use serde_json::Value;
use std::fs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFailure {
    pub region: String,
    pub error: String,
}

/// What a customer file run did, per region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFileReport {
    pub exported: Vec<CustomerFile>,
    pub failed: Vec<RegionFailure>,
}

impl CustomerFileReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct CustomerService<'a> {
    store: &'a ChargingStore,
    objects: &'a dyn ObjectStore,
    export: &'a ExportConfig,
}

impl<'a> CustomerService<'a> {
    pub fn new(store: &'a ChargingStore, objects: &'a dyn ObjectStore, export: &'a ExportConfig) -> Self {
        Self {
            store,
            objects,
            export,
        }
    }

    pub fn create_customer_change(&self, regime_slug: &str, payload: &Value) -> ChargingResult<Customer> {
        let regime = self.store.regime_by_slug(regime_slug)?;
        let change = translator::translate_customer(payload)?;
        let customer = self.store.replace_customer_change(&regime.id, &change)?;
        log::info!(
            "customer change stored: regime={} region={} customer={}",
            regime.slug,
            customer.region,
            customer.customer_reference
        );
        Ok(customer)
    }

    /// Send one file per region with waiting changes.
    pub fn send_customer_files(&self, regime_slug: &str, file_date: NaiveDate) -> ChargingResult<CustomerFileReport> {
        let regime = self.store.regime_by_slug(regime_slug)?;
        let mut report = CustomerFileReport::default();

        for region in self.store.regions_with_unexported_customers(&regime.id)? {
            match self.send_region(&regime, &region, file_date) {
                Ok(customer_file) => report.exported.push(customer_file),
                Err(e) => {
                    log::error!(
                        "customer file failed: regime={} region={region} error={e}",
                        regime.slug
                    );
                    report.failed.push(RegionFailure {
                        region,
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "customer files done: regime={} exported={} failed={}",
            regime.slug,
            report.exported.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn send_region(&self, regime: &Regime, region: &str, file_date: NaiveDate) -> ChargingResult<CustomerFile> {
        // Reference, file row and customer links commit together.
        let customer_file = self.store.in_transaction(|store| {
            let reference =
                sequencer::next_file_reference(store, regime, region, FileKind::Customer, None)?;
            let customer_file = store.insert_customer_file(&regime.id, region, &reference)?;
            store.link_unexported_customers(&regime.id, region, &customer_file.id)?;
            Ok(customer_file)
        })?;

        match self.write_and_upload(regime, &customer_file, file_date) {
            Ok(()) => {
                self.store
                    .set_customer_file_status(&customer_file.id, CustomerFileStatus::Exported)?;
                self.store.get_customer_file(&customer_file.id)
            }
            Err(e) => {
                self.store
                    .set_customer_file_status(&customer_file.id, CustomerFileStatus::Failed)?;
                Err(e)
            }
        }
    }

    fn write_and_upload(&self, regime: &Regime, customer_file: &CustomerFile, file_date: NaiveDate) -> ChargingResult<()> {
        let ctx = CustomerFileContext {
            file_prefix: regime.file_prefix.clone(),
            region: customer_file.region.clone(),
            file_reference: customer_file.file_reference.clone(),
            file_date,
        };

        fs::create_dir_all(&self.export.temp_dir)?;
        let path = self
            .export
            .temp_dir
            .join(file::file_name(&customer_file.file_reference));
        let generated = self.store.with_customer_file_rows(&customer_file.id, |rows| {
            file::generate(&CustomerFilePresenter, &ctx, rows, &path)
        })?;
        upload::send_file(self.objects, self.export, &regime.slug, FileKind::Customer, &generated.path)?;
        Ok(())
    }
}
