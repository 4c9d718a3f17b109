//! Shared fixtures: a canned rules service, payloads and a migrated store.

#![allow(dead_code)]

use charging_core::config::{ChargingConfig, ExportConfig};
use charging_core::error::ChargingResult;
use charging_core::records::Regime;
use charging_core::rules_service::RulesService;
use charging_core::store::ChargingStore;
use charging_core::types::Ruleset;
use charging_core::upload::LocalObjectStore;
use serde_json::{json, Value};
use std::cell::RefCell;
use tempfile::TempDir;

/// Rules service that answers every request with the same decision and
/// remembers what it was asked.
pub struct StubRules {
    response: RefCell<Value>,
    pub requests: RefCell<Vec<(Ruleset, i32, Value)>>,
}

impl StubRules {
    /// Answer with `pounds` as the charge value.
    pub fn charging(pounds: f64) -> Self {
        Self::responding(decision(pounds))
    }

    pub fn responding(body: Value) -> Self {
        Self {
            response: RefCell::new(body),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn set_charge(&self, pounds: f64) {
        *self.response.borrow_mut() = decision(pounds);
    }
}

impl RulesService for StubRules {
    fn calculate(&self, ruleset: Ruleset, financial_year: i32, request: &Value) -> ChargingResult<Value> {
        self.requests
            .borrow_mut()
            .push((ruleset, financial_year, request.clone()));
        Ok(self.response.borrow().clone())
    }
}

pub fn decision(pounds: f64) -> Value {
    json!({
        "WRLSChargingResponse": {
            "chargeValue": pounds,
            "sucFactor": 14.87,
            "sourceFactor": 1.0,
            "seasonFactor": 1.6,
            "lossFactor": 0.03,
            "s130Agreement": "",
            "abatementAdjustment": "S126 x 1.0",
            "s127Agreement": null,
            "eiucSourceFactor": 0.0,
            "eiucFactor": 0.0
        }
    })
}

pub fn presroc_charge() -> Value {
    json!({
        "periodStart": "01-APR-2020",
        "periodEnd": "31-MAR-2021",
        "credit": false,
        "billableDays": 214,
        "authorisedDays": 214,
        "volume": "3.5865",
        "source": "Supported",
        "season": "Summer",
        "loss": "Low",
        "section130Agreement": false,
        "section127Agreement": false,
        "waterUndertaker": false,
        "regionalChargingArea": "Anglian",
        "twoPartTariff": false,
        "compensationCharge": false
    })
}

pub fn sroc_charge() -> Value {
    json!({
        "ruleset": "sroc",
        "periodStart": "01-APR-2021",
        "periodEnd": "31-MAR-2022",
        "credit": false,
        "chargeCategoryCode": "4.5.13",
        "billableDays": 365,
        "authorisedDays": 365,
        "authorisedVolume": 200,
        "loss": "Low",
        "section130Agreement": false,
        "section127Agreement": false,
        "supportedSource": false,
        "regionalChargingArea": "Anglian",
        "twoPartTariff": false,
        "compensationCharge": false,
        "waterCompanyCharge": false,
        "winterOnly": false
    })
}

/// A presroc transaction for `customer` on `licence`, region A.
pub fn presroc_transaction(customer: &str, licence: &str) -> Value {
    let mut payload = presroc_charge();
    let extra = json!({
        "region": "A",
        "customerReference": customer,
        "licenceNumber": licence,
        "lineDescription": "Drains within Littleport & Downham IDB",
        "areaCode": "ARCA"
    });
    merge(&mut payload, extra);
    payload
}

pub fn sroc_transaction(customer: &str, licence: &str) -> Value {
    let mut payload = sroc_charge();
    let extra = json!({
        "region": "A",
        "customerReference": customer,
        "licenceNumber": licence,
        "lineDescription": "Well at Chigborough Farm",
        "areaCode": "ARCA",
        "chargeCategoryDescription": "Medium loss, non-tidal abstraction"
    });
    merge(&mut payload, extra);
    payload
}

/// Copy `extra`'s keys over `payload`'s.
pub fn merge(payload: &mut Value, extra: Value) {
    if let (Some(target), Value::Object(source)) = (payload.as_object_mut(), extra) {
        for (k, v) in source {
            target.insert(k, v);
        }
    }
}

pub struct Harness {
    pub store: ChargingStore,
    pub config: ChargingConfig,
    pub regime: Regime,
    pub objects: LocalObjectStore,
    pub dir: TempDir,
}

impl Harness {
    /// In-memory store with the wrls regime, exporting under a temp dir.
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let mut config = ChargingConfig::default_test();
        config.export = ExportConfig {
            temp_dir: dir.path().join("tmp"),
            storage_root: dir.path().join("storage"),
            bucket: "upload-bucket".into(),
            archive_bucket: "archive-bucket".into(),
            copy_to_archive: false,
        };

        let store = ChargingStore::in_memory().unwrap();
        store.migrate().unwrap();
        let regime = store.ensure_regime(config.regime("wrls").unwrap()).unwrap();
        let objects = LocalObjectStore::new(config.export.storage_root.clone());

        Self {
            store,
            config,
            regime,
            objects,
            dir,
        }
    }
}
