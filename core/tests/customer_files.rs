//! Customer changes and per-region customer files.

mod common;

use charging_core::customer_service::CustomerService;
use charging_core::error::{ChargingError, ChargingResult};
use charging_core::records::CustomerFileStatus;
use charging_core::upload::{LocalObjectStore, ObjectStore};
use chrono::NaiveDate;
use common::Harness;
use serde_json::{json, Value};
use std::fs;

fn file_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

fn change(region: &str, reference: &str, name: &str) -> Value {
    json!({
        "region": region,
        "customerReference": reference,
        "customerName": name,
        "addressLine1": "1 Mill Lane",
        "addressLine2": "Littleport",
        "postcode": "CB6 1AA"
    })
}

/// Rejects uploads whose key contains `poisoned`.
#[derive(Debug)]
struct SelectiveObjects {
    inner: LocalObjectStore,
    poisoned: &'static str,
}

impl ObjectStore for SelectiveObjects {
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> ChargingResult<()> {
        if key.contains(self.poisoned) {
            return Err(ChargingError::Upload(format!("refused {key}")));
        }
        self.inner.put(bucket, key, bytes)
    }
}

#[test]
fn later_change_replaces_an_unexported_one() {
    let h = Harness::new();
    let service = CustomerService::new(&h.store, &h.objects, &h.config.export);

    service
        .create_customer_change("wrls", &change("A", "A12345678T", "First Name"))
        .unwrap();
    service
        .create_customer_change("wrls", &change("A", "a12345678t", "Second Name"))
        .unwrap();

    let waiting = h.store.unexported_customers(&h.regime.id, "A").unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].customer_name, "Second Name");
}

#[test]
fn invalid_change_is_rejected() {
    let h = Harness::new();
    let service = CustomerService::new(&h.store, &h.objects, &h.config.export);
    let err = service
        .create_customer_change("wrls", &json!({ "region": "A", "customerReference": "A1" }))
        .unwrap_err();
    assert!(err.is_unprocessable());
}

#[test]
fn one_file_per_region() {
    let h = Harness::new();
    let service = CustomerService::new(&h.store, &h.objects, &h.config.export);
    service
        .create_customer_change("wrls", &change("A", "A22222222A", "Bravo Farms"))
        .unwrap();
    service
        .create_customer_change("wrls", &change("A", "A11111111A", "Alpha Water"))
        .unwrap();
    service
        .create_customer_change("wrls", &change("W", "W11111111A", "Welsh Mills"))
        .unwrap();

    let report = service.send_customer_files("wrls", file_date()).unwrap();
    assert!(report.is_success());
    assert_eq!(report.exported.len(), 2);
    assert_eq!(report.exported[0].file_reference, "nalac50001");
    assert_eq!(report.exported[0].status, CustomerFileStatus::Exported);
    assert!(report.exported[0].exported_at.is_some());
    assert_eq!(report.exported[1].file_reference, "nalwc50001");

    let uploaded = h
        .objects
        .path_of("upload-bucket", "export/wrls/customer/nalac50001.dat");
    let content = fs::read_to_string(uploaded).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "\"H\",\"0000000\",\"NAL\",\"A\",\"C\",\"nalac50001\",\"17-OCT-2026\"",
            "\"D\",\"0000001\",\"A11111111A\",\"Alpha Water\",\"1 Mill Lane\",\"Littleport\",\"\",\"\",\"\",\"\",\"CB6 1AA\"",
            "\"D\",\"0000002\",\"A22222222A\",\"Bravo Farms\",\"1 Mill Lane\",\"Littleport\",\"\",\"\",\"\",\"\",\"CB6 1AA\"",
            "\"T\",\"0000003\",\"4\"",
        ]
    );

    // Exported changes are not sent again.
    assert!(h.store.unexported_customers(&h.regime.id, "A").unwrap().is_empty());
    let again = service.send_customer_files("wrls", file_date()).unwrap();
    assert!(again.exported.is_empty());
}

#[test]
fn failed_region_does_not_stop_the_others() {
    let h = Harness::new();
    let objects = SelectiveObjects {
        inner: h.objects.clone(),
        poisoned: "nalac",
    };
    let service = CustomerService::new(&h.store, &objects, &h.config.export);
    service
        .create_customer_change("wrls", &change("A", "A11111111A", "Alpha Water"))
        .unwrap();
    service
        .create_customer_change("wrls", &change("W", "W11111111A", "Welsh Mills"))
        .unwrap();

    let report = service.send_customer_files("wrls", file_date()).unwrap();
    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].region, "A");
    assert_eq!(report.exported.len(), 1);
    assert_eq!(report.exported[0].region, "W");

    let files = h.store.customer_files(&h.regime.id).unwrap();
    let failed = files.iter().find(|f| f.region == "A").unwrap();
    assert_eq!(failed.status, CustomerFileStatus::Failed);
    assert_eq!(failed.exported_at, None);
    // The local temp copy is cleaned up even when the upload fails.
    assert!(!h.config.export.temp_dir.join("nalac50001.dat").exists());
}
