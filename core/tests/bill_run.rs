//! Bill run lifecycle: generate, approve, send.

mod common;

use charging_core::bill_run_service::{BillRunService, MINIMUM_CHARGE_DESCRIPTION};
use charging_core::error::{ChargingError, ChargingResult};
use charging_core::transaction_service::TransactionService;
use charging_core::types::{BillRunStatus, Ruleset};
use charging_core::upload::ObjectStore;
use chrono::NaiveDate;
use common::{merge, presroc_transaction, sroc_transaction, Harness, StubRules};
use serde_json::json;
use std::fs;

fn file_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

/// Object store that refuses every upload.
#[derive(Debug)]
struct RefusingObjects;

impl ObjectStore for RefusingObjects {
    fn put(&self, _bucket: &str, key: &str, _bytes: &[u8]) -> ChargingResult<()> {
        Err(ChargingError::Upload(format!("refused {key}")))
    }
}

fn minimum_charge_line(customer: &str, licence: &str) -> serde_json::Value {
    let mut payload = presroc_transaction(customer, licence);
    merge(&mut payload, json!({ "subjectToMinimumCharge": true }));
    payload
}

#[test]
fn generate_tops_up_to_the_minimum_charge() {
    let h = Harness::new();
    let rules = StubRules::charging(10.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &minimum_charge_line("A12345678T", "LIC/1"))
        .unwrap();

    let generated = bill_runs.generate(&bill_run.id).unwrap();
    assert_eq!(generated.status, BillRunStatus::Generated);
    assert_eq!(generated.totals.debit_line_count, 2);
    assert_eq!(generated.totals.debit_line_value, 2500);

    let adjustments = h.store.minimum_charge_adjustments(&bill_run.id).unwrap();
    assert_eq!(adjustments.len(), 1);
    let adjustment = &adjustments[0];
    assert_eq!(adjustment.charge_value, 1500);
    assert!(!adjustment.charge_credit);
    assert!(adjustment.subject_to_minimum_charge);
    assert_eq!(adjustment.line_description, MINIMUM_CHARGE_DESCRIPTION);
    assert_eq!(adjustment.client_id, None);
    assert_eq!(adjustment.licence_number, "LIC/1");

    let invoices = h.store.invoices_for_bill_run(&bill_run.id).unwrap();
    assert!(invoices[0].minimum_charge_invoice);
    assert_eq!(invoices[0].totals.net_total(), 2500);
}

#[test]
fn credits_are_topped_up_on_their_own_side() {
    let h = Harness::new();
    let rules = StubRules::charging(3.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let mut payload = minimum_charge_line("A12345678T", "LIC/1");
    merge(&mut payload, json!({ "credit": true }));
    TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &payload)
        .unwrap();

    let generated = bill_runs.generate(&bill_run.id).unwrap();
    assert_eq!(generated.totals.credit_line_value, 2500);
    assert_eq!(generated.totals.net_total(), -2500);

    let adjustments = h.store.minimum_charge_adjustments(&bill_run.id).unwrap();
    assert_eq!(adjustments.len(), 1);
    assert!(adjustments[0].charge_credit);
    assert_eq!(adjustments[0].charge_value, 2200);
}

#[test]
fn licences_at_or_above_the_minimum_are_left_alone() {
    let h = Harness::new();
    let rules = StubRules::charging(25.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &minimum_charge_line("A12345678T", "LIC/1"))
        .unwrap();

    bill_runs.generate(&bill_run.id).unwrap();
    assert!(h.store.minimum_charge_adjustments(&bill_run.id).unwrap().is_empty());
    let invoices = h.store.invoices_for_bill_run(&bill_run.id).unwrap();
    assert!(!invoices[0].minimum_charge_invoice);
}

#[test]
fn regenerating_replaces_old_adjustments() {
    let h = Harness::new();
    let rules = StubRules::charging(10.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let service = TransactionService::new(&h.store, &rules);

    service
        .add_transaction(&bill_run.id, &minimum_charge_line("A12345678T", "LIC/1"))
        .unwrap();
    bill_runs.generate(&bill_run.id).unwrap();

    rules.set_charge(5.0);
    service
        .add_transaction(&bill_run.id, &minimum_charge_line("A12345678T", "LIC/1"))
        .unwrap();
    let regenerated = bill_runs.generate(&bill_run.id).unwrap();

    let adjustments = h.store.minimum_charge_adjustments(&bill_run.id).unwrap();
    assert_eq!(adjustments.len(), 1);
    assert_eq!(adjustments[0].charge_value, 1000);
    assert_eq!(regenerated.totals.debit_line_count, 3);
    assert_eq!(regenerated.totals.debit_line_value, 2500);
}

#[test]
fn small_presroc_invoices_are_deminimis() {
    let h = Harness::new();
    let rules = StubRules::charging(4.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/1"))
        .unwrap();

    bill_runs.generate(&bill_run.id).unwrap();
    let invoice = &h.store.invoices_for_bill_run(&bill_run.id).unwrap()[0];
    assert!(invoice.deminimis_invoice);
    assert!(!invoice.zero_value_invoice);
    assert!(!invoice.is_billable());
}

#[test]
fn sroc_invoices_are_never_deminimis() {
    let h = Harness::new();
    let rules = StubRules::charging(4.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Sroc).unwrap();
    TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &sroc_transaction("A12345678T", "LIC/1"))
        .unwrap();

    bill_runs.generate(&bill_run.id).unwrap();
    let invoice = &h.store.invoices_for_bill_run(&bill_run.id).unwrap()[0];
    assert!(!invoice.deminimis_invoice);
    assert!(invoice.is_billable());
}

#[test]
fn zero_value_invoices_are_flagged() {
    let h = Harness::new();
    let rules = StubRules::charging(10.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let service = TransactionService::new(&h.store, &rules);

    service
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/1"))
        .unwrap();
    let mut credit = presroc_transaction("A12345678T", "LIC/1");
    merge(&mut credit, json!({ "credit": true }));
    service.add_transaction(&bill_run.id, &credit).unwrap();

    bill_runs.generate(&bill_run.id).unwrap();
    let invoice = &h.store.invoices_for_bill_run(&bill_run.id).unwrap()[0];
    assert!(invoice.zero_value_invoice);
}

#[test]
fn lifecycle_steps_must_come_in_order() {
    let h = Harness::new();
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();

    assert!(matches!(
        bill_runs.approve(&bill_run.id).unwrap_err(),
        ChargingError::InvalidState(_)
    ));
    assert!(matches!(
        bill_runs.send(&bill_run.id, file_date()).unwrap_err(),
        ChargingError::InvalidState(_)
    ));

    bill_runs.generate(&bill_run.id).unwrap();
    assert!(matches!(
        bill_runs.generate(&bill_run.id).unwrap_err(),
        ChargingError::InvalidState(_)
    ));
}

#[test]
fn nothing_billable_needs_no_billing() {
    let h = Harness::new();
    let rules = StubRules::charging(4.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/1"))
        .unwrap();

    bill_runs.generate(&bill_run.id).unwrap();
    bill_runs.approve(&bill_run.id).unwrap();
    let sent = bill_runs.send(&bill_run.id, file_date()).unwrap();

    assert_eq!(sent.status, BillRunStatus::BillingNotRequired);
    assert_eq!(sent.file_reference, None);
    assert!(!h.config.export.storage_root.exists());
}

#[test]
fn send_writes_and_uploads_the_transaction_file() {
    let h = Harness::new();
    let rules = StubRules::charging(10.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let service = TransactionService::new(&h.store, &rules);

    service
        .add_transaction(&bill_run.id, &presroc_transaction("A11111111A", "LIC/1"))
        .unwrap();
    rules.set_charge(5.0);
    let mut credit = presroc_transaction("A22222222A", "LIC/2");
    merge(&mut credit, json!({ "credit": true }));
    service.add_transaction(&bill_run.id, &credit).unwrap();

    bill_runs.generate(&bill_run.id).unwrap();
    bill_runs.approve(&bill_run.id).unwrap();
    let sent = bill_runs.send(&bill_run.id, file_date()).unwrap();

    assert_eq!(sent.status, BillRunStatus::Billed);
    assert_eq!(sent.file_reference.as_deref(), Some("nalai50001"));

    let invoices = h.store.invoices_for_bill_run(&bill_run.id).unwrap();
    assert_eq!(invoices[0].transaction_reference.as_deref(), Some("AI0000001T"));
    assert_eq!(invoices[1].transaction_reference.as_deref(), Some("AC0000002T"));

    // The temp copy is gone once uploaded.
    assert!(!h.config.export.temp_dir.join("nalai50001.dat").exists());

    let uploaded = h
        .objects
        .path_of("upload-bucket", "export/wrls/transaction/nalai50001.dat");
    let content = fs::read_to_string(uploaded).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "\"H\",\"0000000\",\"NAL\",\"A\",\"I\",\"nalai50001\",\"10001\",\"17-OCT-2026\""
    );
    // Body lines follow transaction reference order, so the credit note
    // comes first.
    assert!(lines[1].starts_with(
        "\"D\",\"0000001\",\"A22222222A\",\"17-OCT-2026\",\"C\",\"AC0000002T\""
    ));
    assert!(lines[1].contains("\"-500\""));
    assert!(lines[2].starts_with(
        "\"D\",\"0000002\",\"A11111111A\",\"17-OCT-2026\",\"I\",\"AI0000001T\""
    ));
    assert_eq!(lines[3], "\"T\",\"0000003\",\"4\",\"1000\",\"-500\"");
}

/// References and the file reference are committed before the upload, so
/// a failed upload leaves the bill run pending.
#[test]
fn failed_upload_leaves_the_bill_run_pending() {
    let h = Harness::new();
    let rules = StubRules::charging(30.0);
    let bill_runs = BillRunService::new(&h.store, &RefusingObjects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/1"))
        .unwrap();
    bill_runs.generate(&bill_run.id).unwrap();
    bill_runs.approve(&bill_run.id).unwrap();

    let err = bill_runs.send(&bill_run.id, file_date()).unwrap_err();
    assert!(matches!(err, ChargingError::Upload(_)));

    let stored = h.store.get_bill_run(&bill_run.id).unwrap();
    assert_eq!(stored.status, BillRunStatus::Pending);
    assert_eq!(stored.file_reference.as_deref(), Some("nalai50001"));
    assert!(!h.config.export.temp_dir.join("nalai50001.dat").exists());
}

#[test]
fn sroc_file_reference_carries_the_suffix() {
    let h = Harness::new();
    let rules = StubRules::charging(30.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Sroc).unwrap();
    TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &sroc_transaction("A12345678T", "LIC/1"))
        .unwrap();

    bill_runs.generate(&bill_run.id).unwrap();
    bill_runs.approve(&bill_run.id).unwrap();
    let sent = bill_runs.send(&bill_run.id, file_date()).unwrap();
    assert_eq!(sent.file_reference.as_deref(), Some("nalai50001t"));

    let invoices = h.store.invoices_for_bill_run(&bill_run.id).unwrap();
    assert_eq!(invoices[0].transaction_reference.as_deref(), Some("AI0000001S"));

    let uploaded = h
        .objects
        .path_of("upload-bucket", "export/wrls/transaction/nalai50001t.dat");
    let content = fs::read_to_string(uploaded).unwrap();
    let body: Vec<&str> = content.lines().nth(1).unwrap().split("\",\"").collect();
    assert_eq!(body.len(), 42);
    assert_eq!(body[23], "4.5.13");
    assert_eq!(body[24], "Medium loss, non-tidal abstraction");
    assert_eq!(body[41], "Each\"");
}

#[test]
fn archive_copy_when_configured() {
    let mut h = Harness::new();
    h.config.export.copy_to_archive = true;
    let rules = StubRules::charging(30.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/1"))
        .unwrap();

    bill_runs.generate(&bill_run.id).unwrap();
    bill_runs.approve(&bill_run.id).unwrap();
    bill_runs.send(&bill_run.id, file_date()).unwrap();

    let key = "export/wrls/transaction/nalai50001.dat";
    assert!(h.objects.path_of("upload-bucket", key).exists());
    assert!(h.objects.path_of("archive-bucket", key).exists());
}

#[test]
fn bill_run_numbers_increase_per_region() {
    let h = Harness::new();
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let first = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let second = bill_runs.create_bill_run("wrls", "a", Ruleset::Sroc).unwrap();
    let other = bill_runs.create_bill_run("wrls", "W", Ruleset::Presroc).unwrap();

    assert_eq!(first.bill_run_number, 10001);
    assert_eq!(second.bill_run_number, 10002);
    assert_eq!(second.region, "A");
    assert_eq!(other.bill_run_number, 10001);
}
