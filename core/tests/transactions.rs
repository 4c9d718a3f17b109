//! Adding transactions: persistence, tallies and the guards around them.

mod common;

use charging_core::bill_run_service::BillRunService;
use charging_core::error::ChargingError;
use charging_core::records::Totals;
use charging_core::transaction_service::TransactionService;
use charging_core::types::{BillRunStatus, Ruleset};
use common::{merge, presroc_transaction, sroc_transaction, Harness, StubRules};
use serde_json::json;

#[test]
fn transaction_is_stored_with_its_attributes() {
    let h = Harness::new();
    let rules = StubRules::charging(7.72);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    assert_eq!(bill_run.bill_run_number, 10001);
    assert_eq!(bill_run.status, BillRunStatus::Initialised);

    let saved = TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/1"))
        .unwrap();

    let stored = h.store.get_transaction(&saved.id).unwrap();
    assert_eq!(stored.charge_value, 772);
    assert_eq!(stored.charge_financial_year, 2020);
    assert_eq!(stored.invoice_id, saved.invoice_id);
    assert_eq!(stored.attributes.text("line_attr_1").as_deref(), Some("LIC/1"));
    assert_eq!(stored.attributes.text("line_attr_4").as_deref(), Some("1487"));
    assert_eq!(stored.attributes.text("regime_value_15").as_deref(), Some("Anglian"));
    assert!(stored.charge_calculation.unwrap().contains("chargeValue"));
}

/// Invoice, licence and bill run totals equal the sum of the lines'
/// individual tallies.
#[test]
fn totals_are_the_sum_of_line_tallies() {
    let h = Harness::new();
    let rules = StubRules::charging(0.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let service = TransactionService::new(&h.store, &rules);

    let lines = [
        (10.0, false, true),
        (2.5, true, true),
        (0.0, false, false),
        (4.0, false, false),
    ];
    for (pounds, credit, minimum) in lines {
        rules.set_charge(pounds);
        let mut payload = presroc_transaction("A12345678T", "LIC/1");
        merge(
            &mut payload,
            json!({ "credit": credit, "subjectToMinimumCharge": minimum }),
        );
        service.add_transaction(&bill_run.id, &payload).unwrap();
    }

    let expected = Totals {
        credit_line_count: 1,
        credit_line_value: 250,
        debit_line_count: 2,
        debit_line_value: 1400,
        zero_line_count: 1,
        subject_to_minimum_charge_count: 2,
        subject_to_minimum_charge_credit_value: 250,
        subject_to_minimum_charge_debit_value: 1000,
    };

    let invoices = h.store.invoices_for_bill_run(&bill_run.id).unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].totals, expected);

    let licences = h.store.licences_for_invoice(&invoices[0].id).unwrap();
    assert_eq!(licences.len(), 1);
    assert_eq!(licences[0].totals, expected);

    let stored = h.store.get_bill_run(&bill_run.id).unwrap();
    assert_eq!(stored.totals, expected);
    assert_eq!(stored.totals.net_total(), 1150);
}

#[test]
fn invoices_split_by_customer_and_financial_year() {
    let h = Harness::new();
    let rules = StubRules::charging(1.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let service = TransactionService::new(&h.store, &rules);

    service
        .add_transaction(&bill_run.id, &presroc_transaction("A11111111A", "LIC/1"))
        .unwrap();
    service
        .add_transaction(&bill_run.id, &presroc_transaction("A22222222A", "LIC/2"))
        .unwrap();
    let mut earlier = presroc_transaction("A11111111A", "LIC/1");
    merge(
        &mut earlier,
        json!({ "periodStart": "01-APR-2019", "periodEnd": "31-MAR-2020" }),
    );
    service.add_transaction(&bill_run.id, &earlier).unwrap();

    let invoices = h.store.invoices_for_bill_run(&bill_run.id).unwrap();
    assert_eq!(invoices.len(), 3);
    assert_eq!(h.store.transactions_for_bill_run(&bill_run.id).unwrap().len(), 3);
}

#[test]
fn duplicate_client_id_is_a_conflict() {
    let h = Harness::new();
    let rules = StubRules::charging(7.72);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let service = TransactionService::new(&h.store, &rules);

    let mut payload = presroc_transaction("A12345678T", "LIC/1");
    merge(&mut payload, json!({ "clientId": "BB-1" }));
    service.add_transaction(&bill_run.id, &payload).unwrap();

    let err = service.add_transaction(&bill_run.id, &payload).unwrap_err();
    match err {
        ChargingError::Conflict(message) => {
            assert!(message.contains("Client ID 'BB-1'"), "{message}");
        }
        other => panic!("expected a conflict, got {other}"),
    }

    // The failed insert left no tally behind.
    let stored = h.store.get_bill_run(&bill_run.id).unwrap();
    assert_eq!(stored.totals.debit_line_count, 1);
    assert_eq!(stored.totals.debit_line_value, 772);
}

#[test]
fn lines_without_client_id_never_conflict() {
    let h = Harness::new();
    let rules = StubRules::charging(1.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let service = TransactionService::new(&h.store, &rules);

    let payload = presroc_transaction("A12345678T", "LIC/1");
    service.add_transaction(&bill_run.id, &payload).unwrap();
    service.add_transaction(&bill_run.id, &payload).unwrap();
    assert_eq!(h.store.transactions_for_bill_run(&bill_run.id).unwrap().len(), 2);
}

#[test]
fn region_must_match_the_bill_run() {
    let h = Harness::new();
    let rules = StubRules::charging(1.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();

    let mut payload = presroc_transaction("A12345678T", "LIC/1");
    merge(&mut payload, json!({ "region": "W" }));
    let err = TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &payload)
        .unwrap_err();
    match err {
        ChargingError::Validation(v) => assert_eq!(v.fields(), vec!["region"]),
        other => panic!("expected a validation error, got {other}"),
    }
    assert!(rules.requests.borrow().is_empty());
}

#[test]
fn ruleset_must_match_the_bill_run() {
    let h = Harness::new();
    let rules = StubRules::charging(1.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();

    let err = TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &sroc_transaction("A12345678T", "LIC/1"))
        .unwrap_err();
    assert!(err.is_unprocessable());
}

#[test]
fn rules_service_failure_stores_nothing() {
    let h = Harness::new();
    let rules = StubRules::responding(json!({ "WRLSChargingResponse": {} }));
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();

    let err = TransactionService::new(&h.store, &rules)
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/1"))
        .unwrap_err();
    assert!(matches!(err, ChargingError::RulesServiceResponse(_)));
    assert!(h.store.transactions_for_bill_run(&bill_run.id).unwrap().is_empty());
    assert!(h.store.invoices_for_bill_run(&bill_run.id).unwrap().is_empty());
}

#[test]
fn adding_to_a_generated_bill_run_reopens_it() {
    let h = Harness::new();
    let rules = StubRules::charging(10.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let service = TransactionService::new(&h.store, &rules);

    service
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/1"))
        .unwrap();
    bill_runs.generate(&bill_run.id).unwrap();

    service
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/2"))
        .unwrap();
    let reopened = h.store.get_bill_run(&bill_run.id).unwrap();
    assert_eq!(reopened.status, BillRunStatus::Initialised);
}

#[test]
fn approved_bill_runs_are_closed() {
    let h = Harness::new();
    let rules = StubRules::charging(10.0);
    let bill_runs = BillRunService::new(&h.store, &h.objects, &h.config.export);
    let bill_run = bill_runs.create_bill_run("wrls", "A", Ruleset::Presroc).unwrap();
    let service = TransactionService::new(&h.store, &rules);

    service
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/1"))
        .unwrap();
    bill_runs.generate(&bill_run.id).unwrap();
    bill_runs.approve(&bill_run.id).unwrap();

    let err = service
        .add_transaction(&bill_run.id, &presroc_transaction("A12345678T", "LIC/2"))
        .unwrap_err();
    assert!(matches!(err, ChargingError::InvalidState(_)));
}

#[test]
fn unknown_bill_run_is_not_found() {
    let h = Harness::new();
    let rules = StubRules::charging(1.0);
    let err = TransactionService::new(&h.store, &rules)
        .add_transaction("missing", &presroc_transaction("A12345678T", "LIC/1"))
        .unwrap_err();
    assert!(matches!(err, ChargingError::NotFound { entity: "Bill run", .. }));
}
