//! charging-runner: command-line driver for the charging core.
//!
//! Usage:
//!   charging-runner init --db charging.db
//!   charging-runner calculate --payload charge.json
//!   charging-runner create-bill-run --regime wrls --region A --ruleset sroc
//!   charging-runner add-transaction --bill-run <id> --payload transaction.json
//!   charging-runner generate --bill-run <id>
//!   charging-runner approve --bill-run <id>
//!   charging-runner send --bill-run <id>
//!   charging-runner customer-change --payload customer.json
//!   charging-runner send-customer-files
//!
//! `--payload` takes a JSON file path or inline JSON.

use anyhow::{anyhow, Result};
use charging_core::{
    bill_run_service::BillRunService,
    charge::{CalculateCharge, ChargeOutcome},
    config::ChargingConfig,
    customer_service::CustomerService,
    records::BillRun,
    rules_service::HttpRulesService,
    store::ChargingStore,
    transaction_service::TransactionService,
    types::Ruleset,
    upload::LocalObjectStore,
};
use serde_json::{json, Value};
use std::env;

const COMMANDS: &str = "init, calculate, create-bill-run, add-transaction, generate, approve, send, customer-change, send-customer-files";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .ok_or_else(|| anyhow!("usage: charging-runner <command> [flags]; commands: {COMMANDS}"))?
        .clone();
    let db = flag(&args, "--db").unwrap_or("charging.db");
    let data_dir = flag(&args, "--data-dir").unwrap_or("./data");
    let regime_slug = flag(&args, "--regime").unwrap_or("wrls");

    let config = ChargingConfig::load(data_dir)?;
    let store = ChargingStore::open(db)?;
    store.migrate()?;
    for regime in config.regimes.values() {
        store.ensure_regime(regime)?;
    }

    let objects = LocalObjectStore::new(config.export.storage_root.clone());
    let today = chrono::Local::now().date_naive();
    log::info!("runner: command={command} db={db} regime={regime_slug}");

    let output = match command.as_str() {
        "init" => json!({ "db": db, "regimes": config.regimes.keys().collect::<Vec<_>>() }),
        "calculate" => {
            let rules = HttpRulesService::new(config.rules_service.clone())?;
            let payload = payload(&args)?;
            match CalculateCharge::new(&rules).go(&payload, regime_slug, true)? {
                ChargeOutcome::Response(body) => body,
                ChargeOutcome::Charge(charge) => json!({ "chargeValue": charge.signed_value() }),
            }
        }
        "create-bill-run" => {
            let region = required(&args, "--region")?;
            let ruleset = match flag(&args, "--ruleset") {
                Some(raw) => Ruleset::parse(raw).ok_or_else(|| anyhow!("unknown ruleset '{raw}'"))?,
                None => Ruleset::Presroc,
            };
            let service = BillRunService::new(&store, &objects, &config.export);
            bill_run_json(&service.create_bill_run(regime_slug, region, ruleset)?)
        }
        "add-transaction" => {
            let rules = HttpRulesService::new(config.rules_service.clone())?;
            let bill_run_id = required(&args, "--bill-run")?;
            let transaction = TransactionService::new(&store, &rules)
                .add_transaction(bill_run_id, &payload(&args)?)?;
            json!({
                "transaction": {
                    "id": transaction.id,
                    "clientId": transaction.client_id,
                    "chargeValue": transaction.signed_value(),
                }
            })
        }
        "generate" | "approve" | "send" => {
            let bill_run_id = required(&args, "--bill-run")?;
            let service = BillRunService::new(&store, &objects, &config.export);
            let bill_run = match command.as_str() {
                "generate" => service.generate(bill_run_id)?,
                "approve" => service.approve(bill_run_id)?,
                _ => service.send(bill_run_id, today)?,
            };
            bill_run_json(&bill_run)
        }
        "customer-change" => {
            let service = CustomerService::new(&store, &objects, &config.export);
            let customer = service.create_customer_change(regime_slug, &payload(&args)?)?;
            json!({
                "customer": {
                    "id": customer.id,
                    "region": customer.region,
                    "customerReference": customer.customer_reference,
                }
            })
        }
        "send-customer-files" => {
            let service = CustomerService::new(&store, &objects, &config.export);
            let report = service.send_customer_files(regime_slug, today)?;
            json!({
                "exported": report
                    .exported
                    .iter()
                    .map(|f| json!({ "region": f.region, "fileReference": f.file_reference }))
                    .collect::<Vec<_>>(),
                "failed": report
                    .failed
                    .iter()
                    .map(|f| json!({ "region": f.region, "error": f.error }))
                    .collect::<Vec<_>>(),
            })
        }
        other => return Err(anyhow!("unknown command '{other}'; commands: {COMMANDS}")),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn bill_run_json(bill_run: &BillRun) -> Value {
    json!({
        "billRun": {
            "id": bill_run.id,
            "billRunNumber": bill_run.bill_run_number,
            "region": bill_run.region,
            "ruleset": bill_run.ruleset.as_str(),
            "status": bill_run.status.as_str(),
            "fileReference": bill_run.file_reference,
            "creditLineCount": bill_run.totals.credit_line_count,
            "creditLineValue": bill_run.totals.credit_line_value,
            "debitLineCount": bill_run.totals.debit_line_count,
            "debitLineValue": bill_run.totals.debit_line_value,
            "zeroLineCount": bill_run.totals.zero_line_count,
            "netTotal": bill_run.totals.net_total(),
        }
    })
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn required<'a>(args: &'a [String], name: &str) -> Result<&'a str> {
    flag(args, name).ok_or_else(|| anyhow!("{name} is required"))
}

/// Inline JSON when the value starts with `{`, otherwise a file path.
fn payload(args: &[String]) -> Result<Value> {
    let raw = required(args, "--payload")?;
    let text = if raw.trim_start().starts_with('{') {
        raw.to_string()
    } else {
        std::fs::read_to_string(raw).map_err(|e| anyhow!("Cannot read {raw}: {e}"))?
    };
    Ok(serde_json::from_str(&text)?)
}
