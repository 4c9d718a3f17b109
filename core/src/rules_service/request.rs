//! Outbound request bodies.

use crate::translator::{charge_fields, schema::FieldValue, TranslatedCharge};
use crate::types::Ruleset;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};

/// Name of the object the request fields are nested under.
pub fn envelope(ruleset: Ruleset) -> &'static str {
    match ruleset {
        Ruleset::Presroc => "WRLSChargingRequest",
        Ruleset::Sroc => "SRoCChargingRequest",
    }
}

fn to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Date(d) => Value::String(crate::calendar::format_date(*d)),
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Int(i) => Value::from(*i),
        FieldValue::Decimal(d) => d
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Text(s) => Value::String(s.clone()),
    }
}

/// Every field the ruleset sends, under the service's own attribute names.
pub fn build_request(charge: &TranslatedCharge) -> Value {
    let mut body = Map::new();
    body.insert(
        "chargeFinancialYear".into(),
        Value::from(charge.charge_financial_year),
    );
    for rule in charge_fields(charge.ruleset) {
        if let (Some(name), Some(value)) = (rule.rules_service, charge.value(rule.field)) {
            body.insert(name.to_string(), to_json(value));
        }
    }
    if charge.ruleset == Ruleset::Presroc {
        // The presroc ruleset takes the s126 factor as an agreement too.
        let s126 = charge
            .value("section126Factor")
            .map(|v| !matches!(v, FieldValue::Decimal(d) if *d == rust_decimal::Decimal::ONE))
            .unwrap_or(false);
        body.insert("section126Agreement".into(), Value::Bool(s126));
    }

    let mut envelope_object = Map::new();
    envelope_object.insert(envelope(charge.ruleset).to_string(), Value::Object(body));
    Value::Object(envelope_object)
}
