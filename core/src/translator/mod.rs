//! Client payload validation and renaming.
//!
//! RULE: translators never touch the store or the rules service. They turn
//! a JSON payload into typed values or a `ValidationError` listing every
//! offending field.

pub mod presroc;
pub mod schema;
pub mod sroc;
pub mod transaction;

use crate::attributes::{AttrValue, Attributes};
use crate::calendar;
use crate::error::ValidationError;
use crate::types::Ruleset;
use chrono::NaiveDate;
use schema::{FieldRule, FieldValue, Validated};
use serde_json::Value;

/// Field table for a ruleset's charge request.
pub fn charge_fields(ruleset: Ruleset) -> &'static [FieldRule] {
    match ruleset {
        Ruleset::Presroc => presroc::CHARGE_FIELDS,
        Ruleset::Sroc => sroc::CHARGE_FIELDS,
    }
}

/// A validated charge request, ready for the rules service.
#[derive(Debug, Clone)]
pub struct TranslatedCharge {
    pub ruleset: Ruleset,
    pub charge_period_start: NaiveDate,
    pub charge_period_end: NaiveDate,
    pub charge_financial_year: i32,
    pub charge_credit: bool,
    pub compensation_charge: bool,
    /// Client values in their storage slots, plus the derived ones.
    pub attributes: Attributes,
    pub values: Validated,
}

/// Read the `ruleset` discriminator. Absent or null means presroc.
pub fn ruleset_of(payload: &Value) -> Result<Ruleset, ValidationError> {
    match payload.get("ruleset") {
        None | Some(Value::Null) => Ruleset::from_payload(None),
        Some(Value::String(raw)) => Ruleset::from_payload(Some(raw)),
        Some(_) => Err(ValidationError::single("ruleset", "must be one of [presroc, sroc]")),
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::single(field, "is required"))
}

fn check_period(values: &Validated, errors: &mut ValidationError) {
    if let (Some(start), Some(end)) = (values.date("periodStart"), values.date("periodEnd")) {
        if end < start {
            errors.push("periodEnd", "must be greater than or equal to periodStart");
        } else if calendar::financial_year(start) != calendar::financial_year(end) {
            errors.push("periodEnd", "must be in the same financial year as periodStart");
        }
    }
}

/// Validate the charge fields of `payload` and collect failures into
/// `errors`. Returns the typed values even when something failed so the
/// caller can add its own checks before deciding.
fn validate_charge(ruleset: Ruleset, payload: &Value, errors: &mut ValidationError) -> Validated {
    let (mut values, found) = schema::validate(payload, charge_fields(ruleset));
    errors.details.extend(found.details);
    check_period(&values, errors);
    match ruleset {
        Ruleset::Presroc => presroc::cross_field_rules(&mut values, errors),
        Ruleset::Sroc => sroc::cross_field_rules(&mut values, errors),
    }
    values
}

fn build_charge(ruleset: Ruleset, values: Validated) -> Result<TranslatedCharge, ValidationError> {
    let start = required(values.date("periodStart"), "periodStart")?;
    let end = required(values.date("periodEnd"), "periodEnd")?;
    let credit = required(values.flag("credit"), "credit")?;
    let compensation_charge = values.flag("compensationCharge").unwrap_or(false);

    let mut attributes = values.to_attributes(charge_fields(ruleset));
    let two_part_tariff = values.flag("twoPartTariff").unwrap_or(false);
    attributes.set(
        "line_attr_2",
        AttrValue::Text(calendar::charge_period(start, end)),
    );
    attributes.set(
        "line_attr_3",
        AttrValue::Text(calendar::prorata_days(
            values.int("billableDays").unwrap_or(0),
            values.int("authorisedDays").unwrap_or(0),
            two_part_tariff,
        )),
    );
    if ruleset == Ruleset::Presroc {
        if let Some(volume) = values.get("volume") {
            attributes.set("line_attr_5", volume.to_attr());
        }
    }

    Ok(TranslatedCharge {
        ruleset,
        charge_period_start: start,
        charge_period_end: end,
        charge_financial_year: calendar::financial_year(start),
        charge_credit: credit,
        compensation_charge,
        attributes,
        values,
    })
}

/// Translate a calculate-charge payload.
pub fn translate_charge(payload: &Value) -> Result<TranslatedCharge, ValidationError> {
    let ruleset = ruleset_of(payload)?;
    let mut errors = ValidationError::default();
    let values = validate_charge(ruleset, payload, &mut errors);
    errors.into_result()?;
    build_charge(ruleset, values)
}

/// A validated create-transaction payload.
#[derive(Debug, Clone)]
pub struct TranslatedTransaction {
    pub charge: TranslatedCharge,
    pub region: String,
    pub customer_reference: String,
    pub licence_number: String,
    pub line_description: String,
    pub area_code: String,
    pub client_id: Option<String>,
    pub subject_to_minimum_charge: bool,
    pub new_licence: bool,
}

/// Translate a create-transaction payload: transaction fields and charge
/// fields are checked together so the client sees every failure at once.
pub fn translate_transaction(payload: &Value) -> Result<TranslatedTransaction, ValidationError> {
    let ruleset = ruleset_of(payload)?;
    let mut errors = ValidationError::default();

    let (fields, found) = schema::validate(payload, transaction::TRANSACTION_FIELDS);
    errors.details.extend(found.details);
    let sroc_fields = if ruleset == Ruleset::Sroc {
        let (extra, found) = schema::validate(payload, transaction::SROC_TRANSACTION_FIELDS);
        errors.details.extend(found.details);
        Some(extra)
    } else {
        None
    };

    let values = validate_charge(ruleset, payload, &mut errors);
    errors.into_result()?;

    let mut charge = build_charge(ruleset, values)?;
    charge
        .attributes
        .merge(fields.to_attributes(transaction::TRANSACTION_FIELDS));
    if let Some(extra) = sroc_fields {
        charge
            .attributes
            .merge(extra.to_attributes(transaction::SROC_TRANSACTION_FIELDS));
    }

    Ok(TranslatedTransaction {
        charge,
        region: required(fields.text("region"), "region")?,
        customer_reference: required(fields.text("customerReference"), "customerReference")?,
        licence_number: required(fields.text("licenceNumber"), "licenceNumber")?,
        line_description: required(fields.text("lineDescription"), "lineDescription")?,
        area_code: required(fields.text("areaCode"), "areaCode")?,
        client_id: fields.text("clientId"),
        subject_to_minimum_charge: fields.flag("subjectToMinimumCharge").unwrap_or(false),
        new_licence: fields.flag("newLicence").unwrap_or(false),
    })
}

/// A validated customer change.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedCustomer {
    pub region: String,
    pub customer_reference: String,
    pub customer_name: String,
    /// Lines 1 to 6; only the first is mandatory.
    pub address_lines: [Option<String>; 6],
    pub postcode: Option<String>,
}

pub fn translate_customer(payload: &Value) -> Result<TranslatedCustomer, ValidationError> {
    let (values, errors) = schema::validate(payload, transaction::CUSTOMER_FIELDS);
    errors.into_result()?;

    let line = |n: usize| values.text(&format!("addressLine{n}"));
    Ok(TranslatedCustomer {
        region: required(values.text("region"), "region")?,
        customer_reference: required(values.text("customerReference"), "customerReference")?,
        customer_name: required(values.text("customerName"), "customerName")?,
        address_lines: [line(1), line(2), line(3), line(4), line(5), line(6)],
        postcode: values.text("postcode"),
    })
}

impl TranslatedCharge {
    /// Typed value of a client field, for building outbound requests.
    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }
}
