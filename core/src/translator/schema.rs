//! Data-driven field validation shared by every translator.
//!
//! A translator is a table of `FieldRule`s plus a handful of cross-field
//! checks. `validate` walks the table once, collecting every failure
//! instead of stopping at the first, and returns typed values keyed by
//! the client field name.

use crate::attributes::{AttrValue, Attributes};
use crate::calendar;
use crate::error::ValidationError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy)]
pub enum TextCase {
    AsIs,
    Upper,
}

#[derive(Clone, Copy)]
pub enum FieldKind {
    /// `floor` is the earliest date accepted.
    Date { floor: Option<fn() -> NaiveDate> },
    Boolean,
    Integer { min: i64, max: i64 },
    /// `positive` rejects zero as well as negatives. `max_places` rejects
    /// explicitly supplied values with more fraction digits.
    Decimal { positive: bool, max_places: Option<u32> },
    Text { max_len: usize, case: TextCase },
    /// Closed vocabulary; matched case-insensitively, stored canonically.
    Choice(&'static [&'static str]),
    Pattern { check: fn(&str) -> bool, description: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub enum Presence {
    Required,
    Optional,
    DefaultBool(bool),
    /// Mantissa and scale, as `Decimal::new` takes them.
    DefaultDecimal(i64, u32),
}

/// Where a validated field is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A named column of the transaction or customer row.
    Core,
    /// One of the historical attribute slots.
    Attr(&'static str),
}

#[derive(Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
    pub slot: Slot,
    /// Attribute name the rules service expects, if the field is sent there.
    pub rules_service: Option<&'static str>,
}

impl FieldRule {
    pub const fn new(field: &'static str, kind: FieldKind, presence: Presence, slot: Slot) -> Self {
        Self {
            field,
            kind,
            presence,
            slot,
            rules_service: None,
        }
    }

    pub const fn sent_as(mut self, name: &'static str) -> Self {
        self.rules_service = Some(name);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Date(NaiveDate),
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
}

impl FieldValue {
    pub fn to_attr(&self) -> AttrValue {
        match self {
            FieldValue::Date(d) => AttrValue::Text(calendar::format_date(*d)),
            FieldValue::Bool(b) => AttrValue::Bool(*b),
            FieldValue::Int(i) => AttrValue::Int(*i),
            FieldValue::Decimal(d) => AttrValue::Decimal(*d),
            FieldValue::Text(s) => AttrValue::Text(s.clone()),
        }
    }
}

/// Typed values of a validated payload, keyed by client field name.
#[derive(Debug, Clone, Default)]
pub struct Validated {
    values: BTreeMap<&'static str, FieldValue>,
}

impl Validated {
    pub fn insert(&mut self, field: &'static str, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.values.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        match self.values.get(field) {
            Some(FieldValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        match self.values.get(field) {
            Some(FieldValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn int(&self, field: &str) -> Option<i64> {
        match self.values.get(field) {
            Some(FieldValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn text(&self, field: &str) -> Option<String> {
        match self.values.get(field) {
            Some(FieldValue::Text(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Rename every attribute-slot field into its storage slot.
    pub fn to_attributes(&self, rules: &[FieldRule]) -> Attributes {
        let mut attributes = Attributes::new();
        for rule in rules {
            if let (Slot::Attr(slot), Some(value)) = (rule.slot, self.values.get(rule.field)) {
                attributes.set(slot, value.to_attr());
            }
        }
        attributes
    }
}

/// Upper-case the first letter of each word and lower-case the rest.
pub fn title_case(raw: &str) -> String {
    raw.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Canonical entry of `choices` matching `raw`, ignoring case.
pub fn match_choice(raw: &str, choices: &'static [&'static str]) -> Option<&'static str> {
    let trimmed = raw.trim();
    let titled = title_case(trimmed);
    choices
        .iter()
        .find(|c| **c == titled)
        .or_else(|| choices.iter().find(|c| c.eq_ignore_ascii_case(trimmed)))
        .copied()
}

/// Count of digits after the decimal point as written by the client.
fn fraction_digits(number: &serde_json::Number) -> u32 {
    match parse_decimal_number(number) {
        Some(d) => d.normalize().scale(),
        None => 0,
    }
}

fn parse_decimal_number(number: &serde_json::Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn parse_decimal(value: &Value) -> Option<(Decimal, u32)> {
    match value {
        Value::Number(n) => parse_decimal_number(n).map(|d| (d, fraction_digits(n))),
        Value::String(s) => Decimal::from_str(s.trim())
            .ok()
            .map(|d| (d, d.normalize().scale())),
        _ => None,
    }
}

fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check_field(rule: &FieldRule, value: &Value) -> Result<FieldValue, String> {
    match rule.kind {
        FieldKind::Date { floor } => {
            let raw = value.as_str().ok_or("must be a valid date")?;
            let date = calendar::parse_date(raw).ok_or("must be a valid date")?;
            if let Some(floor) = floor {
                let floor = floor();
                if date < floor {
                    return Err(format!(
                        "must be greater than or equal to {}",
                        calendar::format_date(floor)
                    ));
                }
            }
            Ok(FieldValue::Date(date))
        }
        FieldKind::Boolean => parse_bool(value)
            .map(FieldValue::Bool)
            .ok_or_else(|| "must be a boolean".to_string()),
        FieldKind::Integer { min, max } => {
            let n = parse_int(value).ok_or("must be an integer")?;
            if n < min || n > max {
                return Err(format!("must be between {min} and {max}"));
            }
            Ok(FieldValue::Int(n))
        }
        FieldKind::Decimal { positive, max_places } => {
            let (d, places) = parse_decimal(value).ok_or("must be a number")?;
            if positive && d <= Decimal::ZERO {
                return Err("must be greater than 0".into());
            }
            if d < Decimal::ZERO {
                return Err("must be greater than or equal to 0".into());
            }
            if let Some(max) = max_places {
                if places > max {
                    return Err(format!("must have no more than {max} decimal places"));
                }
            }
            Ok(FieldValue::Decimal(d))
        }
        FieldKind::Text { max_len, case } => {
            let raw = value.as_str().ok_or("must be a string")?.trim();
            if raw.is_empty() {
                return Err("is not allowed to be empty".into());
            }
            if raw.chars().count() > max_len {
                return Err(format!("length must be less than or equal to {max_len} characters long"));
            }
            Ok(FieldValue::Text(match case {
                TextCase::AsIs => raw.to_string(),
                TextCase::Upper => raw.to_uppercase(),
            }))
        }
        FieldKind::Choice(choices) => {
            let raw = value.as_str().ok_or("must be a string")?;
            match_choice(raw, choices)
                .map(|c| FieldValue::Text(c.to_string()))
                .ok_or_else(|| format!("must be one of [{}]", choices.join(", ")))
        }
        FieldKind::Pattern { check, description } => {
            let raw = value.as_str().ok_or("must be a string")?.trim();
            if check(raw) {
                Ok(FieldValue::Text(raw.to_string()))
            } else {
                Err(format!("must be {description}"))
            }
        }
    }
}

/// Validate `payload` against `rules`. Returns the typed values together
/// with every failure found; callers add their cross-field failures to
/// the same collection before deciding.
pub fn validate(payload: &Value, rules: &[FieldRule]) -> (Validated, ValidationError) {
    let mut validated = Validated::default();
    let mut errors = ValidationError::default();

    let empty = Map::new();
    let object = match payload {
        Value::Object(map) => map,
        _ => {
            errors.push("payload", "must be an object");
            &empty
        }
    };

    for rule in rules {
        let supplied = object.get(rule.field).filter(|v| !v.is_null());
        match (supplied, rule.presence) {
            (Some(value), _) => match check_field(rule, value) {
                Ok(v) => validated.insert(rule.field, v),
                Err(message) => errors.push(rule.field, message),
            },
            (None, Presence::Required) => errors.push(rule.field, "is required"),
            (None, Presence::Optional) => {}
            (None, Presence::DefaultBool(b)) => validated.insert(rule.field, FieldValue::Bool(b)),
            (None, Presence::DefaultDecimal(mantissa, scale)) => validated.insert(
                rule.field,
                FieldValue::Decimal(Decimal::new(mantissa, scale)),
            ),
        }
    }

    (validated, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SEASONS: &[&str] = &["Summer", "Winter", "All Year"];

    #[test]
    fn title_case_is_idempotent() {
        assert_eq!(title_case("all year"), "All Year");
        assert_eq!(title_case("ALL YEAR"), "All Year");
        assert_eq!(title_case(&title_case("very low")), title_case("very low"));
    }

    #[test]
    fn choices_come_back_canonically_cased() {
        assert_eq!(match_choice("all year", SEASONS), Some("All Year"));
        assert_eq!(match_choice("WINTER", SEASONS), Some("Winter"));
        assert_eq!(match_choice("spring", SEASONS), None);
    }

    #[test]
    fn decimal_places_are_checked_not_rounded() {
        let rules = [FieldRule::new(
            "factor",
            FieldKind::Decimal { positive: false, max_places: Some(3) },
            Presence::DefaultDecimal(10, 1),
            Slot::Core,
        )];

        let (_, errors) = validate(&json!({ "factor": 0.1234 }), &rules);
        assert_eq!(errors.fields(), vec!["factor"]);

        let (ok, errors) = validate(&json!({ "factor": 0.125 }), &rules);
        assert!(errors.is_empty());
        assert_eq!(ok.get("factor"), Some(&FieldValue::Decimal(Decimal::new(125, 3))));

        let (defaulted, errors) = validate(&json!({}), &rules);
        assert!(errors.is_empty());
        assert_eq!(defaulted.get("factor"), Some(&FieldValue::Decimal(Decimal::new(10, 1))));
    }
}
