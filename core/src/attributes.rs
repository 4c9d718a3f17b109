//! Ruleset-specific attribute slots of a charge transaction.
//!
//! Storage keeps the historical slot names (`line_attr_N`,
//! `regime_value_N`, `header_attr_N`). Each ruleset decides which
//! client field or rules service value lands in which slot; the
//! mapping tables live in `translator` and `rules_service`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;

pub const LINE_ATTR_SLOTS: usize = 15;
pub const REGIME_VALUE_SLOTS: usize = 20;
pub const HEADER_ATTR_SLOTS: usize = 10;

/// Every slot name, in storage column order.
pub fn slot_names() -> Vec<String> {
    let mut names = Vec::with_capacity(LINE_ATTR_SLOTS + REGIME_VALUE_SLOTS + HEADER_ATTR_SLOTS);
    names.extend((1..=LINE_ATTR_SLOTS).map(|n| format!("line_attr_{n}")));
    names.extend((1..=REGIME_VALUE_SLOTS).map(|n| format!("regime_value_{n}")));
    names.extend((1..=HEADER_ATTR_SLOTS).map(|n| format!("header_attr_{n}")));
    names
}

pub fn is_slot(name: &str) -> bool {
    let numbered = |prefix: &str, max: usize| {
        name.strip_prefix(prefix)
            .and_then(|n| n.parse::<usize>().ok())
            .map(|n| (1..=max).contains(&n))
            .unwrap_or(false)
    };
    numbered("line_attr_", LINE_ATTR_SLOTS)
        || numbered("regime_value_", REGIME_VALUE_SLOTS)
        || numbered("header_attr_", HEADER_ATTR_SLOTS)
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Float(f64),
}

impl AttrValue {
    /// Text form written to the database and to export files.
    pub fn to_storage(&self) -> String {
        match self {
            AttrValue::Text(s) => s.clone(),
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Decimal(d) => d.to_string(),
            AttrValue::Float(f) => f.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Text(s) => Value::String(s.clone()),
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Int(i) => Value::from(*i),
            AttrValue::Decimal(d) => d
                .to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            AttrValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            AttrValue::Text(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            AttrValue::Text(s) => s.parse().ok(),
            AttrValue::Decimal(d) => d.to_i64(),
            _ => None,
        }
    }
}

/// Slot name to value. Ordered so persisted and logged output is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(BTreeMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, slot: &str, value: AttrValue) {
        debug_assert!(is_slot(slot), "unknown attribute slot {slot}");
        self.0.insert(slot.to_string(), value);
    }

    pub fn set_opt(&mut self, slot: &str, value: Option<AttrValue>) {
        match value {
            Some(v) => self.set(slot, v),
            None => {
                self.0.remove(slot);
            }
        }
    }

    /// Storage text of a slot, `None` when unset.
    pub fn text(&self, slot: &str) -> Option<String> {
        self.0.get(slot).map(AttrValue::to_storage)
    }

    pub fn flag(&self, slot: &str) -> bool {
        self.0.get(slot).and_then(AttrValue::as_bool).unwrap_or(false)
    }

    pub fn json(&self, slot: &str) -> Value {
        self.0.get(slot).map(AttrValue::to_json).unwrap_or(Value::Null)
    }

    /// Overlay `other` onto self; values in `other` win.
    pub fn merge(&mut self, other: Attributes) {
        self.0.extend(other.0);
    }
}
