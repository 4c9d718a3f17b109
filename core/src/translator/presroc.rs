//! Presroc (pre-2021 rules) charge request schema.

use super::schema::{FieldKind, FieldRule, Presence, Slot, Validated};
use crate::calendar;
use crate::error::ValidationError;

pub const SOURCES: &[&str] = &["Supported", "Unsupported", "Tidal", "Kielder"];
pub const SEASONS: &[&str] = &["Summer", "Winter", "All Year"];
pub const LOSSES: &[&str] = &["High", "Medium", "Low", "Very Low"];
pub const EIUC_SOURCES: &[&str] = &["Tidal", "Other"];
pub const REGIONAL_CHARGING_AREAS: &[&str] = &[
    "Anglian",
    "Midlands",
    "Northumbria",
    "North West",
    "Southern",
    "South West (incl Wessex)",
    "Devon and Cornwall (South West)",
    "North and South Wessex",
    "Thames",
    "Yorkshire",
    "Dee",
    "Wye",
    "Wales",
];

const DAYS: FieldKind = FieldKind::Integer { min: 0, max: 366 };
const BOOL: FieldKind = FieldKind::Boolean;
const REQ: Presence = Presence::Required;

pub const CHARGE_FIELDS: &[FieldRule] = &[
    FieldRule::new(
        "periodStart",
        FieldKind::Date { floor: Some(calendar::presroc_start_floor) },
        REQ,
        Slot::Core,
    ),
    FieldRule::new("periodEnd", FieldKind::Date { floor: None }, REQ, Slot::Core),
    FieldRule::new("credit", BOOL, REQ, Slot::Core),
    FieldRule::new("billableDays", DAYS, REQ, Slot::Attr("regime_value_4")).sent_as("billableDays"),
    FieldRule::new("authorisedDays", DAYS, REQ, Slot::Attr("regime_value_5")).sent_as("authorisedDays"),
    FieldRule::new(
        "volume",
        FieldKind::Decimal { positive: false, max_places: None },
        REQ,
        Slot::Attr("regime_value_6"),
    )
    .sent_as("volume"),
    FieldRule::new("source", FieldKind::Choice(SOURCES), REQ, Slot::Attr("regime_value_7")).sent_as("source"),
    FieldRule::new("season", FieldKind::Choice(SEASONS), REQ, Slot::Attr("regime_value_8")).sent_as("season"),
    FieldRule::new("loss", FieldKind::Choice(LOSSES), REQ, Slot::Attr("regime_value_9")).sent_as("loss"),
    FieldRule::new("section130Agreement", BOOL, REQ, Slot::Attr("regime_value_10")).sent_as("section130Agreement"),
    FieldRule::new(
        "section126Factor",
        FieldKind::Decimal { positive: false, max_places: Some(3) },
        Presence::DefaultDecimal(10, 1),
        Slot::Attr("regime_value_11"),
    )
    .sent_as("section126Factor"),
    FieldRule::new("section127Agreement", BOOL, REQ, Slot::Attr("regime_value_12")).sent_as("section127Agreement"),
    FieldRule::new(
        "eiucSource",
        FieldKind::Choice(EIUC_SOURCES),
        Presence::Optional,
        Slot::Attr("regime_value_13"),
    )
    .sent_as("eiucSource"),
    FieldRule::new("waterUndertaker", BOOL, REQ, Slot::Attr("regime_value_14")).sent_as("waterUndertaker"),
    FieldRule::new(
        "regionalChargingArea",
        FieldKind::Choice(REGIONAL_CHARGING_AREAS),
        REQ,
        Slot::Attr("regime_value_15"),
    )
    .sent_as("region"),
    FieldRule::new("twoPartTariff", BOOL, REQ, Slot::Attr("regime_value_16")).sent_as("twoPartTariff"),
    FieldRule::new("compensationCharge", BOOL, REQ, Slot::Attr("regime_value_17")).sent_as("compensationCharge"),
];

pub fn cross_field_rules(values: &mut Validated, errors: &mut ValidationError) {
    if values.flag("compensationCharge") == Some(true) && !values.contains("eiucSource") {
        errors.push("eiucSource", "is required when compensationCharge is true");
    }

    if values.flag("twoPartTariff") == Some(true) && values.flag("section127Agreement") == Some(false) {
        errors.push("section127Agreement", "must be true when twoPartTariff is true");
    }
}
