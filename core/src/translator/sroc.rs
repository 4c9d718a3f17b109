//! Sroc (2021 onwards) charge request schema.

use super::schema::{FieldKind, FieldRule, FieldValue, Presence, Slot, Validated};
use crate::calendar;
use crate::error::ValidationError;

pub const LOSSES: &[&str] = &["High", "Medium", "Low", "Very Low"];
pub const REGIONAL_CHARGING_AREAS: &[&str] = &[
    "Anglian",
    "Midlands",
    "Northumbria",
    "North West",
    "Southern",
    "South West",
    "Thames",
    "Yorkshire",
    "Wales",
];
pub const SUPPORTED_SOURCE_NAMES: &[&str] = &[
    "Candover",
    "Dee",
    "Earl Soham - Deben",
    "Glen Groundwater",
    "Great East Anglian Groundwater",
    "Great East Anglian Surface Water",
    "Kielder",
    "Lodes Granta Groundwater",
    "Lower Yorkshire Derwent",
    "Medway - Allington",
    "Nene - Northampton",
    "Nene - Water Newton",
    "Ouse - Eaton Socon",
    "Ouse - Hermitage",
    "Ouse - Offord",
    "Rhee Groundwater",
    "Severn",
    "Thames",
    "Thet and Little Ouse Surface Water",
    "Waveney Groundwater",
    "Waveney Surface Water",
    "Welland - Tinwell Sluices",
];

/// Stored when supportedSource is false.
pub const NOT_APPLICABLE: &str = "Not Applicable";

/// `N.N.N` where each segment has one or two digits, e.g. `4.5.13`.
pub fn is_charge_category_code(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| (1..=2).contains(&p.len()) && p.chars().all(|c| c.is_ascii_digit()))
}

const DAYS: FieldKind = FieldKind::Integer { min: 0, max: 366 };
const BOOL: FieldKind = FieldKind::Boolean;
const FACTOR: FieldKind = FieldKind::Decimal { positive: false, max_places: Some(3) };
const REQ: Presence = Presence::Required;
const DEFAULT_ONE: Presence = Presence::DefaultDecimal(10, 1);

pub const CHARGE_FIELDS: &[FieldRule] = &[
    FieldRule::new(
        "periodStart",
        FieldKind::Date { floor: Some(calendar::sroc_start_floor) },
        REQ,
        Slot::Core,
    ),
    FieldRule::new("periodEnd", FieldKind::Date { floor: None }, REQ, Slot::Core),
    FieldRule::new("credit", BOOL, REQ, Slot::Core),
    FieldRule::new(
        "chargeCategoryCode",
        FieldKind::Pattern { check: is_charge_category_code, description: "a charge category code like 4.5.13" },
        REQ,
        Slot::Attr("regime_value_3"),
    )
    .sent_as("chargeCategory"),
    FieldRule::new("billableDays", DAYS, REQ, Slot::Attr("regime_value_4")).sent_as("billableDays"),
    FieldRule::new("authorisedDays", DAYS, REQ, Slot::Attr("regime_value_5")).sent_as("authorisedDays"),
    FieldRule::new(
        "authorisedVolume",
        FieldKind::Decimal { positive: true, max_places: None },
        REQ,
        Slot::Attr("regime_value_6"),
    )
    .sent_as("authorisedVolume"),
    FieldRule::new("loss", FieldKind::Choice(LOSSES), REQ, Slot::Attr("regime_value_9")).sent_as("loss"),
    FieldRule::new("section130Agreement", BOOL, REQ, Slot::Attr("regime_value_10")).sent_as("section130Agreement"),
    FieldRule::new("abatementFactor", FACTOR, DEFAULT_ONE, Slot::Attr("regime_value_11")).sent_as("abatementAdjustment"),
    FieldRule::new("section127Agreement", BOOL, REQ, Slot::Attr("regime_value_12")).sent_as("section127Agreement"),
    FieldRule::new("supportedSource", BOOL, REQ, Slot::Attr("regime_value_13")).sent_as("supportedSource"),
    FieldRule::new(
        "supportedSourceName",
        FieldKind::Choice(SUPPORTED_SOURCE_NAMES),
        Presence::Optional,
        Slot::Attr("regime_value_14"),
    )
    .sent_as("supportedSourceName"),
    FieldRule::new(
        "regionalChargingArea",
        FieldKind::Choice(REGIONAL_CHARGING_AREAS),
        REQ,
        Slot::Attr("regime_value_15"),
    )
    .sent_as("region"),
    FieldRule::new("twoPartTariff", BOOL, REQ, Slot::Attr("regime_value_16")).sent_as("twoPartTariff"),
    FieldRule::new("compensationCharge", BOOL, REQ, Slot::Attr("regime_value_17")).sent_as("compensationCharge"),
    FieldRule::new("waterCompanyCharge", BOOL, REQ, Slot::Attr("regime_value_18")).sent_as("waterCompanyCharge"),
    FieldRule::new("winterOnly", BOOL, REQ, Slot::Attr("regime_value_19")).sent_as("winterOnly"),
    FieldRule::new(
        "actualVolume",
        FieldKind::Decimal { positive: true, max_places: None },
        Presence::Optional,
        Slot::Attr("regime_value_20"),
    )
    .sent_as("actualVolume"),
    FieldRule::new("aggregateProportion", FACTOR, DEFAULT_ONE, Slot::Attr("header_attr_2")).sent_as("aggregateProportion"),
    FieldRule::new("adjustmentFactor", FACTOR, DEFAULT_ONE, Slot::Attr("header_attr_3")).sent_as("adjustmentFactor"),
    FieldRule::new("waterUndertaker", BOOL, Presence::Optional, Slot::Attr("header_attr_4")).sent_as("waterUndertaker"),
];

pub fn cross_field_rules(values: &mut Validated, errors: &mut ValidationError) {
    let compensation = values.flag("compensationCharge") == Some(true);
    let water_company = values.flag("waterCompanyCharge") == Some(true);

    match values.flag("waterUndertaker") {
        None if compensation => {
            errors.push("waterUndertaker", "is required when compensationCharge is true");
        }
        Some(false) if compensation && water_company => {
            errors.push(
                "waterUndertaker",
                "must be true when compensationCharge and waterCompanyCharge are true",
            );
        }
        None => values.insert("waterUndertaker", FieldValue::Bool(false)),
        _ => {}
    }

    if values.flag("twoPartTariff") == Some(true) {
        if values.flag("section127Agreement") == Some(false) {
            errors.push("section127Agreement", "must be true when twoPartTariff is true");
        }
        if !values.contains("actualVolume") {
            errors.push("actualVolume", "is required when twoPartTariff is true");
        }
    }

    match values.flag("supportedSource") {
        Some(false) => {
            if values.contains("supportedSourceName") {
                errors.push("supportedSourceName", "is not allowed when supportedSource is false");
            }
            values.insert("supportedSourceName", FieldValue::Text(NOT_APPLICABLE.to_string()));
        }
        Some(true) if !values.contains("supportedSourceName") => {
            errors.push("supportedSourceName", "is required when supportedSource is true");
        }
        _ => {}
    }
}
