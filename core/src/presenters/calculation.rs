//! Client-facing calculate-charge response.

use crate::charge::CalculatedCharge;
use crate::types::Ruleset;
use serde_json::{json, Map, Value};

const PRESROC_FIELDS: &[(&str, &str)] = &[
    ("sucFactor", "line_attr_4"),
    ("sourceFactor", "line_attr_6"),
    ("seasonFactor", "line_attr_7"),
    ("lossFactor", "line_attr_8"),
    ("s130Agreement", "line_attr_9"),
    ("abatementAdjustment", "line_attr_10"),
    ("eiucSourceFactor", "line_attr_13"),
    ("eiucFactor", "line_attr_14"),
];

const SROC_FIELDS: &[(&str, &str)] = &[
    ("baseCharge", "line_attr_4"),
    ("waterCompanyChargeValue", "line_attr_5"),
    ("supportedSourceValue", "line_attr_6"),
    ("winterOnlyFactor", "line_attr_7"),
    ("section130Factor", "line_attr_8"),
    ("section127Factor", "line_attr_9"),
    ("compensationChargePercent", "line_attr_10"),
];

/// `{ "calculation": { "chargeValue": ..., ... } }` with credits negative.
pub fn present(charge: &CalculatedCharge) -> Value {
    let fields = match charge.ruleset {
        Ruleset::Presroc => PRESROC_FIELDS,
        Ruleset::Sroc => SROC_FIELDS,
    };

    let mut calculation = Map::new();
    calculation.insert("chargeValue".into(), Value::from(charge.signed_value()));
    for (name, slot) in fields {
        calculation.insert(name.to_string(), charge.attributes.json(slot));
    }
    json!({ "calculation": calculation })
}
