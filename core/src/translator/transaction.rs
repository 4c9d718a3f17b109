//! Transaction- and customer-level request fields.
//!
//! These wrap a charge request: a transaction payload is the charge
//! fields plus who is being billed and for which licence.

use super::schema::{FieldKind, FieldRule, Presence, Slot, TextCase};

pub const REGIONS: &[&str] = &["A", "B", "E", "N", "S", "T", "W", "Y"];

pub const AREA_CODES: &[&str] = &[
    "ARCA", "AREA", "ARNA", "CASC", "MIDLS", "MIDLT", "MIDUS", "AGY2N", "AGY2S", "AGY3", "AGY3N",
    "AGY3S", "AGY4N", "AGY4S", "N", "SE", "SE1", "SE2", "SW", "ABNRTH", "DALES", "NAREA", "RIDIN",
    "DEFAULT", "MULTI", "ANTID", "ANTIDS", "DEEJ", "DEES", "NORTH", "SOUTH", "HAAR", "KAEA", "SAAR",
    "WYMO", "SUSX", "THEST", "TWEST", "TNRTH", "TSTH",
];

const TEXT: TextCase = TextCase::AsIs;

pub const TRANSACTION_FIELDS: &[FieldRule] = &[
    FieldRule::new("region", FieldKind::Choice(REGIONS), Presence::Required, Slot::Core),
    FieldRule::new(
        "customerReference",
        FieldKind::Text { max_len: 12, case: TextCase::Upper },
        Presence::Required,
        Slot::Core,
    ),
    FieldRule::new(
        "licenceNumber",
        FieldKind::Text { max_len: 150, case: TEXT },
        Presence::Required,
        Slot::Attr("line_attr_1"),
    ),
    FieldRule::new(
        "lineDescription",
        FieldKind::Text { max_len: 240, case: TEXT },
        Presence::Required,
        Slot::Core,
    ),
    FieldRule::new("areaCode", FieldKind::Choice(AREA_CODES), Presence::Required, Slot::Core),
    FieldRule::new(
        "clientId",
        FieldKind::Text { max_len: 150, case: TEXT },
        Presence::Optional,
        Slot::Core,
    ),
    FieldRule::new(
        "subjectToMinimumCharge",
        FieldKind::Boolean,
        Presence::DefaultBool(false),
        Slot::Core,
    ),
    FieldRule::new("newLicence", FieldKind::Boolean, Presence::DefaultBool(false), Slot::Core),
];

pub const SROC_TRANSACTION_FIELDS: &[FieldRule] = &[FieldRule::new(
    "chargeCategoryDescription",
    FieldKind::Text { max_len: 150, case: TEXT },
    Presence::Required,
    Slot::Attr("header_attr_1"),
)];

pub const CUSTOMER_FIELDS: &[FieldRule] = &[
    FieldRule::new("region", FieldKind::Choice(REGIONS), Presence::Required, Slot::Core),
    FieldRule::new(
        "customerReference",
        FieldKind::Text { max_len: 12, case: TextCase::Upper },
        Presence::Required,
        Slot::Core,
    ),
    FieldRule::new(
        "customerName",
        FieldKind::Text { max_len: 360, case: TEXT },
        Presence::Required,
        Slot::Core,
    ),
    FieldRule::new(
        "addressLine1",
        FieldKind::Text { max_len: 240, case: TEXT },
        Presence::Required,
        Slot::Core,
    ),
    FieldRule::new("addressLine2", FieldKind::Text { max_len: 240, case: TEXT }, Presence::Optional, Slot::Core),
    FieldRule::new("addressLine3", FieldKind::Text { max_len: 240, case: TEXT }, Presence::Optional, Slot::Core),
    FieldRule::new("addressLine4", FieldKind::Text { max_len: 240, case: TEXT }, Presence::Optional, Slot::Core),
    FieldRule::new("addressLine5", FieldKind::Text { max_len: 240, case: TEXT }, Presence::Optional, Slot::Core),
    FieldRule::new("addressLine6", FieldKind::Text { max_len: 240, case: TEXT }, Presence::Optional, Slot::Core),
    FieldRule::new("postcode", FieldKind::Text { max_len: 60, case: TEXT }, Presence::Optional, Slot::Core),
];
