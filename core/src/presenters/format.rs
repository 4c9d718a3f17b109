//! Formatting shared by every file presenter.

use chrono::NaiveDate;

/// Line index as seven zero-padded digits.
pub fn pad_index(index: usize) -> String {
    format!("{index:07}")
}

/// `25-MAR-2021`
pub fn file_date(date: NaiveDate) -> String {
    crate::calendar::format_date(date)
}

/// Missing or whitespace-only values print as empty.
pub fn blank(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => String::new(),
    }
}

/// `value` when `hide` is false, otherwise empty.
pub fn blank_if(hide: bool, value: String) -> String {
    if hide {
        String::new()
    } else {
        value
    }
}

/// Credits print as the negation of their magnitude.
pub fn signed_value(charge_credit: bool, value: i64) -> String {
    if charge_credit {
        (-value).to_string()
    } else {
        value.to_string()
    }
}
