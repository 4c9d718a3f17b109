//! Charge-period date handling: parsing, file formatting, financial years.

use chrono::{Datelike, NaiveDate};

/// Earliest periodStart accepted under the presroc rules.
pub fn presroc_start_floor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2014, 4, 1).unwrap_or(NaiveDate::MIN)
}

/// Earliest periodStart accepted under the sroc rules.
pub fn sroc_start_floor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 4, 1).unwrap_or(NaiveDate::MIN)
}

/// Parse a client-supplied date. Accepts `01-APR-2021` (any month case)
/// and ISO `2021-04-01`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%d-%b-%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .ok()
}

/// `DD-MMM-YYYY`, upper case. The only date format written to files.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string().to_uppercase()
}

/// UK financial year (April to March) a date falls in, named by its
/// starting calendar year.
pub fn financial_year(date: NaiveDate) -> i32 {
    if date.month0() <= 2 {
        date.year() - 1
    } else {
        date.year()
    }
}

/// `"008/016"` style billable/authorised days. Two-part tariff charges
/// are not pro-rated.
pub fn prorata_days(billable: i64, authorised: i64, two_part_tariff: bool) -> String {
    if two_part_tariff {
        return "000/000".to_string();
    }
    format!("{billable:03}/{authorised:03}")
}

/// Charge period as printed on transaction lines.
pub fn charge_period(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} - {}", format_date(start), format_date(end))
}
