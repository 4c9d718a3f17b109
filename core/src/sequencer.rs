//! File and transaction references.
//!
//! Numbers come from the per-(regime, region) sequence counter. Callers
//! take them inside the same `in_transaction` block as the record that
//! uses them, so an issued number always has its record.

use crate::error::ChargingResult;
use crate::records::Regime;
use crate::store::{ChargingStore, Counter};
use crate::types::{FileKind, Ruleset};

/// `{prefix}{region}{i|c}{nnnnn}` plus `t` for sroc transaction files,
/// e.g. `nalai50001t`.
pub fn format_file_reference(
    file_prefix: &str,
    region: &str,
    kind: FileKind,
    number: i64,
    ruleset: Option<Ruleset>,
) -> String {
    let suffix = match ruleset {
        Some(Ruleset::Sroc) => "t",
        _ => "",
    };
    format!(
        "{}{}{}{:05}{}",
        file_prefix.to_lowercase(),
        region.to_lowercase(),
        kind.type_char(),
        number,
        suffix
    )
}

/// `{REGION}{I|C}{nnnnnnn}{T|S}`: `C` for credit notes, `T` for presroc
/// and `S` for sroc.
pub fn format_transaction_reference(region: &str, credit_note: bool, number: i64, ruleset: Ruleset) -> String {
    let kind = if credit_note { 'C' } else { 'I' };
    let suffix = match ruleset {
        Ruleset::Presroc => 'T',
        Ruleset::Sroc => 'S',
    };
    format!("{}{kind}{number:07}{suffix}", region.to_uppercase())
}

/// Take the next file number for `region` and format it.
pub fn next_file_reference(
    store: &ChargingStore,
    regime: &Regime,
    region: &str,
    kind: FileKind,
    ruleset: Option<Ruleset>,
) -> ChargingResult<String> {
    let counter = match kind {
        FileKind::Transaction => Counter::TransactionFile,
        FileKind::Customer => Counter::CustomerFile,
    };
    let number = store.next_number(&regime.id, region, counter)?;
    Ok(format_file_reference(&regime.file_prefix, region, kind, number, ruleset))
}

pub fn next_transaction_reference(
    store: &ChargingStore,
    regime: &Regime,
    region: &str,
    credit_note: bool,
    ruleset: Ruleset,
) -> ChargingResult<String> {
    let number = store.next_number(&regime.id, region, Counter::TransactionReference)?;
    Ok(format_transaction_reference(region, credit_note, number, ruleset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_references() {
        assert_eq!(
            format_file_reference("nal", "A", FileKind::Transaction, 50001, None),
            "nalai50001"
        );
        assert_eq!(
            format_file_reference("nal", "A", FileKind::Transaction, 50001, Some(Ruleset::Sroc)),
            "nalai50001t"
        );
        assert_eq!(
            format_file_reference("NAL", "W", FileKind::Customer, 7, None),
            "nalwc00007"
        );
    }

    #[test]
    fn transaction_references() {
        assert_eq!(
            format_transaction_reference("a", false, 1, Ruleset::Presroc),
            "AI0000001T"
        );
        assert_eq!(
            format_transaction_reference("A", true, 12, Ruleset::Sroc),
            "AC0000012S"
        );
    }
}
