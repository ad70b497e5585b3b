//! Small conversion helpers shared by the storage models.

use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a decimal column read back from the database, with a fallback for
/// scientific notation by parsing as f64 first. Storage always writes plain
/// decimal strings, so the fallback only fires on hand-edited databases.
pub(crate) fn decimal_from_db(value_str: &str, field_name: &str) -> Decimal {
    match Decimal::from_str(value_str) {
        Ok(d) => d,
        Err(e_decimal) => match f64::from_str(value_str).ok().and_then(Decimal::from_f64) {
            Some(d) => d,
            None => {
                log::error!(
                    "Failed to parse {} '{}' as Decimal ({}). Falling back to ZERO.",
                    field_name,
                    value_str,
                    e_decimal
                );
                Decimal::ZERO
            }
        },
    }
}

/// Renders a decimal for a TEXT column. Normalized so that equal values
/// always produce the same stored representation.
pub(crate) fn decimal_to_db(value: &Decimal) -> String {
    value.normalize().to_string()
}
