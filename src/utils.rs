use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Converts an upstream float through its shortest round-trip string so that
/// `15000.1` becomes exactly `15000.1` rather than its binary expansion.
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

/// Parses a provider's string-encoded number ("0.91230000").
pub fn decimal_from_str(value: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(value.trim()).ok()
}

pub fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

pub fn sum<'a, I>(values: I) -> BigDecimal
where
    I: IntoIterator<Item = &'a BigDecimal>,
{
    values.into_iter().fold(zero(), |acc, v| acc + v)
}
