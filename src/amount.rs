use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// Parsed amounts at or below this value are treated as absent.
pub const ZERO_AMOUNT: Decimal = Decimal::ZERO;

/// Largest exponent a [`Decimal`] can be scaled by.
pub const MAX_EXPONENT: u32 = 28;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Cannot parse amount `{raw}`: {reason}")]
    Unparsable { raw: String, reason: String },
    #[error("Exponent {exponent} is out of range (max {MAX_EXPONENT})")]
    ExponentOutOfRange { exponent: u32 },
    #[error("Amount `{raw}` overflows when scaled by 10^{exponent}")]
    Overflow { raw: String, exponent: u32 },
}

/// Converts a wire amount in minor units into display units.
///
/// Returns `Ok(None)` when the amount is at or below [`ZERO_AMOUNT`], so the
/// caller never creates a token entry for it.
pub fn normalize(raw: &str, exponent: u32) -> Result<Option<Decimal>, AmountError> {
    let value = Decimal::from_str(raw.trim()).map_err(|err| AmountError::Unparsable {
        raw: raw.to_owned(),
        reason: err.to_string(),
    })?;
    if value <= ZERO_AMOUNT {
        return Ok(None);
    }
    if exponent > MAX_EXPONENT {
        return Err(AmountError::ExponentOutOfRange { exponent });
    }
    let divisor = Decimal::from_i128_with_scale(10i128.pow(exponent), 0);
    value
        .checked_div(divisor)
        .map(|scaled| Some(scaled.normalize()))
        .ok_or_else(|| AmountError::Overflow {
            raw: raw.to_owned(),
            exponent,
        })
}

#[cfg(test)]
mod tests {
    use rust_decimal::prelude::FromPrimitive;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn scales_by_exponent() {
        assert_eq!(normalize("1000000", 6).unwrap(), Some(dec("1")));
        assert_eq!(normalize("500000", 6).unwrap(), Some(dec("0.5")));
        assert_eq!(normalize("1", 18).unwrap(), Some(dec("0.000000000000000001")));
        assert_eq!(
            normalize("42", 0).unwrap(),
            Some(Decimal::from_u32(42).unwrap())
        );
    }

    #[test]
    fn keeps_fractional_reward_amounts() {
        // distribution rewards are decimal coins with 18 fractional digits
        assert_eq!(
            normalize("1234567.890000000000000000", 6).unwrap(),
            Some(dec("1.23456789"))
        );
    }

    #[test]
    fn zero_and_negative_are_absent() {
        assert_eq!(normalize("0", 6).unwrap(), None);
        assert_eq!(normalize("0.000000000000000000", 6).unwrap(), None);
        assert_eq!(normalize("-5", 6).unwrap(), None);
    }

    #[test]
    fn repeated_additions_do_not_drift() {
        let mut total = Decimal::ZERO;
        for _ in 0..10 {
            total += normalize("100000", 6).unwrap().unwrap();
        }
        assert_eq!(total, Decimal::ONE);
    }

    #[test]
    fn rejects_garbage() {
        let err = normalize("12abc", 6).unwrap_err();
        assert!(matches!(err, AmountError::Unparsable { ref raw, .. } if raw == "12abc"));
        let err = normalize("", 6).unwrap_err();
        assert!(matches!(err, AmountError::Unparsable { .. }));
    }

    #[test]
    fn rejects_exponent_beyond_decimal_scale() {
        assert_eq!(
            normalize("10", 29).unwrap_err(),
            AmountError::ExponentOutOfRange { exponent: 29 }
        );
        // absent amounts never reach the exponent check
        assert_eq!(normalize("0", 29).unwrap(), None);
    }
}
