//! Numeric input coercion
//!
//! Prices, percentages, amounts and token counts arrive from callers in
//! whatever shape the UI produced. In permissive mode anything unparseable,
//! missing, or zero falls back to a field default; in strict mode
//! unparseable or out-of-range input is an [`Error::InvalidInput`].

use crate::{Error, Result};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Caller-supplied numeric value
#[derive(Debug, Clone, PartialEq)]
pub enum NumericInput {
    /// Already numeric
    Number(Decimal),
    /// Text that may or may not parse
    Text(String),
}

impl NumericInput {
    fn parse(&self) -> Option<Decimal> {
        match self {
            NumericInput::Number(d) => Some(*d),
            NumericInput::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Some(Decimal::ZERO);
                }
                Decimal::from_str(s)
                    .or_else(|_| Decimal::from_scientific(s))
                    .ok()
            }
        }
    }
}

impl From<Decimal> for NumericInput {
    fn from(value: Decimal) -> Self {
        NumericInput::Number(value)
    }
}

impl From<i64> for NumericInput {
    fn from(value: i64) -> Self {
        NumericInput::Number(Decimal::from(value))
    }
}

impl From<u64> for NumericInput {
    fn from(value: u64) -> Self {
        NumericInput::Number(Decimal::from(value))
    }
}

impl From<u32> for NumericInput {
    fn from(value: u32) -> Self {
        NumericInput::Number(Decimal::from(value))
    }
}

impl From<i32> for NumericInput {
    fn from(value: i32) -> Self {
        NumericInput::Number(Decimal::from(value))
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        match Decimal::from_f64(value) {
            Some(d) => NumericInput::Number(d),
            None => NumericInput::Text(value.to_string()),
        }
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

impl From<String> for NumericInput {
    fn from(value: String) -> Self {
        NumericInput::Text(value)
    }
}

/// How malformed numeric input is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPolicy {
    /// Normalise to a safe default
    #[default]
    Permissive,
    /// Reject with `InvalidInput`
    Strict,
}

impl CoercionPolicy {
    /// Parse from a config string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "permissive" => Some(CoercionPolicy::Permissive),
            "strict" => Some(CoercionPolicy::Strict),
            _ => None,
        }
    }

    /// Coerce to a number, falling back to `default` for missing input.
    ///
    /// Permissive mode also maps unparseable and zero values to `default`.
    pub fn number(
        &self,
        field: &str,
        input: Option<&NumericInput>,
        default: Decimal,
    ) -> Result<Decimal> {
        let Some(input) = input else {
            return Ok(default);
        };

        match (self, input.parse()) {
            (CoercionPolicy::Permissive, Some(d)) if d.is_zero() => Ok(default),
            (CoercionPolicy::Permissive, Some(d)) => Ok(d),
            (CoercionPolicy::Permissive, None) => {
                tracing::debug!(field, ?input, "Non-numeric input replaced by default");
                Ok(default)
            }
            (CoercionPolicy::Strict, Some(d)) => Ok(d),
            (CoercionPolicy::Strict, None) => Err(Error::InvalidInput(format!(
                "{} is not numeric: {:?}",
                field, input
            ))),
        }
    }

    /// Non-negative amount, default 0
    pub fn amount(&self, field: &str, input: Option<&NumericInput>) -> Result<Decimal> {
        let value = self.number(field, input, Decimal::ZERO)?;
        if value.is_sign_negative() && !value.is_zero() {
            return match self {
                CoercionPolicy::Permissive => Ok(Decimal::ZERO),
                CoercionPolicy::Strict => Err(Error::InvalidInput(format!(
                    "{} must not be negative: {}",
                    field, value
                ))),
            };
        }
        Ok(value)
    }

    /// Share of an asset in `1..=100`, default 100
    pub fn percentage(&self, input: Option<&NumericInput>) -> Result<Decimal> {
        let hundred = Decimal::ONE_HUNDRED;
        let value = self.number("percentage", input, hundred)?;
        if value >= Decimal::ONE && value <= hundred {
            return Ok(value);
        }
        match self {
            CoercionPolicy::Permissive => Ok(value.clamp(Decimal::ONE, hundred)),
            CoercionPolicy::Strict => Err(Error::InvalidInput(format!(
                "percentage must be within 1..=100: {}",
                value
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: CoercionPolicy = CoercionPolicy::Permissive;
    const S: CoercionPolicy = CoercionPolicy::Strict;

    #[test]
    fn test_permissive_defaults() {
        assert_eq!(P.amount("price", None).unwrap(), Decimal::ZERO);
        assert_eq!(
            P.amount("price", Some(&"abc".into())).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(P.percentage(None).unwrap(), Decimal::ONE_HUNDRED);
        assert_eq!(P.percentage(Some(&"n/a".into())).unwrap(), Decimal::ONE_HUNDRED);
        assert_eq!(P.percentage(Some(&0.into())).unwrap(), Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_permissive_parses_text() {
        assert_eq!(
            P.amount("price", Some(&" 1250.50 ".into())).unwrap(),
            Decimal::new(125050, 2)
        );
        assert_eq!(
            P.amount("price", Some(&"1e3".into())).unwrap(),
            Decimal::from(1000)
        );
        assert_eq!(P.percentage(Some(&"25".into())).unwrap(), Decimal::from(25));
    }

    #[test]
    fn test_permissive_clamps_ranges() {
        assert_eq!(P.amount("price", Some(&(-5).into())).unwrap(), Decimal::ZERO);
        assert_eq!(P.percentage(Some(&250.into())).unwrap(), Decimal::ONE_HUNDRED);
        assert_eq!(
            P.percentage(Some(&Decimal::new(5, 1).into())).unwrap(),
            Decimal::ONE
        );
    }

    #[test]
    fn test_nan_is_not_numeric() {
        assert_eq!(P.amount("amount", Some(&f64::NAN.into())).unwrap(), Decimal::ZERO);
        assert!(S.amount("amount", Some(&f64::NAN.into())).is_err());
    }

    #[test]
    fn test_strict_rejects() {
        let err = S.amount("price", Some(&"abc".into())).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(S.amount("price", Some(&(-1).into())).is_err());
        assert!(S.percentage(Some(&0.into())).is_err());
        assert!(S.percentage(Some(&101.into())).is_err());
    }

    #[test]
    fn test_strict_accepts_valid() {
        assert_eq!(S.amount("price", Some(&0.into())).unwrap(), Decimal::ZERO);
        assert_eq!(S.amount("price", None).unwrap(), Decimal::ZERO);
        assert_eq!(S.percentage(Some(&"40".into())).unwrap(), Decimal::from(40));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(CoercionPolicy::parse("Strict"), Some(CoercionPolicy::Strict));
        assert_eq!(CoercionPolicy::parse("loose"), None);
    }
}
