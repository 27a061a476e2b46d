use crate::error::{EngineError, Result};
use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest scale `rust_decimal` can represent.
pub const MAX_FEED_DECIMALS: u32 = 28;

/// Binary selection against a fixed boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub boundary: Decimal,
    pub below_label: String,
    pub at_or_above_label: String,
}

impl ThresholdRule {
    pub fn new(
        boundary: Decimal,
        below_label: impl Into<String>,
        at_or_above_label: impl Into<String>,
    ) -> Result<Self> {
        let rule = Self {
            boundary,
            below_label: below_label.into(),
            at_or_above_label: at_or_above_label.into(),
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<()> {
        if self.below_label.trim().is_empty() || self.at_or_above_label.trim().is_empty() {
            return Err(EngineError::Configuration(
                "threshold labels must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// `reading >= boundary` selects the upper label.
    pub fn select(&self, reading: Decimal) -> &str {
        if reading >= self.boundary {
            &self.at_or_above_label
        } else {
            &self.below_label
        }
    }
}

/// Scales a raw feed answer by `decimals` into a decimal reading.
///
/// Answers wider than a decimal mantissa saturate to `Decimal::MAX`, which is
/// at or above every representable boundary.
pub fn reading_from_raw(raw: U256, decimals: u32) -> Decimal {
    if raw.bit_len() > 96 {
        return Decimal::MAX;
    }
    let mantissa = raw.to::<u128>() as i128;
    Decimal::try_from_i128_with_scale(mantissa, decimals.min(MAX_FEED_DECIMALS))
        .unwrap_or(Decimal::MAX)
}

/// Converts a decimal reading into a raw feed answer with `decimals` places.
///
/// Fails for negative readings and for readings more precise than the feed.
pub fn raw_from_reading(reading: Decimal, decimals: u32) -> Result<U256> {
    if reading.is_sign_negative() && !reading.is_zero() {
        return Err(EngineError::ValidationError(format!(
            "price reading must not be negative, got {reading}"
        )));
    }
    let reading = reading.normalize();
    let scale = reading.scale();
    if scale > decimals {
        return Err(EngineError::ValidationError(format!(
            "price reading {reading} has more than {decimals} decimal places"
        )));
    }
    let mantissa = U256::from(reading.mantissa().unsigned_abs());
    Ok(mantissa * U256::from(10u64).pow(U256::from(decimals - scale)))
}
