use anyhow::{Result, anyhow};
use rust_decimal::{Decimal, prelude::ToPrimitive};

const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Converts a major-unit amount to kopecks/cents, truncating toward zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    let scaled = amount
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
        .ok_or_else(|| anyhow!("amount {amount} overflows minor units"))?;

    scaled
        .trunc()
        .to_i64()
        .ok_or_else(|| anyhow!("amount {amount} overflows minor units"))
}

pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}
