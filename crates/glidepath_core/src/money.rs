//! Fixed-scale decimal helpers shared by every calculator
//!
//! Money is carried as [`Decimal`] and rounded to cents only at the edges of a
//! calculation. Rates and compounding factors are rounded to the significant
//! digit count of the injected [`MathContext`], so decades of repeated monthly
//! compounding stay within a cent of the exact result.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// Number of decimal places kept for money amounts
pub const MONEY_SCALE: u32 = 2;

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Rounding rule applied by a [`MathContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Round half away from zero (0.5 -> 1, -0.5 -> -1)
    #[default]
    HalfUp,
    /// Banker's rounding
    HalfEven,
    /// Truncate toward zero
    Down,
}

impl Rounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Rounding::HalfEven => RoundingStrategy::MidpointNearestEven,
            Rounding::Down => RoundingStrategy::ToZero,
        }
    }
}

/// Precision and rounding used for intermediate rate arithmetic.
///
/// Passed explicitly to every helper instead of living in a global so that
/// tests (or scenarios) can vary precision independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathContext {
    /// Significant digits kept for rates and growth factors
    pub precision: u32,
    pub rounding: Rounding,
}

impl Default for MathContext {
    fn default() -> Self {
        Self {
            precision: 10,
            rounding: Rounding::HalfUp,
        }
    }
}

impl MathContext {
    #[must_use]
    pub fn new(precision: u32, rounding: Rounding) -> Self {
        Self {
            precision,
            rounding,
        }
    }

    /// Round `value` to this context's number of significant digits
    #[must_use]
    pub fn round(&self, value: Decimal) -> Decimal {
        if value.is_zero() {
            return Decimal::ZERO;
        }
        let normalized = value.normalize();
        let digits = digit_count(normalized.mantissa().unsigned_abs());
        let integer_digits = digits as i64 - i64::from(normalized.scale());
        let dp = (i64::from(self.precision) - integer_digits).clamp(0, 28) as u32;
        normalized.round_dp_with_strategy(dp, self.rounding.strategy())
    }

    /// Round `value` to cents using this context's rounding rule
    #[must_use]
    pub fn round_money(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(MONEY_SCALE, self.rounding.strategy())
    }
}

fn digit_count(mut n: u128) -> u32 {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Round a money amount to cents, half-up
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Apply a fractional percentage (0.15 = 15%) to an amount, rounded to cents
#[must_use]
pub fn apply_percentage(amount: Decimal, percentage: Decimal, ctx: &MathContext) -> Decimal {
    ctx.round_money(amount * percentage)
}

/// Convert an annual rate to the equivalent compounded monthly rate:
/// `(1 + annual_rate)^(1/12) - 1`, rounded to the context precision.
pub fn compound_annual_to_monthly(annual_rate: Decimal, ctx: &MathContext) -> Result<Decimal> {
    if annual_rate.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if annual_rate <= Decimal::NEGATIVE_ONE {
        return Err(SimulationError::validation(
            "annual_rate",
            format!("annual rate must be greater than -100%, but was {annual_rate}"),
        ));
    }
    let exponent = Decimal::ONE / MONTHS_PER_YEAR;
    let factor = (Decimal::ONE + annual_rate)
        .checked_powd(exponent)
        .ok_or_else(|| {
            SimulationError::calculation(format!(
                "overflow converting annual rate {annual_rate} to a monthly rate"
            ))
        })?;
    Ok(ctx.round(factor - Decimal::ONE))
}

/// Growth factor `(1 + rate)^years` at context precision
pub fn growth_factor(rate: Decimal, years: Decimal, ctx: &MathContext) -> Result<Decimal> {
    let base = Decimal::ONE + rate;
    let factor = if years.fract().is_zero() {
        years
            .to_u64()
            .and_then(|whole| base.checked_powu(whole))
    } else {
        base.checked_powd(years)
    };
    factor.map(|f| ctx.round(f)).ok_or_else(|| {
        SimulationError::calculation(format!(
            "overflow compounding rate {rate} over {years} years"
        ))
    })
}

/// Inflate `base_amount` by `annual_rate` over `years_elapsed` years.
///
/// Only the final amount is rounded to cents. A zero or negative
/// `years_elapsed` returns `base_amount` untouched.
pub fn apply_inflation(
    base_amount: Decimal,
    annual_rate: Decimal,
    years_elapsed: Decimal,
    ctx: &MathContext,
) -> Result<Decimal> {
    if years_elapsed <= Decimal::ZERO || annual_rate.is_zero() {
        return Ok(base_amount);
    }
    let factor = growth_factor(annual_rate, years_elapsed, ctx)?;
    Ok(ctx.round_money(base_amount * factor))
}
