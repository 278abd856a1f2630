//! Income descriptors and the per-month income breakdown

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::date_math::YearMonth;
use crate::error::{Result, SimulationError};

/// Category an income stream reports into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeKind {
    Salary,
    SocialSecurity,
    Pension,
    Annuity,
    Other,
}

/// A recurring monthly income with its own adjustment rate and active window.
///
/// `monthly_amount` is expressed in dollars of the `start` month and grows by
/// `annual_adjustment` (raise or COLA) on each anniversary of `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStream {
    pub name: String,
    pub kind: IncomeKind,
    pub monthly_amount: Decimal,
    pub start: YearMonth,
    /// Last month paid, inclusive; `None` pays indefinitely
    #[serde(default)]
    pub end: Option<YearMonth>,
    #[serde(default)]
    pub annual_adjustment: Decimal,
    /// Earned income may be subject to an earnings test
    #[serde(default)]
    pub earned: bool,
}

impl IncomeStream {
    pub fn new(
        name: impl Into<String>,
        kind: IncomeKind,
        monthly_amount: Decimal,
        start: YearMonth,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            monthly_amount,
            start,
            end: None,
            annual_adjustment: Decimal::ZERO,
            earned: kind == IncomeKind::Salary,
        }
    }

    #[must_use]
    pub fn until(mut self, end: YearMonth) -> Self {
        self.end = Some(end);
        self
    }

    #[must_use]
    pub fn adjusted_by(mut self, annual_adjustment: Decimal) -> Self {
        self.annual_adjustment = annual_adjustment;
        self
    }

    #[must_use]
    pub fn earned(mut self, earned: bool) -> Self {
        self.earned = earned;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.monthly_amount < Decimal::ZERO {
            return Err(SimulationError::validation(
                "monthly_amount",
                format!(
                    "income '{}' must not be negative, but was {}",
                    self.name, self.monthly_amount
                ),
            ));
        }
        if let Some(end) = self.end
            && end < self.start
        {
            return Err(SimulationError::validation(
                "end",
                format!(
                    "income '{}' ends {} before it starts {}",
                    self.name, end, self.start
                ),
            ));
        }
        if self.annual_adjustment <= Decimal::NEGATIVE_ONE {
            return Err(SimulationError::validation(
                "annual_adjustment",
                format!(
                    "income '{}' adjustment must be above -100%, but was {}",
                    self.name, self.annual_adjustment
                ),
            ));
        }
        Ok(())
    }
}

/// Income received in a single month, broken down by source.
///
/// Immutable once built; a fresh value is produced every month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonthlyIncome {
    salary: Decimal,
    social_security: Decimal,
    pension: Decimal,
    annuity: Decimal,
    other: Decimal,
}

impl MonthlyIncome {
    /// Absent components default to zero
    #[must_use]
    pub fn new(
        salary: Option<Decimal>,
        social_security: Option<Decimal>,
        pension: Option<Decimal>,
        annuity: Option<Decimal>,
        other: Option<Decimal>,
    ) -> Self {
        Self {
            salary: salary.unwrap_or_default(),
            social_security: social_security.unwrap_or_default(),
            pension: pension.unwrap_or_default(),
            annuity: annuity.unwrap_or_default(),
            other: other.unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Copy with `amount` added to the component for `kind`
    #[must_use]
    pub fn with_added(mut self, kind: IncomeKind, amount: Decimal) -> Self {
        match kind {
            IncomeKind::Salary => self.salary += amount,
            IncomeKind::SocialSecurity => self.social_security += amount,
            IncomeKind::Pension => self.pension += amount,
            IncomeKind::Annuity => self.annuity += amount,
            IncomeKind::Other => self.other += amount,
        }
        self
    }

    #[must_use]
    pub fn salary(&self) -> Decimal {
        self.salary
    }

    #[must_use]
    pub fn social_security(&self) -> Decimal {
        self.social_security
    }

    #[must_use]
    pub fn pension(&self) -> Decimal {
        self.pension
    }

    #[must_use]
    pub fn annuity(&self) -> Decimal {
        self.annuity
    }

    #[must_use]
    pub fn other(&self) -> Decimal {
        self.other
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.salary + self.social_security + self.pension + self.annuity + self.other
    }

    #[must_use]
    pub fn total_non_salary(&self) -> Decimal {
        self.total() - self.salary
    }

    #[must_use]
    pub fn has_salary_income(&self) -> bool {
        self.salary > Decimal::ZERO
    }

    /// Any Social Security, pension or annuity income this month
    #[must_use]
    pub fn has_retirement_income(&self) -> bool {
        self.social_security > Decimal::ZERO
            || self.pension > Decimal::ZERO
            || self.annuity > Decimal::ZERO
    }
}

/// Serializable earnings-test policy for Social Security benefits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EarningsTestRule {
    /// Withhold `reduction_rate` of each dollar of annualized earned income
    /// above `annual_exempt_amount`, up to the full benefit.
    Threshold {
        annual_exempt_amount: Decimal,
        reduction_rate: Decimal,
    },
}

impl EarningsTestRule {
    pub fn validate(&self) -> Result<()> {
        match self {
            EarningsTestRule::Threshold {
                annual_exempt_amount,
                reduction_rate,
            } => {
                if *annual_exempt_amount < Decimal::ZERO {
                    return Err(SimulationError::validation(
                        "annual_exempt_amount",
                        format!("exempt amount must not be negative, but was {annual_exempt_amount}"),
                    ));
                }
                if *reduction_rate < Decimal::ZERO || *reduction_rate > Decimal::ONE {
                    return Err(SimulationError::validation(
                        "reduction_rate",
                        format!("reduction rate must be between 0 and 1, but was {reduction_rate}"),
                    ));
                }
                Ok(())
            }
        }
    }
}
