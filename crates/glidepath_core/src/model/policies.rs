//! Contribution, withdrawal and Roth conversion policies
//!
//! Policies are pure descriptions; the engine evaluates them month by month.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::AccountId;
use crate::date_math::YearMonth;
use crate::error::{Result, SimulationError};
use crate::money::{MathContext, apply_inflation, round_money};

/// Scheduled increase of the personal contribution rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateIncrement {
    /// Calendar month (1-12) in which each bump takes effect
    pub month_of_year: i8,
    pub increment: Decimal,
    /// The rate never rises above this
    pub max_rate: Decimal,
}

/// How much goes into the accounts each accumulation month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionPolicy {
    /// Fraction of salary deferred by the person
    #[serde(default)]
    pub personal_rate: Decimal,
    /// Employer match per matched dollar (0.5 = 50 cents on the dollar)
    #[serde(default)]
    pub employer_match_rate: Decimal,
    /// Personal deferral is matched up to this fraction of salary
    #[serde(default)]
    pub employer_match_limit: Decimal,
    /// Flat amount contributed every month on top of the salary deferral
    #[serde(default)]
    pub fixed_monthly_amount: Decimal,
    /// Personal deferrals reduce taxable salary
    #[serde(default)]
    pub pre_tax: bool,
    #[serde(default)]
    pub auto_increase: Option<RateIncrement>,
}

impl Default for ContributionPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Contribution amounts for one month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Contribution {
    pub personal: Decimal,
    pub employer: Decimal,
    /// Personal rate in force this month
    pub rate: Decimal,
}

impl Contribution {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.personal + self.employer
    }
}

impl ContributionPolicy {
    #[must_use]
    pub fn none() -> Self {
        Self {
            personal_rate: Decimal::ZERO,
            employer_match_rate: Decimal::ZERO,
            employer_match_limit: Decimal::ZERO,
            fixed_monthly_amount: Decimal::ZERO,
            pre_tax: false,
            auto_increase: None,
        }
    }

    /// Defer `personal_rate` of salary
    #[must_use]
    pub fn salary_deferral(personal_rate: Decimal) -> Self {
        Self {
            personal_rate,
            pre_tax: true,
            ..Self::none()
        }
    }

    #[must_use]
    pub fn with_employer_match(mut self, match_rate: Decimal, match_limit: Decimal) -> Self {
        self.employer_match_rate = match_rate;
        self.employer_match_limit = match_limit;
        self
    }

    #[must_use]
    pub fn with_fixed_amount(mut self, monthly_amount: Decimal) -> Self {
        self.fixed_monthly_amount = monthly_amount;
        self
    }

    #[must_use]
    pub fn with_auto_increase(mut self, increment: RateIncrement) -> Self {
        self.auto_increase = Some(increment);
        self
    }

    /// Personal rate in force during `month` for a run starting at `start`
    #[must_use]
    pub fn rate_at(&self, start: YearMonth, month: YearMonth) -> Decimal {
        let Some(bump) = self.auto_increase else {
            return self.personal_rate;
        };
        if self.personal_rate >= bump.max_rate {
            return self.personal_rate;
        }
        let steps = month_of_year_occurrences(start, month, bump.month_of_year);
        (self.personal_rate + bump.increment * Decimal::from(steps)).min(bump.max_rate)
    }

    /// Contribution for `month` given that month's salary
    #[must_use]
    pub fn contribution(&self, start: YearMonth, month: YearMonth, salary: Decimal) -> Contribution {
        let rate = self.rate_at(start, month);
        let personal = round_money(salary * rate + self.fixed_monthly_amount);
        let matched = rate.min(self.employer_match_limit);
        let employer = round_money(salary * matched * self.employer_match_rate);
        Contribution {
            personal,
            employer,
            rate,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_fraction("personal_rate", self.personal_rate)?;
        check_fraction("employer_match_limit", self.employer_match_limit)?;
        if self.employer_match_rate < Decimal::ZERO {
            return Err(SimulationError::validation(
                "employer_match_rate",
                format!("match rate must not be negative, but was {}", self.employer_match_rate),
            ));
        }
        if self.fixed_monthly_amount < Decimal::ZERO {
            return Err(SimulationError::validation(
                "fixed_monthly_amount",
                format!("amount must not be negative, but was {}", self.fixed_monthly_amount),
            ));
        }
        if let Some(bump) = self.auto_increase {
            if !(1..=12).contains(&bump.month_of_year) {
                return Err(SimulationError::validation(
                    "month_of_year",
                    format!("month must be 1-12, but was {}", bump.month_of_year),
                ));
            }
            check_fraction("increment", bump.increment)?;
            check_fraction("max_rate", bump.max_rate)?;
        }
        Ok(())
    }
}

/// Months in `(start, month]` whose calendar month is `month_of_year`
fn month_of_year_occurrences(start: YearMonth, month: YearMonth, month_of_year: i8) -> i32 {
    if month <= start {
        return 0;
    }
    let target = i32::from(month_of_year) - 1;
    let upto = |index: i32| (index - target).div_euclid(12);
    upto(month.index()) - upto(start.index())
}

fn check_fraction(field: &'static str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(SimulationError::validation(
            field,
            format!("{field} must be between 0 and 1, but was {value}"),
        ));
    }
    Ok(())
}

/// How much is drawn from the portfolio each distribution month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WithdrawalPolicy {
    #[default]
    None,
    /// `annual_rate / 12` of the current balance every month
    PercentOfBalance { annual_rate: Decimal },
    /// Fixed amount in start-month dollars
    FixedAmount {
        monthly_amount: Decimal,
        #[serde(default)]
        inflation_adjusted: bool,
    },
    /// Cover expenses not met by income
    IncomeGap,
}

impl WithdrawalPolicy {
    /// Amount requested for one month, before spill-over and shortfall
    pub fn requested(
        &self,
        balance: Decimal,
        income: Decimal,
        expenses: Decimal,
        inflation_rate: Decimal,
        years_elapsed: i32,
        ctx: &MathContext,
    ) -> Result<Decimal> {
        let amount = match *self {
            WithdrawalPolicy::None => Decimal::ZERO,
            WithdrawalPolicy::PercentOfBalance { annual_rate } => {
                balance.max(Decimal::ZERO) * annual_rate / Decimal::from(12)
            }
            WithdrawalPolicy::FixedAmount {
                monthly_amount,
                inflation_adjusted,
            } => {
                if inflation_adjusted {
                    apply_inflation(
                        monthly_amount,
                        inflation_rate,
                        Decimal::from(years_elapsed),
                        ctx,
                    )?
                } else {
                    monthly_amount
                }
            }
            WithdrawalPolicy::IncomeGap => expenses - income,
        };
        Ok(round_money(amount.max(Decimal::ZERO)))
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            WithdrawalPolicy::PercentOfBalance { annual_rate } => {
                check_fraction("annual_rate", annual_rate)
            }
            WithdrawalPolicy::FixedAmount { monthly_amount, .. } if monthly_amount < Decimal::ZERO => {
                Err(SimulationError::validation(
                    "monthly_amount",
                    format!("withdrawal must not be negative, but was {monthly_amount}"),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// How much to convert in a month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RothConversionStrategy {
    FixedMonthly { amount: Decimal },
    /// Each December, convert enough to bring the year's taxable income up to
    /// `annual_ceiling` (typically the top of a bracket)
    FillToBracket { annual_ceiling: Decimal },
}

/// Moves money from a tax-deferred account into a tax-free one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RothConversionPlan {
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub strategy: RothConversionStrategy,
    pub start: YearMonth,
    #[serde(default)]
    pub end: Option<YearMonth>,
}

impl RothConversionPlan {
    #[must_use]
    pub fn is_active(&self, month: YearMonth) -> bool {
        month >= self.start && self.end.is_none_or(|end| month <= end)
    }

    /// Amount to convert in `month`, before capping at the source balance.
    /// `ytd_taxable_income` excludes this month's conversion.
    #[must_use]
    pub fn requested(&self, month: YearMonth, ytd_taxable_income: Decimal) -> Decimal {
        if !self.is_active(month) {
            return Decimal::ZERO;
        }
        match self.strategy {
            RothConversionStrategy::FixedMonthly { amount } => amount,
            RothConversionStrategy::FillToBracket { annual_ceiling } if month.is_december() => {
                round_money((annual_ceiling - ytd_taxable_income).max(Decimal::ZERO))
            }
            RothConversionStrategy::FillToBracket { .. } => Decimal::ZERO,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.from_account == self.to_account {
            return Err(SimulationError::validation(
                "to_account",
                format!("conversion source and target are both '{}'", self.from_account),
            ));
        }
        if let Some(end) = self.end
            && end < self.start
        {
            return Err(SimulationError::validation(
                "end",
                format!("conversion ends {end} before it starts {}", self.start),
            ));
        }
        let amount = match self.strategy {
            RothConversionStrategy::FixedMonthly { amount } => amount,
            RothConversionStrategy::FillToBracket { annual_ceiling } => annual_ceiling,
        };
        if amount < Decimal::ZERO {
            return Err(SimulationError::validation(
                "strategy",
                format!("conversion amount must not be negative, but was {amount}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ym(year: i16, month: i8) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_rate_bumps_each_january_after_start() {
        let policy = ContributionPolicy::salary_deferral(dec!(0.06)).with_auto_increase(RateIncrement {
            month_of_year: 1,
            increment: dec!(0.01),
            max_rate: dec!(0.10),
        });
        let start = ym(2025, 1);
        assert_eq!(policy.rate_at(start, ym(2025, 1)), dec!(0.06));
        assert_eq!(policy.rate_at(start, ym(2025, 12)), dec!(0.06));
        assert_eq!(policy.rate_at(start, ym(2026, 1)), dec!(0.07));
        assert_eq!(policy.rate_at(start, ym(2028, 6)), dec!(0.09));
        assert_eq!(policy.rate_at(start, ym(2035, 1)), dec!(0.10));
    }

    #[test]
    fn test_rate_bump_mid_year_start() {
        let policy = ContributionPolicy::salary_deferral(dec!(0.05)).with_auto_increase(RateIncrement {
            month_of_year: 7,
            increment: dec!(0.02),
            max_rate: dec!(0.15),
        });
        let start = ym(2025, 3);
        assert_eq!(policy.rate_at(start, ym(2025, 6)), dec!(0.05));
        assert_eq!(policy.rate_at(start, ym(2025, 7)), dec!(0.07));
        assert_eq!(policy.rate_at(start, ym(2026, 7)), dec!(0.09));
    }

    #[test]
    fn test_contribution_with_match() {
        let policy = ContributionPolicy::salary_deferral(dec!(0.10))
            .with_employer_match(dec!(0.5), dec!(0.06))
            .with_fixed_amount(dec!(100));
        let month = ym(2025, 1);
        let c = policy.contribution(month, month, dec!(10_000));
        assert_eq!(c.personal, dec!(1_100));
        assert_eq!(c.employer, dec!(300));
        assert_eq!(c.total(), dec!(1_400));
    }

    #[test]
    fn test_withdrawal_requests() {
        let ctx = MathContext::default();
        let pct = WithdrawalPolicy::PercentOfBalance { annual_rate: dec!(0.04) };
        assert_eq!(
            pct.requested(dec!(1_200_000), dec!(0), dec!(0), dec!(0), 0, &ctx).unwrap(),
            dec!(4_000)
        );

        let gap = WithdrawalPolicy::IncomeGap;
        assert_eq!(
            gap.requested(dec!(1_000), dec!(3_000), dec!(5_000), dec!(0), 0, &ctx).unwrap(),
            dec!(2_000)
        );
        assert_eq!(
            gap.requested(dec!(1_000), dec!(6_000), dec!(5_000), dec!(0), 0, &ctx).unwrap(),
            Decimal::ZERO
        );

        let fixed = WithdrawalPolicy::FixedAmount {
            monthly_amount: dec!(1_000),
            inflation_adjusted: true,
        };
        assert_eq!(
            fixed.requested(dec!(0), dec!(0), dec!(0), dec!(0.03), 2, &ctx).unwrap(),
            dec!(1_060.90)
        );
    }

    #[test]
    fn test_fill_to_bracket_only_in_december() {
        let plan = RothConversionPlan {
            from_account: AccountId::new("ira"),
            to_account: AccountId::new("roth"),
            strategy: RothConversionStrategy::FillToBracket {
                annual_ceiling: dec!(94_300),
            },
            start: ym(2030, 1),
            end: None,
        };
        assert_eq!(plan.requested(ym(2030, 6), dec!(40_000)), Decimal::ZERO);
        assert_eq!(plan.requested(ym(2030, 12), dec!(40_000)), dec!(54_300));
        assert_eq!(plan.requested(ym(2030, 12), dec!(100_000)), Decimal::ZERO);
        assert_eq!(plan.requested(ym(2029, 12), dec!(0)), Decimal::ZERO);
    }

    #[test]
    fn test_conversion_plan_validation() {
        let plan = RothConversionPlan {
            from_account: AccountId::new("ira"),
            to_account: AccountId::new("ira"),
            strategy: RothConversionStrategy::FixedMonthly { amount: dec!(1_000) },
            start: ym(2030, 1),
            end: None,
        };
        assert!(plan.validate().is_err());
    }
}
