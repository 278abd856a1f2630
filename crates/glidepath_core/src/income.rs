//! Monthly income from every configured source
//!
//! Each source is evaluated on its own through the [`IncomeSource`] contract;
//! the calculator only sums the results by category. Benefit reductions for
//! working beneficiaries are an injected [`EarningsTest`], never hard-coded.

use rust_decimal::Decimal;

use crate::date_math::YearMonth;
use crate::error::Result;
use crate::model::{EarningsTestRule, IncomeKind, IncomeStream, MonthlyIncome, SignificantEvent};
use crate::money::{MathContext, apply_inflation, round_money};

/// Anything that pays a monthly amount over an active window
pub trait IncomeSource {
    fn name(&self) -> &str;

    fn kind(&self) -> IncomeKind;

    fn is_active(&self, month: YearMonth) -> bool;

    /// Amount paid in `month`; zero outside the active window
    fn monthly_income(&self, month: YearMonth, ctx: &MathContext) -> Result<Decimal>;

    /// Wages and self-employment income, as opposed to benefits
    fn is_earned_income(&self) -> bool;

    fn starts_in(&self, month: YearMonth) -> bool;

    fn ends_in(&self, month: YearMonth) -> bool;
}

impl IncomeSource for IncomeStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IncomeKind {
        self.kind
    }

    fn is_active(&self, month: YearMonth) -> bool {
        month >= self.start && self.end.is_none_or(|end| month <= end)
    }

    fn monthly_income(&self, month: YearMonth, ctx: &MathContext) -> Result<Decimal> {
        if !self.is_active(month) {
            return Ok(Decimal::ZERO);
        }
        let years = self.start.whole_years_until(month);
        apply_inflation(
            self.monthly_amount,
            self.annual_adjustment,
            Decimal::from(years),
            ctx,
        )
    }

    fn is_earned_income(&self) -> bool {
        self.earned
    }

    fn starts_in(&self, month: YearMonth) -> bool {
        self.start == month
    }

    fn ends_in(&self, month: YearMonth) -> bool {
        self.end == Some(month)
    }
}

/// Reduces Social Security benefits while the beneficiary still has earnings
pub trait EarningsTest {
    /// Monthly amount withheld from `benefit` given annualized earned income
    fn monthly_reduction(&self, benefit: Decimal, annual_earned_income: Decimal) -> Decimal;
}

impl EarningsTest for EarningsTestRule {
    fn monthly_reduction(&self, benefit: Decimal, annual_earned_income: Decimal) -> Decimal {
        match *self {
            EarningsTestRule::Threshold {
                annual_exempt_amount,
                reduction_rate,
            } => {
                let excess = annual_earned_income - annual_exempt_amount;
                if excess <= Decimal::ZERO {
                    return Decimal::ZERO;
                }
                round_money(excess * reduction_rate / Decimal::from(12)).min(benefit)
            }
        }
    }
}

/// Sums a set of income sources into a [`MonthlyIncome`]
pub struct IncomeCalculator<'a, S: IncomeSource = IncomeStream> {
    sources: &'a [S],
    earnings_test: Option<&'a dyn EarningsTest>,
}

impl<'a, S: IncomeSource> IncomeCalculator<'a, S> {
    #[must_use]
    pub fn new(sources: &'a [S]) -> Self {
        Self {
            sources,
            earnings_test: None,
        }
    }

    #[must_use]
    pub fn with_earnings_test(mut self, test: &'a dyn EarningsTest) -> Self {
        self.earnings_test = Some(test);
        self
    }

    /// Income received in `month`
    pub fn calculate(&self, month: YearMonth, ctx: &MathContext) -> Result<MonthlyIncome> {
        let mut income = MonthlyIncome::zero();
        let mut earned = Decimal::ZERO;
        for source in self.sources {
            let amount = source.monthly_income(month, ctx)?;
            if amount.is_zero() {
                continue;
            }
            if source.is_earned_income() {
                earned += amount;
            }
            income = income.with_added(source.kind(), amount);
        }

        if let Some(test) = self.earnings_test
            && earned > Decimal::ZERO
            && income.social_security() > Decimal::ZERO
        {
            let withheld =
                test.monthly_reduction(income.social_security(), earned * Decimal::from(12));
            income = income.with_added(IncomeKind::SocialSecurity, -withheld);
        }
        Ok(income)
    }

    /// Sources starting or ending in `month`
    pub fn transitions(&self, month: YearMonth) -> Vec<SignificantEvent> {
        let mut events = Vec::new();
        for source in self.sources {
            if source.starts_in(month) {
                events.push(SignificantEvent::IncomeStarted {
                    name: source.name().to_string(),
                });
            }
            if source.ends_in(month) {
                events.push(SignificantEvent::IncomeEnded {
                    name: source.name().to_string(),
                });
            }
        }
        events
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
    fn test_source_window() {
        let ctx = MathContext::default();
        let pension = IncomeStream::new("Pension", IncomeKind::Pension, dec!(2_000), ym(2030, 1))
            .until(ym(2030, 12));
        assert_eq!(pension.monthly_income(ym(2029, 12), &ctx).unwrap(), Decimal::ZERO);
        assert_eq!(pension.monthly_income(ym(2030, 1), &ctx).unwrap(), dec!(2_000));
        assert_eq!(pension.monthly_income(ym(2030, 12), &ctx).unwrap(), dec!(2_000));
        assert_eq!(pension.monthly_income(ym(2031, 1), &ctx).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_cola_steps_on_anniversary() {
        let ctx = MathContext::default();
        let ss = IncomeStream::new("SS", IncomeKind::SocialSecurity, dec!(2_000), ym(2030, 7))
            .adjusted_by(dec!(0.03));
        assert_eq!(ss.monthly_income(ym(2031, 6), &ctx).unwrap(), dec!(2_000));
        assert_eq!(ss.monthly_income(ym(2031, 7), &ctx).unwrap(), dec!(2_060));
        assert_eq!(ss.monthly_income(ym(2032, 7), &ctx).unwrap(), dec!(2_121.80));
    }

    #[test]
    fn test_calculator_sums_by_kind() {
        let ctx = MathContext::default();
        let sources = vec![
            IncomeStream::new("Job", IncomeKind::Salary, dec!(8_000), ym(2025, 1)).until(ym(2029, 12)),
            IncomeStream::new("Rent", IncomeKind::Other, dec!(500), ym(2025, 1)),
            IncomeStream::new("Pension", IncomeKind::Pension, dec!(1_000), ym(2030, 1)),
        ];
        let calc = IncomeCalculator::new(&sources);

        let working = calc.calculate(ym(2026, 3), &ctx).unwrap();
        assert_eq!(working.salary(), dec!(8_000));
        assert_eq!(working.total(), dec!(8_500));
        assert!(!working.has_retirement_income());

        let retired = calc.calculate(ym(2030, 3), &ctx).unwrap();
        assert_eq!(retired.salary(), Decimal::ZERO);
        assert_eq!(retired.total(), dec!(1_500));
        assert!(retired.has_retirement_income());

        let events = calc.transitions(ym(2029, 12));
        assert_eq!(events, vec![SignificantEvent::IncomeEnded { name: "Job".into() }]);
    }

    #[test]
    fn test_earnings_test_reduces_benefit() {
        let ctx = MathContext::default();
        let sources = vec![
            IncomeStream::new("Job", IncomeKind::Salary, dec!(4_000), ym(2025, 1)),
            IncomeStream::new("SS", IncomeKind::SocialSecurity, dec!(2_000), ym(2025, 1)),
        ];
        let rule = EarningsTestRule::Threshold {
            annual_exempt_amount: dec!(22_320),
            reduction_rate: dec!(0.5),
        };
        let calc = IncomeCalculator::new(&sources).with_earnings_test(&rule);
        let income = calc.calculate(ym(2025, 6), &ctx).unwrap();
        // (48,000 - 22,320) / 2 / 12
        assert_eq!(income.social_security(), dec!(930));
        assert_eq!(income.salary(), dec!(4_000));
    }

    #[test]
    fn test_earnings_test_caps_at_benefit() {
        let rule = EarningsTestRule::Threshold {
            annual_exempt_amount: dec!(0),
            reduction_rate: dec!(1),
        };
        assert_eq!(rule.monthly_reduction(dec!(500), dec!(120_000)), dec!(500));
        assert_eq!(rule.monthly_reduction(dec!(500), dec!(0)), Decimal::ZERO);
    }
}
