//! Federal income tax for a simulated month
//!
//! Brackets are annual. A month's tax is the marginal tax on that month's
//! income stacked on top of the year's taxable income so far, so twelve
//! months of the same income add up to the annual liability.

use rust_decimal::Decimal;

use crate::model::{TaxBracket, TaxConfig, TaxSummary};
use crate::money::round_money;

/// Calculate federal income tax using progressive brackets.
/// Returns the total tax owed on the given annual income.
#[must_use]
pub fn calculate_federal_tax(income: Decimal, brackets: &[TaxBracket]) -> Decimal {
    if income <= Decimal::ZERO || brackets.is_empty() {
        return Decimal::ZERO;
    }

    let mut tax = Decimal::ZERO;
    for (i, bracket) in brackets.iter().enumerate() {
        if income <= bracket.threshold {
            break;
        }
        let top = brackets
            .get(i + 1)
            .map_or(income, |next| income.min(next.threshold));
        tax += (top - bracket.threshold).max(Decimal::ZERO) * bracket.rate;
    }
    tax
}

/// Tax on `additional_income` given `ytd_income` already taxed this year
#[must_use]
pub fn calculate_federal_marginal_tax(
    additional_income: Decimal,
    ytd_income: Decimal,
    brackets: &[TaxBracket],
) -> Decimal {
    if additional_income <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let ytd_income = ytd_income.max(Decimal::ZERO);
    calculate_federal_tax(ytd_income + additional_income, brackets)
        - calculate_federal_tax(ytd_income, brackets)
}

/// Rate applied to the next dollar above `income`
#[must_use]
pub fn marginal_rate(income: Decimal, brackets: &[TaxBracket]) -> Decimal {
    brackets
        .iter()
        .take_while(|b| b.threshold <= income.max(Decimal::ZERO))
        .last()
        .map_or(Decimal::ZERO, |b| b.rate)
}

/// One month's taxable events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaxInputs {
    pub taxable_withdrawals: Decimal,
    pub tax_free_withdrawals: Decimal,
    /// Gross benefit; the taxable fraction is applied by the calculator
    pub social_security: Decimal,
    /// Salary net of pre-tax deferrals, pension, annuity and other income
    pub other_taxable_income: Decimal,
    pub roth_conversion: Decimal,
    /// Ordinary taxable income earlier in the same calendar year
    pub ytd_taxable_income: Decimal,
}

/// Applies a [`TaxConfig`] to monthly inputs
#[derive(Debug, Clone, Copy)]
pub struct TaxCalculator<'a> {
    config: &'a TaxConfig,
}

impl<'a> TaxCalculator<'a> {
    #[must_use]
    pub fn new(config: &'a TaxConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn taxable_social_security(&self, benefit: Decimal) -> Decimal {
        round_money(benefit * self.config.social_security_taxable_fraction)
    }

    /// Build the month's [`TaxSummary`].
    ///
    /// A Roth conversion is stacked on top of ordinary income and its tax is
    /// reported separately from the ordinary liability.
    #[must_use]
    pub fn summarize(&self, inputs: &TaxInputs) -> TaxSummary {
        let brackets = &self.config.federal_brackets;
        let taxable_social_security = self.taxable_social_security(inputs.social_security);
        let ordinary = (inputs.taxable_withdrawals
            + taxable_social_security
            + inputs.other_taxable_income)
            .max(Decimal::ZERO);

        let ytd = inputs.ytd_taxable_income.max(Decimal::ZERO);
        let liability = round_money(calculate_federal_marginal_tax(ordinary, ytd, brackets));
        let conversion_tax = round_money(calculate_federal_marginal_tax(
            inputs.roth_conversion,
            ytd + ordinary,
            brackets,
        ));
        let rate = marginal_rate(ytd + ordinary + inputs.roth_conversion, brackets);

        TaxSummary::builder()
            .taxable_withdrawals(inputs.taxable_withdrawals)
            .tax_free_withdrawals(inputs.tax_free_withdrawals)
            .taxable_social_security(taxable_social_security)
            .other_taxable_income(inputs.other_taxable_income)
            .federal_tax_liability(liability)
            .marginal_tax_rate(rate)
            .roth_conversion(inputs.roth_conversion, conversion_tax)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_tax_config() -> TaxConfig {
        TaxConfig {
            federal_brackets: vec![
                TaxBracket::new(dec!(0), dec!(0.10)),
                TaxBracket::new(dec!(10_000), dec!(0.20)),
                TaxBracket::new(dec!(50_000), dec!(0.30)),
            ],
            social_security_taxable_fraction: dec!(0.85),
        }
    }

    #[test]
    fn test_federal_tax_first_bracket() {
        let config = test_tax_config();
        assert_eq!(calculate_federal_tax(dec!(5_000), &config.federal_brackets), dec!(500));
        assert_eq!(calculate_federal_tax(dec!(0), &config.federal_brackets), Decimal::ZERO);
    }

    #[test]
    fn test_federal_tax_multiple_brackets() {
        let config = test_tax_config();
        // 10% of 10k + 20% of 40k + 30% of 10k
        assert_eq!(
            calculate_federal_tax(dec!(60_000), &config.federal_brackets),
            dec!(12_000)
        );
    }

    #[test]
    fn test_marginal_tax_crosses_bracket() {
        let config = test_tax_config();
        // 2k at 10%, then 3k at 20%
        assert_eq!(
            calculate_federal_marginal_tax(dec!(5_000), dec!(8_000), &config.federal_brackets),
            dec!(800)
        );
    }

    #[test]
    fn test_marginal_rate() {
        let config = test_tax_config();
        assert_eq!(marginal_rate(dec!(0), &config.federal_brackets), dec!(0.10));
        assert_eq!(marginal_rate(dec!(10_000), &config.federal_brackets), dec!(0.20));
        assert_eq!(marginal_rate(dec!(75_000), &config.federal_brackets), dec!(0.30));
        assert_eq!(marginal_rate(dec!(75_000), &[]), Decimal::ZERO);
    }

    #[test]
    fn test_summary_excludes_tax_free_withdrawals() {
        let config = test_tax_config();
        let summary = TaxCalculator::new(&config).summarize(&TaxInputs {
            taxable_withdrawals: dec!(3_000),
            tax_free_withdrawals: dec!(2_000),
            social_security: dec!(2_000),
            ..TaxInputs::default()
        });
        assert_eq!(summary.taxable_social_security(), dec!(1_700));
        assert_eq!(summary.taxable_income(), dec!(4_700));
        assert_eq!(summary.federal_tax_liability(), dec!(470));
        assert_eq!(summary.effective_tax_rate(), dec!(0.1));
        assert_eq!(summary.total_withdrawals(), dec!(5_000));
    }

    #[test]
    fn test_summary_stacks_on_ytd_income() {
        let config = test_tax_config();
        let summary = TaxCalculator::new(&config).summarize(&TaxInputs {
            other_taxable_income: dec!(5_000),
            ytd_taxable_income: dec!(48_000),
            ..TaxInputs::default()
        });
        // 2k at 20%, 3k at 30%
        assert_eq!(summary.federal_tax_liability(), dec!(1_300));
        assert_eq!(summary.marginal_tax_rate(), dec!(0.30));
    }

    #[test]
    fn test_roth_conversion_taxed_separately() {
        let config = test_tax_config();
        let summary = TaxCalculator::new(&config).summarize(&TaxInputs {
            other_taxable_income: dec!(5_000),
            roth_conversion: dec!(10_000),
            ..TaxInputs::default()
        });
        assert_eq!(summary.federal_tax_liability(), dec!(500));
        // 5k at 10%, 5k at 20%
        assert_eq!(summary.roth_conversion_tax(), dec!(1_500));
        assert_eq!(summary.total_tax(), dec!(2_000));
        assert_eq!(summary.taxable_income(), dec!(5_000));
    }

    #[test]
    fn test_no_income_no_tax() {
        let config = test_tax_config();
        let summary = TaxCalculator::new(&config).summarize(&TaxInputs::default());
        assert_eq!(summary, TaxSummary::builder().marginal_tax_rate(dec!(0.10)).build());
        assert_eq!(summary.effective_tax_rate(), Decimal::ZERO);
    }
}
