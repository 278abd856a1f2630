//! Tax tables and the per-month tax summary

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// Lower bound of a marginal bracket (annual income) and the rate above it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub threshold: Decimal,
    pub rate: Decimal,
}

impl TaxBracket {
    #[must_use]
    pub const fn new(threshold: Decimal, rate: Decimal) -> Self {
        Self { threshold, rate }
    }
}

/// Tax law assumptions supplied as data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxConfig {
    /// Annual federal brackets, ascending by threshold
    pub federal_brackets: Vec<TaxBracket>,
    /// Fraction of Social Security benefits counted as taxable income
    #[serde(default = "default_social_security_taxable_fraction")]
    pub social_security_taxable_fraction: Decimal,
}

fn default_social_security_taxable_fraction() -> Decimal {
    dec!(0.85)
}

impl Default for TaxConfig {
    /// 2024 US single-filer brackets
    fn default() -> Self {
        Self {
            federal_brackets: vec![
                TaxBracket::new(dec!(0), dec!(0.10)),
                TaxBracket::new(dec!(11_600), dec!(0.12)),
                TaxBracket::new(dec!(47_150), dec!(0.22)),
                TaxBracket::new(dec!(100_525), dec!(0.24)),
                TaxBracket::new(dec!(191_950), dec!(0.32)),
                TaxBracket::new(dec!(243_725), dec!(0.35)),
                TaxBracket::new(dec!(609_350), dec!(0.37)),
            ],
            social_security_taxable_fraction: default_social_security_taxable_fraction(),
        }
    }
}

impl TaxConfig {
    /// No income tax at all; useful for isolating growth in tests
    #[must_use]
    pub fn none() -> Self {
        Self {
            federal_brackets: Vec::new(),
            social_security_taxable_fraction: Decimal::ZERO,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for pair in self.federal_brackets.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(SimulationError::validation(
                    "federal_brackets",
                    format!(
                        "bracket thresholds must be ascending, but {} follows {}",
                        pair[1].threshold, pair[0].threshold
                    ),
                ));
            }
        }
        if let Some(bracket) = self
            .federal_brackets
            .iter()
            .find(|b| b.rate < Decimal::ZERO || b.rate > Decimal::ONE)
        {
            return Err(SimulationError::validation(
                "federal_brackets",
                format!("bracket rate must be between 0 and 1, but was {}", bracket.rate),
            ));
        }
        let fraction = self.social_security_taxable_fraction;
        if fraction < Decimal::ZERO || fraction > Decimal::ONE {
            return Err(SimulationError::validation(
                "social_security_taxable_fraction",
                format!("fraction must be between 0 and 1, but was {fraction}"),
            ));
        }
        Ok(())
    }
}

/// Tax picture for one month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxSummary {
    taxable_withdrawals: Decimal,
    tax_free_withdrawals: Decimal,
    taxable_social_security: Decimal,
    other_taxable_income: Decimal,
    taxable_income: Decimal,
    federal_tax_liability: Decimal,
    effective_tax_rate: Decimal,
    marginal_tax_rate: Decimal,
    roth_conversion_amount: Decimal,
    roth_conversion_tax: Decimal,
}

impl TaxSummary {
    /// All-zero summary
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> TaxSummaryBuilder {
        TaxSummaryBuilder::default()
    }

    #[must_use]
    pub fn taxable_withdrawals(&self) -> Decimal {
        self.taxable_withdrawals
    }

    #[must_use]
    pub fn tax_free_withdrawals(&self) -> Decimal {
        self.tax_free_withdrawals
    }

    #[must_use]
    pub fn total_withdrawals(&self) -> Decimal {
        self.taxable_withdrawals + self.tax_free_withdrawals
    }

    #[must_use]
    pub fn taxable_social_security(&self) -> Decimal {
        self.taxable_social_security
    }

    #[must_use]
    pub fn other_taxable_income(&self) -> Decimal {
        self.other_taxable_income
    }

    /// Ordinary taxable income, excluding any Roth conversion
    #[must_use]
    pub fn taxable_income(&self) -> Decimal {
        self.taxable_income
    }

    #[must_use]
    pub fn federal_tax_liability(&self) -> Decimal {
        self.federal_tax_liability
    }

    /// Liability divided by taxable income; zero when there is no taxable income
    #[must_use]
    pub fn effective_tax_rate(&self) -> Decimal {
        self.effective_tax_rate
    }

    #[must_use]
    pub fn marginal_tax_rate(&self) -> Decimal {
        self.marginal_tax_rate
    }

    #[must_use]
    pub fn roth_conversion_amount(&self) -> Decimal {
        self.roth_conversion_amount
    }

    #[must_use]
    pub fn roth_conversion_tax(&self) -> Decimal {
        self.roth_conversion_tax
    }

    /// Ordinary liability plus conversion tax
    #[must_use]
    pub fn total_tax(&self) -> Decimal {
        self.federal_tax_liability + self.roth_conversion_tax
    }
}

/// Assembles a [`TaxSummary`], deriving taxable income and effective rate
#[derive(Debug, Clone, Default)]
pub struct TaxSummaryBuilder {
    summary: TaxSummary,
}

impl TaxSummaryBuilder {
    #[must_use]
    pub fn taxable_withdrawals(mut self, amount: Decimal) -> Self {
        self.summary.taxable_withdrawals = amount;
        self
    }

    #[must_use]
    pub fn tax_free_withdrawals(mut self, amount: Decimal) -> Self {
        self.summary.tax_free_withdrawals = amount;
        self
    }

    #[must_use]
    pub fn taxable_social_security(mut self, amount: Decimal) -> Self {
        self.summary.taxable_social_security = amount;
        self
    }

    #[must_use]
    pub fn other_taxable_income(mut self, amount: Decimal) -> Self {
        self.summary.other_taxable_income = amount;
        self
    }

    #[must_use]
    pub fn federal_tax_liability(mut self, amount: Decimal) -> Self {
        self.summary.federal_tax_liability = amount;
        self
    }

    #[must_use]
    pub fn marginal_tax_rate(mut self, rate: Decimal) -> Self {
        self.summary.marginal_tax_rate = rate;
        self
    }

    #[must_use]
    pub fn roth_conversion(mut self, amount: Decimal, tax: Decimal) -> Self {
        self.summary.roth_conversion_amount = amount;
        self.summary.roth_conversion_tax = tax;
        self
    }

    #[must_use]
    pub fn build(self) -> TaxSummary {
        let mut summary = self.summary;
        summary.taxable_income = (summary.taxable_withdrawals
            + summary.taxable_social_security
            + summary.other_taxable_income)
            .max(Decimal::ZERO);
        summary.effective_tax_rate = if summary.taxable_income.is_zero() {
            Decimal::ZERO
        } else {
            (summary.federal_tax_liability / summary.taxable_income).round_dp(6)
        };
        summary
    }
}
