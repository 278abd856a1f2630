//! Simulation configuration
//!
//! The main configuration type is `SimulationConfig`, which contains everything
//! needed to run a projection. It is plain serde data so scenarios can live in
//! files; `validate` checks every cross-field invariant before a run starts.
//!
//! # Builder DSL
//!
//! For a more ergonomic way to create simulations, use the builder DSL:
//!
//! ```ignore
//! use glidepath_core::config::SimulationBuilder;
//! use glidepath_core::model::*;
//!
//! let config = SimulationBuilder::new()
//!     .start(2025, 1)
//!     .end(2060, 12)
//!     .birth_date(1970, 6, 15)
//!     .retirement(2035, 7)
//!     .annual_return(dec!(0.07))
//!     .inflation(dec!(0.025))
//!     .account(Account::new("401k", TaxTreatment::TaxDeferred, dec!(350_000)))
//!     .account(Account::new("roth", TaxTreatment::TaxFree, dec!(80_000)))
//!     .income(IncomeStream::new("Salary", IncomeKind::Salary, dec!(9_000), ym))
//!     .contributions(
//!         ContributionPolicy::salary_deferral(dec!(0.10)),
//!         RoutingConfiguration::single_account("401k"),
//!     )
//!     .withdrawals(WithdrawalPolicy::IncomeGap, withdrawal_routing)
//!     .monthly_expenses(dec!(6_500))
//!     .build()?;
//! ```

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::date_math::{MonthRange, YearMonth, generate_months};
use crate::error::{Result, SimulationError};
use crate::model::{
    AccountId, ContributionPolicy, EarningsTestRule, IncomeStream, PersonProfile, Portfolio,
    RmdTable, RothConversionPlan, RoutingSchedule, SimulationLevers, TaxConfig, TaxTreatment,
    WithdrawalPolicy,
};
use crate::money::MathContext;

pub mod builder;

pub use builder::SimulationBuilder;

/// Complete simulation configuration
///
/// # Conceptual Organization
///
/// **World assumptions** (scenarios you might compare):
/// - `levers` - market returns and inflation
/// - `tax_config` - tax law assumptions
/// - `rmd_table` - required distribution divisors
///
/// **Your situation** (fixed facts):
/// - `person` - birth date and planned retirement
/// - `portfolio` - current balances
/// - `start` / `end` - the months to project
///
/// **Your plan** (structure with tunable values):
/// - `income` - salary, benefits and other income
/// - `contributions` / `withdrawals` with their routing
/// - `roth_conversion`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    // === World Assumptions ===
    pub levers: SimulationLevers,

    #[serde(default)]
    pub tax_config: TaxConfig,

    /// Required minimum distributions are skipped when absent
    #[serde(default)]
    pub rmd_table: Option<RmdTable>,

    #[serde(default)]
    pub math: MathContext,

    // === Your Situation ===
    pub person: PersonProfile,

    #[serde(default)]
    pub portfolio: Portfolio,

    /// First simulated month
    pub start: YearMonth,

    /// Last simulated month, inclusive
    pub end: YearMonth,

    // === Your Plan ===
    #[serde(default)]
    pub income: Vec<IncomeStream>,

    #[serde(default)]
    pub earnings_test: Option<EarningsTestRule>,

    /// Living expenses in start-month dollars
    #[serde(default)]
    pub monthly_expenses: Decimal,

    #[serde(default)]
    pub contributions: ContributionPolicy,

    /// Required whenever `contributions` can produce a non-zero amount
    #[serde(default)]
    pub contribution_routing: Option<RoutingSchedule>,

    #[serde(default)]
    pub withdrawals: WithdrawalPolicy,

    /// Required whenever `withdrawals` is not `None`
    #[serde(default)]
    pub withdrawal_routing: Option<RoutingSchedule>,

    #[serde(default)]
    pub roth_conversion: Option<RothConversionPlan>,
}

impl SimulationConfig {
    /// The simulated months
    pub fn months(&self) -> Result<MonthRange> {
        generate_months(self.start, self.end)
    }

    /// Check every invariant a run depends on.
    ///
    /// A config that passes cannot fail a run for configuration reasons;
    /// only calculation errors (e.g. a negative balance) remain possible.
    pub fn validate(&self) -> Result<()> {
        let months = self.months()?;
        self.person.validate()?;
        self.levers.validate(months.len())?;
        self.tax_config.validate()?;
        if let Some(table) = &self.rmd_table {
            table.validate()?;
        }
        if self.math.precision == 0 || self.math.precision > 28 {
            return Err(SimulationError::validation(
                "precision",
                format!("precision must be 1-28 digits, but was {}", self.math.precision),
            ));
        }

        self.validate_portfolio()?;

        for stream in &self.income {
            stream.validate()?;
        }
        if let Some(rule) = &self.earnings_test {
            rule.validate()?;
        }
        if self.monthly_expenses < Decimal::ZERO {
            return Err(SimulationError::validation(
                "monthly_expenses",
                format!("expenses must not be negative, but were {}", self.monthly_expenses),
            ));
        }

        self.contributions.validate()?;
        if self.contributions != ContributionPolicy::none() {
            let routing = self
                .contribution_routing
                .as_ref()
                .ok_or(SimulationError::missing("contribution_routing"))?;
            self.validate_routing_accounts(routing)?;
        }

        self.withdrawals.validate()?;
        if self.withdrawals != WithdrawalPolicy::None {
            let routing = self
                .withdrawal_routing
                .as_ref()
                .ok_or(SimulationError::missing("withdrawal_routing"))?;
            self.validate_routing_accounts(routing)?;
        }

        if let Some(plan) = &self.roth_conversion {
            plan.validate()?;
            self.expect_treatment(&plan.from_account, TaxTreatment::TaxDeferred, "from_account")?;
            self.expect_treatment(&plan.to_account, TaxTreatment::TaxFree, "to_account")?;
        }
        Ok(())
    }

    fn validate_portfolio(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for account in &self.portfolio.accounts {
            if !seen.insert(&account.id) {
                return Err(SimulationError::validation(
                    "accounts",
                    format!("account id '{}' is used more than once", account.id),
                ));
            }
            if account.balance < Decimal::ZERO {
                return Err(SimulationError::validation(
                    "balance",
                    format!(
                        "account '{}' starts with negative balance {}",
                        account.id, account.balance
                    ),
                ));
            }
        }
        Ok(())
    }

    fn validate_routing_accounts(&self, schedule: &RoutingSchedule) -> Result<()> {
        for id in schedule.configurations().flat_map(|r| r.account_ids()) {
            if !self.portfolio.contains(id) {
                return Err(SimulationError::validation(
                    "account_id",
                    format!("routing refers to unknown account '{id}'"),
                ));
            }
        }
        Ok(())
    }

    fn expect_treatment(
        &self,
        id: &AccountId,
        treatment: TaxTreatment,
        field: &'static str,
    ) -> Result<()> {
        match self.portfolio.account(id) {
            Some(account) if account.tax_treatment == treatment => Ok(()),
            Some(account) => Err(SimulationError::validation(
                field,
                format!(
                    "account '{id}' is {:?}, expected {treatment:?}",
                    account.tax_treatment
                ),
            )),
            None => Err(SimulationError::validation(
                field,
                format!("no account with id '{id}'"),
            )),
        }
    }

    // === Scenario Variants ===

    /// Create a variant with a different retirement month
    #[must_use]
    pub fn with_retirement(&self, planned_retirement: YearMonth) -> Self {
        let mut config = self.clone();
        config.person.planned_retirement = planned_retirement;
        config
    }

    /// Create a variant with different market levers
    #[must_use]
    pub fn with_levers(&self, levers: SimulationLevers) -> Self {
        let mut config = self.clone();
        config.levers = levers;
        config
    }

    /// Age at the first simulated month
    #[must_use]
    pub fn initial_age(&self) -> u8 {
        self.person.age_in(self.start)
    }
}
