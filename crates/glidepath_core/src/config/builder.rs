//! Simulation Builder
//!
//! The SimulationBuilder provides a fluent API for assembling a
//! [`SimulationConfig`]. Nothing is checked until `build`, which reports the
//! first missing or invalid field and never returns a half-valid config.
//!
//! # Example
//!
//! ```ignore
//! use glidepath_core::config::SimulationBuilder;
//!
//! let config = SimulationBuilder::new()
//!     .start(2025, 1)
//!     .end(2027, 12)
//!     .birth_date(1980, 6, 15)
//!     .retirement(2045, 7)
//!     .annual_return(dec!(0.07))
//!     .build()?;
//! ```

use jiff::civil::Date;
use rust_decimal::Decimal;

use super::SimulationConfig;
use crate::date_math::YearMonth;
use crate::error::{Result, SimulationError};
use crate::model::{
    Account, ContributionPolicy, EarningsTestRule, IncomeStream, PersonProfile, Portfolio,
    RmdTable, RothConversionPlan, RoutingConfiguration, RoutingSchedule, SimulationLevers,
    TaxConfig, WithdrawalPolicy,
};
use crate::money::MathContext;

/// Builder for [`SimulationConfig`]
#[derive(Debug, Clone, Default)]
pub struct SimulationBuilder {
    start: Option<(i16, i8)>,
    end: Option<(i16, i8)>,
    name: String,
    birth_date: Option<Date>,
    retirement: Option<(i16, i8)>,
    person: Option<PersonProfile>,
    levers: Option<SimulationLevers>,
    inflation: Option<Decimal>,
    tax_config: Option<TaxConfig>,
    rmd_table: Option<RmdTable>,
    math: MathContext,
    accounts: Vec<Account>,
    income: Vec<IncomeStream>,
    earnings_test: Option<EarningsTestRule>,
    monthly_expenses: Decimal,
    contributions: ContributionPolicy,
    contribution_routing: Option<RoutingSchedule>,
    contribution_routing_changes: Vec<((i16, i8), RoutingConfiguration)>,
    withdrawals: WithdrawalPolicy,
    withdrawal_routing: Option<RoutingSchedule>,
    withdrawal_routing_changes: Vec<((i16, i8), RoutingConfiguration)>,
    roth_conversion: Option<RothConversionPlan>,
}

impl SimulationBuilder {
    /// Create a new simulation builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Time range
    // =========================================================================

    /// First simulated month
    #[must_use]
    pub fn start(mut self, year: i16, month: i8) -> Self {
        self.start = Some((year, month));
        self
    }

    /// Last simulated month, inclusive
    #[must_use]
    pub fn end(mut self, year: i16, month: i8) -> Self {
        self.end = Some((year, month));
        self
    }

    // =========================================================================
    // Person
    // =========================================================================

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the birth date for age-based calculations
    #[must_use]
    pub fn birth_date(mut self, year: i16, month: i8, day: i8) -> Self {
        self.birth_date = Some(jiff::civil::date(year, month, day));
        self
    }

    /// First month of the distribution phase
    #[must_use]
    pub fn retirement(mut self, year: i16, month: i8) -> Self {
        self.retirement = Some((year, month));
        self
    }

    /// Use a ready-made profile instead of `birth_date` and `retirement`
    #[must_use]
    pub fn person(mut self, person: PersonProfile) -> Self {
        self.person = Some(person);
        self
    }

    // =========================================================================
    // World assumptions
    // =========================================================================

    #[must_use]
    pub fn levers(mut self, levers: SimulationLevers) -> Self {
        self.levers = Some(levers);
        self
    }

    /// Deterministic mode with a fixed annual return
    #[must_use]
    pub fn annual_return(self, rate: Decimal) -> Self {
        self.levers(SimulationLevers::deterministic(rate))
    }

    /// Annual inflation; overrides whatever the levers carry
    #[must_use]
    pub fn inflation(mut self, rate: Decimal) -> Self {
        self.inflation = Some(rate);
        self
    }

    #[must_use]
    pub fn tax_config(mut self, config: TaxConfig) -> Self {
        self.tax_config = Some(config);
        self
    }

    #[must_use]
    pub fn rmd_table(mut self, table: RmdTable) -> Self {
        self.rmd_table = Some(table);
        self
    }

    #[must_use]
    pub fn math_context(mut self, math: MathContext) -> Self {
        self.math = math;
        self
    }

    // =========================================================================
    // Accounts and plan
    // =========================================================================

    #[must_use]
    pub fn account(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }

    #[must_use]
    pub fn income(mut self, stream: IncomeStream) -> Self {
        self.income.push(stream);
        self
    }

    #[must_use]
    pub fn earnings_test(mut self, rule: EarningsTestRule) -> Self {
        self.earnings_test = Some(rule);
        self
    }

    #[must_use]
    pub fn monthly_expenses(mut self, amount: Decimal) -> Self {
        self.monthly_expenses = amount;
        self
    }

    #[must_use]
    pub fn contributions(
        mut self,
        policy: ContributionPolicy,
        routing: impl Into<RoutingSchedule>,
    ) -> Self {
        self.contributions = policy;
        self.contribution_routing = Some(routing.into());
        self
    }

    /// Re-route contributions from the given month onward
    #[must_use]
    pub fn contribution_routing_from(
        mut self,
        year: i16,
        month: i8,
        routing: RoutingConfiguration,
    ) -> Self {
        self.contribution_routing_changes
            .push(((year, month), routing));
        self
    }

    #[must_use]
    pub fn withdrawals(
        mut self,
        policy: WithdrawalPolicy,
        routing: impl Into<RoutingSchedule>,
    ) -> Self {
        self.withdrawals = policy;
        self.withdrawal_routing = Some(routing.into());
        self
    }

    /// Re-route withdrawals from the given month onward
    #[must_use]
    pub fn withdrawal_routing_from(
        mut self,
        year: i16,
        month: i8,
        routing: RoutingConfiguration,
    ) -> Self {
        self.withdrawal_routing_changes.push(((year, month), routing));
        self
    }

    #[must_use]
    pub fn roth_conversion(mut self, plan: RothConversionPlan) -> Self {
        self.roth_conversion = Some(plan);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Resolve and validate the configuration
    pub fn build(self) -> Result<SimulationConfig> {
        let (start_year, start_month) = self.start.ok_or(SimulationError::missing("start"))?;
        let (end_year, end_month) = self.end.ok_or(SimulationError::missing("end"))?;
        let start = YearMonth::new(start_year, start_month)?;
        let end = YearMonth::new(end_year, end_month)?;

        let person = match self.person {
            Some(person) => person,
            None => {
                let birth_date = self
                    .birth_date
                    .ok_or(SimulationError::missing("birth_date"))?;
                let (year, month) = self
                    .retirement
                    .ok_or(SimulationError::missing("retirement"))?;
                PersonProfile::new(self.name, birth_date, YearMonth::new(year, month)?)?
            }
        };

        let mut levers = self.levers.ok_or(SimulationError::missing("levers"))?;
        if let Some(rate) = self.inflation {
            levers.inflation_rate = rate;
        }

        let contribution_routing =
            with_changes(self.contribution_routing, self.contribution_routing_changes)?;
        let withdrawal_routing =
            with_changes(self.withdrawal_routing, self.withdrawal_routing_changes)?;

        let config = SimulationConfig {
            levers,
            tax_config: self.tax_config.unwrap_or_default(),
            rmd_table: self.rmd_table,
            math: self.math,
            person,
            portfolio: Portfolio::new(self.accounts),
            start,
            end,
            income: self.income,
            earnings_test: self.earnings_test,
            monthly_expenses: self.monthly_expenses,
            contributions: self.contributions,
            contribution_routing,
            withdrawals: self.withdrawals,
            withdrawal_routing,
            roth_conversion: self.roth_conversion,
        };
        config.validate()?;
        Ok(config)
    }
}

fn with_changes(
    schedule: Option<RoutingSchedule>,
    changes: Vec<((i16, i8), RoutingConfiguration)>,
) -> Result<Option<RoutingSchedule>> {
    if changes.is_empty() {
        return Ok(schedule);
    }
    let mut schedule = schedule.ok_or(SimulationError::missing("routing"))?;
    for ((year, month), routing) in changes {
        schedule = schedule.change_at(YearMonth::new(year, month)?, routing);
    }
    Ok(Some(schedule))
}
