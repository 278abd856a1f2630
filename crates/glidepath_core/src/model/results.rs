//! Simulation results and snapshots
//!
//! Contains the output types from running simulations: one snapshot per
//! simulated month, the time series that holds them, annual roll-ups and
//! Monte Carlo batch statistics.

use std::ops::Range;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::accounts::AccountBalance;
use super::income::MonthlyIncome;
use super::profiles::SimulationPhase;
use super::routing::Disbursement;
use super::tax_config::TaxSummary;
use crate::date_math::YearMonth;

/// Noteworthy things that happened in a month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignificantEvent {
    RetirementStarted,
    IncomeStarted { name: String },
    IncomeEnded { name: String },
    ContributionRateIncreased { rate: Decimal },
    RothConversion { amount: Decimal },
    RequiredDistribution { amount: Decimal },
    WithdrawalShortfall { amount: Decimal },
    PortfolioDepleted,
}

/// State of the plan for one simulated month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySnapshot {
    pub month: YearMonth,
    pub phase: SimulationPhase,
    /// Total balance before this month's flows and growth
    pub starting_balance: Decimal,
    /// Total balance after flows and growth
    pub ending_balance: Decimal,
    pub balances: Vec<AccountBalance>,
    pub income: MonthlyIncome,
    pub expenses: Decimal,
    pub tax: TaxSummary,
    /// Personal plus employer contributions
    pub contributions: Decimal,
    pub employer_contributions: Decimal,
    /// Amount actually withdrawn, including any required distribution
    pub withdrawals: Decimal,
    /// Requested withdrawal the portfolio could not fund
    pub shortfall: Decimal,
    pub monthly_return_rate: Decimal,
    /// Change in value from this month's return
    pub investment_return: Decimal,
    pub contribution_flows: Vec<Disbursement>,
    pub withdrawal_flows: Vec<Disbursement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SignificantEvent>,
}

impl MonthlySnapshot {
    #[must_use]
    pub fn year(&self) -> i16 {
        self.month.year()
    }

    /// Contributions minus withdrawals
    #[must_use]
    pub fn net_flow(&self) -> Decimal {
        self.contributions - self.withdrawals
    }

    #[must_use]
    pub fn had_shortfall(&self) -> bool {
        self.shortfall > Decimal::ZERO
    }
}

/// Append-only sequence of values in month order.
///
/// Only the engine appends; callers get read access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeries<T> {
    items: Vec<T>,
}

impl<T> Default for TimeSeries<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> TimeSeries<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, item: T) {
        self.items.push(item);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Entries in `range`, clamped to the series bounds
    #[must_use]
    pub fn window(&self, range: Range<usize>) -> &[T] {
        let end = range.end.min(self.items.len());
        let start = range.start.min(end);
        &self.items[start..end]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<'a, T> IntoIterator for &'a TimeSeries<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl TimeSeries<MonthlySnapshot> {
    /// Ending balance of the last month, zero for an empty series
    #[must_use]
    pub fn final_balance(&self) -> Decimal {
        self.last().map_or(Decimal::ZERO, |s| s.ending_balance)
    }

    #[must_use]
    pub fn had_shortfall(&self) -> bool {
        self.iter().any(MonthlySnapshot::had_shortfall)
    }

    /// Snapshots belonging to calendar `year`
    #[must_use]
    pub fn year(&self, year: i16) -> &[MonthlySnapshot] {
        let start = self.items.partition_point(|s| s.year() < year);
        let end = self.items.partition_point(|s| s.year() <= year);
        self.window(start..end)
    }

    pub fn events(&self) -> impl Iterator<Item = (YearMonth, &SignificantEvent)> {
        self.iter()
            .flat_map(|s| s.events.iter().map(move |e| (s.month, e)))
    }
}

/// A calendar year's snapshots folded into totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualSummary {
    pub year: i16,
    /// Simulated months in this year (fewer than 12 for partial years)
    pub months: usize,
    pub starting_balance: Decimal,
    pub ending_balance: Decimal,
    pub total_contributions: Decimal,
    pub total_withdrawals: Decimal,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub total_taxes: Decimal,
    pub total_shortfall: Decimal,
    /// Growth net of contributions and withdrawals
    pub annual_return: Decimal,
    /// `annual_return` as a percentage of the average invested balance
    pub annual_return_percent: Decimal,
    /// Tax divided by taxable income for the year, zero without taxable income
    pub effective_tax_rate: Decimal,
    pub ending_phase: SimulationPhase,
    pub significant_events: Vec<SignificantEvent>,
}

impl AnnualSummary {
    #[must_use]
    pub fn had_growth(&self) -> bool {
        self.annual_return > Decimal::ZERO
    }

    #[must_use]
    pub fn is_accumulating(&self) -> bool {
        self.total_contributions > self.total_withdrawals
    }

    #[must_use]
    pub fn is_distributing(&self) -> bool {
        self.total_withdrawals > self.total_contributions
    }

    #[must_use]
    pub fn had_significant_events(&self) -> bool {
        !self.significant_events.is_empty()
    }

    #[must_use]
    pub fn balance_change(&self) -> Decimal {
        self.ending_balance - self.starting_balance
    }
}

/// Every trial of a Monte Carlo batch plus its statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub trials: Vec<TimeSeries<MonthlySnapshot>>,
    pub summary: MonteCarloSummary,
}

/// Aggregate outcome of a Monte Carlo batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub trials: usize,
    /// Fraction of trials that never hit a withdrawal shortfall
    pub success_rate: Decimal,
    pub p10_final_balance: Decimal,
    pub p50_final_balance: Decimal,
    pub p90_final_balance: Decimal,
}
