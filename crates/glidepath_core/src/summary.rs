//! Annual roll-ups of a monthly time series

use rust_decimal::Decimal;

use crate::model::{AnnualSummary, MonthlySnapshot, TimeSeries};

impl AnnualSummary {
    /// Fold one calendar year's snapshots, in month order.
    ///
    /// Returns `None` for an empty slice. Partial years (the first or last
    /// year of a run) are folded over whichever months exist.
    #[must_use]
    pub fn from_snapshots(snapshots: &[MonthlySnapshot]) -> Option<Self> {
        let first = snapshots.first()?;
        let last = snapshots.last()?;

        let mut total_contributions = Decimal::ZERO;
        let mut total_withdrawals = Decimal::ZERO;
        let mut total_income = Decimal::ZERO;
        let mut total_expenses = Decimal::ZERO;
        let mut total_taxes = Decimal::ZERO;
        let mut total_shortfall = Decimal::ZERO;
        let mut ordinary_tax = Decimal::ZERO;
        let mut taxable_income = Decimal::ZERO;
        let mut significant_events = Vec::new();

        for s in snapshots {
            total_contributions += s.contributions;
            total_withdrawals += s.withdrawals;
            total_income += s.income.total();
            total_expenses += s.expenses;
            total_taxes += s.tax.total_tax();
            total_shortfall += s.shortfall;
            ordinary_tax += s.tax.federal_tax_liability();
            taxable_income += s.tax.taxable_income();
            significant_events.extend(s.events.iter().cloned());
        }

        let starting_balance = first.starting_balance;
        let ending_balance = last.ending_balance;
        let net_flows = total_contributions - total_withdrawals;
        let annual_return = ending_balance - starting_balance - net_flows;

        // Simple Dietz: flows are assumed to arrive mid-year
        let base = starting_balance + net_flows / Decimal::TWO;
        let annual_return_percent = if base > Decimal::ZERO {
            (annual_return / base * Decimal::ONE_HUNDRED).round_dp(2)
        } else {
            Decimal::ZERO
        };
        let effective_tax_rate = if taxable_income.is_zero() {
            Decimal::ZERO
        } else {
            (ordinary_tax / taxable_income).round_dp(6)
        };

        Some(Self {
            year: first.year(),
            months: snapshots.len(),
            starting_balance,
            ending_balance,
            total_contributions,
            total_withdrawals,
            total_income,
            total_expenses,
            total_taxes,
            total_shortfall,
            annual_return,
            annual_return_percent,
            effective_tax_rate,
            ending_phase: last.phase,
            significant_events,
        })
    }
}

/// One summary per calendar year present in `series`, in order
#[must_use]
pub fn summarize_years(series: &TimeSeries<MonthlySnapshot>) -> Vec<AnnualSummary> {
    series
        .as_slice()
        .chunk_by(|a, b| a.year() == b.year())
        .filter_map(AnnualSummary::from_snapshots)
        .collect()
}
