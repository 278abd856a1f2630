use rand::SeedableRng;
use rand::rngs::SmallRng;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::date_math::YearMonth;
use crate::model::{Portfolio, TaxTreatment};

/// Runtime state for one projection, owned exclusively by the run
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub timeline: SimTimeline,
    pub portfolio: Portfolio,
    pub taxes: SimTaxState,
    pub rmd: SimRmdState,
    /// Seeded per run; never shared between runs
    pub rng: SmallRng,
    /// Personal contribution rate in force last month
    pub last_contribution_rate: Option<Decimal>,
    /// Set once the portfolio has been drained
    pub depleted: bool,
}

#[derive(Debug, Clone)]
pub struct SimTimeline {
    pub start: YearMonth,
    pub current: YearMonth,
    /// Zero-based position of `current` within the run
    pub month_offset: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SimTaxState {
    pub year: i16,
    /// Ordinary taxable income plus conversions so far this year
    pub ytd_taxable_income: Decimal,
    pub ytd_tax: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct SimRmdState {
    /// Tax-deferred balance at the end of each year
    pub year_end_balances: FxHashMap<i16, Decimal>,
    /// Taxable withdrawals this year, which count toward the distribution
    pub ytd_tax_deferred_withdrawals: Decimal,
}

impl SimulationState {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let portfolio = config.portfolio.clone();
        let mut rmd = SimRmdState::default();
        // Opening balances stand in for the prior year-end
        rmd.year_end_balances.insert(
            config.start.year() - 1,
            portfolio.balance_by_treatment(TaxTreatment::TaxDeferred),
        );

        Self {
            timeline: SimTimeline {
                start: config.start,
                current: config.start,
                month_offset: 0,
            },
            portfolio,
            taxes: SimTaxState {
                year: config.start.year(),
                ..Default::default()
            },
            rmd,
            rng: SmallRng::seed_from_u64(config.levers.seed()),
            last_contribution_rate: None,
            depleted: false,
        }
    }

    /// Move to `month`, rolling year-to-date state over on a new year
    pub fn begin_month(&mut self, month: YearMonth, offset: usize) {
        self.timeline.current = month;
        self.timeline.month_offset = offset;
        self.maybe_rollover_year(month.year());
    }

    pub fn maybe_rollover_year(&mut self, year: i16) {
        if year == self.taxes.year {
            return;
        }
        let closing = self
            .portfolio
            .balance_by_treatment(TaxTreatment::TaxDeferred);
        self.rmd.year_end_balances.insert(self.taxes.year, closing);
        debug!(
            year = self.taxes.year,
            taxable_income = %self.taxes.ytd_taxable_income,
            tax = %self.taxes.ytd_tax,
            tax_deferred_balance = %closing,
            "year closed"
        );

        self.taxes = SimTaxState {
            year,
            ..Default::default()
        };
        self.rmd.ytd_tax_deferred_withdrawals = Decimal::ZERO;
    }

    /// Tax-deferred balance at the end of the year before `year`
    #[must_use]
    pub fn prior_year_end_tax_deferred(&self, year: i16) -> Decimal {
        self.rmd
            .year_end_balances
            .get(&(year - 1))
            .copied()
            .unwrap_or_default()
    }

    /// Years elapsed since the first simulated month, in whole years
    #[must_use]
    pub fn years_elapsed(&self) -> i32 {
        self.timeline.start.whole_years_until(self.timeline.current)
    }

    pub fn record_taxes(&mut self, taxable_income: Decimal, tax: Decimal) {
        self.taxes.ytd_taxable_income += taxable_income;
        self.taxes.ytd_tax += tax;
    }
}
