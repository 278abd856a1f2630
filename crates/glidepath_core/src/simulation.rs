//! The month-by-month projection engine
//!
//! Each month runs in a fixed order: cash flows first (contributions or
//! withdrawals, then any required distribution and Roth conversion), then
//! taxes, then that month's market return on the resulting balances.

use rand::{RngCore, SeedableRng};
use rand::rngs::SmallRng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::allocation::{WithdrawalOutcome, deposit, withdraw, withdraw_in_order};
use crate::config::SimulationConfig;
use crate::date_math::YearMonth;
use crate::error::{Result, SimulationError};
use crate::income::IncomeCalculator;
use crate::model::{
    AccountId, Disbursement, MonteCarloResult, MonteCarloSummary, MonthlyIncome, MonthlySnapshot,
    PersonProfile, SignificantEvent, SimulationPhase, TaxTreatment, TimeSeries,
};
use crate::money::apply_inflation;
use crate::simulation_state::SimulationState;
use crate::taxes::{TaxCalculator, TaxInputs};

pub use crate::date_math::generate_months;

/// Phase of the plan in `month`: distribution from the planned retirement
/// month onward, accumulation before it.
#[must_use]
pub fn determine_phase(person: &PersonProfile, month: YearMonth) -> SimulationPhase {
    if month >= person.planned_retirement {
        SimulationPhase::Distribution
    } else {
        SimulationPhase::Accumulation
    }
}

/// Monthly return for the zero-based `month_offset` of a run.
///
/// Only Monte Carlo mode draws from `rng`; the other modes leave it untouched.
pub fn calculate_monthly_return(
    config: &SimulationConfig,
    month_offset: usize,
    rng: &mut dyn RngCore,
) -> Result<Decimal> {
    let strategy = config.levers.mode.return_strategy();
    strategy(&config.levers, month_offset, rng, &config.math)
}

/// Run one projection over `config.start..=config.end`.
///
/// Fails before the first month if the config is invalid, and returns no
/// partial series if a later month fails.
pub fn simulate(config: &SimulationConfig) -> Result<TimeSeries<MonthlySnapshot>> {
    config.validate()?;
    let months = config.months()?;
    debug!(
        start = %config.start,
        end = %config.end,
        months = months.len(),
        mode = ?config.levers.mode,
        "starting simulation"
    );

    let mut state = SimulationState::from_config(config);
    let mut series = TimeSeries::with_capacity(months.len());
    let mut calculator = IncomeCalculator::new(&config.income);
    if let Some(rule) = &config.earnings_test {
        calculator = calculator.with_earnings_test(rule);
    }

    for (offset, month) in months.iter().enumerate() {
        state.begin_month(month, offset);
        let snapshot = step(config, &mut state, &calculator)?;
        series.push(snapshot);
    }

    info!(
        months = series.len(),
        final_balance = %series.final_balance(),
        shortfall = series.had_shortfall(),
        "simulation complete"
    );
    Ok(series)
}

/// Entry point for callers holding an optional config, such as a scenario
/// loader that may have found nothing to run.
pub fn run(config: Option<&SimulationConfig>) -> Result<TimeSeries<MonthlySnapshot>> {
    simulate(config.ok_or(SimulationError::missing("config"))?)
}

/// Flows recorded while processing one month
#[derive(Default)]
struct MonthFlows {
    contributions: Decimal,
    employer_contributions: Decimal,
    pre_tax_contributions: Decimal,
    contribution_flows: Vec<Disbursement>,
    withdrawals: WithdrawalOutcome,
    roth_conversion: Decimal,
}

fn step(
    config: &SimulationConfig,
    state: &mut SimulationState,
    calculator: &IncomeCalculator<'_>,
) -> Result<MonthlySnapshot> {
    let month = state.timeline.current;
    let ctx = &config.math;
    let phase = determine_phase(&config.person, month);
    let mut events = Vec::new();
    if month == config.person.planned_retirement {
        events.push(SignificantEvent::RetirementStarted);
    }
    events.extend(calculator.transitions(month));

    let monthly_return_rate =
        calculate_monthly_return(config, state.timeline.month_offset, &mut state.rng)?;
    let starting_balance = state.portfolio.total_balance();
    let income = calculator.calculate(month, ctx)?;
    let expenses = apply_inflation(
        config.monthly_expenses,
        config.levers.inflation_rate,
        Decimal::from(state.years_elapsed()),
        ctx,
    )?;

    let mut flows = MonthFlows::default();
    match phase {
        SimulationPhase::Accumulation => {
            contribute(config, state, &income, &mut flows, &mut events)?;
        }
        SimulationPhase::Distribution => {
            distribute(config, state, &income, expenses, &mut flows)?;
        }
    }
    required_distribution(config, state, &mut flows, &mut events)?;

    let ordinary_income = income.salary() - flows.pre_tax_contributions
        + income.pension()
        + income.annuity()
        + income.other();
    let mut inputs = TaxInputs {
        taxable_withdrawals: flows.withdrawals.taxable,
        tax_free_withdrawals: flows.withdrawals.tax_free,
        social_security: income.social_security(),
        other_taxable_income: ordinary_income,
        roth_conversion: Decimal::ZERO,
        ytd_taxable_income: state.taxes.ytd_taxable_income,
    };
    let tax_calculator = TaxCalculator::new(&config.tax_config);
    let month_taxable = tax_calculator.summarize(&inputs).taxable_income();
    convert_to_roth(config, state, month_taxable, &mut flows, &mut events)?;
    inputs.roth_conversion = flows.roth_conversion;
    let tax = tax_calculator.summarize(&inputs);
    state.record_taxes(tax.taxable_income() + tax.roth_conversion_amount(), tax.total_tax());

    let shortfall = flows.withdrawals.shortfall;
    if shortfall > Decimal::ZERO {
        warn!(%month, %shortfall, "withdrawal shortfall");
        events.push(SignificantEvent::WithdrawalShortfall { amount: shortfall });
    }

    let investment_return = state.portfolio.apply_growth(monthly_return_rate, ctx);
    let ending_balance = state.portfolio.total_balance();

    if ending_balance.is_zero() && starting_balance > Decimal::ZERO && !state.depleted {
        warn!(%month, "portfolio depleted");
        state.depleted = true;
        events.push(SignificantEvent::PortfolioDepleted);
    }

    Ok(MonthlySnapshot {
        month,
        phase,
        starting_balance,
        ending_balance,
        balances: state.portfolio.balances(),
        income,
        expenses,
        tax,
        contributions: flows.contributions,
        employer_contributions: flows.employer_contributions,
        withdrawals: flows.withdrawals.total(),
        shortfall,
        monthly_return_rate,
        investment_return,
        contribution_flows: flows.contribution_flows,
        withdrawal_flows: flows.withdrawals.flows,
        events,
    })
}

fn contribute(
    config: &SimulationConfig,
    state: &mut SimulationState,
    income: &MonthlyIncome,
    flows: &mut MonthFlows,
    events: &mut Vec<SignificantEvent>,
) -> Result<()> {
    let Some(schedule) = &config.contribution_routing else {
        return Ok(());
    };
    let month = state.timeline.current;
    let contribution = config
        .contributions
        .contribution(config.start, month, income.salary());

    if let Some(previous) = state.last_contribution_rate
        && contribution.rate > previous
    {
        events.push(SignificantEvent::ContributionRateIncreased {
            rate: contribution.rate,
        });
    }
    state.last_contribution_rate = Some(contribution.rate);

    flows.contribution_flows = deposit(
        &mut state.portfolio,
        schedule.active_at(month),
        contribution.total(),
    )?;
    flows.contributions = contribution.total();
    flows.employer_contributions = contribution.employer;
    if config.contributions.pre_tax {
        flows.pre_tax_contributions = contribution.personal.min(income.salary());
    }
    Ok(())
}

fn distribute(
    config: &SimulationConfig,
    state: &mut SimulationState,
    income: &MonthlyIncome,
    expenses: Decimal,
    flows: &mut MonthFlows,
) -> Result<()> {
    let Some(schedule) = &config.withdrawal_routing else {
        return Ok(());
    };
    let requested = config.withdrawals.requested(
        state.portfolio.total_balance(),
        income.total(),
        expenses,
        config.levers.inflation_rate,
        state.years_elapsed(),
        &config.math,
    )?;
    let outcome = withdraw(
        &mut state.portfolio,
        schedule.active_at(state.timeline.current),
        requested,
    )?;
    state.rmd.ytd_tax_deferred_withdrawals += outcome.taxable;
    flows.withdrawals.absorb(outcome);
    Ok(())
}

/// December top-up of tax-deferred withdrawals to the year's required minimum
fn required_distribution(
    config: &SimulationConfig,
    state: &mut SimulationState,
    flows: &mut MonthFlows,
    events: &mut Vec<SignificantEvent>,
) -> Result<()> {
    let month = state.timeline.current;
    let Some(table) = &config.rmd_table else {
        return Ok(());
    };
    if !month.is_december() {
        return Ok(());
    }
    let age = config.person.age_in(month);
    let required =
        table.required_distribution(age, state.prior_year_end_tax_deferred(month.year()));
    let top_up = required - state.rmd.ytd_tax_deferred_withdrawals;
    if top_up <= Decimal::ZERO {
        return Ok(());
    }

    let sources: Vec<AccountId> = config
        .portfolio
        .accounts
        .iter()
        .filter(|a| a.tax_treatment == TaxTreatment::TaxDeferred)
        .map(|a| a.id.clone())
        .collect();
    let mut outcome = withdraw_in_order(&mut state.portfolio, &sources, top_up)?;
    // An unfunded distribution is not a spending shortfall
    outcome.shortfall = Decimal::ZERO;
    let taken = outcome.taxable;
    if taken > Decimal::ZERO {
        debug!(%month, age, %required, %taken, "required minimum distribution");
        state.rmd.ytd_tax_deferred_withdrawals += taken;
        events.push(SignificantEvent::RequiredDistribution { amount: taken });
    }
    flows.withdrawals.absorb(outcome);
    Ok(())
}

fn convert_to_roth(
    config: &SimulationConfig,
    state: &mut SimulationState,
    month_taxable_income: Decimal,
    flows: &mut MonthFlows,
    events: &mut Vec<SignificantEvent>,
) -> Result<()> {
    let Some(plan) = &config.roth_conversion else {
        return Ok(());
    };
    let month = state.timeline.current;
    let ytd = state.taxes.ytd_taxable_income + month_taxable_income;
    let amount = plan
        .requested(month, ytd)
        .min(state.portfolio.balance(&plan.from_account));
    if amount <= Decimal::ZERO {
        return Ok(());
    }
    state.portfolio.apply_flow(&plan.from_account, -amount)?;
    state.portfolio.apply_flow(&plan.to_account, amount)?;
    flows.roth_conversion = amount;
    events.push(SignificantEvent::RothConversion { amount });
    Ok(())
}

/// Run `trials` independent projections and summarize their outcomes.
///
/// Trial seeds are drawn from the levers' seed up front, so the result does
/// not depend on how trials are scheduled across threads.
pub fn monte_carlo_simulate(config: &SimulationConfig, trials: usize) -> Result<MonteCarloResult> {
    if trials == 0 {
        return Err(SimulationError::validation(
            "trials",
            "a Monte Carlo batch needs at least one trial",
        ));
    }
    config.validate()?;

    let mut master = SmallRng::seed_from_u64(config.levers.seed());
    let seeds: Vec<u64> = (0..trials).map(|_| master.next_u64()).collect();
    let run_trial = |seed: u64| simulate(&config.with_levers(config.levers.reseeded(seed)));

    #[cfg(feature = "parallel")]
    let runs: Result<Vec<_>> = seeds.into_par_iter().map(run_trial).collect();
    #[cfg(not(feature = "parallel"))]
    let runs: Result<Vec<_>> = seeds.into_iter().map(run_trial).collect();
    let runs = runs?;

    let summary = summarize_trials(&runs);
    info!(
        trials,
        success_rate = %summary.success_rate,
        median = %summary.p50_final_balance,
        "monte carlo complete"
    );
    Ok(MonteCarloResult {
        trials: runs,
        summary,
    })
}

fn summarize_trials(runs: &[TimeSeries<MonthlySnapshot>]) -> MonteCarloSummary {
    let trials = runs.len();
    let successes = runs.iter().filter(|run| !run.had_shortfall()).count();
    let mut finals: Vec<Decimal> = runs.iter().map(TimeSeries::final_balance).collect();
    finals.sort();

    let percentile = |p: Decimal| -> Decimal {
        if finals.is_empty() {
            return Decimal::ZERO;
        }
        let rank = (p * Decimal::from(finals.len() - 1)).round();
        let index = rank.to_usize().unwrap_or(0).min(finals.len() - 1);
        finals[index]
    };

    let success_rate = if trials == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(successes) / Decimal::from(trials)).round_dp(4)
    };

    MonteCarloSummary {
        trials,
        success_rate,
        p10_final_balance: percentile(Decimal::new(1, 1)),
        p50_final_balance: percentile(Decimal::new(5, 1)),
        p90_final_balance: percentile(Decimal::new(9, 1)),
    }
}
