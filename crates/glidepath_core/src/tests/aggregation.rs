//! Annual roll-ups of simulated series

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{base_builder, ym};
use crate::model::{
    Account, ContributionPolicy, IncomeKind, IncomeStream, MonthlySnapshot,
    RoutingConfiguration, SignificantEvent, SimulationPhase, TaxTreatment, TimeSeries,
    WithdrawalPolicy,
};
use crate::simulation::simulate;
use crate::summary::summarize_years;

#[test]
fn test_one_summary_per_year() {
    let config = base_builder().end(2026, 12).build().unwrap();
    let summaries = summarize_years(&simulate(&config).unwrap());

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].year, 2025);
    assert_eq!(summaries[1].year, 2026);
    assert!(summaries.iter().all(|s| s.months == 12));
}

#[test]
fn test_partial_years() {
    let config = base_builder().start(2024, 11).end(2025, 2).build().unwrap();
    let summaries = summarize_years(&simulate(&config).unwrap());

    let shape: Vec<(i16, usize)> = summaries.iter().map(|s| (s.year, s.months)).collect();
    assert_eq!(shape, vec![(2024, 2), (2025, 2)]);
}

#[test]
fn test_empty_series() {
    let series: TimeSeries<MonthlySnapshot> = TimeSeries::default();
    assert!(summarize_years(&series).is_empty());
}

#[test]
fn test_accumulation_year_totals() {
    let config = base_builder()
        .annual_return(Decimal::ZERO)
        .account(Account::new("401k", TaxTreatment::TaxDeferred, dec!(100_000)))
        .income(IncomeStream::new(
            "job",
            IncomeKind::Salary,
            dec!(10_000),
            ym(2025, 1),
        ))
        .contributions(
            ContributionPolicy::salary_deferral(dec!(0.10)),
            RoutingConfiguration::single_account("401k"),
        )
        .build()
        .unwrap();
    let year = summarize_years(&simulate(&config).unwrap()).remove(0);

    assert_eq!(year.starting_balance, dec!(100_000));
    assert_eq!(year.ending_balance, dec!(112_000));
    assert_eq!(year.total_contributions, dec!(12_000));
    assert_eq!(year.total_income, dec!(120_000));
    assert_eq!(year.annual_return, Decimal::ZERO);
    assert_eq!(year.balance_change(), dec!(12_000));
    assert!(year.is_accumulating());
    assert!(!year.had_growth());
    assert_eq!(year.ending_phase, SimulationPhase::Accumulation);
}

#[test]
fn test_return_percent_without_flows() {
    let config = base_builder()
        .account(Account::new("brokerage", TaxTreatment::Taxable, dec!(100_000)))
        .build()
        .unwrap();
    let year = summarize_years(&simulate(&config).unwrap()).remove(0);

    assert!(year.had_growth());
    assert_eq!(year.annual_return_percent, dec!(7.00));
}

#[test]
fn test_retirement_year() {
    let config = base_builder()
        .annual_return(Decimal::ZERO)
        .birth_date(1960, 3, 1)
        .retirement(2025, 7)
        .account(Account::new("brokerage", TaxTreatment::Taxable, dec!(100_000)))
        .monthly_expenses(dec!(3_000))
        .withdrawals(
            WithdrawalPolicy::IncomeGap,
            RoutingConfiguration::single_account("brokerage"),
        )
        .build()
        .unwrap();
    let year = summarize_years(&simulate(&config).unwrap()).remove(0);

    assert_eq!(year.total_withdrawals, dec!(18_000));
    assert_eq!(year.total_expenses, dec!(36_000));
    assert!(year.is_distributing());
    assert_eq!(year.ending_phase, SimulationPhase::Distribution);
    assert!(year.had_significant_events());
    assert!(year.significant_events.contains(&SignificantEvent::RetirementStarted));
}

#[test]
fn test_shortfall_totals() {
    let config = base_builder()
        .annual_return(Decimal::ZERO)
        .birth_date(1960, 3, 1)
        .retirement(2025, 1)
        .account(Account::new("brokerage", TaxTreatment::Taxable, dec!(10_000)))
        .monthly_expenses(dec!(1_000))
        .withdrawals(
            WithdrawalPolicy::IncomeGap,
            RoutingConfiguration::single_account("brokerage"),
        )
        .build()
        .unwrap();
    let year = summarize_years(&simulate(&config).unwrap()).remove(0);

    assert_eq!(year.total_withdrawals, dec!(10_000));
    assert_eq!(year.total_shortfall, dec!(2_000));
    assert_eq!(year.ending_balance, Decimal::ZERO);
}
