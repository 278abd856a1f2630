//! Contribution and withdrawal routing through the engine

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{base_builder, ym};
use crate::config::SimulationBuilder;
use crate::error::SimulationError;
use crate::model::{
    Account, AccountId, ContributionPolicy, Disbursement, IncomeKind, IncomeStream,
    RoutingConfiguration, TaxTreatment, WithdrawalPolicy,
};
use crate::simulation::simulate;

fn split_60_40() -> RoutingConfiguration {
    RoutingConfiguration::builder()
        .add_rule("401k", dec!(0.6), 1)
        .add_rule("roth", dec!(0.4), 2)
        .build()
        .unwrap()
}

fn saver() -> SimulationBuilder {
    base_builder()
        .annual_return(Decimal::ZERO)
        .account(Account::new("401k", TaxTreatment::TaxDeferred, Decimal::ZERO))
        .account(Account::new("roth", TaxTreatment::TaxFree, Decimal::ZERO))
        .income(IncomeStream::new(
            "job",
            IncomeKind::Salary,
            dec!(10_000),
            ym(2025, 1),
        ))
}

fn flow(account: &str, amount: Decimal) -> Disbursement {
    Disbursement {
        account_id: AccountId::new(account),
        amount,
    }
}

#[test]
fn test_contributions_split_by_percentage() {
    let config = saver()
        .contributions(ContributionPolicy::salary_deferral(dec!(0.10)), split_60_40())
        .build()
        .unwrap();
    let series = simulate(&config).unwrap();

    let first = series.first().unwrap();
    assert_eq!(
        first.contribution_flows,
        vec![flow("401k", dec!(600)), flow("roth", dec!(400))]
    );
    let balances = &series.last().unwrap().balances;
    assert_eq!(balances[0].balance, dec!(7_200));
    assert_eq!(balances[1].balance, dec!(4_800));
}

/// A scheduled routing change applies from its effective month on
#[test]
fn test_routing_change_mid_run() {
    let config = saver()
        .contributions(ContributionPolicy::salary_deferral(dec!(0.10)), split_60_40())
        .contribution_routing_from(2025, 7, RoutingConfiguration::single_account("roth"))
        .build()
        .unwrap();
    let series = simulate(&config).unwrap();

    assert_eq!(series.year(2025)[5].contribution_flows.len(), 2);
    assert_eq!(
        series.year(2025)[6].contribution_flows,
        vec![flow("roth", dec!(1_000))]
    );
    let balances = &series.last().unwrap().balances;
    assert_eq!(balances[0].balance, dec!(3_600));
    assert_eq!(balances[1].balance, dec!(8_400));
}

#[test]
fn test_routing_change_without_initial_routing() {
    let err = saver()
        .contribution_routing_from(2025, 7, RoutingConfiguration::single_account("roth"))
        .build()
        .unwrap_err();
    assert_eq!(err, SimulationError::MissingField { field: "routing" });
}

/// An account that runs dry hands its unmet share to the next account by priority
#[test]
fn test_withdrawal_spills_over() {
    let routing = RoutingConfiguration::builder()
        .add_rule_percent("brokerage", dec!(50), 1)
        .add_rule_percent("roth", dec!(50), 2)
        .build()
        .unwrap();
    let config = base_builder()
        .annual_return(Decimal::ZERO)
        .birth_date(1960, 3, 1)
        .retirement(2025, 1)
        .end(2025, 1)
        .account(Account::new("brokerage", TaxTreatment::Taxable, dec!(1_000)))
        .account(Account::new("roth", TaxTreatment::TaxFree, dec!(100_000)))
        .monthly_expenses(dec!(4_000))
        .withdrawals(WithdrawalPolicy::IncomeGap, routing)
        .build()
        .unwrap();
    let snapshot = simulate(&config).unwrap().first().cloned().unwrap();

    assert_eq!(snapshot.withdrawals, dec!(4_000));
    assert_eq!(snapshot.shortfall, Decimal::ZERO);
    assert_eq!(
        snapshot.withdrawal_flows,
        vec![flow("brokerage", dec!(1_000)), flow("roth", dec!(3_000))]
    );
}

#[test]
fn test_percent_of_balance_withdrawal() {
    let config = base_builder()
        .annual_return(Decimal::ZERO)
        .birth_date(1960, 3, 1)
        .retirement(2025, 1)
        .end(2025, 1)
        .account(Account::new("brokerage", TaxTreatment::Taxable, dec!(120_000)))
        .withdrawals(
            WithdrawalPolicy::PercentOfBalance {
                annual_rate: dec!(0.04),
            },
            RoutingConfiguration::single_account("brokerage"),
        )
        .build()
        .unwrap();
    let snapshot = simulate(&config).unwrap().first().cloned().unwrap();

    assert_eq!(snapshot.withdrawals, dec!(400));
}

#[test]
fn test_inflation_adjusted_fixed_withdrawal() {
    let config = base_builder()
        .annual_return(Decimal::ZERO)
        .inflation(dec!(0.10))
        .birth_date(1960, 3, 1)
        .retirement(2025, 1)
        .end(2026, 1)
        .account(Account::new("brokerage", TaxTreatment::Taxable, dec!(100_000)))
        .withdrawals(
            WithdrawalPolicy::FixedAmount {
                monthly_amount: dec!(1_000),
                inflation_adjusted: true,
            },
            RoutingConfiguration::single_account("brokerage"),
        )
        .build()
        .unwrap();
    let series = simulate(&config).unwrap();

    assert_eq!(series.first().unwrap().withdrawals, dec!(1_000));
    assert_eq!(series.year(2025)[11].withdrawals, dec!(1_000));
    assert_eq!(series.last().unwrap().withdrawals, dec!(1_100));
}

#[test]
fn test_invalid_percentages_are_rejected() {
    let err = RoutingConfiguration::builder()
        .add_rule("401k", dec!(0.6), 1)
        .add_rule("roth", dec!(0.3), 2)
        .build()
        .unwrap_err();
    match err {
        SimulationError::InvalidAllocation { message, actual } => {
            assert_eq!(actual, dec!(0.9));
            assert!(message.contains("90%"), "unexpected message: {message}");
        }
        other => panic!("expected InvalidAllocation, got {other:?}"),
    }
}

#[test]
fn test_routing_to_unknown_account_is_rejected() {
    let result = saver()
        .contributions(
            ContributionPolicy::salary_deferral(dec!(0.10)),
            RoutingConfiguration::single_account("hsa"),
        )
        .build();
    assert!(result.is_err());
}

#[test]
fn test_policy_without_routing_is_rejected() {
    let mut config = saver()
        .contributions(
            ContributionPolicy::salary_deferral(dec!(0.10)),
            RoutingConfiguration::single_account("401k"),
        )
        .build()
        .unwrap();
    config.contribution_routing = None;

    assert_eq!(
        config.validate().unwrap_err(),
        SimulationError::MissingField {
            field: "contribution_routing"
        }
    );
}
