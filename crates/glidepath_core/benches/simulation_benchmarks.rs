//! Criterion benchmarks for glidepath_core projections
//!
//! Run with: cargo bench -p glidepath_core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use glidepath_core::config::{SimulationBuilder, SimulationConfig};
use glidepath_core::date_math::YearMonth;
use glidepath_core::model::{
    Account, ContributionPolicy, HistoricalReturns, IncomeKind, IncomeStream, ReturnDistribution,
    RmdTable, RoutingConfiguration, SimulationLevers, TaxTreatment, WithdrawalPolicy,
};
use glidepath_core::{monte_carlo_simulate, simulate, summarize_years};
use rust_decimal_macros::dec;

fn create_lifecycle_config(levers: SimulationLevers) -> SimulationConfig {
    let salary_start = YearMonth::new(2025, 1).expect("valid month");
    let salary_end = YearMonth::new(2035, 6).expect("valid month");
    let contribution_routing = RoutingConfiguration::builder()
        .add_rule("401k", dec!(0.7), 1)
        .add_rule("roth", dec!(0.3), 2)
        .build()
        .expect("valid routing");
    let withdrawal_routing = RoutingConfiguration::builder()
        .add_rule("brokerage", dec!(0.5), 1)
        .add_rule("401k", dec!(0.3), 2)
        .add_rule("roth", dec!(0.2), 3)
        .build()
        .expect("valid routing");

    SimulationBuilder::new()
        .start(2025, 1)
        .end(2054, 12)
        .birth_date(1970, 6, 15)
        .retirement(2035, 7)
        .levers(levers)
        .inflation(dec!(0.025))
        .rmd_table(RmdTable::default())
        .account(Account::new("401k", TaxTreatment::TaxDeferred, dec!(350_000)))
        .account(Account::new("roth", TaxTreatment::TaxFree, dec!(80_000)))
        .account(Account::new("brokerage", TaxTreatment::Taxable, dec!(120_000)))
        .income(
            IncomeStream::new("Salary", IncomeKind::Salary, dec!(9_000), salary_start)
                .until(salary_end)
                .adjusted_by(dec!(0.03)),
        )
        .income(
            IncomeStream::new(
                "Social Security",
                IncomeKind::SocialSecurity,
                dec!(2_800),
                YearMonth::new(2037, 6).expect("valid month"),
            )
            .adjusted_by(dec!(0.025)),
        )
        .monthly_expenses(dec!(6_500))
        .contributions(
            ContributionPolicy::salary_deferral(dec!(0.10)).with_employer_match(dec!(0.5), dec!(0.06)),
            contribution_routing,
        )
        .withdrawals(WithdrawalPolicy::IncomeGap, withdrawal_routing)
        .build()
        .expect("valid benchmark config")
}

fn bench_deterministic_simulation(c: &mut Criterion) {
    let config = create_lifecycle_config(SimulationLevers::deterministic(dec!(0.06)));

    c.bench_function("deterministic_30yr_simulation", |b| {
        b.iter(|| simulate(black_box(&config)))
    });
}

fn bench_historical_simulation(c: &mut Criterion) {
    let config =
        create_lifecycle_config(SimulationLevers::historical(HistoricalReturns::sp500_from(1960)));

    c.bench_function("historical_30yr_simulation", |b| {
        b.iter(|| simulate(black_box(&config)))
    });
}

fn bench_annual_summary(c: &mut Criterion) {
    let config = create_lifecycle_config(SimulationLevers::deterministic(dec!(0.06)));
    let series = simulate(&config).expect("simulation succeeds");

    c.bench_function("summarize_30yr", |b| {
        b.iter(|| summarize_years(black_box(&series)))
    });
}

fn bench_monte_carlo(c: &mut Criterion) {
    let mut group = c.benchmark_group("monte_carlo");
    group.sample_size(10);
    let config = create_lifecycle_config(SimulationLevers::monte_carlo(
        ReturnDistribution::US_EQUITY_NORMAL,
        42,
    ));

    for trials in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("trials", trials), trials, |b, &trials| {
            b.iter(|| monte_carlo_simulate(black_box(&config), black_box(trials)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_deterministic_simulation,
    bench_historical_simulation,
    bench_annual_summary,
    bench_monte_carlo,
);
criterion_main!(benches);
