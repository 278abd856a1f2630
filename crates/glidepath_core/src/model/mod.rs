mod accounts;
mod ids;
mod income;
mod market;
mod policies;
mod profiles;
mod results;
mod rmd;
mod routing;
mod tax_config;

pub use accounts::{Account, AccountBalance, Portfolio, TaxTreatment};
pub use ids::AccountId;
pub use income::{EarningsTestRule, IncomeKind, IncomeStream, MonthlyIncome};
pub use market::{
    HistoricalReturns, MonteCarloLevers, Periodicity, ReturnDistribution, ReturnStrategy,
    SimulationLevers, SimulationMode,
};
pub use policies::{
    Contribution, ContributionPolicy, RateIncrement, RothConversionPlan, RothConversionStrategy,
    WithdrawalPolicy,
};
pub use profiles::{PersonProfile, SimulationPhase};
pub use results::{
    AnnualSummary, MonteCarloResult, MonteCarloSummary, MonthlySnapshot, SignificantEvent,
    TimeSeries,
};
pub use rmd::{RmdTable, RmdTableEntry};
pub use routing::{
    ALLOCATION_TOLERANCE, Disbursement, RoutingConfiguration, RoutingConfigurationBuilder,
    RoutingRule, RoutingSchedule,
};
pub use tax_config::{TaxBracket, TaxConfig, TaxSummary, TaxSummaryBuilder};
