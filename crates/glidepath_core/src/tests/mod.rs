//! Scenario tests for the projection engine
//!
//! Tests are organized by topic:
//! - `basic` - Core simulation mechanics and error handling
//! - `phases` - Accumulation/distribution switching
//! - `returns` - Deterministic, Monte Carlo and historical returns
//! - `routing` - Contribution and withdrawal routing through the engine
//! - `taxes` - Year-to-date tax, Roth conversions and RMDs
//! - `aggregation` - Annual roll-ups of simulated series
//! - `builder_dsl` - Builder DSL for fluent simulation setup
//! - `monte_carlo` - Batches of seeded trials
//! - `properties` - Property tests over routing, months and income

mod aggregation;
mod routing;

use rust_decimal_macros::dec;

use crate::config::SimulationBuilder;
use crate::date_math::YearMonth;
use crate::model::TaxConfig;

pub(super) fn ym(year: i16, month: i8) -> YearMonth {
    YearMonth::new(year, month).unwrap()
}

/// Calendar 2025, retirement far in the future, no taxes, 7% returns
pub(super) fn base_builder() -> SimulationBuilder {
    SimulationBuilder::new()
        .start(2025, 1)
        .end(2025, 12)
        .birth_date(1980, 6, 15)
        .retirement(2045, 7)
        .annual_return(dec!(0.07))
        .tax_config(TaxConfig::none())
}
