//! Household retirement projection library
//!
//! This crate projects a household's finances month by month, from today
//! through retirement and beyond. It supports:
//! - Accumulation and distribution phases driven by the planned retirement month
//! - Contribution and withdrawal routing across accounts by priority and percentage
//! - Deterministic, Monte Carlo and historical market returns
//! - Income streams with annual COLA/raises and a pluggable earnings test
//! - Year-to-date progressive federal tax, Roth conversions and RMDs
//! - Annual roll-ups of the monthly series
//!
//! All money is [`rust_decimal::Decimal`]; precision and rounding for rate
//! arithmetic come from an explicit [`money::MathContext`].
//!
//! # Builder DSL
//!
//! ```ignore
//! use glidepath_core::{SimulationBuilder, simulate, summarize_years};
//!
//! let config = SimulationBuilder::new()
//!     .start(2025, 1)
//!     .end(2054, 12)
//!     .birth_date(1980, 6, 15)
//!     .retirement(2045, 7)
//!     .annual_return(dec!(0.06))
//!     .account(Account::new("401k", TaxTreatment::TaxDeferred, dec!(250_000)))
//!     .build()?;
//! let series = simulate(&config)?;
//! let years = summarize_years(&series);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod allocation;
pub mod date_math;
pub mod error;
pub mod income;
pub mod money;
pub mod simulation;
pub mod simulation_state;
pub mod summary;
pub mod taxes;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{SimulationBuilder, SimulationConfig};
pub use error::{Result, SimulationError};
pub use simulation::{
    calculate_monthly_return, determine_phase, generate_months, monte_carlo_simulate, run,
    simulate,
};
pub use summary::summarize_years;
