//! Required Minimum Distribution (RMD) tables and calculations
//!
//! The IRS requires minimum withdrawals from tax-deferred accounts
//! starting at age 73 (as of 2024).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::money::round_money;

/// IRS Uniform Lifetime Table for calculating Required Minimum Distributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmdTable {
    pub entries: Vec<RmdTableEntry>,
}

/// Single entry in the RMD table mapping age to IRS divisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RmdTableEntry {
    pub age: u8,
    pub divisor: Decimal,
}

const UNIFORM_LIFETIME_2024: [(u8, Decimal); 48] = [
    (73, dec!(26.5)),
    (74, dec!(25.5)),
    (75, dec!(24.6)),
    (76, dec!(23.7)),
    (77, dec!(22.9)),
    (78, dec!(22.0)),
    (79, dec!(21.1)),
    (80, dec!(20.2)),
    (81, dec!(19.4)),
    (82, dec!(18.5)),
    (83, dec!(17.7)),
    (84, dec!(16.8)),
    (85, dec!(16.0)),
    (86, dec!(15.2)),
    (87, dec!(14.4)),
    (88, dec!(13.7)),
    (89, dec!(12.9)),
    (90, dec!(12.2)),
    (91, dec!(11.5)),
    (92, dec!(10.8)),
    (93, dec!(10.1)),
    (94, dec!(9.5)),
    (95, dec!(8.9)),
    (96, dec!(8.4)),
    (97, dec!(7.8)),
    (98, dec!(7.3)),
    (99, dec!(6.8)),
    (100, dec!(6.4)),
    (101, dec!(6.0)),
    (102, dec!(5.6)),
    (103, dec!(5.2)),
    (104, dec!(4.9)),
    (105, dec!(4.6)),
    (106, dec!(4.3)),
    (107, dec!(4.1)),
    (108, dec!(3.9)),
    (109, dec!(3.7)),
    (110, dec!(3.5)),
    (111, dec!(3.4)),
    (112, dec!(3.3)),
    (113, dec!(3.1)),
    (114, dec!(3.0)),
    (115, dec!(2.9)),
    (116, dec!(2.8)),
    (117, dec!(2.7)),
    (118, dec!(2.5)),
    (119, dec!(2.3)),
    (120, dec!(2.0)),
];

impl Default for RmdTable {
    fn default() -> Self {
        Self::irs_uniform_lifetime_2024()
    }
}

impl RmdTable {
    /// IRS Uniform Lifetime Table (2024)
    #[must_use]
    pub fn irs_uniform_lifetime_2024() -> Self {
        RmdTable {
            entries: UNIFORM_LIFETIME_2024
                .iter()
                .map(|&(age, divisor)| RmdTableEntry { age, divisor })
                .collect(),
        }
    }

    /// Youngest age with a divisor
    #[must_use]
    pub fn start_age(&self) -> Option<u8> {
        self.entries.iter().map(|e| e.age).min()
    }

    /// Divisor for `age`. Ages past the end of the table reuse the last entry.
    #[must_use]
    pub fn divisor_for_age(&self, age: u8) -> Option<Decimal> {
        if let Some(entry) = self.entries.iter().find(|e| e.age == age) {
            return Some(entry.divisor);
        }
        self.entries
            .iter()
            .filter(|e| e.age < age)
            .max_by_key(|e| e.age)
            .filter(|_| self.start_age().is_some_and(|start| age >= start))
            .map(|e| e.divisor)
    }

    /// Annual distribution required at `age` given the prior year-end balance
    #[must_use]
    pub fn required_distribution(&self, age: u8, prior_year_end_balance: Decimal) -> Decimal {
        match self.divisor_for_age(age) {
            Some(divisor) if prior_year_end_balance > Decimal::ZERO => {
                round_money(prior_year_end_balance / divisor)
            }
            _ => Decimal::ZERO,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(entry) = self.entries.iter().find(|e| e.divisor <= Decimal::ZERO) {
            return Err(SimulationError::validation(
                "rmd_table",
                format!(
                    "divisor for age {} must be positive, but was {}",
                    entry.age, entry.divisor
                ),
            ));
        }
        Ok(())
    }
}
