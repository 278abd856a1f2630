//! The person whose plan is being projected, and the life-cycle phase

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::date_math::YearMonth;
use crate::error::{Result, SimulationError};

/// Accumulation before retirement, distribution from the retirement month on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationPhase {
    Accumulation,
    Distribution,
}

impl SimulationPhase {
    #[must_use]
    pub fn is_accumulation(self) -> bool {
        self == SimulationPhase::Accumulation
    }

    #[must_use]
    pub fn is_distribution(self) -> bool {
        self == SimulationPhase::Distribution
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonProfile {
    #[serde(default)]
    pub name: String,
    pub birth_date: Date,
    /// First month of retirement; this month is already in distribution
    pub planned_retirement: YearMonth,
}

impl PersonProfile {
    pub fn new(
        name: impl Into<String>,
        birth_date: Date,
        planned_retirement: YearMonth,
    ) -> Result<Self> {
        let person = Self {
            name: name.into(),
            birth_date,
            planned_retirement,
        };
        person.validate()?;
        Ok(person)
    }

    pub fn validate(&self) -> Result<()> {
        if self.planned_retirement < YearMonth::from_date(self.birth_date) {
            return Err(SimulationError::validation(
                "planned_retirement",
                format!(
                    "retirement month {} is before birth date {}",
                    self.planned_retirement, self.birth_date
                ),
            ));
        }
        Ok(())
    }

    /// Age in whole years during `month`, counting a birthday in that month
    #[must_use]
    pub fn age_in(&self, month: YearMonth) -> u8 {
        let birth = YearMonth::from_date(self.birth_date);
        birth.whole_years_until(month).clamp(0, i32::from(u8::MAX)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_retirement_before_birth() {
        let result = PersonProfile::new(
            "Pat",
            jiff::civil::date(1980, 6, 15),
            YearMonth::new(1979, 1).unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_age_counts_birthday_month() {
        let person = PersonProfile::new(
            "Pat",
            jiff::civil::date(1960, 6, 15),
            YearMonth::new(2027, 1).unwrap(),
        )
        .unwrap();
        assert_eq!(person.age_in(YearMonth::new(2033, 5).unwrap()), 72);
        assert_eq!(person.age_in(YearMonth::new(2033, 6).unwrap()), 73);
    }
}
