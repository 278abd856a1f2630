//! Error taxonomy for configuration, routing and simulation failures
//!
//! Every failure is terminal for the object or run that produced it: builders
//! refuse to return an invalid value, and a simulation that hits an error
//! returns no partial time series.

use rust_decimal::Decimal;

/// Errors produced while building configuration or running a projection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// A required configuration or builder field was never set
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    /// A supplied value failed a domain predicate
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Routing percentages did not form a complete allocation
    #[error("invalid allocation: {message}")]
    InvalidAllocation { message: String, actual: Decimal },

    /// A derived computation reached an invalid state
    #[error("calculation error: {0}")]
    Calculation(String),
}

impl SimulationError {
    pub fn missing(field: &'static str) -> Self {
        SimulationError::MissingField { field }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        SimulationError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn calculation(message: impl Into<String>) -> Self {
        SimulationError::Calculation(message.into())
    }

    /// True for errors raised while checking configuration, before any month ran
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SimulationError::MissingField { .. }
                | SimulationError::Validation { .. }
                | SimulationError::InvalidAllocation { .. }
        )
    }
}

impl From<jiff::Error> for SimulationError {
    fn from(err: jiff::Error) -> Self {
        SimulationError::Calculation(format!("date calculation error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_messages_name_the_offending_field() {
        let err = SimulationError::missing("person");
        assert_eq!(err.to_string(), "missing required field: person");

        let err = SimulationError::validation("start", "2026-01 is after end 2025-12");
        assert_eq!(err.to_string(), "invalid start: 2026-01 is after end 2025-12");

        let err = SimulationError::InvalidAllocation {
            message: "Routing percentages must sum to 100%, but was 95.5%".into(),
            actual: dec!(0.955),
        };
        assert!(err.to_string().contains("95.5%"));
    }

    #[test]
    fn test_configuration_classification() {
        assert!(SimulationError::missing("end").is_configuration_error());
        assert!(!SimulationError::calculation("overflow").is_configuration_error());
    }
}
