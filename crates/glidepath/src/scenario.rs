//! Scenario files: a YAML wrapper around [`SimulationConfig`]

use std::path::Path;

use color_eyre::eyre::{Context, Result};
use glidepath_core::SimulationConfig;
use glidepath_core::model::{HistoricalReturns, RmdTable, SimulationLevers};
use serde::Deserialize;

/// One projection as stored on disk
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Apply the IRS Uniform Lifetime table when the simulation names none
    #[serde(default)]
    pub required_distributions: bool,
    /// Replay S&P 500 annual returns from this year instead of the simulation's levers
    #[serde(default)]
    pub sp500_from: Option<i16>,
    pub simulation: SimulationConfig,
}

impl Scenario {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read scenario {}", path.display()))?;
        let scenario = Self::from_yaml(&content)
            .wrap_err_with(|| format!("failed to parse scenario {}", path.display()))?;
        tracing::debug!(name = %scenario.name, path = %path.display(), "scenario loaded");
        Ok(scenario)
    }

    /// Resolve the shortcuts into a validated config
    pub fn into_config(self) -> Result<SimulationConfig> {
        let mut config = self.simulation;
        if self.required_distributions && config.rmd_table.is_none() {
            config.rmd_table = Some(RmdTable::default());
        }
        if let Some(year) = self.sp500_from {
            let inflation = config.levers.inflation_rate;
            config.levers = SimulationLevers::historical(HistoricalReturns::sp500_from(year))
                .with_inflation(inflation);
        }
        config
            .validate()
            .wrap_err_with(|| format!("scenario '{}' is invalid", self.name))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glidepath_core::model::{SimulationMode, TaxTreatment, WithdrawalPolicy};
    use rust_decimal_macros::dec;

    const SAMPLE: &str = include_str!("../../../scenarios/mid_career.yaml");

    const MINIMAL: &str = r#"
name: Minimal
simulation:
  start: "2025-01"
  end: "2025-12"
  levers:
    annual_return: 0.05
  person:
    birth_date: "1980-06-15"
    planned_retirement: "2045-07"
"#;

    #[test]
    fn test_sample_scenario_parses() {
        let scenario = Scenario::from_yaml(SAMPLE).unwrap();
        assert_eq!(scenario.name, "Mid-career saver");
        assert!(scenario.required_distributions);

        let config = scenario.into_config().unwrap();
        assert_eq!(config.levers.mode, SimulationMode::MonteCarlo);
        assert_eq!(config.portfolio.accounts.len(), 3);
        assert_eq!(
            config.portfolio.accounts[0].tax_treatment,
            TaxTreatment::TaxDeferred
        );
        assert_eq!(config.withdrawals, WithdrawalPolicy::IncomeGap);
        assert!(config.rmd_table.is_some());
        assert_eq!(config.months().unwrap().len(), 480);
    }

    #[test]
    fn test_minimal_scenario_uses_defaults() {
        let config = Scenario::from_yaml(MINIMAL).unwrap().into_config().unwrap();
        assert_eq!(config.levers.mode, SimulationMode::Deterministic);
        assert_eq!(config.levers.annual_return, dec!(0.05));
        assert!(config.rmd_table.is_none());
        assert!(config.portfolio.accounts.is_empty());
    }

    #[test]
    fn test_sp500_shortcut_replaces_levers() {
        let mut scenario = Scenario::from_yaml(MINIMAL).unwrap();
        scenario.sp500_from = Some(1990);
        let config = scenario.into_config().unwrap();
        assert_eq!(config.levers.mode, SimulationMode::Historical);
    }

    #[test]
    fn test_invalid_scenario_is_rejected() {
        let yaml = MINIMAL.replace("2025-12", "2024-12");
        let scenario = Scenario::from_yaml(&yaml).unwrap();
        assert!(scenario.into_config().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.yaml");
        std::fs::write(&path, MINIMAL).unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.name, "Minimal");
        assert!(Scenario::load(&dir.path().join("missing.yaml")).is_err());
    }
}
