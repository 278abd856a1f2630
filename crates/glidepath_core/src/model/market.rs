//! Market levers: how each month's portfolio return is generated
//!
//! The mode is chosen once per run. [`SimulationMode::return_strategy`] is the
//! single table mapping each mode to its generator, so the behaviour of all
//! three modes can be audited in one place.

use rand::RngCore;
use rand_distr::{Distribution, LogNormal, Normal, StudentT};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::money::{MathContext, compound_annual_to_monthly};

/// Strategy used to produce monthly returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationMode {
    /// One fixed annual rate
    #[default]
    Deterministic,
    /// Seeded random draws from a return distribution
    MonteCarlo,
    /// Replay of a recorded return sequence
    Historical,
}

/// Generator signature shared by every mode: levers, zero-based month offset
/// within the run, the run's RNG and the math context.
pub type ReturnStrategy =
    fn(&SimulationLevers, usize, &mut dyn RngCore, &MathContext) -> Result<Decimal>;

impl SimulationMode {
    /// Mode to generator mapping
    #[must_use]
    pub fn return_strategy(self) -> ReturnStrategy {
        match self {
            SimulationMode::Deterministic => deterministic_return,
            SimulationMode::MonteCarlo => sampled_return,
            SimulationMode::Historical => historical_return,
        }
    }
}

/// Parametric distribution of annual returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReturnDistribution {
    Normal {
        annual_mean: f64,
        annual_std_dev: f64,
    },
    /// Log returns are normal; captures the skew of compounded returns
    LogNormal {
        annual_mean: f64,
        annual_std_dev: f64,
    },
    /// Fat-tailed returns; lower `df` means fatter tails (4-6 typical for equities)
    StudentT {
        annual_mean: f64,
        annual_scale: f64,
        df: f64,
    },
}

impl ReturnDistribution {
    /// Long-run US equities, nominal
    pub const US_EQUITY_NORMAL: ReturnDistribution = ReturnDistribution::Normal {
        annual_mean: 0.10,
        annual_std_dev: 0.18,
    };

    fn sample_monthly(&self, rng: &mut dyn RngCore) -> Result<f64> {
        let months = 12.0_f64;
        match *self {
            ReturnDistribution::Normal {
                annual_mean,
                annual_std_dev,
            } => {
                let mean = (1.0 + annual_mean).powf(1.0 / months) - 1.0;
                Normal::new(mean, annual_std_dev / months.sqrt())
                    .map(|d| d.sample(rng))
                    .map_err(|_| invalid_distribution("Normal", "std_dev must be non-negative and finite"))
            }
            ReturnDistribution::LogNormal {
                annual_mean,
                annual_std_dev,
            } => {
                let mu = (1.0 + annual_mean).ln() / months;
                LogNormal::new(mu, annual_std_dev / months.sqrt())
                    .map(|d| d.sample(rng) - 1.0)
                    .map_err(|_| invalid_distribution("LogNormal", "std_dev must be positive and finite"))
            }
            ReturnDistribution::StudentT {
                annual_mean,
                annual_scale,
                df,
            } => {
                let mean = (1.0 + annual_mean).powf(1.0 / months) - 1.0;
                let scale = annual_scale / months.sqrt();
                StudentT::new(df)
                    .map(|d| mean + scale * d.sample(rng))
                    .map_err(|_| {
                        invalid_distribution("StudentT", "degrees of freedom must be positive and finite")
                    })
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let (mean, spread) = match *self {
            ReturnDistribution::Normal {
                annual_mean,
                annual_std_dev,
            }
            | ReturnDistribution::LogNormal {
                annual_mean,
                annual_std_dev,
            } => (annual_mean, annual_std_dev),
            ReturnDistribution::StudentT {
                annual_mean,
                annual_scale,
                df,
            } => {
                if !(df.is_finite() && df > 0.0) {
                    return Err(invalid_distribution(
                        "StudentT",
                        "degrees of freedom must be positive and finite",
                    ));
                }
                (annual_mean, annual_scale)
            }
        };
        if !mean.is_finite() || mean <= -1.0 {
            return Err(SimulationError::validation(
                "annual_mean",
                format!("annual mean return must be finite and above -100%, but was {mean}"),
            ));
        }
        if !spread.is_finite() || spread < 0.0 {
            return Err(SimulationError::validation(
                "annual_std_dev",
                format!("return spread must be finite and non-negative, but was {spread}"),
            ));
        }
        Ok(())
    }
}

fn invalid_distribution(kind: &str, reason: &str) -> SimulationError {
    SimulationError::validation("distribution", format!("invalid {kind} parameters: {reason}"))
}

/// Monte Carlo settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloLevers {
    pub distribution: ReturnDistribution,
    /// Seed for the run's RNG; equal seeds give identical paths
    pub seed: u64,
}

/// Spacing of the values in a [`HistoricalReturns`] series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodicity {
    #[default]
    Monthly,
    /// Each value covers twelve consecutive months
    Annual,
}

/// A recorded sequence of returns replayed in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalReturns {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub periodicity: Periodicity,
    pub returns: Vec<Decimal>,
}

impl HistoricalReturns {
    pub fn monthly(name: impl Into<String>, returns: Vec<Decimal>) -> Self {
        Self {
            name: name.into(),
            periodicity: Periodicity::Monthly,
            returns,
        }
    }

    pub fn annual(name: impl Into<String>, returns: Vec<Decimal>) -> Self {
        Self {
            name: name.into(),
            periodicity: Periodicity::Annual,
            returns,
        }
    }

    /// S&P 500 total return including dividends, 1928-2023
    #[must_use]
    pub fn sp500() -> Self {
        Self::annual("S&P 500", SP_500_ANNUAL_RETURNS.to_vec())
    }

    /// Same series, replayed from `first_year` onward
    #[must_use]
    pub fn sp500_from(first_year: i16) -> Self {
        let skip = usize::try_from(first_year - SP_500_FIRST_YEAR).unwrap_or(0);
        let returns = SP_500_ANNUAL_RETURNS.iter().skip(skip).copied().collect();
        Self::annual(format!("S&P 500 from {first_year}"), returns)
    }

    /// How many months of returns the series can supply
    #[must_use]
    pub fn months_available(&self) -> usize {
        match self.periodicity {
            Periodicity::Monthly => self.returns.len(),
            Periodicity::Annual => self.returns.len() * 12,
        }
    }

    /// Monthly return for the zero-based month `offset`
    pub fn monthly_return(&self, offset: usize, ctx: &MathContext) -> Result<Decimal> {
        let exhausted = || {
            SimulationError::calculation(format!(
                "historical return sequence '{}' exhausted at month {} ({} months available)",
                self.name,
                offset + 1,
                self.months_available()
            ))
        };
        match self.periodicity {
            Periodicity::Monthly => self.returns.get(offset).copied().ok_or_else(exhausted),
            Periodicity::Annual => {
                let annual = self.returns.get(offset / 12).copied().ok_or_else(exhausted)?;
                compound_annual_to_monthly(annual, ctx)
            }
        }
    }
}

/// Everything that decides market behaviour for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationLevers {
    #[serde(default)]
    pub mode: SimulationMode,
    /// Annual return used in deterministic mode
    #[serde(default)]
    pub annual_return: Decimal,
    /// Annual inflation applied to expenses and inflation-adjusted withdrawals
    #[serde(default)]
    pub inflation_rate: Decimal,
    #[serde(default)]
    pub monte_carlo: Option<MonteCarloLevers>,
    #[serde(default)]
    pub historical: Option<HistoricalReturns>,
}

impl Default for SimulationLevers {
    fn default() -> Self {
        Self::deterministic(Decimal::ZERO)
    }
}

impl SimulationLevers {
    #[must_use]
    pub fn deterministic(annual_return: Decimal) -> Self {
        Self {
            mode: SimulationMode::Deterministic,
            annual_return,
            inflation_rate: Decimal::ZERO,
            monte_carlo: None,
            historical: None,
        }
    }

    #[must_use]
    pub fn monte_carlo(distribution: ReturnDistribution, seed: u64) -> Self {
        Self {
            mode: SimulationMode::MonteCarlo,
            annual_return: Decimal::ZERO,
            inflation_rate: Decimal::ZERO,
            monte_carlo: Some(MonteCarloLevers { distribution, seed }),
            historical: None,
        }
    }

    #[must_use]
    pub fn historical(series: HistoricalReturns) -> Self {
        Self {
            mode: SimulationMode::Historical,
            annual_return: Decimal::ZERO,
            inflation_rate: Decimal::ZERO,
            monte_carlo: None,
            historical: Some(series),
        }
    }

    #[must_use]
    pub fn with_inflation(mut self, inflation_rate: Decimal) -> Self {
        self.inflation_rate = inflation_rate;
        self
    }

    /// Seed for the run's RNG; deterministic and historical modes never draw
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.monte_carlo.map_or(0, |mc| mc.seed)
    }

    /// Copy of these levers with a different Monte Carlo seed
    #[must_use]
    pub fn reseeded(&self, seed: u64) -> Self {
        let mut levers = self.clone();
        if let Some(mc) = levers.monte_carlo.as_mut() {
            mc.seed = seed;
        }
        levers
    }

    /// Check the levers the selected mode depends on
    pub fn validate(&self, months: usize) -> Result<()> {
        if self.annual_return <= Decimal::NEGATIVE_ONE {
            return Err(SimulationError::validation(
                "annual_return",
                format!("annual return must be above -100%, but was {}", self.annual_return),
            ));
        }
        if self.inflation_rate <= Decimal::NEGATIVE_ONE || self.inflation_rate > Decimal::ONE {
            return Err(SimulationError::validation(
                "inflation_rate",
                format!("inflation rate must be within (-100%, 100%], but was {}", self.inflation_rate),
            ));
        }
        match self.mode {
            SimulationMode::Deterministic => Ok(()),
            SimulationMode::MonteCarlo => self
                .monte_carlo
                .ok_or(SimulationError::missing("monte_carlo"))?
                .distribution
                .validate(),
            SimulationMode::Historical => {
                let series = self
                    .historical
                    .as_ref()
                    .ok_or(SimulationError::missing("historical"))?;
                if series.months_available() < months {
                    return Err(SimulationError::calculation(format!(
                        "historical return sequence '{}' has {} months but the run needs {months}",
                        series.name,
                        series.months_available()
                    )));
                }
                Ok(())
            }
        }
    }
}

fn deterministic_return(
    levers: &SimulationLevers,
    _offset: usize,
    _rng: &mut dyn RngCore,
    ctx: &MathContext,
) -> Result<Decimal> {
    compound_annual_to_monthly(levers.annual_return, ctx)
}

fn sampled_return(
    levers: &SimulationLevers,
    _offset: usize,
    rng: &mut dyn RngCore,
    ctx: &MathContext,
) -> Result<Decimal> {
    let mc = levers
        .monte_carlo
        .ok_or(SimulationError::missing("monte_carlo"))?;
    let draw = mc.distribution.sample_monthly(rng)?.max(-1.0);
    let draw = Decimal::from_f64(draw).ok_or_else(|| {
        SimulationError::calculation(format!("sampled return {draw} is not representable"))
    })?;
    Ok(ctx.round(draw))
}

fn historical_return(
    levers: &SimulationLevers,
    offset: usize,
    _rng: &mut dyn RngCore,
    ctx: &MathContext,
) -> Result<Decimal> {
    levers
        .historical
        .as_ref()
        .ok_or(SimulationError::missing("historical"))?
        .monthly_return(offset, ctx)
}

const SP_500_FIRST_YEAR: i16 = 1928;

const SP_500_ANNUAL_RETURNS: &[Decimal] = &[
    dec!(0.4381), dec!(-0.0830), dec!(-0.2512), dec!(-0.4384), dec!(-0.0864), dec!(0.4998),
    dec!(-0.0119), dec!(0.4674), dec!(0.3194), dec!(-0.3534), dec!(0.2928), dec!(-0.0110),
    dec!(-0.1067), dec!(-0.1277), dec!(0.1917), dec!(0.2506), dec!(0.1903), dec!(0.3582),
    dec!(-0.0843), dec!(0.0520), dec!(0.0570), dec!(0.1830), dec!(0.3081), dec!(0.2368),
    dec!(0.1815), dec!(-0.0121), dec!(0.5256), dec!(0.3260), dec!(0.0744), dec!(-0.1046),
    dec!(0.4372), dec!(0.1206), dec!(0.0034), dec!(0.2664), dec!(-0.0881), dec!(0.2261),
    dec!(0.1642), dec!(0.1240), dec!(-0.0997), dec!(0.2380), dec!(0.1081), dec!(-0.0824),
    dec!(0.0356), dec!(0.1422), dec!(0.1876), dec!(-0.1431), dec!(-0.2590), dec!(0.3700),
    dec!(0.2383), dec!(-0.0698), dec!(0.0651), dec!(0.1852), dec!(0.3174), dec!(-0.0470),
    dec!(0.2042), dec!(0.2234), dec!(0.0615), dec!(0.3124), dec!(0.1849), dec!(0.0581),
    dec!(0.1654), dec!(0.3148), dec!(-0.0306), dec!(0.3023), dec!(0.0749), dec!(0.0997),
    dec!(0.0133), dec!(0.3720), dec!(0.2268), dec!(0.3310), dec!(0.2834), dec!(0.2089),
    dec!(-0.0903), dec!(-0.1185), dec!(-0.2197), dec!(0.2836), dec!(0.1074), dec!(0.0483),
    dec!(0.1561), dec!(0.0548), dec!(-0.3655), dec!(0.2594), dec!(0.1482), dec!(0.0210),
    dec!(0.1589), dec!(0.3215), dec!(0.1352), dec!(0.0138), dec!(0.1177), dec!(0.2161),
    dec!(-0.0423), dec!(0.3121), dec!(0.1802), dec!(0.2847), dec!(-0.1804), dec!(0.2606),
];
