//! Routing rules describing how one cash flow splits across accounts
//!
//! A [`RoutingConfiguration`] is validated once when it is built and is
//! immutable afterwards. Changing routing mid-simulation means building a new
//! configuration and scheduling it with a [`RoutingSchedule`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::ids::AccountId;
use crate::date_math::YearMonth;
use crate::error::{Result, SimulationError};

/// Allowed deviation of the summed percentages from 1.0
pub const ALLOCATION_TOLERANCE: Decimal = dec!(0.001);

/// One account's share of a routed flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub account_id: AccountId,
    /// Fraction of the flow in `[0, 1]`
    pub percentage: Decimal,
    /// Disbursement order; lower goes first
    pub priority: u32,
}

impl RoutingRule {
    pub fn new(account_id: impl Into<AccountId>, percentage: Decimal, priority: u32) -> Self {
        Self {
            account_id: account_id.into(),
            percentage,
            priority,
        }
    }
}

/// Amount actually moved for one account when a flow was routed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disbursement {
    pub account_id: AccountId,
    pub amount: Decimal,
}

/// Validated, immutable set of routing rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RoutingRule>", into = "Vec<RoutingRule>")]
pub struct RoutingConfiguration {
    rules: Vec<RoutingRule>,
}

impl RoutingConfiguration {
    #[must_use]
    pub fn builder() -> RoutingConfigurationBuilder {
        RoutingConfigurationBuilder::default()
    }

    /// Route 100% of a flow to one account
    pub fn single_account(account_id: impl Into<AccountId>) -> Self {
        Self {
            rules: vec![RoutingRule::new(account_id, Decimal::ONE, 0)],
        }
    }

    /// Rules in insertion order. The slice is read-only; callers cannot
    /// alter the configuration through it.
    #[must_use]
    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// An owned copy of the rules sorted by ascending priority.
    /// Rules with equal priority keep their insertion order.
    #[must_use]
    pub fn rules_by_priority(&self) -> Vec<RoutingRule> {
        let mut sorted = self.rules.clone();
        sorted.sort_by_key(|r| r.priority);
        sorted
    }

    #[must_use]
    pub fn total_percentage(&self) -> Decimal {
        self.rules.iter().map(|r| r.percentage).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn account_ids(&self) -> impl Iterator<Item = &AccountId> {
        self.rules.iter().map(|r| &r.account_id)
    }

    fn validate(rules: Vec<RoutingRule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(SimulationError::validation(
                "rules",
                "routing configuration needs at least one rule",
            ));
        }
        for rule in &rules {
            if rule.percentage < Decimal::ZERO || rule.percentage > Decimal::ONE {
                return Err(SimulationError::validation(
                    "percentage",
                    format!(
                        "percentage for account '{}' must be between 0 and 1, but was {}",
                        rule.account_id, rule.percentage
                    ),
                ));
            }
        }
        let total: Decimal = rules.iter().map(|r| r.percentage).sum();
        if (total - Decimal::ONE).abs() > ALLOCATION_TOLERANCE {
            let shown = (total * Decimal::ONE_HUNDRED).normalize();
            return Err(SimulationError::InvalidAllocation {
                message: format!("Routing percentages must sum to 100%, but was {shown}%"),
                actual: total,
            });
        }
        Ok(Self { rules })
    }
}

impl TryFrom<Vec<RoutingRule>> for RoutingConfiguration {
    type Error = SimulationError;

    fn try_from(rules: Vec<RoutingRule>) -> Result<Self> {
        Self::validate(rules)
    }
}

impl From<RoutingConfiguration> for Vec<RoutingRule> {
    fn from(value: RoutingConfiguration) -> Self {
        value.rules
    }
}

/// Accumulates rules for a [`RoutingConfiguration`]
#[derive(Debug, Clone, Default)]
pub struct RoutingConfigurationBuilder {
    rules: Vec<RoutingRule>,
}

impl RoutingConfigurationBuilder {
    /// Add a rule with a fractional percentage (0.25 = 25%)
    #[must_use]
    pub fn add_rule(
        mut self,
        account_id: impl Into<AccountId>,
        percentage: Decimal,
        priority: u32,
    ) -> Self {
        self.rules
            .push(RoutingRule::new(account_id, percentage, priority));
        self
    }

    /// Add a rule with a whole-number percentage (25 = 25%)
    #[must_use]
    pub fn add_rule_percent(
        self,
        account_id: impl Into<AccountId>,
        percentage: Decimal,
        priority: u32,
    ) -> Self {
        self.add_rule(account_id, percentage / Decimal::ONE_HUNDRED, priority)
    }

    pub fn build(self) -> Result<RoutingConfiguration> {
        RoutingConfiguration::validate(self.rules)
    }
}

/// Routing that may change at scheduled months
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingSchedule {
    pub initial: RoutingConfiguration,
    /// `(effective month, configuration)` pairs
    #[serde(default)]
    pub changes: Vec<(YearMonth, RoutingConfiguration)>,
}

impl RoutingSchedule {
    #[must_use]
    pub fn new(initial: RoutingConfiguration) -> Self {
        Self {
            initial,
            changes: Vec::new(),
        }
    }

    /// Switch to `routing` from `effective` onward
    #[must_use]
    pub fn change_at(mut self, effective: YearMonth, routing: RoutingConfiguration) -> Self {
        self.changes.push((effective, routing));
        self.changes.sort_by_key(|(month, _)| *month);
        self
    }

    /// Configuration in force during `month`
    #[must_use]
    pub fn active_at(&self, month: YearMonth) -> &RoutingConfiguration {
        self.changes
            .iter()
            .rev()
            .find(|(effective, _)| *effective <= month)
            .map_or(&self.initial, |(_, routing)| routing)
    }

    /// Every configuration this schedule can return
    pub fn configurations(&self) -> impl Iterator<Item = &RoutingConfiguration> {
        std::iter::once(&self.initial).chain(self.changes.iter().map(|(_, r)| r))
    }
}

impl From<RoutingConfiguration> for RoutingSchedule {
    fn from(value: RoutingConfiguration) -> Self {
        RoutingSchedule::new(value)
    }
}
