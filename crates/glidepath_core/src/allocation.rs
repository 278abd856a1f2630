//! Routing cash flows across accounts
//!
//! Splitting a flow is exact to the cent: every rule receives its rounded share
//! and the last rule in priority order absorbs whatever rounding left over.
//! Withdrawals additionally spill over when an account cannot cover its share.

use rust_decimal::Decimal;

use crate::error::Result;
use crate::model::{AccountId, Disbursement, Portfolio, RoutingConfiguration};
use crate::money::round_money;

/// Split `amount` across `routing` in priority order.
///
/// The returned amounts are never negative and always sum to exactly `amount`.
#[must_use]
pub fn split_flow(routing: &RoutingConfiguration, amount: Decimal) -> Vec<Disbursement> {
    let rules = routing.rules_by_priority();
    let mut remaining = amount;
    let mut shares = Vec::with_capacity(rules.len());
    let last = rules.len().saturating_sub(1);
    for (i, rule) in rules.into_iter().enumerate() {
        let share = if i == last {
            remaining
        } else {
            // Rounding up several shares must not overdraw the last one
            round_money(amount * rule.percentage).min(remaining)
        };
        remaining -= share;
        shares.push(Disbursement {
            account_id: rule.account_id,
            amount: share,
        });
    }
    shares
}

/// Credit `amount` to the portfolio according to `routing`
pub fn deposit(
    portfolio: &mut Portfolio,
    routing: &RoutingConfiguration,
    amount: Decimal,
) -> Result<Vec<Disbursement>> {
    if amount <= Decimal::ZERO {
        return Ok(Vec::new());
    }
    let shares = split_flow(routing, amount);
    for share in &shares {
        if !share.amount.is_zero() {
            portfolio.apply_flow(&share.account_id, share.amount)?;
        }
    }
    Ok(shares)
}

/// What a withdrawal actually took, split by tax character
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WithdrawalOutcome {
    /// Positive amounts taken from each account, in the order first touched
    pub flows: Vec<Disbursement>,
    /// Portion that counts as ordinary income
    pub taxable: Decimal,
    pub tax_free: Decimal,
    /// Requested but not available
    pub shortfall: Decimal,
}

impl WithdrawalOutcome {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.taxable + self.tax_free
    }

    /// Fold another withdrawal into this one, merging per-account amounts
    pub fn absorb(&mut self, other: WithdrawalOutcome) {
        for flow in other.flows {
            self.record(flow.account_id, flow.amount);
        }
        self.taxable += other.taxable;
        self.tax_free += other.tax_free;
        self.shortfall += other.shortfall;
    }

    fn record(&mut self, account_id: AccountId, amount: Decimal) {
        match self.flows.iter_mut().find(|f| f.account_id == account_id) {
            Some(existing) => existing.amount += amount,
            None => self.flows.push(Disbursement { account_id, amount }),
        }
    }

    fn take(
        &mut self,
        portfolio: &mut Portfolio,
        account_id: &AccountId,
        wanted: Decimal,
    ) -> Result<Decimal> {
        let available = portfolio.balance(account_id);
        let taken = wanted.min(available).max(Decimal::ZERO);
        if taken.is_zero() {
            return Ok(Decimal::ZERO);
        }
        portfolio.apply_flow(account_id, -taken)?;
        let taxable = portfolio
            .account(account_id)
            .is_some_and(|a| a.tax_treatment.withdrawal_is_taxable());
        if taxable {
            self.taxable += taken;
        } else {
            self.tax_free += taken;
        }
        self.record(account_id.clone(), taken);
        Ok(taken)
    }
}

/// Debit `amount` from the portfolio according to `routing`.
///
/// Each account first gives up to its routed share. Any unmet remainder is
/// then drawn from the routing's accounts in priority order, and whatever is
/// still missing is reported as shortfall.
pub fn withdraw(
    portfolio: &mut Portfolio,
    routing: &RoutingConfiguration,
    amount: Decimal,
) -> Result<WithdrawalOutcome> {
    let mut outcome = WithdrawalOutcome::default();
    if amount <= Decimal::ZERO {
        return Ok(outcome);
    }

    let mut unmet = Decimal::ZERO;
    for share in split_flow(routing, amount) {
        let taken = outcome.take(portfolio, &share.account_id, share.amount)?;
        unmet += share.amount - taken;
    }

    if unmet > Decimal::ZERO {
        for rule in routing.rules_by_priority() {
            if unmet.is_zero() {
                break;
            }
            unmet -= outcome.take(portfolio, &rule.account_id, unmet)?;
        }
    }

    outcome.shortfall = unmet;
    Ok(outcome)
}

/// Debit `amount` from `accounts`, draining each in turn
pub fn withdraw_in_order<'a>(
    portfolio: &mut Portfolio,
    accounts: impl IntoIterator<Item = &'a AccountId>,
    amount: Decimal,
) -> Result<WithdrawalOutcome> {
    let mut outcome = WithdrawalOutcome::default();
    let mut unmet = amount.max(Decimal::ZERO);
    for account_id in accounts {
        if unmet.is_zero() {
            break;
        }
        unmet -= outcome.take(portfolio, account_id, unmet)?;
    }
    outcome.shortfall = unmet;
    Ok(outcome)
}
