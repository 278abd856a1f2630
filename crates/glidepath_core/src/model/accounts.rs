//! Accounts and the portfolio that holds them
//!
//! Balances are only ever changed through [`Portfolio::apply_flow`] and
//! [`Portfolio::apply_growth`], both of which are driven by the engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::AccountId;
use crate::error::{Result, SimulationError};
use crate::money::MathContext;

/// Tax treatment of withdrawals from an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxTreatment {
    /// Brokerage; withdrawals are treated as return of basis
    Taxable,
    /// 401k, Traditional IRA; withdrawals taxed as ordinary income
    TaxDeferred,
    /// Roth IRA, Roth 401k; withdrawals tax-free
    TaxFree,
}

impl TaxTreatment {
    /// Whether a withdrawal from this account counts as taxable income
    #[must_use]
    pub fn withdrawal_is_taxable(self) -> bool {
        matches!(self, TaxTreatment::TaxDeferred)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    #[serde(default)]
    pub name: String,
    pub tax_treatment: TaxTreatment,
    pub balance: Decimal,
}

impl Account {
    pub fn new(
        id: impl Into<AccountId>,
        tax_treatment: TaxTreatment,
        balance: Decimal,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            tax_treatment,
            balance,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Balance of one account at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub balance: Decimal,
}

/// The set of accounts under simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub accounts: Vec<Account>,
}

impl Portfolio {
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    /// Portfolio with no accounts
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| &a.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &AccountId) -> bool {
        self.account(id).is_some()
    }

    /// Balance of an account, zero if unknown
    #[must_use]
    pub fn balance(&self, id: &AccountId) -> Decimal {
        self.account(id).map_or(Decimal::ZERO, |a| a.balance)
    }

    #[must_use]
    pub fn total_balance(&self) -> Decimal {
        self.accounts.iter().map(|a| a.balance).sum()
    }

    /// Sum of balances across accounts with the given treatment
    #[must_use]
    pub fn balance_by_treatment(&self, treatment: TaxTreatment) -> Decimal {
        self.accounts
            .iter()
            .filter(|a| a.tax_treatment == treatment)
            .map(|a| a.balance)
            .sum()
    }

    #[must_use]
    pub fn balances(&self) -> Vec<AccountBalance> {
        self.accounts
            .iter()
            .map(|a| AccountBalance {
                account_id: a.id.clone(),
                balance: a.balance,
            })
            .collect()
    }

    /// Credit (positive) or debit (negative) an account.
    ///
    /// Returns the new balance. A debit that would take the balance below
    /// zero is refused and leaves the account unchanged.
    pub fn apply_flow(&mut self, id: &AccountId, amount: Decimal) -> Result<Decimal> {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| {
                SimulationError::validation("account_id", format!("no account with id '{id}'"))
            })?;
        let new_balance = account.balance + amount;
        if new_balance < Decimal::ZERO {
            return Err(SimulationError::calculation(format!(
                "flow of {amount} would leave account '{id}' at {new_balance}"
            )));
        }
        account.balance = new_balance;
        Ok(new_balance)
    }

    /// Compound every account by `monthly_rate`, rounding balances to cents.
    ///
    /// Returns the total change in value across the portfolio.
    pub fn apply_growth(&mut self, monthly_rate: Decimal, ctx: &MathContext) -> Decimal {
        let mut total_change = Decimal::ZERO;
        for account in &mut self.accounts {
            let grown = ctx.round_money(account.balance * (Decimal::ONE + monthly_rate));
            let grown = grown.max(Decimal::ZERO);
            total_change += grown - account.balance;
            account.balance = grown;
        }
        total_change
    }
}
