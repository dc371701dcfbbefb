//! Account lookup.

use std::collections::HashSet;
use std::future::Future;

use super::model::{Account, AccountId};
use super::validation::validate_account;
use crate::{Error, Result};

/// Read-only access to stored accounts.
///
/// The engine never writes accounts back.
pub trait AccountStore: Send + Sync + 'static {
    /// Looks up an account by email address (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no account matches.
    fn by_email(&self, email: &str) -> impl Future<Output = Result<Account>> + Send;

    /// Looks up an account by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no account matches.
    fn by_id(&self, id: AccountId) -> impl Future<Output = Result<Account>> + Send;
}

/// Accounts held in memory, typically loaded from a config file.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountStore {
    accounts: Vec<Account>,
}

impl MemoryAccountStore {
    /// Validates and stores `accounts`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid account or a duplicate id or email.
    pub fn new(accounts: Vec<Account>) -> Result<Self> {
        let mut ids = HashSet::new();
        let mut emails = HashSet::new();

        for account in &accounts {
            if let Err(errors) = validate_account(account) {
                let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
                return Err(Error::Config(format!(
                    "account {}: {}",
                    account.id,
                    reasons.join(", ")
                )));
            }
            if !ids.insert(account.id) {
                return Err(Error::Config(format!("duplicate account id {}", account.id)));
            }
            if !emails.insert(account.email.to_lowercase()) {
                return Err(Error::Config(format!("duplicate account {}", account.email)));
            }
        }

        Ok(Self { accounts })
    }

    /// All accounts, in load order.
    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }
}

impl AccountStore for MemoryAccountStore {
    async fn by_email(&self, email: &str) -> Result<Account> {
        self.accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| Error::AccountNotFound(email.to_string()))
    }

    async fn by_id(&self, id: AccountId) -> Result<Account> {
        self.accounts
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| Error::AccountNotFound(id.to_string()))
    }
}
