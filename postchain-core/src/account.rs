use std::collections::HashMap;

/// Balance and stake for a single public key. Accounts are never deleted:
/// an all-zero account and a missing entry are equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Account {
    pub balance: f64,
    pub stake: f64,
}

/// Keyed by `public_key_hex`. Missing entries are materialized with a
/// zero-valued [`Account`] the first time they're referenced — callers
/// should go through [`AccountMapExt::entry_or_default`] rather than
/// `HashMap::get` so reducer and validation code see the same defaulting
/// behavior.
pub type AccountMap = HashMap<String, Account>;

pub trait AccountMapExt {
    fn balance_of(&self, public_key_hex: &str) -> f64;
    fn stake_of(&self, public_key_hex: &str) -> f64;
    fn entry_or_default(&mut self, public_key_hex: &str) -> &mut Account;
}

impl AccountMapExt for AccountMap {
    fn balance_of(&self, public_key_hex: &str) -> f64 {
        self.get(public_key_hex).map(|a| a.balance).unwrap_or(0.0)
    }

    fn stake_of(&self, public_key_hex: &str) -> f64 {
        self.get(public_key_hex).map(|a| a.stake).unwrap_or(0.0)
    }

    fn entry_or_default(&mut self, public_key_hex: &str) -> &mut Account {
        self.entry(public_key_hex.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_account_reads_as_zero() {
        let accounts: AccountMap = AccountMap::new();
        assert_eq!(accounts.balance_of("nobody"), 0.0);
        assert_eq!(accounts.stake_of("nobody"), 0.0);
    }

    #[test]
    fn entry_or_default_materializes_in_place() {
        let mut accounts = AccountMap::new();
        accounts.entry_or_default("alice").balance += 10.0;
        assert_eq!(accounts.balance_of("alice"), 10.0);
    }
}
