//! The account-state fold: turns an accepted block into mutations of an
//! [`AccountMap`]. Mirrors the upstream service's `update_account_dict` —
//! it trusts that `validation` has already rejected anything that would
//! make these mutations unsound (insufficient balance, over-unstaking,
//! an ICO outside genesis, ...).

use crate::account::AccountMapExt;
use crate::params::ConsensusParams;
use crate::transaction::Transaction;
use crate::types::TransactionType;
use crate::{Account, AccountMap, Block};

pub fn apply_transaction(accounts: &mut AccountMap, tx: &Transaction, is_genesis: bool) {
    if let Some(fee) = tx.source.tx_fee {
        accounts.entry_or_default(&tx.source.source_pk_hex).balance -= fee;
    }

    match tx.source.tx_type {
        TransactionType::Stake => {
            if let Some(amount) = tx.target.tx_token {
                let account = accounts.entry_or_default(&tx.source.source_pk_hex);
                account.balance -= amount;
                account.stake += amount;
            }
        }
        TransactionType::Transfer | TransactionType::Tip => {
            if let (Some(amount), Some(target_pk)) = (tx.target.tx_token, tx.target.target_pk_hex.as_ref()) {
                accounts.entry_or_default(&tx.source.source_pk_hex).balance -= amount;
                accounts.entry_or_default(target_pk).balance += amount;
            }
        }
        TransactionType::Ico => {
            if is_genesis {
                if let Some(amount) = tx.target.tx_token {
                    accounts.entry_or_default(&tx.source.source_pk_hex).stake += amount;
                }
            }
        }
        _ => {
            // Social transactions only ever move the fee debited above.
        }
    }
}

/// Folds every transaction in `block` into `accounts`, then credits the
/// block's validator with the fixed validation reward. Does not append
/// the block to any chain — callers own that separately.
pub fn apply_block(accounts: &mut AccountMap, block: &Block, params: &ConsensusParams) {
    for tx in &block.transactions {
        apply_transaction(accounts, tx, block.is_genesis());
    }
    accounts.entry_or_default(&block.validator_public_key_hex).balance += params.validation_reward;
}

/// Replays an entire chain from an empty account map, for rebuilding state
/// after a restart or a fork switch.
pub fn rebuild_accounts<'a>(blocks: impl Iterator<Item = &'a Block>, params: &ConsensusParams) -> AccountMap {
    let mut accounts: AccountMap = AccountMap::new();
    for block in blocks {
        apply_block(&mut accounts, block, params);
    }
    accounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TransactionSource, TransactionTarget};

    fn tx(tx_type: TransactionType, source: &str, target: Option<&str>, token: Option<f64>) -> Transaction {
        let src = TransactionSource {
            source_pk_hex: source.to_string(),
            tx_type,
            content_type: None,
            content_hash_hex: None,
            tx_fee: None,
        };
        let tgt = TransactionTarget {
            target_tx_hash_hex: None,
            target_pk_hex: target.map(|s| s.to_string()),
            tx_token: token,
            tx_object: None,
        };
        Transaction::new(src, tgt, 0.0)
    }

    #[test]
    fn stake_moves_balance_into_stake() {
        let mut accounts: AccountMap = AccountMap::new();
        accounts.insert("alice".into(), Account { balance: 100.0, stake: 0.0 });
        apply_transaction(&mut accounts, &tx(TransactionType::Stake, "alice", None, Some(30.0)), false);
        let alice = accounts["alice"];
        assert_eq!(alice.balance, 70.0);
        assert_eq!(alice.stake, 30.0);
    }

    #[test]
    fn negative_stake_unstakes() {
        let mut accounts: AccountMap = AccountMap::new();
        accounts.insert("alice".into(), Account { balance: 70.0, stake: 30.0 });
        apply_transaction(&mut accounts, &tx(TransactionType::Stake, "alice", None, Some(-10.0)), false);
        let alice = accounts["alice"];
        assert_eq!(alice.balance, 80.0);
        assert_eq!(alice.stake, 20.0);
    }

    #[test]
    fn transfer_conserves_total_balance() {
        let mut accounts: AccountMap = AccountMap::new();
        accounts.insert("alice".into(), Account { balance: 100.0, stake: 0.0 });
        apply_transaction(&mut accounts, &tx(TransactionType::Transfer, "alice", Some("bob"), Some(40.0)), false);
        assert_eq!(accounts["alice"].balance, 60.0);
        assert_eq!(accounts["bob"].balance, 40.0);
    }

    #[test]
    fn ico_only_applies_in_genesis() {
        let mut accounts: AccountMap = AccountMap::new();
        apply_transaction(&mut accounts, &tx(TransactionType::Ico, "alice", None, Some(1_000_000.0)), false);
        assert_eq!(accounts.get("alice"), None);

        apply_transaction(&mut accounts, &tx(TransactionType::Ico, "alice", None, Some(1_000_000.0)), true);
        assert_eq!(accounts["alice"].stake, 1_000_000.0);
    }

    #[test]
    fn social_transaction_only_debits_fee() {
        let mut accounts: AccountMap = AccountMap::new();
        accounts.insert("alice".into(), Account { balance: 10.0, stake: 0.0 });
        let mut post = tx(TransactionType::Post, "alice", None, None);
        post.source.tx_fee = Some(1.0);
        apply_transaction(&mut accounts, &post, false);
        assert_eq!(accounts["alice"].balance, 9.0);
    }

    #[test]
    fn block_application_credits_validator_reward() {
        let params = ConsensusParams::default();
        let mut accounts: AccountMap = AccountMap::new();
        let block = Block::new(None, vec![], "validator".into(), 0.0);
        apply_block(&mut accounts, &block, &params);
        assert_eq!(accounts["validator"].balance, params.validation_reward);
    }
}
