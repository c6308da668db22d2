//! Acceptance rules applied before anything is folded into state or
//! amplified to peers. Kept separate from [`crate::reducer`] so the
//! "is this allowed" question and the "what does applying it do"
//! question can be reasoned about (and tested) independently.

use crate::account::AccountMapExt;
use crate::block::Block;
use crate::error::ValidationError;
use crate::params::ConsensusParams;
use crate::ports::SignatureScheme;
use crate::transaction::Transaction;
use crate::types::TransactionType;
use crate::validator_rand::ValidatorRand;
use crate::AccountMap;

fn fractional_part(value: f64) -> f64 {
    value.fract().abs()
}

pub fn validate_transaction(
    tx: &Transaction,
    accounts: &AccountMap,
    params: &ConsensusParams,
    ico_allowed_keys: &[String],
    scheme: &dyn SignatureScheme,
    now: f64,
    is_genesis: bool,
) -> Result<(), ValidationError> {
    if !tx.verify_signature(scheme) {
        return Err(ValidationError::SignatureInvalid);
    }
    if tx.timestamp > now {
        return Err(ValidationError::TimestampFuture);
    }
    if let Some(fee) = tx.source.tx_fee {
        if fee < 0.0 {
            return Err(ValidationError::FeeNegative);
        }
    }

    match tx.source.tx_type {
        TransactionType::Stake => validate_stake(tx, accounts),
        TransactionType::Transfer => validate_transfer(tx, accounts),
        TransactionType::Tip => validate_tip(tx, accounts),
        TransactionType::Ico => validate_ico(tx, params, ico_allowed_keys, is_genesis),
        _ => Ok(()),
    }
}

fn validate_stake(tx: &Transaction, accounts: &AccountMap) -> Result<(), ValidationError> {
    let amount = tx
        .target
        .tx_token
        .ok_or(ValidationError::StakeInvalid("missing tx_token"))?;
    if fractional_part(amount) != 0.0 {
        return Err(ValidationError::StakeInvalid("tx_token must be an integer amount"));
    }
    let account = *accounts.get(&tx.source.source_pk_hex).ok_or(ValidationError::AccountMissing)?;
    if amount >= 0.0 {
        if account.balance < amount {
            return Err(ValidationError::StakeInvalid("insufficient balance"));
        }
    } else if account.stake < -amount {
        return Err(ValidationError::StakeInvalid("cannot unstake more than staked"));
    }
    Ok(())
}

fn validate_transfer(tx: &Transaction, accounts: &AccountMap) -> Result<(), ValidationError> {
    let amount = tx
        .target
        .tx_token
        .ok_or(ValidationError::TransferInvalid("missing tx_token"))?;
    if amount <= 0.0 {
        return Err(ValidationError::TransferInvalid("tx_token must be positive"));
    }
    if tx.target.target_pk_hex.is_none() {
        return Err(ValidationError::TransferInvalid("missing target_public_key_hex"));
    }
    let account = accounts.get(&tx.source.source_pk_hex).ok_or(ValidationError::AccountMissing)?;
    let required = amount + tx.source.tx_fee.unwrap_or(0.0);
    if account.balance < required {
        return Err(ValidationError::TransferInvalid("insufficient balance"));
    }
    Ok(())
}

fn validate_tip(tx: &Transaction, accounts: &AccountMap) -> Result<(), ValidationError> {
    let amount = tx.target.tx_token.ok_or(ValidationError::TipInvalid("missing tx_token"))?;
    if amount <= 0.0 {
        return Err(ValidationError::TipInvalid("tx_token must be positive"));
    }
    if tx.target.target_pk_hex.is_none() {
        return Err(ValidationError::TipInvalid("missing target_public_key_hex"));
    }
    if tx.target.target_tx_hash_hex.is_none() {
        return Err(ValidationError::TipInvalid("missing target_transaction_hash_hex"));
    }
    let account = accounts.get(&tx.source.source_pk_hex).ok_or(ValidationError::AccountMissing)?;
    let required = amount + tx.source.tx_fee.unwrap_or(0.0);
    if account.balance < required {
        return Err(ValidationError::TipInvalid("insufficient balance"));
    }
    Ok(())
}

fn validate_ico(tx: &Transaction, params: &ConsensusParams, ico_allowed_keys: &[String], is_genesis: bool) -> Result<(), ValidationError> {
    if !is_genesis {
        return Err(ValidationError::IcoOutsideGenesis);
    }
    if !ico_allowed_keys.iter().any(|k| k == &tx.source.source_pk_hex) {
        return Err(ValidationError::IcoInvalid("source_public_key_hex is not on the ICO allow-list"));
    }
    match tx.target.tx_token {
        Some(amount) if amount == params.ico_tokens => Ok(()),
        Some(_) => Err(ValidationError::IcoInvalid("tx_token must equal the configured ico_tokens amount")),
        None => Err(ValidationError::IcoInvalid("missing tx_token")),
    }
}

/// Validates a block already known to extend the current head. `elected_validator_pk`
/// is the outcome of the deterministic election for this round — computed by
/// `postchain-consensus`, not by this crate.
pub fn validate_block(
    block: &Block,
    head_hash_hex: Option<&str>,
    elected_validator_pk: &str,
    accounts: &AccountMap,
    params: &ConsensusParams,
    ico_allowed_keys: &[String],
    scheme: &dyn SignatureScheme,
    now: f64,
) -> Result<(), ValidationError> {
    if !block.verify_signature(scheme) {
        return Err(ValidationError::BlockSignatureInvalid);
    }
    if block.timestamp > now {
        return Err(ValidationError::TimestampFuture);
    }
    if block.previous_block_hash_hex.as_deref() != head_hash_hex {
        return Err(ValidationError::NotHead);
    }
    if block.validator_public_key_hex != elected_validator_pk {
        return Err(ValidationError::ValidatorMismatch);
    }
    if block.transactions.len() > params.max_tx_per_block {
        return Err(ValidationError::TransferInvalid("too many transactions for one block"));
    }

    let is_genesis = block.is_genesis();
    let mut scratch = accounts.clone();
    for tx in &block.transactions {
        validate_transaction(tx, &scratch, params, ico_allowed_keys, scheme, now, is_genesis)?;
        crate::reducer::apply_transaction(&mut scratch, tx, is_genesis);
    }
    Ok(())
}

pub fn validate_rand(
    rand: &ValidatorRand,
    expected_previous_hash_hex: &str,
    scheme: &dyn SignatureScheme,
    now: f64,
) -> Result<(), ValidationError> {
    if !rand.verify_signature(scheme) {
        return Err(ValidationError::RandInvalid("signature"));
    }
    if rand.timestamp > now {
        return Err(ValidationError::TimestampFuture);
    }
    if rand.previous_block_hash_hex != expected_previous_hash_hex {
        return Err(ValidationError::RandInvalid("does not extend the current head"));
    }
    Ok(())
}
