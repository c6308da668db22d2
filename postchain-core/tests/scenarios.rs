//! End-to-end scenarios exercising the data model, reducer, and validation
//! together as a node would use them, without any network or consensus-
//! timing machinery.

use postchain_core::ports::SignatureScheme;
use postchain_core::{
    reducer, validation, AccountMap, Block, Chain, ConsensusParams, Transaction, TransactionSource, TransactionTarget,
    TransactionType, ValidationError,
};

struct AlwaysValid;
impl SignatureScheme for AlwaysValid {
    fn verify(&self, _pk: &str, _msg: &[u8], _sig: &[u8]) -> bool {
        true
    }
    fn sign(&self, _sk: &str, msg: &[u8]) -> Vec<u8> {
        msg.to_vec()
    }
}

fn ico_tx(source_pk: &str, tokens: f64, timestamp: f64) -> Transaction {
    let source = TransactionSource {
        source_pk_hex: source_pk.to_string(),
        tx_type: TransactionType::Ico,
        content_type: None,
        content_hash_hex: None,
        tx_fee: None,
    };
    let target = TransactionTarget {
        tx_token: Some(tokens),
        ..Default::default()
    };
    let mut tx = Transaction::new(source, target, timestamp);
    tx.sign(&AlwaysValid, "secret");
    tx
}

#[test]
fn e1_genesis_ico_credits_stake_and_rewards_validator() {
    let params = ConsensusParams::default();
    let allowed = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
    let txs: Vec<Transaction> = allowed.iter().map(|pk| ico_tx(pk, params.ico_tokens, 0.0)).collect();

    let mut genesis = Block::new(None, txs, "a".to_string(), 0.0);
    genesis.sign(&AlwaysValid, "secret");

    let accounts = AccountMap::new();
    validation::validate_block(&genesis, None, "a", &accounts, &params, &allowed, &AlwaysValid, 1.0)
        .expect("genesis block should validate");

    let chain = Chain::from_blocks(vec![genesis]).unwrap();
    let accounts = reducer::rebuild_accounts(chain.to_vec().into_iter(), &params);

    for pk in &allowed {
        assert_eq!(accounts.get(pk).unwrap().stake, params.ico_tokens);
    }
    assert_eq!(accounts.get("a").unwrap().balance, params.validation_reward);
    for pk in ["b", "c", "d"] {
        assert_eq!(accounts.get(pk).unwrap().balance, 0.0);
    }
}

fn chain_after_genesis() -> (Chain, AccountMap, ConsensusParams, Vec<String>) {
    let params = ConsensusParams::default();
    let allowed = vec!["a".to_string(), "b".to_string()];
    let txs: Vec<Transaction> = allowed.iter().map(|pk| ico_tx(pk, params.ico_tokens, 0.0)).collect();
    let mut genesis = Block::new(None, txs, "a".to_string(), 0.0);
    genesis.sign(&AlwaysValid, "secret");
    let chain = Chain::from_blocks(vec![genesis]).unwrap();
    let accounts = reducer::rebuild_accounts(chain.to_vec().into_iter(), &params);
    (chain, accounts, params, allowed)
}

#[test]
fn e2_transfer_with_fee_debits_sender_and_credits_target() {
    let (mut chain, accounts, params, allowed) = chain_after_genesis();

    // Give "a" enough spare balance that a transfer-plus-fee validates;
    // a is credited VALIDATION_REWARD (100) from the genesis block alone,
    // so grant it headroom via a second funded round instead of relying on
    // that reward to cover the whole transfer.
    let mut funded = accounts.clone();
    funded.get_mut("a").unwrap().balance += 10_000.0;

    let source = TransactionSource {
        source_pk_hex: "a".into(),
        tx_type: TransactionType::Transfer,
        content_type: None,
        content_hash_hex: None,
        tx_fee: Some(10.0),
    };
    let target = TransactionTarget {
        target_pk_hex: Some("b".into()),
        tx_token: Some(1000.0),
        ..Default::default()
    };
    let mut transfer = Transaction::new(source, target, 1.0);
    transfer.sign(&AlwaysValid, "secret");

    let head_hash_hex = chain.head_hash_hex();
    let mut block2 = Block::new(head_hash_hex.clone(), vec![transfer], "b".to_string(), 1.0);
    block2.sign(&AlwaysValid, "secret");

    validation::validate_block(
        &block2,
        head_hash_hex.as_deref(),
        "b",
        &funded,
        &params,
        &allowed,
        &AlwaysValid,
        2.0,
    )
    .expect("funded transfer should validate");

    chain.append(block2).unwrap();
    let accounts = reducer::rebuild_accounts(chain.to_vec().into_iter(), &params);

    assert_eq!(accounts.get("a").unwrap().balance, 10_000.0 + params.validation_reward - 1010.0);
    assert_eq!(accounts.get("b").unwrap().balance, params.validation_reward + 1000.0);
}

#[test]
fn e3_overspend_transfer_rejected() {
    let (_chain, accounts, params, allowed) = chain_after_genesis();

    let source = TransactionSource {
        source_pk_hex: "a".into(),
        tx_type: TransactionType::Transfer,
        content_type: None,
        content_hash_hex: None,
        tx_fee: None,
    };
    let target = TransactionTarget {
        target_pk_hex: Some("b".into()),
        tx_token: Some(params.validation_reward + 1.0),
        ..Default::default()
    };
    let mut overspend = Transaction::new(source, target, 1.0);
    overspend.sign(&AlwaysValid, "secret");

    let err = validation::validate_transaction(&overspend, &accounts, &params, &allowed, &AlwaysValid, 2.0, false)
        .unwrap_err();
    assert_eq!(err.to_string(), "transfer transaction invalid: insufficient balance");
}

#[test]
fn e6_block_not_extending_head_is_rejected_and_state_unchanged() {
    let (chain, accounts, params, allowed) = chain_after_genesis();
    let before = accounts.clone();

    let mut stray = Block::new(Some("not-the-real-head".repeat(4)), vec![], "a".to_string(), 1.0);
    stray.sign(&AlwaysValid, "secret");

    let err = validation::validate_block(
        &stray,
        chain.head_hash_hex().as_deref(),
        "a",
        &accounts,
        &params,
        &allowed,
        &AlwaysValid,
        2.0,
    )
    .unwrap_err();

    assert_eq!(err, ValidationError::NotHead);
    assert_eq!(accounts, before);
    assert_eq!(chain.len(), 1);
}
