//! The round ticker: once per second, checks whether this instant falls
//! on a rand-emission or block-proposal boundary for the configured
//! round period, mirroring the upstream service's `repeat_every(seconds=1)`
//! scheduler.

use crate::state::AppState;
use postchain_consensus::{eligible_validators, select_block_transactions};
use postchain_core::ports::KeyPairProvider;
use postchain_core::{validation, Block, ValidatorRand};
use postchain_gossip::{amplify, BLOCK_VALIDATION_PATH, VALIDATOR_RAND_PATH};
use rand::RngCore;
use tracing::{error, info, warn};

pub async fn run_round_ticker(app: AppState) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        interval.tick().await;
        let period = app.0.config.round_period_secs;
        if period == 0 {
            continue;
        }
        let now = app.now() as u64;
        if now % period == 0 {
            if let Err(err) = emit_rand(&app).await {
                error!(%err, "failed to emit validator rand");
            }
        } else if now % period == period / 2 {
            if let Err(err) = propose_block(&app).await {
                error!(%err, "failed to propose block");
            }
        }
    }
}

async fn emit_rand(app: &AppState) -> anyhow::Result<()> {
    let our_pk = app.0.keypair.public_key_hex();

    let (head_hash_hex, eligible) = {
        let state = app.0.state.lock().await;
        (state.chain.head_hash_hex().unwrap_or_default(), eligible_validators(&state.accounts, &app.0.params))
    };
    if !eligible.contains(&our_pk) {
        return Ok(());
    }

    let mut rand_bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut rand_bytes);
    let mut rand = ValidatorRand::new(head_hash_hex.clone(), our_pk.clone(), u64::from_be_bytes(rand_bytes), app.now());
    rand.sign_with(app.0.keypair.as_ref());

    let (body, peers, item_id) = {
        let mut state = app.0.state.lock().await;
        state.round.accept_rand(rand.clone());
        let item_id = format!("{head_hash_hex}:{our_pk}");
        let body = serde_json::json!({ "rand": rand.to_dict(), "origin": app.0.config.self_address });
        (body, state.peers.clone(), item_id)
    };

    let mut state = app.0.state.lock().await;
    amplify(&mut state.rand_broadcast, &peers, &app.0.config.self_address, "", &item_id, VALIDATOR_RAND_PATH, body, app.0.rpc.as_ref()).await;
    info!("emitted validator rand for parent {head_hash_hex}");
    Ok(())
}

async fn propose_block(app: &AppState) -> anyhow::Result<()> {
    let our_pk = app.0.keypair.public_key_hex();

    let (head_hash_hex, elected, has_full_quorum) = {
        let state = app.0.state.lock().await;
        let head = state.chain.head_hash_hex().unwrap_or_default();
        let eligible = eligible_validators(&state.accounts, &app.0.params);
        let elected = state.round.elect_for_parent(&head, &state.accounts, &app.0.params);
        let has_full_quorum = state.round.has_full_quorum(&head, &eligible, app.0.params.min_validator_cnt);
        if !has_full_quorum {
            let missing = state.round.missing_validators(&head, &eligible);
            if !missing.is_empty() {
                warn!(parent = %head, missing = ?missing, "round closed without a full rand quorum");
            }
        }
        (head, elected, has_full_quorum)
    };

    if !has_full_quorum || elected.as_deref() != Some(our_pk.as_str()) {
        return Ok(());
    }

    let (block, body, peers) = {
        let mut state = app.0.state.lock().await;
        let pending: Vec<_> = state.mempool.iter().cloned().collect();
        let selected: Vec<_> = select_block_transactions(pending.iter(), &state.accounts, &app.0.params)
            .into_iter()
            .cloned()
            .collect();

        let prev = if head_hash_hex.is_empty() { None } else { Some(head_hash_hex.clone()) };
        let mut block = Block::new(prev, selected, our_pk.clone(), app.now());
        block.sign_with(app.0.keypair.as_ref());

        validation::validate_block(
            &block,
            state.chain.head_hash_hex().as_deref(),
            &our_pk,
            &state.accounts,
            &app.0.params,
            &app.0.ico_allowed_keys,
            &app.0.scheme,
            app.now(),
        )?;

        let applied: Vec<String> = block.transactions.iter().map(|t| t.tx_hash_hex()).collect();
        postchain_core::reducer::apply_block(&mut state.accounts, &block, &app.0.params);
        state.mempool.remove_all(applied);
        state.chain.append(block.clone())?;
        state.round.retain_only(&block.block_hash_hex());

        let body = serde_json::json!({ "block": block.to_dict(), "origin": app.0.config.self_address });
        (block, body, state.peers.clone())
    };

    let mut state = app.0.state.lock().await;
    amplify(&mut state.block_broadcast, &peers, &app.0.config.self_address, "", &block.block_hash_hex(), BLOCK_VALIDATION_PATH, body, app.0.rpc.as_ref()).await;
    info!(transactions = block.transactions.len(), "proposed new block");
    Ok(())
}
