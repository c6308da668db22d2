use anyhow::{Context, Result};
use postchain_core::block::BlockDict;
use postchain_core::ports::{RpcClient, SignatureScheme};
use postchain_core::{reducer, validation, AccountMap, Block, Chain, ConsensusParams};
use postchain_gossip::{PeerSet, BLOCKCHAIN_PATH};
use std::path::Path;

pub fn load_ico_allowed_keys(path: Option<&Path>) -> Result<Vec<String>> {
    let Some(path) = path else { return Ok(Vec::new()) };
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let keys: Vec<String> = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(keys)
}

/// Loads a chain from a JSON array of [`BlockDict`]s (genesis first) and
/// replays it to reconstruct the account map. Returns an empty chain if
/// no path is configured or the file doesn't exist yet — a freshly
/// bootstrapped node expects to catch up via `join_network` instead.
pub fn load_initial_chain(path: Option<&Path>, params: &ConsensusParams) -> Result<(Chain, postchain_core::AccountMap)> {
    let Some(path) = path else {
        return Ok((Chain::new(), postchain_core::AccountMap::new()));
    };
    if !path.exists() {
        return Ok((Chain::new(), postchain_core::AccountMap::new()));
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let dicts: Vec<BlockDict> = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    let blocks: Vec<Block> = dicts
        .into_iter()
        .map(Block::from_dict)
        .collect::<Result<_, _>>()
        .context("decoding blocks from init blockchain file")?;
    let chain = Chain::from_blocks(blocks).context("linking initial chain")?;
    let accounts = reducer::rebuild_accounts(chain.to_vec().into_iter(), params);
    Ok((chain, accounts))
}

/// The third join step: pull `GET /blockchain` from every known peer and
/// adopt the longest candidate that validates in full, oldest-first. A
/// joining node hasn't collected any rand quorum for the rounds behind it,
/// so each ancestor block is trusted as authored by the validator key it
/// carries rather than re-run through election — everything else
/// (signatures, balances, linkage) is still checked exactly as on the live
/// path. Peers that are unreachable, return malformed JSON, or offer a
/// chain that fails validation are skipped rather than failing the join.
pub async fn sync_chain_from_peers(
    peers: &PeerSet,
    rpc: &dyn RpcClient,
    scheme: &dyn SignatureScheme,
    ico_allowed_keys: &[String],
    params: &ConsensusParams,
    now: f64,
) -> Option<(Chain, AccountMap)> {
    let mut best: Option<(Chain, AccountMap)> = None;

    for peer in peers.iter() {
        let Ok(value) = rpc.get(peer, BLOCKCHAIN_PATH).await else { continue };
        let Ok(mut dicts) = serde_json::from_value::<Vec<BlockDict>>(value) else { continue };
        dicts.reverse(); // the route returns head-first; replay wants genesis-first
        let Ok(blocks) = dicts.into_iter().map(Block::from_dict).collect::<Result<Vec<Block>, _>>() else { continue };
        if blocks.is_empty() {
            continue;
        }
        if let Some((best_chain, _)) = &best {
            if blocks.len() <= best_chain.len() {
                continue;
            }
        }
        let Ok(accounts) = replay_and_validate(&blocks, scheme, ico_allowed_keys, params, now) else { continue };
        let Ok(chain) = Chain::from_blocks(blocks) else { continue };
        best = Some((chain, accounts));
    }

    best
}

fn replay_and_validate(
    blocks: &[Block],
    scheme: &dyn SignatureScheme,
    ico_allowed_keys: &[String],
    params: &ConsensusParams,
    now: f64,
) -> anyhow::Result<AccountMap> {
    let mut accounts = AccountMap::new();
    let mut prev_hash_hex: Option<String> = None;
    for block in blocks {
        validation::validate_block(
            block,
            prev_hash_hex.as_deref(),
            &block.validator_public_key_hex,
            &accounts,
            params,
            ico_allowed_keys,
            scheme,
            now,
        )
        .map_err(|e| anyhow::anyhow!(e))?;
        reducer::apply_block(&mut accounts, block, params);
        prev_hash_hex = Some(block.block_hash_hex());
    }
    Ok(accounts)
}
