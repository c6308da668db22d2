//! Deterministic, stake-weighted validator election. Every honest node
//! that has collected the same quorum of [`ValidatorRand`] submissions for
//! a given parent block computes the same elected validator without any
//! further communication — the selection is a pure function of the
//! collected randomness and the current stake distribution.

use parking_lot::RwLock;
use postchain_core::account::AccountMapExt;
use postchain_core::params::ConsensusParams;
use postchain_core::{AccountMap, Transaction, ValidatorRand};
use std::collections::HashMap;

/// Validators eligible to be elected for the *next* block: everyone whose
/// stake strictly exceeds `validator_min_stake`, in ascending public-key
/// order so every node walks the same list.
pub fn eligible_validators(accounts: &AccountMap, params: &ConsensusParams) -> Vec<String> {
    let mut eligible: Vec<String> = accounts
        .iter()
        .filter(|(_, account)| account.stake > params.validator_min_stake)
        .map(|(pk, _)| pk.clone())
        .collect();
    eligible.sort();
    eligible
}

/// Combines a quorum of per-validator randomness into a single seed: the
/// wrapping sum of every submitted `rand` value. Order-independent because
/// addition commutes, so nodes that collected the same quorum in different
/// arrival orders still agree on the seed; `elect_validator` reduces it
/// modulo the total eligible stake.
pub fn combine_rand_seed(rands: &HashMap<String, u64>) -> u64 {
    rands.values().fold(0u64, |acc, rand| acc.wrapping_add(*rand))
}

/// Walks the eligible set ordered by stake ascending (ties broken by public
/// key ascending), picking the validator whose cumulative-stake bucket
/// contains `seed % total_stake`. Re-sorts internally rather than trusting
/// the caller's order, since `eligible_validators` returns its list sorted
/// by public key alone (useful for quorum-set comparison) and election
/// needs the distinct stake-ascending walk order every node must agree on.
pub fn elect_validator(eligible: &[String], accounts: &AccountMap, seed: u64) -> Option<String> {
    if eligible.is_empty() {
        return None;
    }
    let mut by_stake: Vec<(&String, u64)> = eligible.iter().map(|pk| (pk, accounts.stake_of(pk) as u64)).collect();
    by_stake.sort_by(|(pk_a, stake_a), (pk_b, stake_b)| stake_a.cmp(stake_b).then_with(|| pk_a.cmp(pk_b)));

    let total_stake: u64 = by_stake.iter().map(|(_, stake)| stake).sum();
    if total_stake == 0 {
        return None;
    }
    let mut pick = seed % total_stake;
    for (pk, stake) in &by_stake {
        if pick < *stake {
            return Some((*pk).clone());
        }
        pick -= stake;
    }
    by_stake.last().map(|(pk, _)| (*pk).clone())
}

/// Orders mempool transactions for inclusion: highest-stake sender first
/// (validators' own housekeeping transactions land in the block before
/// everyone else's), ties broken by transaction hash so the ordering is
/// fully deterministic, then truncated to `max_tx_per_block`.
pub fn select_block_transactions<'a>(
    pending: impl Iterator<Item = &'a Transaction>,
    accounts: &AccountMap,
    params: &ConsensusParams,
) -> Vec<&'a Transaction> {
    let mut txs: Vec<&Transaction> = pending.collect();
    txs.sort_by(|a, b| {
        let stake_a = accounts.stake_of(&a.source.source_pk_hex);
        let stake_b = accounts.stake_of(&b.source.source_pk_hex);
        stake_b
            .partial_cmp(&stake_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.tx_hash_hex().cmp(&b.tx_hash_hex()))
    });
    txs.truncate(params.max_tx_per_block);
    txs
}

/// Tracks, per parent block hash, the rand submissions collected so far
/// this round. Guarded by a `parking_lot::RwLock` so it can sit behind an
/// `Arc` shared between the round ticker and inbound gossip handlers
/// without needing the whole node's coarse lock held for reads.
#[derive(Debug, Default)]
pub struct RoundState {
    rands_by_parent: RwLock<HashMap<String, HashMap<String, ValidatorRand>>>,
}

impl RoundState {
    pub fn new() -> Self {
        RoundState::default()
    }

    /// Returns `true` if this is the first rand seen from this validator
    /// for this parent.
    pub fn accept_rand(&self, rand: ValidatorRand) -> bool {
        let mut by_parent = self.rands_by_parent.write();
        let slot = by_parent.entry(rand.previous_block_hash_hex.clone()).or_default();
        if slot.contains_key(&rand.validator_public_key_hex) {
            return false;
        }
        slot.insert(rand.validator_public_key_hex.clone(), rand);
        true
    }

    pub fn quorum_size(&self, parent_hash_hex: &str) -> usize {
        self.rands_by_parent.read().get(parent_hash_hex).map(HashMap::len).unwrap_or(0)
    }

    pub fn has_quorum(&self, parent_hash_hex: &str, min_validator_cnt: usize) -> bool {
        self.quorum_size(parent_hash_hex) >= min_validator_cnt
    }

    /// Eligible validators (`eligible`) that have not yet submitted rand for
    /// `parent_hash_hex` — the set `V \ R` from the missing-rands diagnostic.
    pub fn missing_validators(&self, parent_hash_hex: &str, eligible: &[String]) -> Vec<String> {
        let by_parent = self.rands_by_parent.read();
        let slot = by_parent.get(parent_hash_hex);
        eligible
            .iter()
            .filter(|pk| !slot.map(|s| s.contains_key(*pk)).unwrap_or(false))
            .cloned()
            .collect()
    }

    /// True iff the rand-submitter set for `parent_hash_hex` exactly equals
    /// `eligible` (`V == R`) and that set meets `min_validator_cnt` — the
    /// full-quorum gate election requires, as opposed to [`Self::has_quorum`]'s
    /// cardinality-only check.
    pub fn has_full_quorum(&self, parent_hash_hex: &str, eligible: &[String], min_validator_cnt: usize) -> bool {
        if eligible.len() < min_validator_cnt {
            return false;
        }
        self.missing_validators(parent_hash_hex, eligible).is_empty() && self.quorum_size(parent_hash_hex) == eligible.len()
    }

    /// Computes the elected validator for `parent_hash_hex` from whatever
    /// rand quorum has been collected. Callers should check
    /// [`RoundState::has_quorum`] first; an under-quorum election is still
    /// deterministic, just not yet authoritative.
    pub fn elect_for_parent(&self, parent_hash_hex: &str, accounts: &AccountMap, params: &ConsensusParams) -> Option<String> {
        let by_parent = self.rands_by_parent.read();
        let slot = by_parent.get(parent_hash_hex)?;
        let rands: HashMap<String, u64> = slot.iter().map(|(pk, r)| (pk.clone(), r.rand)).collect();
        let seed = combine_rand_seed(&rands);
        let eligible = eligible_validators(accounts, params);
        elect_validator(&eligible, accounts, seed)
    }

    /// Drops collected rands for parents other than the current head —
    /// called once a block is accepted so the map doesn't grow without
    /// bound across rounds.
    pub fn retain_only(&self, parent_hash_hex: &str) {
        let mut by_parent = self.rands_by_parent.write();
        by_parent.retain(|parent, _| parent == parent_hash_hex);
    }
}
