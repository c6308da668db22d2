use crate::transaction::Transaction;
use std::collections::{HashMap, HashSet};

/// Transactions waiting to be picked up into a block. Capacity-bounded so
/// an attacker can't grow memory without bound by flooding unconfirmed
/// transactions; once full, the lowest-fee entry is evicted to make room
/// for an incoming one (ties broken by insertion order, oldest evicted
/// first).
#[derive(Debug, Default)]
pub struct Mempool {
    pending: HashMap<String, Transaction>,
    order: Vec<String>,
    capacity: usize,
}

impl Mempool {
    pub fn new(capacity: usize) -> Self {
        Mempool {
            pending: HashMap::new(),
            order: Vec::new(),
            capacity,
        }
    }

    pub fn contains(&self, tx_hash_hex: &str) -> bool {
        self.pending.contains_key(tx_hash_hex)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns `true` if the transaction was newly accepted. Already-known
    /// transactions are ignored rather than replaced.
    pub fn insert(&mut self, tx: Transaction) -> bool {
        let hash = tx.tx_hash_hex();
        if self.pending.contains_key(&hash) {
            return false;
        }
        if self.capacity > 0 && self.pending.len() >= self.capacity {
            self.evict_lowest_fee();
        }
        self.order.push(hash.clone());
        self.pending.insert(hash, tx);
        true
    }

    fn evict_lowest_fee(&mut self) {
        let victim = self
            .order
            .iter()
            .min_by(|a, b| {
                let fee_a = self.pending.get(*a).and_then(|t| t.source.tx_fee).unwrap_or(0.0);
                let fee_b = self.pending.get(*b).and_then(|t| t.source.tx_fee).unwrap_or(0.0);
                fee_a.partial_cmp(&fee_b).unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();
        if let Some(hash) = victim {
            self.remove(&hash);
        }
    }

    pub fn remove(&mut self, tx_hash_hex: &str) -> Option<Transaction> {
        self.order.retain(|h| h != tx_hash_hex);
        self.pending.remove(tx_hash_hex)
    }

    /// Drops every transaction that made it into an applied block.
    pub fn remove_all(&mut self, tx_hash_hexes: impl IntoIterator<Item = String>) {
        for hash in tx_hash_hexes {
            self.remove(&hash);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.order.iter().filter_map(|h| self.pending.get(h))
    }
}

/// Tracks, per gossiped item, which peers are already known to have seen
/// it — so a node amplifies to each peer at most once per item
/// ("at-most-one-hop" fan-out) instead of re-broadcasting on every
/// duplicate inbound copy.
#[derive(Debug, Default)]
pub struct BroadcastSet {
    sent_to: HashMap<String, HashSet<String>>,
}

impl BroadcastSet {
    pub fn new() -> Self {
        BroadcastSet::default()
    }

    /// Records that `item_id` has been sent to `peer`. Returns `true` if
    /// this is the first time (i.e. the caller should actually send it).
    pub fn mark_sent(&mut self, item_id: &str, peer: &str) -> bool {
        self.sent_to.entry(item_id.to_string()).or_default().insert(peer.to_string())
    }

    pub fn already_sent(&self, item_id: &str, peer: &str) -> bool {
        self.sent_to.get(item_id).map(|peers| peers.contains(peer)).unwrap_or(false)
    }

    pub fn known_item(&self, item_id: &str) -> bool {
        self.sent_to.contains_key(item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionType;
    use crate::{TransactionSource, TransactionTarget};

    fn tx_with_fee(seed: u8, fee: f64) -> Transaction {
        let source = TransactionSource {
            source_pk_hex: hex::encode([seed; 32]),
            tx_type: TransactionType::Post,
            content_type: None,
            content_hash_hex: None,
            tx_fee: Some(fee),
        };
        Transaction::new(source, TransactionTarget::default(), seed as f64)
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut pool = Mempool::new(10);
        let tx = tx_with_fee(1, 1.0);
        assert!(pool.insert(tx.clone()));
        assert!(!pool.insert(tx));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn eviction_drops_lowest_fee_when_full() {
        let mut pool = Mempool::new(2);
        pool.insert(tx_with_fee(1, 5.0));
        pool.insert(tx_with_fee(2, 1.0));
        pool.insert(tx_with_fee(3, 9.0));
        assert_eq!(pool.len(), 2);
        let fees: Vec<f64> = pool.iter().filter_map(|t| t.source.tx_fee).collect();
        assert!(!fees.contains(&1.0));
    }

    #[test]
    fn broadcast_set_dedups_per_peer() {
        let mut set = BroadcastSet::new();
        assert!(set.mark_sent("h1", "peer-a"));
        assert!(!set.mark_sent("h1", "peer-a"));
        assert!(set.mark_sent("h1", "peer-b"));
    }
}
