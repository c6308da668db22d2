//! A single-owner, arena-backed chain: blocks are stored by hash in a map
//! rather than linked to each other, so there's no `Block` ↔ `Block`
//! ownership cycle to fight the borrow checker over. Only the head hash
//! is tracked; ancestry is recovered by following `previous_block_hash_hex`
//! backward through the arena.

use crate::block::Block;
use crate::error::{CoreError, ValidationError};
use crate::{hash_from_hex, hash_to_hex};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Chain {
    blocks: HashMap<[u8; 32], Block>,
    head: Option<[u8; 32]>,
}

impl Chain {
    pub fn new() -> Self {
        Chain::default()
    }

    pub fn head_hash(&self) -> Option<[u8; 32]> {
        self.head
    }

    pub fn head_hash_hex(&self) -> Option<String> {
        self.head.map(|h| hash_to_hex(&h))
    }

    pub fn head(&self) -> Option<&Block> {
        self.head.and_then(|h| self.blocks.get(&h))
    }

    pub fn get(&self, hash: &[u8; 32]) -> Option<&Block> {
        self.blocks.get(hash)
    }

    pub fn get_hex(&self, hash_hex: &str) -> Option<&Block> {
        hash_from_hex(hash_hex).ok().and_then(|h| self.get(&h))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Appends a block that must extend the current head exactly (or be a
    /// genesis block when the chain is empty). Rejects anything else with
    /// [`ValidationError::NotHead`] — forks and reorgs aren't modeled;
    /// the longest-chain adoption a node performs on join happens by
    /// replaying a full peer chain through [`Chain::from_blocks`], not by
    /// appending onto a divergent local head.
    pub fn append(&mut self, block: Block) -> Result<(), CoreError> {
        let expected_prev = self.head_hash_hex();
        if block.previous_block_hash_hex != expected_prev {
            return Err(ValidationError::NotHead.into());
        }
        let hash = block.block_hash;
        self.head = Some(hash);
        self.blocks.insert(hash, block);
        Ok(())
    }

    /// Walks from the head back to genesis, returning blocks oldest-first —
    /// the order `reducer::rebuild_accounts` and `from_blocks` expect.
    pub fn to_vec(&self) -> Vec<&Block> {
        let mut out = self.to_vec_head_first();
        out.reverse();
        out
    }

    /// Walks from the head back to genesis, returning blocks head-first —
    /// the order the `GET /blockchain` route exposes to peers.
    pub fn to_vec_head_first(&self) -> Vec<&Block> {
        let mut out = Vec::with_capacity(self.blocks.len());
        let mut cursor = self.head;
        while let Some(hash) = cursor {
            let Some(block) = self.blocks.get(&hash) else { break };
            cursor = block
                .previous_block_hash_hex
                .as_deref()
                .and_then(|h| hash_from_hex(h).ok());
            out.push(block);
        }
        out
    }

    /// Rebuilds a chain from an ordered, genesis-first list of blocks,
    /// validating only linkage (hash-chaining), not transaction content —
    /// callers that need full validation should replay through
    /// `postchain_core::validation` block by block.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, CoreError> {
        let mut chain = Chain::new();
        for block in blocks {
            chain.append(block)?;
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(prev: Option<String>, validator: &str, ts: f64) -> Block {
        Block::new(prev, vec![], validator.to_string(), ts)
    }

    #[test]
    fn genesis_then_linked_blocks_append() {
        let mut chain = Chain::new();
        let genesis = block(None, "v1", 0.0);
        let genesis_hash_hex = genesis.block_hash_hex();
        chain.append(genesis).unwrap();
        assert_eq!(chain.head_hash_hex(), Some(genesis_hash_hex.clone()));

        let next = block(Some(genesis_hash_hex), "v2", 10.0);
        chain.append(next).unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn non_head_block_rejected() {
        let mut chain = Chain::new();
        chain.append(block(None, "v1", 0.0)).unwrap();
        let orphan = block(Some("ff".repeat(32)), "v2", 10.0);
        assert!(chain.append(orphan).is_err());
    }

    #[test]
    fn to_vec_is_genesis_first() {
        let mut chain = Chain::new();
        let genesis = block(None, "v1", 0.0);
        let genesis_hash_hex = genesis.block_hash_hex();
        chain.append(genesis).unwrap();
        chain.append(block(Some(genesis_hash_hex), "v2", 10.0)).unwrap();

        let ordered = chain.to_vec();
        assert_eq!(ordered.len(), 2);
        assert!(ordered[0].is_genesis());
        assert!(!ordered[1].is_genesis());

        let head_first = chain.to_vec_head_first();
        assert_eq!(head_first.len(), 2);
        assert!(!head_first[0].is_genesis());
        assert!(head_first[1].is_genesis());
    }
}
