//! Node configuration: one TOML file plus `POSTCHAIN__`-prefixed
//! environment overrides, loaded through the `config` crate the way every
//! other service in this stack does it.

use anyhow::Result;
use postchain_core::params::ConsensusParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's own externally reachable base address, e.g.
    /// `http://127.0.0.1:8000`. Advertised to peers during join and used
    /// to recognize (and skip) self-amplification.
    pub self_address: String,
    pub listen_addr: String,
    pub seed_peers: Vec<String>,
    pub known_nodes_path: PathBuf,
    pub private_key_path: PathBuf,
    pub init_blockchain_path: Option<PathBuf>,
    pub ico_public_keys_path: Option<PathBuf>,

    pub ico_tokens: f64,
    pub validation_reward: f64,
    pub validator_min_stake: f64,
    pub max_tx_per_block: usize,
    pub min_validator_cnt: usize,
    pub round_period_secs: u64,
    pub rpc_timeout_ms: u64,
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("POSTCHAIN").separator("__"));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn example() -> Self {
        let params = ConsensusParams::default();
        NodeConfig {
            self_address: "http://127.0.0.1:8000".into(),
            listen_addr: "0.0.0.0:8000".into(),
            seed_peers: vec![],
            known_nodes_path: PathBuf::from("known_nodes.json"),
            private_key_path: PathBuf::from("node.key"),
            init_blockchain_path: None,
            ico_public_keys_path: None,
            ico_tokens: params.ico_tokens,
            validation_reward: params.validation_reward,
            validator_min_stake: params.validator_min_stake,
            max_tx_per_block: params.max_tx_per_block,
            min_validator_cnt: params.min_validator_cnt,
            round_period_secs: params.round_period_secs,
            rpc_timeout_ms: 3000,
        }
    }

    pub fn consensus_params(&self) -> ConsensusParams {
        ConsensusParams {
            validator_min_stake: self.validator_min_stake,
            validation_reward: self.validation_reward,
            max_tx_per_block: self.max_tx_per_block,
            min_validator_cnt: self.min_validator_cnt,
            ico_tokens: self.ico_tokens,
            round_period_secs: self.round_period_secs,
        }
    }
}
