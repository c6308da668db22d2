/// Tunable economic and scheduling constants. Defaults mirror the values
/// the reference deployment has run with since genesis; a network that
/// wants different numbers sets them in `postchain-config` and plumbs
/// them through here rather than hard-coding them at call sites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusParams {
    /// A validator is eligible only if `stake > validator_min_stake`.
    pub validator_min_stake: f64,
    /// Credited to the block's validator on successful application.
    pub validation_reward: f64,
    pub max_tx_per_block: usize,
    pub min_validator_cnt: usize,
    pub ico_tokens: f64,
    pub round_period_secs: u64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        ConsensusParams {
            validator_min_stake: 10.0,
            validation_reward: 100.0,
            max_tx_per_block: 20,
            min_validator_cnt: 3,
            ico_tokens: 1_000_000.0,
            round_period_secs: 10,
        }
    }
}
