use postchain_consensus::RoundState;
use postchain_core::ports::{ClockSource, KeyPairProvider, RpcClient};
use postchain_core::{AccountMap, Chain};
use postchain_core::{BroadcastSet, Mempool};
use postchain_config::NodeConfig;
use postchain_crypto::Ed25519Scheme;
use postchain_gossip::PeerSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Every piece of state a node mutates while handling a request or a
/// round tick. Held behind a single coarse `tokio::sync::Mutex`: the
/// model is simple correctness over fine-grained throughput, and the
/// lock is always released before any outbound RPC await (gossip is
/// pre-committed, then sent without the lock held — see
/// `postchain_gossip::amplify`).
pub struct NodeState {
    pub chain: Chain,
    pub accounts: AccountMap,
    pub mempool: Mempool,
    pub peers: PeerSet,
    pub tx_broadcast: BroadcastSet,
    pub block_broadcast: BroadcastSet,
    pub rand_broadcast: BroadcastSet,
    pub round: RoundState,
}

impl NodeState {
    pub fn new(mempool_capacity: usize) -> Self {
        NodeState {
            chain: Chain::new(),
            accounts: AccountMap::new(),
            mempool: Mempool::new(mempool_capacity),
            peers: PeerSet::new(),
            tx_broadcast: BroadcastSet::new(),
            block_broadcast: BroadcastSet::new(),
            rand_broadcast: BroadcastSet::new(),
            round: RoundState::new(),
        }
    }
}

pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
    }
}

/// Everything shared read-only across the lifetime of the process, plus
/// the one mutable [`NodeState`] behind its lock. Cloning an `AppState`
/// only clones the `Arc`.
#[derive(Clone)]
pub struct AppState(pub Arc<AppInner>);

pub struct AppInner {
    pub config: NodeConfig,
    pub params: postchain_core::ConsensusParams,
    pub ico_allowed_keys: Vec<String>,
    pub keypair: Arc<dyn KeyPairProvider>,
    pub scheme: Ed25519Scheme,
    pub rpc: Arc<dyn RpcClient>,
    pub clock: SystemClock,
    pub state: Mutex<NodeState>,
}

impl AppState {
    pub fn now(&self) -> f64 {
        self.0.clock.now()
    }
}
