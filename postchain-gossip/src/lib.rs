//! HTTP-transport peer gossip: a known-peer set, an outbound
//! [`RpcClient`] built on `reqwest`, and the bootstrap/amplify helpers a
//! node uses to stay in sync with the rest of the network. Deliberately
//! not a pub/sub overlay — every peer is addressed directly, matching the
//! wire-level behavior of the service this was ported from.

use async_trait::async_trait;
use postchain_core::error::CoreError;
use postchain_core::ports::RpcClient;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const KNOWN_NODES_PATH: &str = "/known_nodes";
pub const NODE_REQUEST_PATH: &str = "/node";
pub const BLOCKCHAIN_PATH: &str = "/blockchain";
pub const TRANSACTION_VALIDATION_PATH: &str = "/validation/transaction";
pub const BLOCK_VALIDATION_PATH: &str = "/validation/block";
pub const VALIDATOR_RAND_PATH: &str = "/validator/rand";

#[derive(Debug, Error)]
pub enum GossipError {
    #[error("no peers configured")]
    NoPeers,
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("failed to persist known peers: {0}")]
    Io(#[from] std::io::Error),
}

/// The known-peer set, persisted as a flat JSON array of addresses (e.g.
/// `http://host:port`) at the path configured by `known_nodes_path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeerSet(HashSet<String>);

impl PeerSet {
    pub fn new() -> Self {
        PeerSet::default()
    }

    pub fn from_addresses(addresses: impl IntoIterator<Item = String>) -> Self {
        PeerSet(addresses.into_iter().collect())
    }

    /// Returns `true` if `address` was newly added.
    pub fn accept(&mut self, address: String) -> bool {
        self.0.insert(address)
    }

    pub fn remove(&mut self, address: &str) -> bool {
        self.0.remove(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.0.contains(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// Writes the set as a flat JSON array of addresses to `path`.
    pub fn save_to_file(&self, path: &Path) -> Result<(), GossipError> {
        let json = serde_json::to_string_pretty(self).unwrap_or_else(|_| "[]".to_string());
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reads a previously saved set from `path`; an absent or unparsable
    /// file yields an empty set rather than an error, since a node's first
    /// run has nothing saved yet.
    pub fn load_from_file(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

/// `reqwest`-backed implementation of `postchain_core::ports::RpcClient`.
/// `peer` is the full base address (`http://host:port`); `path` is one of
/// the route constants above.
pub struct ReqwestRpcClient {
    client: reqwest::Client,
}

impl ReqwestRpcClient {
    pub fn new(timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("reqwest client configuration is always valid");
        ReqwestRpcClient { client }
    }
}

#[async_trait]
impl RpcClient for ReqwestRpcClient {
    async fn post(&self, peer: &str, path: &str, body: serde_json::Value) -> Result<serde_json::Value, CoreError> {
        let url = format!("{peer}{path}");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|_| CoreError::PeerUnreachable)?;
        response.json().await.map_err(|_| CoreError::PeerUnreachable)
    }

    async fn get(&self, peer: &str, path: &str) -> Result<serde_json::Value, CoreError> {
        let url = format!("{peer}{path}");
        let response = self.client.get(&url).send().await.map_err(|_| CoreError::PeerUnreachable)?;
        response.json().await.map_err(|_| CoreError::PeerUnreachable)
    }
}

/// Bootstraps into the network: pulls each seed peer's known-node list,
/// unions it with the seeds themselves, and announces `self_address` to
/// every peer discovered along the way. Unreachable seeds are skipped
/// rather than failing the whole join — only having *zero* reachable
/// seeds is an error.
pub async fn join_network(
    self_address: &str,
    seed_peers: &[String],
    rpc: &dyn RpcClient,
) -> Result<PeerSet, GossipError> {
    if seed_peers.is_empty() {
        return Err(GossipError::NoPeers);
    }

    let mut peers = PeerSet::from_addresses(seed_peers.iter().cloned());
    let mut reachable = false;

    for seed in seed_peers {
        if let Ok(value) = rpc.get(seed, KNOWN_NODES_PATH).await {
            reachable = true;
            if let Some(addresses) = value.get("addresses").and_then(|v| v.as_array()) {
                for addr in addresses {
                    if let Some(addr) = addr.as_str() {
                        peers.accept(addr.to_string());
                    }
                }
            }
        }
    }

    peers.remove(self_address);

    for peer in peers.to_vec() {
        let body = serde_json::json!({ "address": self_address });
        let _ = rpc.post(&peer, NODE_REQUEST_PATH, body).await;
    }

    if !reachable {
        return Err(GossipError::NoPeers);
    }

    Ok(peers)
}

/// Sends `body` to every peer in `peers` that hasn't already been marked
/// as having received `item_id`, excluding `self_address`. Peers are
/// marked sent *before* the send is awaited: if the same item arrives
/// again concurrently from another inbound route while these awaits are
/// in flight, it won't be re-sent to a peer already credited here, even
/// though the actual network call for this round hasn't completed yet.
/// Re-delivery from a failed send is accepted as a (harmless, idempotent)
/// cost of not re-locking node state around the network round-trip.
pub async fn amplify(
    broadcast: &mut postchain_core::mempool::BroadcastSet,
    peers: &PeerSet,
    self_address: &str,
    origin: &str,
    item_id: &str,
    path: &str,
    body: serde_json::Value,
    rpc: &dyn RpcClient,
) {
    let targets: Vec<String> = peers
        .iter()
        .filter(|p| p.as_str() != self_address)
        .filter(|p| p.as_str() != origin)
        .filter(|p| broadcast.mark_sent(item_id, p))
        .cloned()
        .collect();

    for peer in targets {
        let _ = rpc.post(&peer, path, body.clone()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRpc {
        posts: Mutex<Vec<(String, String)>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RpcClient for RecordingRpc {
        async fn post(&self, peer: &str, path: &str, _body: serde_json::Value) -> Result<serde_json::Value, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.posts.lock().unwrap().push((peer.to_string(), path.to_string()));
            Ok(serde_json::json!({}))
        }

        async fn get(&self, _peer: &str, _path: &str) -> Result<serde_json::Value, CoreError> {
            Ok(serde_json::json!({ "addresses": [] }))
        }
    }

    #[tokio::test]
    async fn amplify_sends_to_each_peer_once() {
        let rpc = RecordingRpc::default();
        let mut broadcast = postchain_core::mempool::BroadcastSet::new();
        let peers = PeerSet::from_addresses(["http://a".to_string(), "http://b".to_string(), "http://self".to_string()]);

        amplify(&mut broadcast, &peers, "http://self", "", "item-1", BLOCK_VALIDATION_PATH, serde_json::json!({}), &rpc).await;
        amplify(&mut broadcast, &peers, "http://self", "", "item-1", BLOCK_VALIDATION_PATH, serde_json::json!({}), &rpc).await;

        assert_eq!(rpc.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn amplify_excludes_self_and_origin_sending_to_the_remaining_peers() {
        let rpc = RecordingRpc::default();
        let mut broadcast = postchain_core::mempool::BroadcastSet::new();
        let peers = PeerSet::from_addresses([
            "http://self".to_string(),
            "http://origin".to_string(),
            "http://a".to_string(),
            "http://b".to_string(),
            "http://c".to_string(),
        ]);

        amplify(
            &mut broadcast,
            &peers,
            "http://self",
            "http://origin",
            "item-1",
            BLOCK_VALIDATION_PATH,
            serde_json::json!({}),
            &rpc,
        )
        .await;

        assert_eq!(rpc.calls.load(Ordering::SeqCst), 3);
        let sent: std::collections::HashSet<String> = rpc.posts.lock().unwrap().iter().map(|(peer, _)| peer.clone()).collect();
        assert_eq!(
            sent,
            ["http://a", "http://b", "http://c"].into_iter().map(String::from).collect()
        );
    }

    #[tokio::test]
    async fn join_network_requires_at_least_one_reachable_seed() {
        struct Unreachable;
        #[async_trait]
        impl RpcClient for Unreachable {
            async fn post(&self, _peer: &str, _path: &str, _body: serde_json::Value) -> Result<serde_json::Value, CoreError> {
                Err(CoreError::PeerUnreachable)
            }
            async fn get(&self, _peer: &str, _path: &str) -> Result<serde_json::Value, CoreError> {
                Err(CoreError::PeerUnreachable)
            }
        }

        let result = join_network("http://self", &["http://seed".to_string()], &Unreachable).await;
        assert!(result.is_err());
    }

    #[test]
    fn peer_set_round_trips_through_a_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("postchain-gossip-test-peers-{}.json", std::process::id()));

        let mut peers = PeerSet::new();
        peers.accept("http://a".into());
        peers.accept("http://b".into());
        peers.save_to_file(&path).unwrap();

        let loaded = PeerSet::load_from_file(&path);
        assert!(loaded.contains("http://a"));
        assert!(loaded.contains("http://b"));
        assert_eq!(loaded.len(), 2);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn peer_set_load_from_missing_file_is_empty() {
        let path = std::env::temp_dir().join("postchain-gossip-test-peers-does-not-exist.json");
        assert!(PeerSet::load_from_file(&path).is_empty());
    }

    #[test]
    fn peer_set_excludes_self_after_accept() {
        let mut peers = PeerSet::new();
        peers.accept("http://self".into());
        peers.accept("http://other".into());
        peers.remove("http://self");
        assert!(!peers.contains("http://self"));
        assert!(peers.contains("http://other"));
    }
}
