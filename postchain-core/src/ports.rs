//! Seams to the collaborators this crate treats as external: the signature
//! backend, the node's own key pair, wall-clock time, and outbound RPC.
//!
//! Keeping these as traits (rather than hard dependencies on `ed25519-dalek`
//! or `reqwest`) is what lets `postchain-core` stay a pure data/validation
//! library: `postchain-crypto` and `postchain-gossip` provide the concrete
//! implementations consumed by `postchain-node`.

use async_trait::async_trait;

/// The signature scheme backing every signed entity in the system. A
/// drop-in: the specification only requires *some* asymmetric scheme bound
/// to SHA-256-hashed canonical JSON, not a specific curve.
pub trait SignatureScheme: Send + Sync {
    fn verify(&self, public_key_hex: &str, message: &[u8], signature: &[u8]) -> bool;
    fn sign(&self, secret_key_hex: &str, message: &[u8]) -> Vec<u8>;
}

/// The node's own identity: supplied by the key-pair provider collaborator,
/// never read from global state.
pub trait KeyPairProvider: Send + Sync {
    fn public_key_hex(&self) -> String;
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// Wall-clock time, injected so validation and round timing are testable.
pub trait ClockSource: Send + Sync {
    fn now(&self) -> f64;
}

/// Outbound peer calls. `post`/`get` mirror the HTTP surface in full: the
/// core never assumes any particular transport beneath this trait.
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn post(
        &self,
        peer: &str,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, crate::error::CoreError>;

    async fn get(&self, peer: &str, path: &str) -> Result<serde_json::Value, crate::error::CoreError>;
}
