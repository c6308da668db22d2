pub mod account;
pub mod block;
pub mod chain;
pub mod error;
pub mod mempool;
pub mod params;
pub mod ports;
pub mod reducer;
pub mod transaction;
pub mod types;
pub mod validation;
pub mod validator_rand;

pub use account::{Account, AccountMap};
pub use block::Block;
pub use chain::Chain;
pub use error::{CoreError, ValidationError};
pub use mempool::{BroadcastSet, Mempool};
pub use params::ConsensusParams;
pub use ports::{ClockSource, KeyPairProvider, RpcClient, SignatureScheme};
pub use transaction::{Transaction, TransactionSource, TransactionTarget};
pub use types::{TransactionContentType, TransactionType};
pub use validator_rand::ValidatorRand;

/// SHA-256 over raw bytes.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

pub fn hash_to_hex(hash: &[u8; 32]) -> String {
    hex::encode(hash)
}

pub fn hash_from_hex(hex_str: &str) -> Result<[u8; 32], error::CoreError> {
    let bytes = hex::decode(hex_str).map_err(|_| error::CoreError::BadHex)?;
    bytes
        .try_into()
        .map_err(|_| error::CoreError::BadHash)
}
