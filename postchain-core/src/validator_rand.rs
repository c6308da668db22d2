use crate::error::CoreError;
use crate::{hash_from_hex, hash_to_hex};
use serde::{Deserialize, Serialize};

/// A validator's committed randomness for the block that will be built on
/// top of `previous_block_hash`. Quorum over these (one per eligible
/// validator, for the same parent) seeds the deterministic election in
/// `postchain-consensus`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorRand {
    pub previous_block_hash_hex: String,
    pub validator_public_key_hex: String,
    pub rand: u64,
    pub timestamp: f64,
    pub signature: Option<Vec<u8>>,
}

#[derive(Serialize)]
struct RandPresigned<'a> {
    previous_block_hash_hex: &'a str,
    validator_public_key_hex: &'a str,
    rand: u64,
    timestamp: f64,
}

impl ValidatorRand {
    pub fn new(previous_block_hash_hex: String, validator_public_key_hex: String, rand: u64, timestamp: f64) -> Self {
        ValidatorRand {
            previous_block_hash_hex,
            validator_public_key_hex,
            rand,
            timestamp,
            signature: None,
        }
    }

    fn presigned_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&RandPresigned {
            previous_block_hash_hex: &self.previous_block_hash_hex,
            validator_public_key_hex: &self.validator_public_key_hex,
            rand: self.rand,
            timestamp: self.timestamp,
        })
        .expect("presigned validator rand is always serializable")
    }

    pub fn sign(&mut self, scheme: &dyn crate::ports::SignatureScheme, secret_key_hex: &str) {
        self.signature = Some(scheme.sign(secret_key_hex, &self.presigned_bytes()));
    }

    /// Signs as the node's own identity; `validator_public_key_hex` must
    /// already equal `keypair.public_key_hex()`.
    pub fn sign_with(&mut self, keypair: &dyn crate::ports::KeyPairProvider) {
        self.signature = Some(keypair.sign(&self.presigned_bytes()));
    }

    pub fn verify_signature(&self, scheme: &dyn crate::ports::SignatureScheme) -> bool {
        match &self.signature {
            Some(sig) => scheme.verify(&self.validator_public_key_hex, &self.presigned_bytes(), sig),
            None => false,
        }
    }

    pub fn to_dict(&self) -> ValidatorRandDict {
        ValidatorRandDict {
            previous_block_hash_hex: self.previous_block_hash_hex.clone(),
            validator_public_key_hex: self.validator_public_key_hex.clone(),
            rand: self.rand,
            timestamp: self.timestamp,
            signature_hex: self.signature.as_ref().map(hex::encode),
        }
    }

    pub fn from_dict(dict: ValidatorRandDict) -> Result<Self, CoreError> {
        // Round-trip the hash to confirm it's well-formed hex of the right
        // length without actually needing the decoded bytes here.
        let _ = hash_from_hex(&dict.previous_block_hash_hex)?;
        let signature = dict
            .signature_hex
            .map(|s| hex::decode(s).map_err(|_| CoreError::BadHex))
            .transpose()?;
        Ok(ValidatorRand {
            previous_block_hash_hex: dict.previous_block_hash_hex,
            validator_public_key_hex: dict.validator_public_key_hex,
            rand: dict.rand,
            timestamp: dict.timestamp,
            signature,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorRandDict {
    pub previous_block_hash_hex: String,
    pub validator_public_key_hex: String,
    pub rand: u64,
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_hex: Option<String>,
}

/// Convenience used by callers that already have raw hash bytes at hand.
pub fn previous_block_hash_hex(hash: &[u8; 32]) -> String {
    hash_to_hex(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysValid;
    impl crate::ports::SignatureScheme for AlwaysValid {
        fn verify(&self, _pk: &str, _msg: &[u8], _sig: &[u8]) -> bool {
            true
        }
        fn sign(&self, _sk: &str, msg: &[u8]) -> Vec<u8> {
            msg.to_vec()
        }
    }

    #[test]
    fn round_trip_preserves_fields() {
        let mut rand = ValidatorRand::new("aa".repeat(32), "bb".repeat(32), 42, 1_700_000_000.0);
        rand.sign(&AlwaysValid, "secret");
        let dict = rand.to_dict();
        let restored = ValidatorRand::from_dict(dict).unwrap();
        assert_eq!(restored, rand);
    }
}
