use crate::error::CoreError;
use crate::types::{TransactionContentType, TransactionType};
use crate::{hash_from_hex, hash_to_hex, sha256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionSource {
    pub source_pk_hex: String,
    pub tx_type: TransactionType,
    pub content_type: Option<TransactionContentType>,
    pub content_hash_hex: Option<String>,
    pub tx_fee: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionTarget {
    pub target_tx_hash_hex: Option<String>,
    pub target_pk_hex: Option<String>,
    pub tx_token: Option<f64>,
    pub tx_object: Option<serde_json::Value>,
}

/// A signed, hashed transaction. `tx_hash`/`signature` are derived from
/// `source`, `target`, and `timestamp` — mutating any of those without
/// re-hashing/re-signing produces an object that fails validation.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub source: TransactionSource,
    pub target: TransactionTarget,
    pub timestamp: f64,
    pub tx_hash: [u8; 32],
    pub signature: Option<Vec<u8>>,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.tx_hash == other.tx_hash && self.signature == other.signature
    }
}
impl Eq for Transaction {}

/// Fixed field order used for both hashing and signing. Field order here
/// IS the canonical serialization — do not reorder without breaking every
/// existing hash and signature.
#[derive(Serialize)]
struct TransactionPresigned<'a> {
    source_public_key_hex: &'a str,
    transaction_type: u8,
    content_type: Option<u8>,
    content_hash_hex: Option<&'a str>,
    tx_fee: Option<f64>,
    target_transaction_hash_hex: Option<&'a str>,
    target_public_key_hex: Option<&'a str>,
    tx_token: Option<f64>,
    tx_object: Option<&'a serde_json::Value>,
    timestamp: f64,
}

impl Transaction {
    fn presigned<'a>(source: &'a TransactionSource, target: &'a TransactionTarget, timestamp: f64) -> TransactionPresigned<'a> {
        TransactionPresigned {
            source_public_key_hex: &source.source_pk_hex,
            transaction_type: source.tx_type.as_u8(),
            content_type: source.content_type.map(|c| c.as_u8()),
            content_hash_hex: source.content_hash_hex.as_deref(),
            tx_fee: source.tx_fee,
            target_transaction_hash_hex: target.target_tx_hash_hex.as_deref(),
            target_public_key_hex: target.target_pk_hex.as_deref(),
            tx_token: target.tx_token,
            tx_object: target.tx_object.as_ref(),
            timestamp,
        }
    }

    fn presigned_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&Self::presigned(&self.source, &self.target, self.timestamp))
            .expect("presigned transaction is always serializable")
    }

    /// Build an unsigned transaction stamped with the current hash; call
    /// `sign` before broadcasting.
    pub fn new(source: TransactionSource, target: TransactionTarget, timestamp: f64) -> Self {
        let tx_hash = sha256(&serde_json::to_vec(&Self::presigned(&source, &target, timestamp)).unwrap());
        Transaction {
            source,
            target,
            timestamp,
            tx_hash,
            signature: None,
        }
    }

    pub fn sign(&mut self, scheme: &dyn crate::ports::SignatureScheme, secret_key_hex: &str) {
        self.signature = Some(scheme.sign(secret_key_hex, &self.presigned_bytes()));
    }

    /// Signs using the node's own identity rather than an explicit secret
    /// key hex. `source.source_pk_hex` must already equal
    /// `keypair.public_key_hex()` — this does not set it for you.
    pub fn sign_with(&mut self, keypair: &dyn crate::ports::KeyPairProvider) {
        self.signature = Some(keypair.sign(&self.presigned_bytes()));
    }

    pub fn verify_signature(&self, scheme: &dyn crate::ports::SignatureScheme) -> bool {
        match &self.signature {
            Some(sig) => scheme.verify(&self.source.source_pk_hex, &self.presigned_bytes(), sig),
            None => false,
        }
    }

    pub fn tx_hash_hex(&self) -> String {
        hash_to_hex(&self.tx_hash)
    }

    pub fn to_dict(&self) -> TransactionDict {
        TransactionDict {
            source_public_key_hex: self.source.source_pk_hex.clone(),
            transaction_type: self.source.tx_type.as_u8(),
            content_type: self.source.content_type.map(|c| c.as_u8()),
            content_hash_hex: self.source.content_hash_hex.clone(),
            tx_fee: self.source.tx_fee,
            target_transaction_hash_hex: self.target.target_tx_hash_hex.clone(),
            target_public_key_hex: self.target.target_pk_hex.clone(),
            tx_token: self.target.tx_token,
            tx_object: self.target.tx_object.clone(),
            signature_hex: self.signature.as_ref().map(hex::encode),
            transaction_hash_hex: self.tx_hash_hex(),
            timestamp: self.timestamp,
        }
    }

    pub fn from_dict(dict: TransactionDict) -> Result<Self, CoreError> {
        let tx_type = TransactionType::from_u8(dict.transaction_type).ok_or(CoreError::BadKey)?;
        let content_type = dict.content_type.map(TransactionContentType::from_u8).flatten();
        let source = TransactionSource {
            source_pk_hex: dict.source_public_key_hex,
            tx_type,
            content_type,
            content_hash_hex: dict.content_hash_hex,
            tx_fee: dict.tx_fee,
        };
        let target = TransactionTarget {
            target_tx_hash_hex: dict.target_transaction_hash_hex,
            target_pk_hex: dict.target_public_key_hex,
            tx_token: dict.tx_token,
            tx_object: dict.tx_object,
        };
        let signature = dict
            .signature_hex
            .map(|s| hex::decode(s).map_err(|_| CoreError::BadHex))
            .transpose()?;
        let tx_hash = hash_from_hex(&dict.transaction_hash_hex)?;

        let tx = Transaction {
            source,
            target,
            timestamp: dict.timestamp,
            tx_hash,
            signature,
        };
        Ok(tx)
    }
}

/// Wire-compatible projection of a [`Transaction`], used both as the HTTP
/// request/response body and as the embedded form inside `BlockDict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDict {
    pub source_public_key_hex: String,
    pub transaction_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_transaction_hash_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_public_key_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_token: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_object: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_hex: Option<String>,
    pub transaction_hash_hex: String,
    pub timestamp: f64,
}

// `Option<Option<T>>::flatten` isn't stable on a `map(...).transpose()` chain
// the way we need it above for a fallible `From<u8>`, so provide it by hand.
trait OptionResultExt<T> {
    fn flatten(self) -> Option<T>;
}
impl<T> OptionResultExt<T> for Option<Option<T>> {
    fn flatten(self) -> Option<T> {
        self.and_then(|inner| inner)
    }
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

    fn sample() -> Transaction {
        let source = TransactionSource {
            source_pk_hex: "aa".repeat(32),
            tx_type: TransactionType::Transfer,
            content_type: None,
            content_hash_hex: None,
            tx_fee: Some(1.0),
        };
        let target = TransactionTarget {
            target_tx_hash_hex: None,
            target_pk_hex: Some("bb".repeat(32)),
            tx_token: Some(100.0),
            tx_object: None,
        };
        Transaction::new(source, target, 1_700_000_000.0)
    }

    #[test]
    fn round_trip_preserves_hash_and_signature() {
        let mut tx = sample();
        tx.sign(&AlwaysValid, "secret");
        let dict = tx.to_dict();
        let restored = Transaction::from_dict(dict).unwrap();
        assert_eq!(restored.tx_hash, tx.tx_hash);
        assert_eq!(restored.signature, tx.signature);
        assert_eq!(restored, tx);
    }

    #[test]
    fn hash_changes_with_any_presigned_field() {
        let tx = sample();
        let mut other = sample();
        other.target.tx_token = Some(101.0);
        let other = Transaction::new(other.source, other.target, other.timestamp);
        assert_ne!(tx.tx_hash, other.tx_hash);
    }
}
