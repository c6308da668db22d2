use crate::error::CoreError;
use crate::transaction::{Transaction, TransactionDict};
use crate::{hash_from_hex, hash_to_hex, sha256};
use serde::{Deserialize, Serialize};

/// A block. The presigned projection hashes only the transaction hashes,
/// not their full bodies — matching the upstream service this was ported
/// from. That's a known malleability surface (a transaction's content
/// could theoretically be swapped post-hoc for another with the same
/// hash only if the hash function collides) rather than an oversight; see
/// the project notes for the accepted tradeoff.
#[derive(Debug, Clone)]
pub struct Block {
    pub previous_block_hash_hex: Option<String>,
    pub transactions: Vec<Transaction>,
    pub validator_public_key_hex: String,
    pub timestamp: f64,
    pub block_hash: [u8; 32],
    pub signature: Option<Vec<u8>>,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.block_hash == other.block_hash && self.signature == other.signature
    }
}
impl Eq for Block {}

#[derive(Serialize)]
struct BlockPresigned<'a> {
    previous_block_hash_hex: &'a Option<String>,
    transaction_hash_hex_list: Vec<String>,
    validator_public_key_hex: &'a str,
    timestamp: f64,
}

impl Block {
    fn presigned_bytes(
        previous_block_hash_hex: &Option<String>,
        transactions: &[Transaction],
        validator_public_key_hex: &str,
        timestamp: f64,
    ) -> Vec<u8> {
        let transaction_hash_hex_list = transactions.iter().map(Transaction::tx_hash_hex).collect();
        serde_json::to_vec(&BlockPresigned {
            previous_block_hash_hex,
            transaction_hash_hex_list,
            validator_public_key_hex,
            timestamp,
        })
        .expect("presigned block is always serializable")
    }

    pub fn new(
        previous_block_hash_hex: Option<String>,
        transactions: Vec<Transaction>,
        validator_public_key_hex: String,
        timestamp: f64,
    ) -> Self {
        let bytes = Self::presigned_bytes(&previous_block_hash_hex, &transactions, &validator_public_key_hex, timestamp);
        let block_hash = sha256(&bytes);
        Block {
            previous_block_hash_hex,
            transactions,
            validator_public_key_hex,
            timestamp,
            block_hash,
            signature: None,
        }
    }

    fn presigned_bytes_self(&self) -> Vec<u8> {
        Self::presigned_bytes(
            &self.previous_block_hash_hex,
            &self.transactions,
            &self.validator_public_key_hex,
            self.timestamp,
        )
    }

    pub fn sign(&mut self, scheme: &dyn crate::ports::SignatureScheme, secret_key_hex: &str) {
        self.signature = Some(scheme.sign(secret_key_hex, &self.presigned_bytes_self()));
    }

    /// Signs as the node's own identity; `validator_public_key_hex` must
    /// already equal `keypair.public_key_hex()`.
    pub fn sign_with(&mut self, keypair: &dyn crate::ports::KeyPairProvider) {
        self.signature = Some(keypair.sign(&self.presigned_bytes_self()));
    }

    pub fn verify_signature(&self, scheme: &dyn crate::ports::SignatureScheme) -> bool {
        match &self.signature {
            Some(sig) => scheme.verify(&self.validator_public_key_hex, &self.presigned_bytes_self(), sig),
            None => false,
        }
    }

    pub fn block_hash_hex(&self) -> String {
        hash_to_hex(&self.block_hash)
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_block_hash_hex.is_none()
    }

    pub fn to_dict(&self) -> BlockDict {
        BlockDict {
            previous_block_hash_hex: self.previous_block_hash_hex.clone(),
            transactions: self.transactions.iter().map(Transaction::to_dict).collect(),
            validator_public_key_hex: self.validator_public_key_hex.clone(),
            timestamp: self.timestamp,
            signature_hex: self.signature.as_ref().map(hex::encode),
            block_hash_hex: self.block_hash_hex(),
        }
    }

    pub fn from_dict(dict: BlockDict) -> Result<Self, CoreError> {
        let transactions = dict
            .transactions
            .into_iter()
            .map(Transaction::from_dict)
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(prev) = &dict.previous_block_hash_hex {
            let _ = hash_from_hex(prev)?;
        }
        let block_hash = hash_from_hex(&dict.block_hash_hex)?;
        let signature = dict
            .signature_hex
            .map(|s| hex::decode(s).map_err(|_| CoreError::BadHex))
            .transpose()?;
        Ok(Block {
            previous_block_hash_hex: dict.previous_block_hash_hex,
            transactions,
            validator_public_key_hex: dict.validator_public_key_hex,
            timestamp: dict.timestamp,
            block_hash,
            signature,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDict {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_block_hash_hex: Option<String>,
    pub transactions: Vec<TransactionDict>,
    pub validator_public_key_hex: String,
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_hex: Option<String>,
    pub block_hash_hex: String,
}
