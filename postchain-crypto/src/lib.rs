//! Ed25519 signing backed by `ed25519-dalek`, wired into
//! `postchain-core`'s [`SignatureScheme`]/[`KeyPairProvider`] ports. The
//! specification treats the signature scheme as a drop-in over
//! SHA-256-hashed canonical JSON; Ed25519 is what this deployment runs
//! rather than the SECP384R1/ECDSA pair the reference service used.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use postchain_core::ports::{KeyPairProvider, SignatureScheme};
use rand::rngs::OsRng;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key file not found: {0}")]
    NotFound(String),
    #[error("malformed key material: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A generated or loaded key pair, hex-encoded for storage and wire use.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub public_key_hex: String,
    pub secret_key_hex: String,
}

pub fn generate_ed25519() -> KeyMaterial {
    let signing = SigningKey::generate(&mut OsRng);
    KeyMaterial {
        public_key_hex: hex::encode(signing.verifying_key().to_bytes()),
        secret_key_hex: hex::encode(signing.to_bytes()),
    }
}

fn signing_key_from_hex(secret_key_hex: &str) -> Result<SigningKey, KeyError> {
    let bytes = hex::decode(secret_key_hex).map_err(|e| KeyError::Malformed(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| KeyError::Malformed("secret key must be 32 bytes".into()))?;
    Ok(SigningKey::from_bytes(&bytes))
}

fn verifying_key_from_hex(public_key_hex: &str) -> Result<VerifyingKey, KeyError> {
    let bytes = hex::decode(public_key_hex).map_err(|e| KeyError::Malformed(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| KeyError::Malformed("public key must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| KeyError::Malformed(e.to_string()))
}

/// A raw hex-encoded secret key on disk, one line, no encryption — this
/// deployment relies on filesystem permissions rather than a passphrase-
/// wrapped keystore.
pub fn save_key_file(path: &Path, key: &KeyMaterial) -> Result<(), KeyError> {
    fs::write(path, &key.secret_key_hex)?;
    Ok(())
}

pub fn load_key_file(path: &Path) -> Result<KeyMaterial, KeyError> {
    if !path.exists() {
        return Err(KeyError::NotFound(path.display().to_string()));
    }
    let secret_key_hex = fs::read_to_string(path)?.trim().to_string();
    let signing = signing_key_from_hex(&secret_key_hex)?;
    Ok(KeyMaterial {
        public_key_hex: hex::encode(signing.verifying_key().to_bytes()),
        secret_key_hex,
    })
}

/// The node's own identity, handed to the event loop as a
/// `dyn KeyPairProvider`.
pub struct Ed25519KeyPair {
    signing: SigningKey,
    public_key_hex: String,
}

impl Ed25519KeyPair {
    pub fn from_key_material(key: &KeyMaterial) -> Result<Self, KeyError> {
        let signing = signing_key_from_hex(&key.secret_key_hex)?;
        Ok(Ed25519KeyPair {
            signing,
            public_key_hex: key.public_key_hex.clone(),
        })
    }
}

impl KeyPairProvider for Ed25519KeyPair {
    fn public_key_hex(&self) -> String {
        self.public_key_hex.clone()
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing.sign(message).to_bytes().to_vec()
    }
}

/// Stateless verify/sign-by-key-hex implementation used wherever the
/// signer isn't the node itself (validating gossip from peers, signing
/// on behalf of a loaded test account, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Scheme;

impl SignatureScheme for Ed25519Scheme {
    fn verify(&self, public_key_hex: &str, message: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying) = verifying_key_from_hex(public_key_hex) else {
            return false;
        };
        let Ok(sig_bytes): Result<[u8; 64], _> = signature.try_into() else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);
        verifying.verify(message, &signature).is_ok()
    }

    fn sign(&self, secret_key_hex: &str, message: &[u8]) -> Vec<u8> {
        match signing_key_from_hex(secret_key_hex) {
            Ok(signing) => signing.sign(message).to_bytes().to_vec(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trips() {
        let key = generate_ed25519();
        let scheme = Ed25519Scheme;
        let sig = scheme.sign(&key.secret_key_hex, b"hello world");
        assert!(scheme.verify(&key.public_key_hex, b"hello world", &sig));
        assert!(!scheme.verify(&key.public_key_hex, b"tampered", &sig));
    }

    #[test]
    fn key_pair_provider_matches_loaded_material() {
        let key = generate_ed25519();
        let pair = Ed25519KeyPair::from_key_material(&key).unwrap();
        assert_eq!(pair.public_key_hex(), key.public_key_hex);
        let sig = pair.sign(b"payload");
        assert!(Ed25519Scheme.verify(&key.public_key_hex, b"payload", &sig));
    }

    #[test]
    fn save_and_load_key_file_round_trips() {
        let key = generate_ed25519();
        let dir = std::env::temp_dir().join(format!("postchain-crypto-test-{}", key.public_key_hex));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("node.key");
        save_key_file(&path, &key).unwrap();
        let loaded = load_key_file(&path).unwrap();
        assert_eq!(loaded.public_key_hex, key.public_key_hex);
        assert_eq!(loaded.secret_key_hex, key.secret_key_hex);
        fs::remove_dir_all(&dir).ok();
    }
}
