use crate::types::AccountId;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224};
use std::fmt;
use thiserror::Error;

/// DER prefix of a SubjectPublicKeyInfo holding a raw Ed25519 key.
const ED25519_DER_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Trailing tag byte of a self-authenticating account reference.
const SELF_AUTHENTICATING_TAG: u8 = 0x02;

#[derive(Debug, Error)]
pub enum KeyGenError {
    #[error("unable to generate key pair: {0}")]
    Entropy(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("public key does not match private key")]
    KeyMismatch,
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// Portable key-pair representation: lowercase hex of the 32-byte public key
/// and of the 64-byte `seed || public` secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

impl KeyPair {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Authenticated actor used to attribute remote calls.
#[derive(Clone)]
pub struct CallerHandle {
    signing: SigningKey,
    account: AccountId,
}

impl CallerHandle {
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().to_bytes())
    }

    /// Sign `message`, returning the hex-encoded signature.
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(self.signing.sign(message).to_bytes())
    }
}

impl fmt::Debug for CallerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerHandle")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub caller: CallerHandle,
    pub account: AccountId,
}

/// Generate a fresh Ed25519 key pair from OS entropy.
pub fn generate_key_pair() -> Result<KeyPair, KeyGenError> {
    let mut seed = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut seed)
        .map_err(|e| KeyGenError::Entropy(e.to_string()))?;
    let signing = SigningKey::from_bytes(&seed);
    Ok(KeyPair {
        public_key: hex::encode(signing.verifying_key().to_bytes()),
        private_key: hex::encode(signing.to_keypair_bytes()),
    })
}

/// Rebuild the caller identity stored in `key_pair`.
///
/// Deterministic: the same key pair always yields the same account.
pub fn resolve_identity(key_pair: &KeyPair) -> Result<ResolvedIdentity, IdentityError> {
    let public = decode_public_key(&key_pair.public_key)?;

    let secret = hex::decode(key_pair.private_key.trim())
        .map_err(|e| IdentityError::InvalidPrivateKey(e.to_string()))?;
    let signing = match secret.len() {
        32 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&secret);
            SigningKey::from_bytes(&seed)
        }
        64 => {
            let mut bytes = [0u8; 64];
            bytes.copy_from_slice(&secret);
            SigningKey::from_keypair_bytes(&bytes).map_err(|_| IdentityError::KeyMismatch)?
        }
        n => {
            return Err(IdentityError::InvalidPrivateKey(format!(
                "expected 32 or 64 bytes, got {n}"
            )))
        }
    };

    if signing.verifying_key() != public {
        return Err(IdentityError::KeyMismatch);
    }

    let account = account_id_for(&public);
    Ok(ResolvedIdentity {
        caller: CallerHandle {
            signing,
            account: account.clone(),
        },
        account,
    })
}

/// Self-authenticating account reference: `sha224(DER(public key)) || 0x02`,
/// base58-encoded.
pub fn account_id_for(public: &VerifyingKey) -> AccountId {
    let mut der = Vec::with_capacity(ED25519_DER_PREFIX.len() + 32);
    der.extend_from_slice(&ED25519_DER_PREFIX);
    der.extend_from_slice(public.as_bytes());

    let mut principal = Sha224::digest(&der).to_vec();
    principal.push(SELF_AUTHENTICATING_TAG);
    AccountId::new(bs58::encode(principal).into_string())
}

/// Check a hex signature produced by [`CallerHandle::sign`].
pub fn verify_signature(
    public_key_hex: &str,
    message: &[u8],
    signature_hex: &str,
) -> Result<(), IdentityError> {
    let public = decode_public_key(public_key_hex)?;
    let raw = hex::decode(signature_hex)
        .map_err(|e| IdentityError::InvalidSignature(e.to_string()))?;
    let bytes: [u8; 64] = raw
        .as_slice()
        .try_into()
        .map_err(|_| IdentityError::InvalidSignature(format!("expected 64 bytes, got {}", raw.len())))?;
    public
        .verify(message, &Signature::from_bytes(&bytes))
        .map_err(|e| IdentityError::InvalidSignature(e.to_string()))
}

fn decode_public_key(public_key_hex: &str) -> Result<VerifyingKey, IdentityError> {
    let raw = hex::decode(public_key_hex.trim())
        .map_err(|e| IdentityError::InvalidPublicKey(e.to_string()))?;
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        IdentityError::InvalidPublicKey(format!("expected 32 bytes, got {}", raw.len()))
    })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| IdentityError::InvalidPublicKey(e.to_string()))
}
