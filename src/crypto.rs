//! Symmetric encryption envelope and hashing primitives.
//!
//! Sensitive fields and tokens are protected with AES-256-GCM. The wire
//! format is `iv:authTag:ciphertext`, each part hex-encoded, with a fresh
//! 16-byte IV per call. GCM authenticates the ciphertext: any tampering
//! with the envelope fails decryption outright.

use aes_gcm::{
    aead::{
        generic_array::{typenum::U16, GenericArray},
        Aead, KeyInit,
    },
    aes::Aes256,
    AesGcm,
};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::GatewayError;

/// AES-256-GCM with a 16-byte nonce and 16-byte tag.
type EnvelopeCipher = AesGcm<Aes256, U16>;

const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// Envelope encryption bound to one 32-byte key and a fixed hash salt,
/// both from process configuration.
pub struct CryptoEnvelope {
    cipher: EnvelopeCipher,
    hash_salt: String,
}

impl CryptoEnvelope {
    /// Build an envelope from a hex-encoded 32-byte key.
    pub fn new(key_hex: &str, hash_salt: &str) -> Result<Self, GatewayError> {
        let key = hex::decode(key_hex)
            .map_err(|_| GatewayError::Config("crypto key is not valid hex".into()))?;
        if key.len() != 32 {
            return Err(GatewayError::Config(format!(
                "crypto key must be 32 bytes, got {}",
                key.len()
            )));
        }
        let cipher = EnvelopeCipher::new_from_slice(&key)
            .map_err(|_| GatewayError::Config("crypto key rejected by cipher".into()))?;
        Ok(Self {
            cipher,
            hash_salt: hash_salt.to_string(),
        })
    }

    /// Encrypt a plaintext string into the `iv:authTag:ciphertext` triplet.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, GatewayError> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        let nonce = GenericArray::from_slice(&iv);

        // The aead API appends the tag to the ciphertext; the envelope
        // format carries it as its own segment.
        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| GatewayError::Decryption)?;
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        Ok(format!(
            "{}:{}:{}",
            hex::encode(iv),
            hex::encode(tag),
            hex::encode(ciphertext)
        ))
    }

    /// Decrypt an envelope produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails hard on any tampering or key mismatch; corrupted data is never
    /// returned as plaintext.
    pub fn decrypt(&self, envelope: &str) -> Result<String, GatewayError> {
        let mut parts = envelope.split(':');
        let (iv_hex, tag_hex, ct_hex) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(iv), Some(tag), Some(ct), None) => (iv, tag, ct),
            _ => return Err(GatewayError::Decryption),
        };

        let iv = hex::decode(iv_hex).map_err(|_| GatewayError::Decryption)?;
        let tag = hex::decode(tag_hex).map_err(|_| GatewayError::Decryption)?;
        let ciphertext = hex::decode(ct_hex).map_err(|_| GatewayError::Decryption)?;
        if iv.len() != IV_LEN || tag.len() != TAG_LEN {
            return Err(GatewayError::Decryption);
        }

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let nonce = GenericArray::from_slice(&iv);
        let plaintext = self
            .cipher
            .decrypt(nonce, sealed.as_slice())
            .map_err(|_| GatewayError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| GatewayError::Decryption)
    }

    /// SHA-256 of `value` concatenated with the configured salt, hex-encoded.
    /// One-way, used for lookups (e.g. token blacklist keys), not passwords.
    pub fn hash_data(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        hasher.update(self.hash_salt.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Cryptographically secure random hex string of `len_bytes` random bytes.
/// Used for session ids, reset tokens, and API keys.
pub fn generate_secure_token(len_bytes: usize) -> String {
    let mut bytes = vec![0u8; len_bytes];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
