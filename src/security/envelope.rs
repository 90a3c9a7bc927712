// src/security/envelope.rs
//! Envelope encryption for shares and the backup mnemonic.
//!
//! Data is sealed with AES-256-GCM under a [`PinKey`] derived from the user's
//! PIN (see `crypto::kdf`). Each call draws a fresh 96-bit IV, so an IV is
//! never reused under one key. Authentication failure is the only integrity
//! check in the pipeline and always surfaces as
//! [`CustodyError::DecryptionFailed`].

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::core::errors::CustodyError;
use crate::crypto::random::{random_array, EntropySource};
use crate::security::secret::{redacted, SecretVec};
use crate::utils::{base64_to_bytes, bytes_to_base64, serde_base64, serde_base64_array};

/// AES-GCM nonce length.
pub const IV_LEN: usize = 12;
/// AES-256 key length.
pub const KEY_LEN: usize = 32;
/// GCM authentication tag length appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Key derived from a PIN, usable only for sealing and opening envelopes.
///
/// The raw bytes never leave this module: there is no accessor, no `Clone`
/// and `Debug` is redacted. The buffer is zeroized on drop.
pub struct PinKey {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl PinKey {
    pub(crate) fn from_derived(key: Zeroizing<[u8; KEY_LEN]>) -> Self {
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm, CustodyError> {
        Aes256Gcm::new_from_slice(self.key.as_slice())
            .map_err(|_| CustodyError::CryptoProvider("invalid key length".to_string()))
    }
}

impl fmt::Debug for PinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinKey({})", redacted(KEY_LEN))
    }
}

/// Ciphertext (with tag) plus the IV it was sealed under. Both halves are
/// stored base64-encoded and independently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    #[serde(with = "serde_base64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "serde_base64_array")]
    pub iv: [u8; IV_LEN],
}

/// An encrypted, encoded share (`x || payload`).
pub type EncryptedShare = EncryptedBlob;

impl EncryptedBlob {
    pub fn new(ciphertext: Vec<u8>, iv: [u8; IV_LEN]) -> Self {
        Self { ciphertext, iv }
    }

    /// Rebuild from the two base64 strings a store hands back.
    pub fn from_base64_parts(ciphertext: &str, iv: &str) -> Result<Self, CustodyError> {
        let ciphertext = base64_to_bytes(ciphertext)?;
        let iv_raw = base64_to_bytes(iv)?;
        let iv: [u8; IV_LEN] = iv_raw
            .as_slice()
            .try_into()
            .map_err(|_| CustodyError::LengthMismatch { expected: IV_LEN, actual: iv_raw.len() })?;
        Ok(Self { ciphertext, iv })
    }

    pub fn ciphertext_base64(&self) -> String {
        bytes_to_base64(&self.ciphertext)
    }

    pub fn iv_base64(&self) -> String {
        bytes_to_base64(&self.iv)
    }
}

fn nonce_from(iv: &[u8; IV_LEN]) -> &aes_gcm::aead::Nonce<Aes256Gcm> {
    // `from_slice` goes through deprecated generic-array helpers in the current aead release
    #[allow(deprecated)]
    aes_gcm::aead::Nonce::<Aes256Gcm>::from_slice(iv)
}

/// Seal `plaintext` under `key` with a fresh IV, binding `aad`.
pub fn encrypt(
    plaintext: &[u8],
    key: &PinKey,
    aad: &[u8],
    entropy: &dyn EntropySource,
) -> Result<EncryptedBlob, CustodyError> {
    let cipher = key.cipher()?;
    let iv: [u8; IV_LEN] = random_array(entropy)?;
    let nonce = nonce_from(&iv);
    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| CustodyError::CryptoProvider("encryption failed".to_string()))?;
    Ok(EncryptedBlob { ciphertext, iv })
}

/// Open a blob sealed by [`encrypt`]. Any mismatch of key, IV, ciphertext or
/// `aad` is reported as `DecryptionFailed`; altered plaintext is never
/// returned.
pub fn decrypt(blob: &EncryptedBlob, key: &PinKey, aad: &[u8]) -> Result<SecretVec, CustodyError> {
    if blob.ciphertext.len() < TAG_LEN {
        return Err(CustodyError::DecryptionFailed);
    }
    let cipher = key.cipher()?;
    let nonce = nonce_from(&blob.iv);
    let plaintext = cipher
        .decrypt(nonce, Payload { msg: &blob.ciphertext, aad })
        .map_err(|_| CustodyError::DecryptionFailed)?;
    Ok(Zeroizing::new(plaintext))
}
