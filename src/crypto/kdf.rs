//! PIN key derivation (PBKDF2-HMAC-SHA256).
//!
//! A 256-bit [`PinKey`] is stretched from the user's PIN and a per-wallet
//! 32-byte salt. Derivation is deliberately slow; the async variant runs it on
//! the blocking pool and can be abandoned through a [`CancellationToken`].

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::random::{random_array, EntropySource};
use crate::core::errors::CustodyError;
use crate::security::envelope::{PinKey, KEY_LEN};
use crate::utils::{base64_to_bytes, bytes_to_base64, serde_base64_array};

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;
/// Floor accepted from configuration and stored bundles.
pub const MIN_PBKDF2_ITERATIONS: u32 = 1_000;
/// Ceiling for the same; keeps a tampered bundle from pinning a blocking
/// thread for hours.
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;
pub const SALT_LEN: usize = 32;

/// KDF recorded alongside every bundle so the PIN key can be re-derived with
/// the parameters it was created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KdfAlgorithm {
    Pbkdf2Sha256 { iterations: u32 },
}

impl KdfAlgorithm {
    pub fn iterations(&self) -> u32 {
        match self {
            KdfAlgorithm::Pbkdf2Sha256 { iterations } => *iterations,
        }
    }
}

impl Default for KdfAlgorithm {
    fn default() -> Self {
        KdfAlgorithm::Pbkdf2Sha256 { iterations: DEFAULT_PBKDF2_ITERATIONS }
    }
}

/// Per-wallet salt. Not secret, but must be unique per wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfSalt(#[serde(with = "serde_base64_array")] [u8; SALT_LEN]);

impl KdfSalt {
    pub fn generate(entropy: &dyn EntropySource) -> Result<Self, CustodyError> {
        Ok(Self(random_array(entropy)?))
    }

    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        bytes_to_base64(&self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self, CustodyError> {
        let raw = base64_to_bytes(s)?;
        let bytes: [u8; SALT_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| CustodyError::LengthMismatch { expected: SALT_LEN, actual: raw.len() })?;
        Ok(Self(bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDerivation {
    algorithm: KdfAlgorithm,
}

impl KeyDerivation {
    /// Fails with `InvalidParameters` when the iteration count is outside
    /// [`MIN_PBKDF2_ITERATIONS`]`..=`[`MAX_PBKDF2_ITERATIONS`].
    pub fn new(algorithm: KdfAlgorithm) -> Result<Self, CustodyError> {
        let iterations = algorithm.iterations();
        if !(MIN_PBKDF2_ITERATIONS..=MAX_PBKDF2_ITERATIONS).contains(&iterations) {
            return Err(CustodyError::InvalidParameters(format!(
                "PBKDF2 iterations must be in {}..={}, got {}",
                MIN_PBKDF2_ITERATIONS, MAX_PBKDF2_ITERATIONS, iterations
            )));
        }
        if iterations < DEFAULT_PBKDF2_ITERATIONS {
            warn!(iterations, "PBKDF2 iteration count below the recommended {}", DEFAULT_PBKDF2_ITERATIONS);
        }
        Ok(Self { algorithm })
    }

    pub fn pbkdf2(iterations: u32) -> Result<Self, CustodyError> {
        Self::new(KdfAlgorithm::Pbkdf2Sha256 { iterations })
    }

    pub fn algorithm(&self) -> KdfAlgorithm {
        self.algorithm
    }

    /// Derive the envelope key for `pin`. The PIN is taken as UTF-8 bytes;
    /// format rules are enforced by `security::pin`, not here.
    pub fn derive_pin_key(&self, pin: &str, salt: &KdfSalt) -> Result<PinKey, CustodyError> {
        if pin.is_empty() {
            return Err(CustodyError::InvalidPin("PIN cannot be empty".to_string()));
        }
        let KdfAlgorithm::Pbkdf2Sha256 { iterations } = self.algorithm;
        debug!(iterations, "deriving PIN key");
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt.as_bytes(), iterations, key.as_mut_slice());
        Ok(PinKey::from_derived(key))
    }

    /// [`derive_pin_key`](Self::derive_pin_key) on the blocking pool.
    ///
    /// Returns `Cancelled` as soon as `cancel` fires. The worker thread
    /// finishes its rounds in the background and drops (zeroizes) the key.
    pub async fn derive_pin_key_cancellable(
        &self,
        pin: &str,
        salt: &KdfSalt,
        cancel: &CancellationToken,
    ) -> Result<PinKey, CustodyError> {
        if cancel.is_cancelled() {
            return Err(CustodyError::Cancelled);
        }
        let kdf = *self;
        let salt = *salt;
        let pin = Zeroizing::new(pin.to_owned());
        let task = tokio::task::spawn_blocking(move || kdf.derive_pin_key(&pin, &salt));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("PIN key derivation cancelled");
                Err(CustodyError::Cancelled)
            }
            joined = task => match joined {
                Ok(result) => result,
                Err(e) => Err(CustodyError::CryptoProvider(format!("key derivation task failed: {}", e))),
            },
        }
    }
}

impl Default for KeyDerivation {
    fn default() -> Self {
        Self { algorithm: KdfAlgorithm::default() }
    }
}

/// One-shot helper: derive with an explicit iteration count.
pub fn derive_key_from_pin(pin: &str, salt: &KdfSalt, iterations: u32) -> Result<PinKey, CustodyError> {
    KeyDerivation::pbkdf2(iterations)?.derive_pin_key(pin, salt)
}
