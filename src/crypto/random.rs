//! Randomness capability.
//!
//! All randomness (polynomial coefficients, IVs, salts, mnemonic entropy and
//! recovery codes) flows through an injected [`EntropySource`]. Production
//! code uses [`OsEntropy`]; tests can plug in [`DeterministicEntropy`] to get
//! reproducible vectors.

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::core::errors::CustodyError;

#[derive(Debug, Error)]
#[error("secure random source unavailable: {0}")]
pub struct RandomError(pub String);

impl From<RandomError> for CustodyError {
    fn from(err: RandomError) -> Self {
        CustodyError::RandomUnavailable(err.0)
    }
}

/// Source of cryptographically secure random bytes.
pub trait EntropySource: Send + Sync {
    /// Fill `dest` completely or fail. Partial fills are never reported as
    /// success.
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), RandomError>;
}

/// Operating-system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), RandomError> {
        OsRng.try_fill_bytes(dest).map_err(|e| RandomError(e.to_string()))
    }
}

/// Seeded generator for reproducible test vectors.
///
/// Never use this outside tests: the whole output stream is determined by the
/// 64-bit seed.
pub struct DeterministicEntropy {
    rng: Mutex<StdRng>,
}

impl DeterministicEntropy {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl EntropySource for DeterministicEntropy {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), RandomError> {
        self.rng.lock().try_fill_bytes(dest).map_err(|e| RandomError(e.to_string()))
    }
}

impl std::fmt::Debug for DeterministicEntropy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DeterministicEntropy")
    }
}

/// Fixed-size random array.
pub fn random_array<const N: usize>(entropy: &dyn EntropySource) -> Result<[u8; N], RandomError> {
    let mut out = [0u8; N];
    entropy.try_fill(&mut out)?;
    Ok(out)
}

/// Random bytes in a buffer that is wiped on drop.
pub fn random_secret_bytes(
    entropy: &dyn EntropySource,
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, RandomError> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    entropy.try_fill(&mut out)?;
    Ok(out)
}

/// Uniform index in `0..bound` using rejection sampling over single bytes.
///
/// `bound` must be in `1..=256`.
pub fn uniform_index(entropy: &dyn EntropySource, bound: usize) -> Result<usize, RandomError> {
    debug_assert!((1..=256).contains(&bound));
    // largest multiple of `bound` that fits in a byte range
    let zone = 256 - (256 % bound);
    loop {
        let mut b = [0u8; 1];
        entropy.try_fill(&mut b)?;
        let v = b[0] as usize;
        if v < zone {
            return Ok(v % bound);
        }
    }
}
