//! # Shamir secret sharing over GF(2^8)
//!
//! Each byte of the secret is the constant term of its own random polynomial
//! of degree `threshold - 1`; share `x` carries that polynomial's value at `x`
//! for every byte. Any `threshold` shares rebuild the secret by interpolating
//! at zero; fewer shares are independent of the secret as long as the
//! higher-degree coefficients come from a secure random source.
//!
//! ## Share binary format
//!
//! - byte 0: x-coordinate (1..=255)
//! - byte 1..: payload, one y-value per secret byte
//!
//! Combining shares that were not produced by the same split yields a
//! deterministic but wrong secret; this layer attaches no integrity tag.
//! Callers verify the result (the wallet layer checks the derived address).
//!
//! ```rust
//! # use wallet_custody::crypto::random::OsEntropy;
//! # use wallet_custody::crypto::shamir::{combine_shares, split_secret, SplitParams};
//! let shares = split_secret(b"hello", SplitParams::WALLET, &OsEntropy).unwrap();
//! let recovered = combine_shares(&[shares[0].clone(), shares[2].clone()]).unwrap();
//! assert_eq!(recovered.as_bytes(), b"hello");
//! ```

use std::collections::HashSet;
use std::fmt;

use base64::Engine;
use thiserror::Error;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::gf256;
use super::random::{random_secret_bytes, EntropySource, RandomError};
use crate::security::secret::{redacted, Secret, SecretVec};

/// Errors raised by the field and sharing layers.
#[derive(Debug, Error)]
pub enum ShamirError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("share length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("not enough shares: have {have}, need {need}")]
    InsufficientShares { have: usize, need: usize },

    #[error("inconsistent shares: {0}")]
    InconsistentShares(String),

    #[error("malformed share: {0}")]
    MalformedShare(String),

    #[error("division by zero in GF(256)")]
    DivisionByZero,

    #[error("random source unavailable: {0}")]
    Random(String),
}

impl From<RandomError> for ShamirError {
    fn from(err: RandomError) -> Self {
        ShamirError::Random(err.0)
    }
}

/// Minimum number of shares any combination needs.
pub const MIN_THRESHOLD: u8 = 2;

/// Share count and threshold for one split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitParams {
    pub total_shares: u8,
    pub threshold: u8,
}

impl SplitParams {
    /// Device / server / recovery, any two rebuild.
    pub const WALLET: SplitParams = SplitParams { total_shares: 3, threshold: 2 };

    pub fn new(total_shares: u8, threshold: u8) -> Result<Self, ShamirError> {
        let params = Self { total_shares, threshold };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ShamirError> {
        if self.threshold < MIN_THRESHOLD {
            return Err(ShamirError::InvalidParameters(format!(
                "threshold must be at least {}, got {}",
                MIN_THRESHOLD, self.threshold
            )));
        }
        // total_shares <= 255 holds by type
        if self.total_shares < self.threshold {
            return Err(ShamirError::InvalidParameters(format!(
                "total shares ({}) cannot be less than threshold ({})",
                self.total_shares, self.threshold
            )));
        }
        Ok(())
    }
}

/// One point of the sharing polynomials: x-coordinate plus one y-value per
/// secret byte.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    x: u8,
    y: Vec<u8>,
}

impl Share {
    /// Takes ownership of `y`; it is wiped if the share is rejected.
    pub fn new(x: u8, y: Vec<u8>) -> Result<Self, ShamirError> {
        let mut y = Zeroizing::new(y);
        Self::check(x, &y)?;
        Ok(Self { x, y: std::mem::take(&mut *y) })
    }

    fn check(x: u8, y: &[u8]) -> Result<(), ShamirError> {
        if x == 0 {
            return Err(ShamirError::MalformedShare("x-coordinate cannot be zero".to_string()));
        }
        if y.is_empty() {
            return Err(ShamirError::MalformedShare("payload cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn payload(&self) -> &[u8] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// `x || payload`
    pub fn encode(&self) -> SecretVec {
        let mut out = Zeroizing::new(Vec::with_capacity(1 + self.y.len()));
        out.push(self.x);
        out.extend_from_slice(&self.y);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ShamirError> {
        if bytes.len() < 2 {
            return Err(ShamirError::MalformedShare(format!(
                "encoded share too short: {} bytes",
                bytes.len()
            )));
        }
        let (x, y) = (bytes[0], &bytes[1..]);
        Self::check(x, y)?;
        Ok(Self { x, y: y.to_vec() })
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.encode().as_slice()))
    }

    pub fn from_hex(s: &str) -> Result<Self, ShamirError> {
        let raw = Zeroizing::new(
            hex::decode(s.trim()).map_err(|e| ShamirError::MalformedShare(e.to_string()))?,
        );
        Share::decode(&raw)
    }

    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(base64::engine::general_purpose::STANDARD.encode(self.encode().as_slice()))
    }

    pub fn from_base64(s: &str) -> Result<Self, ShamirError> {
        let raw = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(s.trim())
                .map_err(|e| ShamirError::MalformedShare(e.to_string()))?,
        );
        Share::decode(&raw)
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share").field("x", &self.x).field("y", &redacted(self.y.len())).finish()
    }
}

/// Split `secret` into `params.total_shares` shares at x = 1..=total_shares.
///
/// Parameters are validated before any randomness is drawn; on error nothing
/// is returned.
pub fn split_secret(
    secret: &[u8],
    params: SplitParams,
    entropy: &dyn EntropySource,
) -> Result<Vec<Share>, ShamirError> {
    params.validate()?;
    if secret.is_empty() {
        return Err(ShamirError::InvalidParameters("secret cannot be empty".to_string()));
    }
    debug!(
        secret_len = secret.len(),
        total_shares = params.total_shares,
        threshold = params.threshold,
        "splitting secret"
    );

    let degree = (params.threshold - 1) as usize;
    // one run of `degree` random coefficients per secret byte
    let random = random_secret_bytes(entropy, degree * secret.len())?;

    let mut payloads: Vec<Vec<u8>> =
        (0..params.total_shares).map(|_| Vec::with_capacity(secret.len())).collect();
    let mut coeffs = Zeroizing::new(vec![0u8; degree + 1]);
    for (i, &byte) in secret.iter().enumerate() {
        coeffs[0] = byte;
        coeffs[1..].copy_from_slice(&random[i * degree..(i + 1) * degree]);
        for (idx, payload) in payloads.iter_mut().enumerate() {
            payload.push(gf256::eval_polynomial(&coeffs, (idx + 1) as u8));
        }
    }

    Ok(payloads
        .into_iter()
        .enumerate()
        .map(|(idx, y)| Share { x: (idx + 1) as u8, y })
        .collect())
}

/// Rebuild the secret from at least two shares of equal length.
///
/// All supplied shares take part in the interpolation. Shares from different
/// splits, or fewer than the split's threshold, produce a wrong secret rather
/// than an error.
pub fn combine_shares(shares: &[Share]) -> Result<Secret, ShamirError> {
    if shares.len() < MIN_THRESHOLD as usize {
        return Err(ShamirError::InsufficientShares {
            have: shares.len(),
            need: MIN_THRESHOLD as usize,
        });
    }

    let payload_len = shares[0].len();
    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares {
        if share.len() != payload_len {
            return Err(ShamirError::LengthMismatch { expected: payload_len, actual: share.len() });
        }
        if share.x == 0 {
            return Err(ShamirError::InconsistentShares("x-coordinate zero".to_string()));
        }
        if !seen.insert(share.x) {
            return Err(ShamirError::InconsistentShares(format!(
                "duplicate x-coordinate {}",
                share.x
            )));
        }
    }

    let xs: Vec<u8> = shares.iter().map(|s| s.x).collect();
    let mut ys = Zeroizing::new(vec![0u8; shares.len()]);
    let mut secret = Zeroizing::new(vec![0u8; payload_len]);
    for (byte_idx, out) in secret.iter_mut().enumerate() {
        for (slot, share) in ys.iter_mut().zip(shares.iter()) {
            *slot = share.y[byte_idx];
        }
        *out = gf256::interpolate_at_zero(&xs, &ys)?;
    }

    Ok(Secret::from_slice(&secret))
}
