use thiserror::Error;

use crate::crypto::shamir::ShamirError;
use crate::utils::EncodingError;

/// Broad failure classes surfaced to callers.
///
/// The caller (UI / session layer) maps these to user-facing messages and owns
/// any attempt counting or lockout; nothing in this crate retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad parameters, malformed PIN, mismatched lengths. Raised before any
    /// cryptographic operation runs.
    Precondition,
    /// AEAD authentication failed. Deliberately uninformative.
    Authentication,
    /// Not enough shares, inconsistent shares, or shares that do not rebuild
    /// the wallet key.
    Reconstruction,
    /// Entropy source or crypto provider unavailable, or the call was
    /// cancelled.
    Resource,
}

/// Error type for every custody operation.
#[derive(Debug, Error)]
pub enum CustodyError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid PIN: {0}")]
    InvalidPin(String),

    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Wrong PIN, wrong salt, tampered ciphertext or IV, or a share presented
    /// for the wrong wallet/role/epoch. The cause is never disclosed.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("insufficient shares: have {have}, need {need}")]
    InsufficientShares { have: usize, need: usize },

    #[error("inconsistent shares: {0}")]
    InconsistentShares(String),

    #[error("reconstructed key does not match wallet address")]
    ShareMismatch,

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("secure random source unavailable: {0}")]
    RandomUnavailable(String),

    #[error("crypto provider failure: {0}")]
    CryptoProvider(String),

    #[error("operation cancelled")]
    Cancelled,

    /// Failure reported by an external
    /// [`DeviceShareStore`](crate::storage::DeviceShareStore) implementation.
    #[error("storage error: {0}")]
    Storage(String),
}

impl CustodyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CustodyError::InvalidParameters(_)
            | CustodyError::InvalidPin(_)
            | CustodyError::LengthMismatch { .. }
            | CustodyError::InvalidEncoding(_)
            | CustodyError::Config(_) => ErrorCategory::Precondition,
            CustodyError::DecryptionFailed => ErrorCategory::Authentication,
            CustodyError::InsufficientShares { .. }
            | CustodyError::InconsistentShares(_)
            | CustodyError::ShareMismatch => ErrorCategory::Reconstruction,
            CustodyError::KeyGeneration(_)
            | CustodyError::Signing(_)
            | CustodyError::RandomUnavailable(_)
            | CustodyError::CryptoProvider(_)
            | CustodyError::Cancelled
            | CustodyError::Storage(_) => ErrorCategory::Resource,
        }
    }

    /// Cryptographic failures are deterministic; none of them is worth a retry.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn is_authentication_failure(&self) -> bool {
        self.category() == ErrorCategory::Authentication
    }
}

impl From<ShamirError> for CustodyError {
    fn from(err: ShamirError) -> Self {
        match err {
            ShamirError::InvalidParameters(msg) => CustodyError::InvalidParameters(msg),
            ShamirError::LengthMismatch { expected, actual } => {
                CustodyError::LengthMismatch { expected, actual }
            }
            ShamirError::InsufficientShares { have, need } => {
                CustodyError::InsufficientShares { have, need }
            }
            ShamirError::InconsistentShares(msg) => CustodyError::InconsistentShares(msg),
            ShamirError::MalformedShare(msg) => CustodyError::InvalidEncoding(msg),
            ShamirError::DivisionByZero => {
                CustodyError::InconsistentShares("duplicate x-coordinate".to_string())
            }
            ShamirError::Random(msg) => CustodyError::RandomUnavailable(msg),
        }
    }
}

impl From<EncodingError> for CustodyError {
    fn from(err: EncodingError) -> Self {
        CustodyError::InvalidEncoding(err.to_string())
    }
}
