//! Owned secret buffers that are zeroized on drop.
use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::core::errors::CustodyError;

/// Common alias for secret byte buffers which will be zeroed when dropped.
pub type SecretVec = Zeroizing<Vec<u8>>;

/// Raw secp256k1 private key length.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Fixed-length private key bytes, wiped on drop.
pub type PrivateKeyBytes = Zeroizing<[u8; PRIVATE_KEY_LEN]>;

/// Placeholder used wherever a secret-bearing value is formatted.
pub(crate) fn redacted(len: usize) -> String {
    format!("<redacted len={}>", len)
}

/// A transient secret: the raw private key while it is being split or after
/// it has been reconstructed. Never persisted, never logged.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    bytes: Vec<u8>,
}

impl Secret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self { bytes: bytes.to_vec() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copy into a fixed-length key buffer, checking the length.
    pub fn to_private_key(&self) -> Result<PrivateKeyBytes, CustodyError> {
        if self.bytes.len() != PRIVATE_KEY_LEN {
            return Err(CustodyError::LengthMismatch {
                expected: PRIVATE_KEY_LEN,
                actual: self.bytes.len(),
            });
        }
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        out.copy_from_slice(&self.bytes);
        Ok(out)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", redacted(self.bytes.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let s = Secret::from_slice(b"super secret");
        let out = format!("{:?}", s);
        assert!(!out.contains("super"));
        assert!(out.contains("len=12"));
    }

    #[test]
    fn test_to_private_key_checks_length() {
        let short = Secret::from_slice(&[1u8; 16]);
        assert!(matches!(
            short.to_private_key(),
            Err(CustodyError::LengthMismatch { expected: 32, actual: 16 })
        ));
        let ok = Secret::from_slice(&[9u8; 32]);
        assert_eq!(ok.to_private_key().unwrap().as_slice(), &[9u8; 32]);
    }

    #[test]
    fn test_zeroize_clears_bytes() {
        let mut s = Secret::from_slice(&[0xAA; 8]);
        s.zeroize();
        assert!(s.is_empty() || s.as_bytes().iter().all(|&b| b == 0));
    }
}
