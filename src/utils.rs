// src/utils.rs
//! Binary <-> text encodings. All helpers round-trip arbitrary bytes, not
//! just ASCII-safe text.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Invalid hex string: {0}")]
    InvalidHexString(String),
    #[error("Invalid base64 string: {0}")]
    InvalidBase64String(String),
}

/// Convert a hex-encoded string to bytes. An optional `0x` prefix is accepted.
pub fn hex_to_bytes(hex_string: &str) -> Result<Vec<u8>, EncodingError> {
    let trimmed = hex_string.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(body).map_err(|e| EncodingError::InvalidHexString(e.to_string()))
}

/// Convert bytes to a lowercase hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub fn bytes_to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn base64_to_bytes(s: &str) -> Result<Vec<u8>, EncodingError> {
    STANDARD.decode(s.trim()).map_err(|e| EncodingError::InvalidBase64String(e.to_string()))
}

/// Serde adapter: `Vec<u8>` as a standard base64 string.
pub mod serde_base64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::bytes_to_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::base64_to_bytes(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: `[u8; N]` as a standard base64 string with the length
/// checked on the way in.
pub mod serde_base64_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::bytes_to_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = super::base64_to_bytes(&s).map_err(serde::de::Error::custom)?;
        let len = raw.len();
        raw.try_into().map_err(|_| {
            serde::de::Error::custom(format!("expected {} bytes, got {}", N, len))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_bytes() {
        let bytes = hex_to_bytes("48656c6c6f").unwrap();
        assert_eq!(bytes, b"Hello");
        assert_eq!(hex_to_bytes("0x00ff").unwrap(), vec![0x00, 0xff]);
    }

    #[test]
    fn test_hex_to_bytes_invalid() {
        assert!(hex_to_bytes("invalid").is_err());
        assert!(hex_to_bytes("abc").is_err());
    }

    #[test]
    fn test_bytes_to_hex() {
        assert_eq!(bytes_to_hex(b"Hello"), "48656c6c6f");
    }

    #[test]
    fn test_all_byte_values_roundtrip() {
        let all: Vec<u8> = (0..=255u8).collect();
        assert_eq!(hex_to_bytes(&bytes_to_hex(&all)).unwrap(), all);
        assert_eq!(base64_to_bytes(&bytes_to_base64(&all)).unwrap(), all);
        assert_eq!(base64_to_bytes(&bytes_to_base64(&[])).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_base64_invalid() {
        assert!(matches!(base64_to_bytes("@@@"), Err(EncodingError::InvalidBase64String(_))));
    }

    #[test]
    fn test_serde_array_length_checked() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Holder {
            #[serde(with = "serde_base64_array")]
            iv: [u8; 12],
        }
        let json = serde_json::to_string(&Holder { iv: [3u8; 12] }).unwrap();
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.iv, [3u8; 12]);

        let short = format!("{{\"iv\":\"{}\"}}", bytes_to_base64(&[1u8; 8]));
        assert!(serde_json::from_str::<Holder>(&short).is_err());
    }
}
