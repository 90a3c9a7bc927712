//! The durable, storable artifact of wallet creation.
//!
//! A [`WalletShareBundle`] holds the three encrypted shares, the KDF salt and
//! parameters, and the encrypted mnemonic. It carries no plaintext secret.
//! Every ciphertext is bound through AES-GCM associated data to the wallet
//! address, the share role and the share epoch, so a share cannot be replayed
//! into another slot, another wallet, or a later epoch.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::CustodyError;
use crate::core::keys::parse_address;
use crate::crypto::kdf::{KdfAlgorithm, KdfSalt, MAX_PBKDF2_ITERATIONS, MIN_PBKDF2_ITERATIONS};
use crate::security::envelope::{EncryptedBlob, EncryptedShare};

pub const BUNDLE_SCHEMA_VERSION: u32 = 1;
const AAD_DOMAIN: &str = "wallet-custody/v1";

/// Where a share lives; fixes its x-coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareRole {
    Device,
    Server,
    Recovery,
}

impl ShareRole {
    pub const ALL: [ShareRole; 3] = [ShareRole::Device, ShareRole::Server, ShareRole::Recovery];

    pub fn x(self) -> u8 {
        match self {
            ShareRole::Device => 1,
            ShareRole::Server => 2,
            ShareRole::Recovery => 3,
        }
    }

    pub fn from_x(x: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.x() == x)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShareRole::Device => "device",
            ShareRole::Server => "server",
            ShareRole::Recovery => "recovery",
        }
    }
}

impl fmt::Display for ShareRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Associated data for a share ciphertext. The address is lower-cased so
/// checksum casing never affects authentication.
pub fn share_aad(address: &str, role: ShareRole, epoch: u32) -> Vec<u8> {
    format!("{}|{}|{}|{}", AAD_DOMAIN, address.to_ascii_lowercase(), role, epoch).into_bytes()
}

/// Associated data for the mnemonic ciphertext; independent of the epoch.
pub fn mnemonic_aad(address: &str) -> Vec<u8> {
    format!("{}|{}|mnemonic", AAD_DOMAIN, address.to_ascii_lowercase()).into_bytes()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletShareBundle {
    pub schema_version: u32,
    /// EIP-55 checksummed address.
    pub address: String,
    pub device_share: EncryptedShare,
    pub server_share: EncryptedShare,
    pub recovery_share: EncryptedShare,
    pub kdf_salt: KdfSalt,
    pub kdf: KdfAlgorithm,
    pub encrypted_mnemonic: EncryptedBlob,
    /// Incremented on every rotation.
    pub share_epoch: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_at: Option<DateTime<Utc>>,
}

impl WalletShareBundle {
    pub fn share(&self, role: ShareRole) -> &EncryptedShare {
        match role {
            ShareRole::Device => &self.device_share,
            ShareRole::Server => &self.server_share,
            ShareRole::Recovery => &self.recovery_share,
        }
    }

    pub fn share_aad(&self, role: ShareRole) -> Vec<u8> {
        share_aad(&self.address, role, self.share_epoch)
    }

    pub fn mnemonic_aad(&self) -> Vec<u8> {
        mnemonic_aad(&self.address)
    }

    /// Structural checks run before any key derivation.
    pub fn validate(&self) -> Result<(), CustodyError> {
        if self.schema_version != BUNDLE_SCHEMA_VERSION {
            return Err(CustodyError::InvalidParameters(format!(
                "unsupported bundle schema version {}",
                self.schema_version
            )));
        }
        parse_address(&self.address)?;
        let iterations = self.kdf.iterations();
        if !(MIN_PBKDF2_ITERATIONS..=MAX_PBKDF2_ITERATIONS).contains(&iterations) {
            return Err(CustodyError::InvalidParameters(format!(
                "bundle KDF iterations {} outside {}..={}",
                iterations, MIN_PBKDF2_ITERATIONS, MAX_PBKDF2_ITERATIONS
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, CustodyError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CustodyError::InvalidEncoding(format!("bundle serialization failed: {}", e)))
    }

    pub fn from_json(s: &str) -> Result<Self, CustodyError> {
        let bundle: WalletShareBundle = serde_json::from_str(s)
            .map_err(|e| CustodyError::InvalidEncoding(format!("invalid bundle JSON: {}", e)))?;
        bundle.validate()?;
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::envelope::IV_LEN;
    use pretty_assertions::assert_eq;

    const ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn blob(tag: u8) -> EncryptedBlob {
        EncryptedBlob::new(vec![tag; 49], [tag; IV_LEN])
    }

    fn sample() -> WalletShareBundle {
        WalletShareBundle {
            schema_version: BUNDLE_SCHEMA_VERSION,
            address: ADDRESS.to_string(),
            device_share: blob(1),
            server_share: blob(2),
            recovery_share: blob(3),
            kdf_salt: KdfSalt::from_bytes([9u8; 32]),
            kdf: KdfAlgorithm::default(),
            encrypted_mnemonic: blob(4),
            share_epoch: 0,
            created_at: Utc::now(),
            rotated_at: None,
        }
    }

    #[test]
    fn test_role_coordinates() {
        assert_eq!(ShareRole::ALL.map(ShareRole::x), [1, 2, 3]);
        assert_eq!(ShareRole::from_x(2), Some(ShareRole::Server));
        assert_eq!(ShareRole::from_x(0), None);
        assert_eq!(ShareRole::from_x(4), None);
    }

    #[test]
    fn test_aad_binds_role_epoch_and_address() {
        let a = share_aad(ADDRESS, ShareRole::Device, 0);
        assert_eq!(a, b"wallet-custody/v1|0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266|device|0".to_vec());
        assert_ne!(a, share_aad(ADDRESS, ShareRole::Device, 1));
        assert_ne!(a, share_aad(ADDRESS, ShareRole::Server, 0));
        assert_eq!(a, share_aad(&ADDRESS.to_lowercase(), ShareRole::Device, 0));
        assert!(String::from_utf8(mnemonic_aad(ADDRESS)).unwrap().ends_with("|mnemonic"));
    }

    #[test]
    fn test_json_roundtrip() {
        let bundle = sample();
        let json = bundle.to_json().unwrap();
        assert!(json.contains("\"kdf_salt\""));
        assert!(json.contains("\"pbkdf2-sha256\""));
        assert!(!json.contains("rotated_at"));
        assert_eq!(WalletShareBundle::from_json(&json).unwrap(), bundle);
    }

    #[test]
    fn test_share_accessor() {
        let bundle = sample();
        assert_eq!(bundle.share(ShareRole::Recovery), &blob(3));
    }

    #[test]
    fn test_validation() {
        let mut bad_version = sample();
        bad_version.schema_version = 2;
        assert!(bad_version.validate().is_err());

        let mut bad_address = sample();
        bad_address.address = "0xnothex".to_string();
        assert!(bad_address.validate().is_err());

        let mut weak_kdf = sample();
        weak_kdf.kdf = KdfAlgorithm::Pbkdf2Sha256 { iterations: 10 };
        assert!(weak_kdf.validate().is_err());

        let mut runaway_kdf = sample();
        runaway_kdf.kdf = KdfAlgorithm::Pbkdf2Sha256 { iterations: u32::MAX };
        assert!(matches!(runaway_kdf.validate(), Err(CustodyError::InvalidParameters(_))));
        let json = runaway_kdf.to_json().unwrap();
        assert!(WalletShareBundle::from_json(&json).is_err());

        assert!(WalletShareBundle::from_json("{}").is_err());
    }
}
