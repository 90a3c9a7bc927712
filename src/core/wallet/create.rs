use std::fmt;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use super::WalletShareManager;
use crate::core::bundle::{share_aad, mnemonic_aad, ShareRole, WalletShareBundle, BUNDLE_SCHEMA_VERSION};
use crate::core::errors::CustodyError;
use crate::core::keys::GeneratedKeyPair;
use crate::crypto::kdf::KdfSalt;
use crate::crypto::shamir::{split_secret, Share, SplitParams};
use crate::security::envelope::{encrypt, EncryptedShare, PinKey};
use crate::security::recovery_code::generate_recovery_code;

/// Result of wallet creation. `mnemonic` and `recovery_code` are for
/// one-time display; only `bundle` is meant to be stored.
pub struct CreatedWallet {
    pub address: String,
    pub bundle: WalletShareBundle,
    pub mnemonic: SecretString,
    pub recovery_code: SecretString,
}

impl fmt::Debug for CreatedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedWallet")
            .field("address", &self.address)
            .field("bundle", &self.bundle)
            .field("mnemonic", &"<redacted>")
            .field("recovery_code", &"<redacted>")
            .finish()
    }
}

impl WalletShareManager {
    /// Generate a key, split it 2-of-3, and seal every share and the mnemonic
    /// under a key derived from `pin` and a fresh salt.
    pub async fn create_wallet(&self, pin: &str) -> Result<CreatedWallet, CustodyError> {
        self.config.pin.validate_new_pin(pin)?;

        let GeneratedKeyPair { address, private_key, mnemonic } = self.keygen.generate(self.entropy())?;
        debug!(address = %address, "key pair generated");

        let shares = split_secret(private_key.as_slice(), SplitParams::WALLET, self.entropy())?;
        drop(private_key);

        let salt = KdfSalt::generate(self.entropy())?;
        let kdf = self.config.kdf.algorithm();
        let pin_key = self.derive_pin_key(pin, &salt, kdf).await?;

        let [device_share, server_share, recovery_share] =
            seal_shares(&shares, &pin_key, &address, 0, self)?;
        let encrypted_mnemonic = encrypt(
            mnemonic.expose_secret().as_bytes(),
            &pin_key,
            &mnemonic_aad(&address),
            self.entropy(),
        )?;
        let recovery_code = generate_recovery_code(&self.config.recovery_code, self.entropy())?;

        let bundle = WalletShareBundle {
            schema_version: BUNDLE_SCHEMA_VERSION,
            address: address.clone(),
            device_share,
            server_share,
            recovery_share,
            kdf_salt: salt,
            kdf,
            encrypted_mnemonic,
            share_epoch: 0,
            created_at: Utc::now(),
            rotated_at: None,
        };

        info!(address = %address, iterations = kdf.iterations(), "wallet created");
        Ok(CreatedWallet { address, bundle, mnemonic, recovery_code })
    }
}

/// Encrypt the three shares of one split into their role slots at `epoch`.
pub(super) fn seal_shares(
    shares: &[Share],
    pin_key: &PinKey,
    address: &str,
    epoch: u32,
    manager: &WalletShareManager,
) -> Result<[EncryptedShare; 3], CustodyError> {
    let seal = |role: ShareRole| -> Result<EncryptedShare, CustodyError> {
        let share = shares
            .iter()
            .find(|s| s.x() == role.x())
            .ok_or_else(|| CustodyError::InvalidParameters(format!("no share for role {}", role)))?;
        encrypt(&share.encode(), pin_key, &share_aad(address, role, epoch), manager.entropy())
    };
    Ok([seal(ShareRole::Device)?, seal(ShareRole::Server)?, seal(ShareRole::Recovery)?])
}
