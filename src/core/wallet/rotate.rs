//! Share rotation.
//!
//! With a 2-of-3 split the server and recovery shares alone fix the
//! polynomial, so a new device share cannot be issued without also replacing
//! the other two. Rotation therefore re-splits the key and re-seals all three
//! shares at the next epoch. The old device share no longer authenticates
//! (its AAD names the old epoch) and would not combine with the new server
//! share even if it did.

use chrono::Utc;
use tracing::info;

use super::create::seal_shares;
use super::reconstruct::{open_key, ShareInput};
use super::WalletShareManager;
use crate::core::bundle::{ShareRole, WalletShareBundle};
use crate::core::errors::CustodyError;
use crate::crypto::shamir::{split_secret, SplitParams};
use crate::security::envelope::EncryptedShare;
use crate::security::pin::validate_pin_format;

/// Replacement bundle produced by a rotation. The caller must swap it in for
/// the previous bundle as one update and hand the new recovery share to the
/// user.
#[derive(Debug, Clone)]
pub struct RotatedWallet {
    pub bundle: WalletShareBundle,
    pub previous_epoch: u32,
}

impl RotatedWallet {
    pub fn device_share(&self) -> &EncryptedShare {
        &self.bundle.device_share
    }

    pub fn recovery_share(&self) -> &EncryptedShare {
        &self.bundle.recovery_share
    }
}

impl WalletShareManager {
    /// Rebuild the key from the server + recovery shares and issue a fresh
    /// set of shares under the same PIN key and salt.
    pub async fn rotate_device_share(
        &self,
        bundle: &WalletShareBundle,
        pin: &str,
    ) -> Result<RotatedWallet, CustodyError> {
        validate_pin_format(pin, self.config.pin.length)?;
        bundle.validate()?;
        let next_epoch = bundle
            .share_epoch
            .checked_add(1)
            .ok_or_else(|| CustodyError::InvalidParameters("share epoch exhausted".to_string()))?;

        let pin_key = self.derive_pin_key(pin, &bundle.kdf_salt, bundle.kdf).await?;
        let inputs = [
            ShareInput::from_bundle(bundle, ShareRole::Server),
            ShareInput::from_bundle(bundle, ShareRole::Recovery),
        ];
        let private_key = open_key(bundle, &pin_key, &inputs)?;
        let shares = split_secret(private_key.as_slice(), SplitParams::WALLET, self.entropy())?;
        drop(private_key);

        let [device_share, server_share, recovery_share] =
            seal_shares(&shares, &pin_key, &bundle.address, next_epoch, self)?;

        let rotated = WalletShareBundle {
            device_share,
            server_share,
            recovery_share,
            share_epoch: next_epoch,
            rotated_at: Some(Utc::now()),
            ..bundle.clone()
        };
        info!(address = %bundle.address, epoch = next_epoch, "shares rotated");
        Ok(RotatedWallet { bundle: rotated, previous_epoch: bundle.share_epoch })
    }
}
