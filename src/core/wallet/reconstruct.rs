//! Two-share reconstruction.
//!
//! The key exists only inside [`WalletShareManager::sign_with_shares`]: two
//! shares are opened, combined, checked against the bundle address, used for
//! one signature and dropped. Every buffer on the way is zeroizing, so the
//! same holds on error paths.

use tracing::{debug, info, warn};

use super::WalletShareManager;
use crate::core::bundle::{ShareRole, WalletShareBundle};
use crate::core::errors::CustodyError;
use crate::core::keys::parse_address;
use crate::core::signer::{SignedPayload, SigningRequest, TransientSigner};
use crate::crypto::hash::constant_time_eq_bytes;
use crate::crypto::shamir::{combine_shares, Share};
use crate::security::envelope::{decrypt, EncryptedShare, PinKey};
use crate::security::pin::validate_pin_format;
use crate::security::secret::PrivateKeyBytes;

/// Number of shares every reconstruction takes.
pub const SHARES_REQUIRED: usize = 2;

/// An encrypted share together with the slot it claims to come from.
#[derive(Debug, Clone, Copy)]
pub struct ShareInput<'a> {
    pub role: ShareRole,
    pub share: &'a EncryptedShare,
}

impl<'a> ShareInput<'a> {
    pub fn new(role: ShareRole, share: &'a EncryptedShare) -> Self {
        Self { role, share }
    }

    /// The share stored in `bundle` for `role`.
    pub fn from_bundle(bundle: &'a WalletShareBundle, role: ShareRole) -> Self {
        Self { role, share: bundle.share(role) }
    }
}

/// Exactly two shares with distinct roles.
fn check_share_inputs(inputs: &[ShareInput<'_>]) -> Result<(), CustodyError> {
    if inputs.len() < SHARES_REQUIRED {
        return Err(CustodyError::InsufficientShares { have: inputs.len(), need: SHARES_REQUIRED });
    }
    if inputs.len() > SHARES_REQUIRED {
        return Err(CustodyError::InvalidParameters(format!(
            "exactly {} shares are required, got {}",
            SHARES_REQUIRED,
            inputs.len()
        )));
    }
    if inputs[0].role == inputs[1].role {
        return Err(CustodyError::InconsistentShares(format!(
            "both shares claim the {} role",
            inputs[0].role
        )));
    }
    Ok(())
}

impl WalletShareManager {
    /// Reconstruct from the two given shares and sign `request`.
    pub async fn sign_with_shares(
        &self,
        bundle: &WalletShareBundle,
        pin: &str,
        inputs: &[ShareInput<'_>],
        request: &SigningRequest,
    ) -> Result<SignedPayload, CustodyError> {
        validate_pin_format(pin, self.config.pin.length)?;
        check_share_inputs(inputs)?;
        bundle.validate()?;

        let pin_key = self.derive_pin_key(pin, &bundle.kdf_salt, bundle.kdf).await?;
        let private_key = open_key(bundle, &pin_key, inputs)?;
        drop(pin_key);

        let signer = TransientSigner::from_private_key(&private_key, self.config.wallet.chain_id)?;
        drop(private_key);
        let signed = signer.sign(request).await?;
        drop(signer);

        info!(
            address = %bundle.address,
            roles = %format!("{}+{}", inputs[0].role, inputs[1].role),
            "signed with reconstructed key"
        );
        Ok(signed)
    }

    /// Normal operation: device + server shares.
    pub async fn sign(
        &self,
        bundle: &WalletShareBundle,
        pin: &str,
        request: &SigningRequest,
    ) -> Result<SignedPayload, CustodyError> {
        let inputs = [
            ShareInput::from_bundle(bundle, ShareRole::Device),
            ShareInput::from_bundle(bundle, ShareRole::Server),
        ];
        self.sign_with_shares(bundle, pin, &inputs, request).await
    }

    /// Device share lost: server + recovery shares.
    pub async fn recover_and_sign(
        &self,
        bundle: &WalletShareBundle,
        pin: &str,
        request: &SigningRequest,
    ) -> Result<SignedPayload, CustodyError> {
        let inputs = [
            ShareInput::from_bundle(bundle, ShareRole::Server),
            ShareInput::from_bundle(bundle, ShareRole::Recovery),
        ];
        self.sign_with_shares(bundle, pin, &inputs, request).await
    }

    /// Check that `pin` and the server + recovery shares still rebuild the
    /// wallet key, without signing anything.
    pub async fn verify_recovery(&self, bundle: &WalletShareBundle, pin: &str) -> Result<(), CustodyError> {
        validate_pin_format(pin, self.config.pin.length)?;
        bundle.validate()?;
        let inputs = [
            ShareInput::from_bundle(bundle, ShareRole::Server),
            ShareInput::from_bundle(bundle, ShareRole::Recovery),
        ];
        let pin_key = self.derive_pin_key(pin, &bundle.kdf_salt, bundle.kdf).await?;
        open_key(bundle, &pin_key, &inputs).map(drop)
    }
}

/// Decrypt, decode and combine two shares, then confirm the result is the
/// key behind `bundle.address`.
pub(super) fn open_key(
    bundle: &WalletShareBundle,
    pin_key: &PinKey,
    inputs: &[ShareInput<'_>],
) -> Result<PrivateKeyBytes, CustodyError> {
    check_share_inputs(inputs)?;

    let mut shares = Vec::with_capacity(inputs.len());
    for input in inputs {
        let raw = decrypt(input.share, pin_key, &bundle.share_aad(input.role))?;
        let share = Share::decode(&raw)?;
        if share.x() != input.role.x() {
            return Err(CustodyError::InconsistentShares(format!(
                "{} share carries x-coordinate {}",
                input.role,
                share.x()
            )));
        }
        shares.push(share);
    }
    debug!(payload_len = shares[0].len(), "combining shares");

    let secret = combine_shares(&shares)?;
    drop(shares);
    let private_key = secret.to_private_key()?;
    drop(secret);

    let expected = parse_address(&bundle.address)?;
    let signer = TransientSigner::from_private_key(&private_key, 1)
        .map_err(|_| CustodyError::ShareMismatch)?;
    if !constant_time_eq_bytes(signer.address().as_bytes(), expected.as_bytes()) {
        warn!(address = %bundle.address, "reconstructed key does not match wallet address");
        return Err(CustodyError::ShareMismatch);
    }
    Ok(private_key)
}
