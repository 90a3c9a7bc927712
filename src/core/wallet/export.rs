use secrecy::SecretString;
use tracing::info;

use super::WalletShareManager;
use crate::core::bundle::WalletShareBundle;
use crate::core::errors::CustodyError;
use crate::security::envelope::decrypt;
use crate::security::pin::validate_pin_format;

impl WalletShareManager {
    /// Decrypt the backup phrase for one-time display. The only operation
    /// that exposes the full mnemonic.
    pub async fn export_mnemonic(
        &self,
        bundle: &WalletShareBundle,
        pin: &str,
    ) -> Result<SecretString, CustodyError> {
        validate_pin_format(pin, self.config.pin.length)?;
        bundle.validate()?;

        let pin_key = self.derive_pin_key(pin, &bundle.kdf_salt, bundle.kdf).await?;
        let raw = decrypt(&bundle.encrypted_mnemonic, &pin_key, &bundle.mnemonic_aad())?;
        // validate in place so no unwrapped copy outlives an error
        let phrase = std::str::from_utf8(&raw)
            .map_err(|_| CustodyError::InvalidEncoding("mnemonic is not UTF-8".to_string()))?;

        info!(address = %bundle.address, "mnemonic exported");
        Ok(SecretString::new(phrase.to_owned()))
    }
}
