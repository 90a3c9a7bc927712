//! Wallet share lifecycle.
//!
//! `WalletShareManager` owns no wallet state; every operation takes the
//! bundle it works on and returns a new one where something changes.
//!
//! ## Module Structure
//! - `create` - key generation, split, encryption
//! - `reconstruct` - two-share reconstruction for signing and recovery
//! - `rotate` - share rotation after recovery
//! - `export` - one-time mnemonic export

pub mod create;
pub mod export;
pub mod reconstruct;
pub mod rotate;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::config::CustodyConfig;
use crate::core::errors::CustodyError;
use crate::core::keys::{Bip39KeyGenerator, KeyPairGenerator};
use crate::crypto::kdf::{KdfAlgorithm, KdfSalt, KeyDerivation};
use crate::crypto::random::{EntropySource, OsEntropy};
use crate::security::envelope::PinKey;

pub use create::CreatedWallet;
pub use reconstruct::ShareInput;
pub use rotate::RotatedWallet;

/// Orchestrates create / sign / recover / rotate / export over
/// [`WalletShareBundle`](crate::core::bundle::WalletShareBundle)s.
///
/// Two cancellation signals reach the PIN key derivation: the manager-wide
/// token (a shutdown signal; once fired, the manager refuses every further
/// derivation) and an optional per-operation token attached with
/// [`scoped`](Self::scoped).
#[derive(Clone)]
pub struct WalletShareManager {
    config: CustodyConfig,
    entropy: Arc<dyn EntropySource>,
    keygen: Arc<dyn KeyPairGenerator>,
    cancel: CancellationToken,
    scope: Option<CancellationToken>,
}

impl WalletShareManager {
    /// Production wiring: OS entropy and BIP-39 key generation.
    pub fn new(config: CustodyConfig) -> Result<Self, CustodyError> {
        let keygen = Bip39KeyGenerator::from_config(&config.wallet)?;
        Self::with_components(config, Arc::new(OsEntropy), Arc::new(keygen))
    }

    pub fn with_components(
        config: CustodyConfig,
        entropy: Arc<dyn EntropySource>,
        keygen: Arc<dyn KeyPairGenerator>,
    ) -> Result<Self, CustodyError> {
        config.validate()?;
        Ok(Self { config, entropy, keygen, cancel: CancellationToken::new(), scope: None })
    }

    /// Key derivations started by this manager abort with `Cancelled` once
    /// `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Handle for one operation that also aborts when `token` fires. The
    /// manager itself stays usable after the operation is cancelled.
    ///
    /// ```ignore
    /// let op = CancellationToken::new();
    /// let signed = manager.scoped(op.clone()).sign(&bundle, pin, &request).await?;
    /// ```
    pub fn scoped(&self, token: CancellationToken) -> Self {
        Self { scope: Some(token), ..self.clone() }
    }

    pub fn config(&self) -> &CustodyConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn entropy(&self) -> &dyn EntropySource {
        self.entropy.as_ref()
    }

    async fn derive_pin_key(
        &self,
        pin: &str,
        salt: &KdfSalt,
        algorithm: KdfAlgorithm,
    ) -> Result<PinKey, CustodyError> {
        let derivation = KeyDerivation::new(algorithm)?;
        let Some(scope) = &self.scope else {
            return derivation.derive_pin_key_cancellable(pin, salt, &self.cancel).await;
        };
        tokio::select! {
            biased;
            _ = scope.cancelled() => {
                debug!("pin key derivation cancelled for this operation");
                Err(CustodyError::Cancelled)
            }
            res = derivation.derive_pin_key_cancellable(pin, salt, &self.cancel) => res,
        }
    }
}

impl std::fmt::Debug for WalletShareManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletShareManager")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("scoped", &self.scope.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::crypto::random::DeterministicEntropy;

    pub(crate) const PIN: &str = "246810";

    pub(crate) fn manager(seed: u64) -> WalletShareManager {
        WalletShareManager::with_components(
            CustodyConfig::for_testing(),
            Arc::new(DeterministicEntropy::from_seed(seed)),
            Arc::new(Bip39KeyGenerator::default()),
        )
        .unwrap()
    }
}
