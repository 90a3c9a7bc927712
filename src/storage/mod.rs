//! Device-bound share store.
//!
//! The device keeps one [`EncryptedShare`] per wallet address. The store is
//! treated as an opaque get/set/delete of `(ciphertext, iv)` pairs; nothing
//! read back is trusted beyond what AEAD authentication proves.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::core::bundle::{ShareRole, WalletShareBundle};
use crate::core::errors::CustodyError;
use crate::core::signer::{SignedPayload, SigningRequest};
use crate::core::wallet::{RotatedWallet, ShareInput, WalletShareManager};
use crate::security::envelope::EncryptedShare;

#[async_trait]
pub trait DeviceShareStore: Send + Sync {
    async fn get(&self, address: &str) -> Result<Option<EncryptedShare>, CustodyError>;
    async fn set(&self, address: &str, share: EncryptedShare) -> Result<(), CustodyError>;
    /// Returns whether a share was present.
    async fn delete(&self, address: &str) -> Result<bool, CustodyError>;
}

/// Process-local store, keyed by lower-cased address.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDeviceShareStore {
    shares: Arc<RwLock<HashMap<String, EncryptedShare>>>,
}

impl InMemoryDeviceShareStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shares.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.read().is_empty()
    }
}

fn store_key(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

#[async_trait]
impl DeviceShareStore for InMemoryDeviceShareStore {
    async fn get(&self, address: &str) -> Result<Option<EncryptedShare>, CustodyError> {
        Ok(self.shares.read().get(&store_key(address)).cloned())
    }

    async fn set(&self, address: &str, share: EncryptedShare) -> Result<(), CustodyError> {
        self.shares.write().insert(store_key(address), share);
        Ok(())
    }

    async fn delete(&self, address: &str) -> Result<bool, CustodyError> {
        Ok(self.shares.write().remove(&store_key(address)).is_some())
    }
}

/// Put the bundle's device share on the device.
pub async fn install_device_share(
    store: &dyn DeviceShareStore,
    bundle: &WalletShareBundle,
) -> Result<(), CustodyError> {
    store.set(&bundle.address, bundle.device_share.clone()).await?;
    debug!(address = %bundle.address, epoch = bundle.share_epoch, "device share installed");
    Ok(())
}

/// Rotate and replace the stored device share with a single `set`, so the
/// device never holds a share from both epochs.
pub async fn rotate_and_install(
    manager: &WalletShareManager,
    store: &dyn DeviceShareStore,
    bundle: &WalletShareBundle,
    pin: &str,
) -> Result<RotatedWallet, CustodyError> {
    let rotated = manager.rotate_device_share(bundle, pin).await?;
    store.set(&rotated.bundle.address, rotated.device_share().clone()).await?;
    info!(address = %rotated.bundle.address, epoch = rotated.bundle.share_epoch, "rotated device share installed");
    Ok(rotated)
}

/// Sign with the share held on the device plus the bundle's server share.
pub async fn sign_with_stored_device_share(
    manager: &WalletShareManager,
    store: &dyn DeviceShareStore,
    bundle: &WalletShareBundle,
    pin: &str,
    request: &SigningRequest,
) -> Result<SignedPayload, CustodyError> {
    let device = store
        .get(&bundle.address)
        .await?
        .ok_or(CustodyError::InsufficientShares { have: 1, need: 2 })?;
    let inputs = [
        ShareInput::new(ShareRole::Device, &device),
        ShareInput::from_bundle(bundle, ShareRole::Server),
    ];
    manager.sign_with_shares(bundle, pin, &inputs, request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CustodyConfig;
    use crate::core::keys::Bip39KeyGenerator;
    use crate::core::signer::verify_message;
    use crate::crypto::random::DeterministicEntropy;
    use crate::security::envelope::IV_LEN;

    const PIN: &str = "246810";

    fn manager() -> WalletShareManager {
        WalletShareManager::with_components(
            CustodyConfig::for_testing(),
            Arc::new(DeterministicEntropy::from_seed(40)),
            Arc::new(Bip39KeyGenerator::default()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_set_delete() {
        let store = InMemoryDeviceShareStore::new();
        let share = EncryptedShare::new(vec![1, 2, 3], [0u8; IV_LEN]);
        assert!(store.get("0xABC").await.unwrap().is_none());
        store.set("0xABC", share.clone()).await.unwrap();
        assert_eq!(store.get("0xabc").await.unwrap(), Some(share));
        assert_eq!(store.len(), 1);
        assert!(store.delete("0xAbC").await.unwrap());
        assert!(!store.delete("0xabc").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sign_from_store() {
        let mgr = manager();
        let store = InMemoryDeviceShareStore::new();
        let created = mgr.create_wallet(PIN).await.unwrap();

        let missing = sign_with_stored_device_share(&mgr, &store, &created.bundle, PIN, &SigningRequest::message("m")).await;
        assert!(matches!(missing, Err(CustodyError::InsufficientShares { have: 1, need: 2 })));

        install_device_share(&store, &created.bundle).await.unwrap();
        let signed = sign_with_stored_device_share(&mgr, &store, &created.bundle, PIN, &SigningRequest::message("m"))
            .await
            .unwrap();
        assert!(verify_message(b"m", signed.signature(), &created.address).unwrap());
    }

    #[tokio::test]
    async fn test_rotate_and_install_replaces_share() {
        let mgr = manager();
        let store = InMemoryDeviceShareStore::new();
        let created = mgr.create_wallet(PIN).await.unwrap();
        install_device_share(&store, &created.bundle).await.unwrap();

        let rotated = rotate_and_install(&mgr, &store, &created.bundle, PIN).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&created.address).await.unwrap().as_ref(), Some(rotated.device_share()));

        // old bundle with the new device share: epoch mismatch
        let stale = sign_with_stored_device_share(&mgr, &store, &created.bundle, PIN, &SigningRequest::message("m")).await;
        assert!(matches!(stale, Err(CustodyError::DecryptionFailed)));
        sign_with_stored_device_share(&mgr, &store, &rotated.bundle, PIN, &SigningRequest::message("m"))
            .await
            .unwrap();
    }

    /// A device store whose backing keychain is locked.
    struct LockedStore;

    #[async_trait]
    impl DeviceShareStore for LockedStore {
        async fn get(&self, _address: &str) -> Result<Option<EncryptedShare>, CustodyError> {
            Err(CustodyError::Storage("keychain locked".to_string()))
        }

        async fn set(&self, _address: &str, _share: EncryptedShare) -> Result<(), CustodyError> {
            Err(CustodyError::Storage("keychain locked".to_string()))
        }

        async fn delete(&self, _address: &str) -> Result<bool, CustodyError> {
            Err(CustodyError::Storage("keychain locked".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failures_propagate() {
        let mgr = manager();
        let created = mgr.create_wallet(PIN).await.unwrap();

        let err = install_device_share(&LockedStore, &created.bundle).await.unwrap_err();
        assert!(matches!(err, CustodyError::Storage(_)));
        assert_eq!(err.category(), crate::core::errors::ErrorCategory::Resource);

        let err = sign_with_stored_device_share(&mgr, &LockedStore, &created.bundle, PIN, &SigningRequest::message("m"))
            .await
            .unwrap_err();
        assert!(matches!(err, CustodyError::Storage(_)));

        // a failed device write fails the rotation; the old bundle stays current
        let err = rotate_and_install(&mgr, &LockedStore, &created.bundle, PIN).await.unwrap_err();
        assert!(matches!(err, CustodyError::Storage(_)));
    }
}
