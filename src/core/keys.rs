//! Key-pair generation seam.
//!
//! The lifecycle manager never picks keys itself; it asks a
//! [`KeyPairGenerator`] for a fresh key, its public address and the BIP-39
//! phrase backing it. [`Bip39KeyGenerator`] is the production default.

use std::fmt;
use std::str::FromStr;

use bip39::{Language, Mnemonic};
use ethers::signers::coins_bip39::English;
use ethers::signers::{LocalWallet, MnemonicBuilder, Signer};
use ethers::types::Address;
use ethers::utils::to_checksum;
use secrecy::SecretString;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::core::config::WalletConfig;
use crate::core::errors::CustodyError;
use crate::crypto::random::{random_secret_bytes, EntropySource};
use crate::security::secret::{redacted, PrivateKeyBytes, PRIVATE_KEY_LEN};

/// Output of key generation. Dropped (and zeroized) as soon as the key has
/// been split.
pub struct GeneratedKeyPair {
    pub address: String,
    pub private_key: PrivateKeyBytes,
    pub mnemonic: SecretString,
}

impl fmt::Debug for GeneratedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedKeyPair")
            .field("address", &self.address)
            .field("private_key", &redacted(PRIVATE_KEY_LEN))
            .field("mnemonic", &"<redacted>")
            .finish()
    }
}

pub trait KeyPairGenerator: Send + Sync {
    fn generate(&self, entropy: &dyn EntropySource) -> Result<GeneratedKeyPair, CustodyError>;
}

/// BIP-39 mnemonic + BIP-44 derivation of a secp256k1 account.
#[derive(Debug, Clone)]
pub struct Bip39KeyGenerator {
    derivation_path: String,
    words: usize,
}

impl Bip39KeyGenerator {
    pub fn new(derivation_path: impl Into<String>, words: usize) -> Result<Self, CustodyError> {
        if !matches!(words, 12 | 24) {
            return Err(CustodyError::InvalidParameters(format!(
                "mnemonic must have 12 or 24 words, got {}",
                words
            )));
        }
        Ok(Self { derivation_path: derivation_path.into(), words })
    }

    pub fn from_config(config: &WalletConfig) -> Result<Self, CustodyError> {
        Self::new(config.derivation_path.clone(), config.mnemonic_words)
    }

    fn entropy_len(&self) -> usize {
        // 12 words <- 128 bits, 24 words <- 256 bits
        self.words / 3 * 4
    }

    /// Derive the account at the configured path from an existing phrase.
    pub fn derive_from_phrase(&self, phrase: &str) -> Result<GeneratedKeyPair, CustodyError> {
        let wallet = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .derivation_path(&self.derivation_path)
            .map_err(|e| CustodyError::KeyGeneration(format!("invalid derivation path: {}", e)))?
            .build()
            .map_err(|e| CustodyError::KeyGeneration(format!("derivation failed: {}", e)))?;

        let mut field_bytes = wallet.signer().to_bytes();
        let mut private_key = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        private_key.copy_from_slice(field_bytes.as_slice());
        field_bytes.as_mut_slice().zeroize();

        Ok(GeneratedKeyPair {
            address: to_checksum(&wallet.address(), None),
            private_key,
            mnemonic: SecretString::new(phrase.to_owned()),
        })
    }
}

impl Default for Bip39KeyGenerator {
    fn default() -> Self {
        Self { derivation_path: "m/44'/60'/0'/0/0".to_string(), words: 12 }
    }
}

impl KeyPairGenerator for Bip39KeyGenerator {
    fn generate(&self, entropy: &dyn EntropySource) -> Result<GeneratedKeyPair, CustodyError> {
        let seed_entropy = random_secret_bytes(entropy, self.entropy_len())?;
        let mnemonic = Mnemonic::from_entropy_in(Language::English, &seed_entropy)
            .map_err(|e| CustodyError::KeyGeneration(format!("mnemonic generation failed: {}", e)))?;
        let phrase = Zeroizing::new(mnemonic.to_string());
        debug!(words = self.words, path = %self.derivation_path, "generated mnemonic");
        self.derive_from_phrase(&phrase)
    }
}

/// EIP-55 checksummed address of a raw secp256k1 private key.
pub fn address_from_private_key(private_key: &[u8; PRIVATE_KEY_LEN]) -> Result<String, CustodyError> {
    let wallet = LocalWallet::from_bytes(private_key)
        .map_err(|_| CustodyError::KeyGeneration("invalid private key".to_string()))?;
    Ok(to_checksum(&wallet.address(), None))
}

/// Parse a 0x-prefixed hex address; case is not checked.
pub fn parse_address(address: &str) -> Result<Address, CustodyError> {
    Address::from_str(address.trim())
        .map_err(|_| CustodyError::InvalidParameters(format!("invalid address: {}", address)))
}
