use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::errors::CustodyError;
use crate::crypto::kdf::{
    KdfAlgorithm, DEFAULT_PBKDF2_ITERATIONS, MAX_PBKDF2_ITERATIONS, MIN_PBKDF2_ITERATIONS,
};
use crate::security::pin::{PinPolicy, DEFAULT_PIN_LENGTH};
use crate::security::recovery_code::RecoveryCodeFormat;

/// Path to a TOML config file.
pub const ENV_CONFIG_PATH: &str = "CUSTODY_CONFIG";
pub const ENV_KDF_ITERATIONS: &str = "CUSTODY_KDF_ITERATIONS";
pub const ENV_CHAIN_ID: &str = "CUSTODY_CHAIN_ID";

/// Key derivation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfConfig {
    /// PBKDF2 iteration count for new bundles
    #[serde(default = "KdfConfig::default_iterations")]
    pub iterations: u32,
}

impl KdfConfig {
    fn default_iterations() -> u32 {
        DEFAULT_PBKDF2_ITERATIONS
    }

    pub fn algorithm(&self) -> KdfAlgorithm {
        KdfAlgorithm::Pbkdf2Sha256 { iterations: self.iterations }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self { iterations: Self::default_iterations() }
    }
}

/// Key generation and signing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "WalletConfig::default_derivation_path")]
    pub derivation_path: String,

    /// EIP-155 chain id attached to signed transactions
    #[serde(default = "WalletConfig::default_chain_id")]
    pub chain_id: u64,

    /// 12 or 24
    #[serde(default = "WalletConfig::default_mnemonic_words")]
    pub mnemonic_words: usize,
}

impl WalletConfig {
    fn default_derivation_path() -> String {
        "m/44'/60'/0'/0/0".to_string()
    }
    fn default_chain_id() -> u64 {
        1
    }
    fn default_mnemonic_words() -> usize {
        12
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            derivation_path: Self::default_derivation_path(),
            chain_id: Self::default_chain_id(),
            mnemonic_words: Self::default_mnemonic_words(),
        }
    }
}

/// Custody engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyConfig {
    #[serde(default)]
    pub kdf: KdfConfig,

    #[serde(default)]
    pub pin: PinPolicy,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub recovery_code: RecoveryCodeFormat,
}

impl CustodyConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, CustodyError> {
        let config: CustodyConfig =
            toml::from_str(s).map_err(|e| CustodyError::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CustodyError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading custody config");
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CustodyError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Defaults, or the file named by `CUSTODY_CONFIG`, with the
    /// `CUSTODY_KDF_ITERATIONS` and `CUSTODY_CHAIN_ID` overrides applied.
    pub fn from_env() -> Result<Self, CustodyError> {
        let mut config = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), CustodyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_KDF_ITERATIONS) {
            self.kdf.iterations = raw.trim().parse().map_err(|_| {
                CustodyError::Config(format!("{} must be an integer, got {:?}", ENV_KDF_ITERATIONS, raw))
            })?;
        }
        if let Some(raw) = lookup(ENV_CHAIN_ID) {
            self.wallet.chain_id = raw.trim().parse().map_err(|_| {
                CustodyError::Config(format!("{} must be an integer, got {:?}", ENV_CHAIN_ID, raw))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CustodyError> {
        if self.kdf.iterations < MIN_PBKDF2_ITERATIONS {
            return Err(CustodyError::Config(format!(
                "kdf.iterations must be at least {}, got {}",
                MIN_PBKDF2_ITERATIONS, self.kdf.iterations
            )));
        }
        if self.kdf.iterations > MAX_PBKDF2_ITERATIONS {
            return Err(CustodyError::Config(format!(
                "kdf.iterations must be at most {}, got {}",
                MAX_PBKDF2_ITERATIONS, self.kdf.iterations
            )));
        }
        if self.kdf.iterations < DEFAULT_PBKDF2_ITERATIONS {
            warn!(
                iterations = self.kdf.iterations,
                "kdf.iterations below {}; use only for testing", DEFAULT_PBKDF2_ITERATIONS
            );
        }
        if self.pin.length != DEFAULT_PIN_LENGTH {
            return Err(CustodyError::Config(format!(
                "pin.length must be {}, got {}",
                DEFAULT_PIN_LENGTH, self.pin.length
            )));
        }
        if !matches!(self.wallet.mnemonic_words, 12 | 24) {
            return Err(CustodyError::Config(format!(
                "wallet.mnemonic_words must be 12 or 24, got {}",
                self.wallet.mnemonic_words
            )));
        }
        if self.wallet.chain_id == 0 {
            return Err(CustodyError::Config("wallet.chain_id cannot be 0".to_string()));
        }
        if !self.wallet.derivation_path.starts_with("m/") {
            return Err(CustodyError::Config(format!(
                "wallet.derivation_path must start with m/, got {}",
                self.wallet.derivation_path
            )));
        }
        self.recovery_code.validate()
    }

    /// Fast KDF settings for tests and local tooling.
    pub fn for_testing() -> Self {
        Self { kdf: KdfConfig { iterations: MIN_PBKDF2_ITERATIONS }, ..Self::default() }
    }
}
