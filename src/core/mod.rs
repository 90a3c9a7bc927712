pub mod bundle;
pub mod config;
pub mod errors;
pub mod keys;
pub mod signer;
pub mod wallet;

pub use wallet::WalletShareManager;
