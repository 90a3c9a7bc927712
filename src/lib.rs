#![allow(clippy::len_zero)]
#![allow(clippy::needless_range_loop)]
// src/lib.rs
//! Threshold key custody for an embedded, non-custodial wallet.
//!
//! A wallet's private key is split 2-of-3 over GF(256) into device, server
//! and recovery shares. Each share and the backup mnemonic are sealed with
//! AES-256-GCM under a key stretched from the user's 6-digit PIN. Any two
//! shares plus the PIN rebuild the key for exactly one signature.

pub mod core;
pub mod crypto;
pub mod security;
pub mod storage;
pub mod utils;

pub use crate::core::bundle::{ShareRole, WalletShareBundle};
pub use crate::core::config::CustodyConfig;
pub use crate::core::errors::{CustodyError, ErrorCategory};
pub use crate::core::signer::{SignedPayload, SigningRequest};
pub use crate::core::wallet::{CreatedWallet, RotatedWallet, ShareInput, WalletShareManager};
