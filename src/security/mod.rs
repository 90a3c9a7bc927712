// src/security/mod.rs
//! Secret handling: zeroizing buffers, PIN-keyed envelope encryption, PIN
//! policy and recovery codes.

pub mod envelope;
pub mod pin;
pub mod recovery_code;
pub mod secret;

pub use envelope::{EncryptedBlob, EncryptedShare, PinKey};
pub use pin::PinPolicy;
pub use secret::{Secret, SecretVec};
