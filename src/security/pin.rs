//! PIN format and weak-PIN policy.
//!
//! Format is checked on every operation that takes a PIN. The weak-PIN rules
//! apply only when a PIN is first chosen (wallet creation); an existing
//! bundle must stay openable with whatever PIN it was created under.

use serde::{Deserialize, Serialize};

use crate::core::errors::CustodyError;
use crate::crypto::hash::constant_time_eq;

pub const DEFAULT_PIN_LENGTH: usize = 6;

/// Commonly chosen PINs that the pattern rules below do not catch.
const BUILTIN_BLOCKLIST: &[&str] = &[
    "112233", "123123", "121212", "147258", "159753", "258369", "112358", "102030", "100200",
    "696969", "131313", "789456", "456123", "852456",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinPolicy {
    pub length: usize,
    pub reject_weak: bool,
    /// Extra PINs to refuse at creation, on top of the built-in list.
    pub blocklist: Vec<String>,
}

impl Default for PinPolicy {
    fn default() -> Self {
        Self { length: DEFAULT_PIN_LENGTH, reject_weak: true, blocklist: Vec::new() }
    }
}

impl PinPolicy {
    /// Policy that checks format only.
    pub fn format_only() -> Self {
        Self { reject_weak: false, ..Self::default() }
    }

    pub fn validate_format(&self, pin: &str) -> Result<(), CustodyError> {
        validate_pin_format(pin, self.length)
    }

    /// Format check plus weak-PIN rules; used when a PIN is set.
    pub fn validate_new_pin(&self, pin: &str) -> Result<(), CustodyError> {
        self.validate_format(pin)?;
        if !self.reject_weak {
            return Ok(());
        }
        if let Some(reason) = weakness(pin) {
            return Err(CustodyError::InvalidPin(format!("PIN is too weak: {}", reason)));
        }
        let blocked = BUILTIN_BLOCKLIST
            .iter()
            .copied()
            .chain(self.blocklist.iter().map(String::as_str))
            .any(|entry| constant_time_eq(entry, pin));
        if blocked {
            return Err(CustodyError::InvalidPin("PIN is too weak: commonly used".to_string()));
        }
        Ok(())
    }
}

/// Exactly `length` ASCII digits.
pub fn validate_pin_format(pin: &str, length: usize) -> Result<(), CustodyError> {
    if pin.len() != length {
        return Err(CustodyError::InvalidPin(format!("PIN must be exactly {} digits", length)));
    }
    if !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CustodyError::InvalidPin("PIN must contain digits only".to_string()));
    }
    Ok(())
}

fn weakness(pin: &str) -> Option<&'static str> {
    let digits: Vec<u8> = pin.bytes().map(|b| b - b'0').collect();
    if digits.windows(2).all(|w| w[0] == w[1]) {
        return Some("all digits are the same");
    }
    let step = |w: &[u8]| (10 + w[1] - w[0]) % 10;
    if digits.windows(2).all(|w| step(w) == 1) || digits.windows(2).all(|w| step(w) == 9) {
        return Some("sequential digits");
    }
    for period in [2usize, 3] {
        if digits.len() > period && digits.iter().enumerate().all(|(i, d)| *d == digits[i % period]) {
            return Some("repeating pattern");
        }
    }
    None
}
