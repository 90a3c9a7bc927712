//! Human-presentable recovery code.
//!
//! Generated once at wallet creation and handed back for out-of-band display.
//! It plays no part in share reconstruction and is not stored in the bundle.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::core::errors::CustodyError;
use crate::crypto::random::{uniform_index, EntropySource};

/// Upper-case letters and digits without the easily confused I, O, 0 and 1.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const SEPARATOR: char = '-';
/// Longest code accepted, separators excluded.
pub const MAX_CODE_CHARS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryCodeFormat {
    pub groups: usize,
    pub group_len: usize,
}

impl Default for RecoveryCodeFormat {
    fn default() -> Self {
        Self { groups: 4, group_len: 4 }
    }
}

impl RecoveryCodeFormat {
    pub fn validate(&self) -> Result<(), CustodyError> {
        if self.groups == 0 || self.group_len == 0 {
            return Err(CustodyError::Config("recovery code needs at least one group of one character".to_string()));
        }
        let chars = self
            .groups
            .checked_mul(self.group_len)
            .filter(|&n| n <= MAX_CODE_CHARS)
            .ok_or_else(|| {
                CustodyError::Config(format!(
                    "recovery code of {}x{} characters exceeds {} characters",
                    self.groups, self.group_len, MAX_CODE_CHARS
                ))
            })?;
        // 32 symbols = 5 bits each; refuse anything under 64 bits
        if chars * 5 < 64 {
            return Err(CustodyError::Config(format!(
                "recovery code of {}x{} characters is too short",
                self.groups, self.group_len
            )));
        }
        Ok(())
    }

    /// Length including separators.
    pub fn display_len(&self) -> usize {
        self.groups
            .saturating_mul(self.group_len)
            .saturating_add(self.groups.saturating_sub(1))
    }
}

/// Draw a fresh code such as `K7QM-3XWA-PN9D-HT4C`.
pub fn generate_recovery_code(
    format: &RecoveryCodeFormat,
    entropy: &dyn EntropySource,
) -> Result<SecretString, CustodyError> {
    format.validate()?;
    let mut code = Zeroizing::new(String::with_capacity(format.display_len()));
    for group in 0..format.groups {
        if group > 0 {
            code.push(SEPARATOR);
        }
        for _ in 0..format.group_len {
            let idx = uniform_index(entropy, ALPHABET.len())?;
            code.push(ALPHABET[idx] as char);
        }
    }
    Ok(SecretString::new(code.as_str().to_owned()))
}

/// Canonical form of user input: upper-cased, spaces dropped.
pub fn normalize(input: &str) -> Zeroizing<String> {
    Zeroizing::new(input.chars().filter(|c| !c.is_whitespace()).map(|c| c.to_ascii_uppercase()).collect())
}

pub fn is_well_formed(code: &str, format: &RecoveryCodeFormat) -> bool {
    let groups: Vec<&str> = code.split(SEPARATOR).collect();
    groups.len() == format.groups
        && groups
            .iter()
            .all(|g| g.len() == format.group_len && g.bytes().all(|b| ALPHABET.contains(&b)))
}
