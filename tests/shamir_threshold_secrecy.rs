//! A single share must not reveal the secret: for a fixed secret byte, each
//! share's bytes are uniform over 0..=255 across fresh splits.

use wallet_custody::crypto::random::DeterministicEntropy;
use wallet_custody::crypto::shamir::{split_secret, SplitParams};

const SPLITS: usize = 400;
const SECRET_LEN: usize = 64;
// 255 degrees of freedom; mean 255, sd ~22.6. 360 is beyond 4.5 sd.
const CHI_SQUARE_LIMIT: f64 = 360.0;

fn histogram(secret_byte: u8, share_index: usize, seed: u64) -> [u32; 256] {
    let entropy = DeterministicEntropy::from_seed(seed);
    let secret = [secret_byte; SECRET_LEN];
    let mut counts = [0u32; 256];
    for _ in 0..SPLITS {
        let shares = split_secret(&secret, SplitParams::WALLET, &entropy).unwrap();
        for &y in shares[share_index].payload() {
            counts[y as usize] += 1;
        }
    }
    counts
}

fn chi_square(counts: &[u32; 256]) -> f64 {
    let total: u32 = counts.iter().sum();
    let expected = total as f64 / 256.0;
    counts.iter().map(|&c| (c as f64 - expected).powi(2) / expected).sum()
}

#[test]
fn single_share_bytes_are_uniform() {
    for (seed, secret_byte) in [(1u64, 0x00u8), (2, 0x7f), (3, 0xff)] {
        for share_index in 0..3 {
            let counts = histogram(secret_byte, share_index, seed);
            let stat = chi_square(&counts);
            assert!(
                stat < CHI_SQUARE_LIMIT,
                "share {} for secret {:#04x}: chi-square {:.1}",
                share_index + 1,
                secret_byte,
                stat
            );
        }
    }
}

#[test]
fn share_never_equals_secret_systematically() {
    let counts = histogram(0x42, 0, 9);
    let total: u32 = counts.iter().sum();
    // P(y == s) is 1/256 for a uniform share
    let hits = counts[0x42] as f64 / total as f64;
    assert!(hits < 0.01, "share byte equals secret byte {:.3} of the time", hits);
}
