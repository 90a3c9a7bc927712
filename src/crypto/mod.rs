pub mod gf256;
pub mod hash;
pub mod kdf;
pub mod random;
pub mod shamir;

pub use self::kdf::{KdfAlgorithm, KdfSalt, KeyDerivation};
pub use self::random::{DeterministicEntropy, EntropySource, OsEntropy};
pub use self::shamir::{combine_shares, split_secret, Share, ShamirError, SplitParams};
