// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Mutex;

use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::{SeedableRng, TryRngCore};
use thiserror::Error;

/// Source of invite ids and invite section salts.
///
/// One generator is shared by all transactions of a process. Draws from different transactions
/// interleave, a seeded generator only repeats its output when used by a single transaction.
#[derive(Debug)]
pub struct Rng(Mutex<ChaCha20Rng>);

impl Rng {
    pub fn new() -> Self {
        Self(Mutex::new(ChaCha20Rng::from_os_rng()))
    }

    #[cfg(any(test, feature = "test_utils"))]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self(Mutex::new(ChaCha20Rng::from_seed(seed)))
    }

    /// Overwrite all of `dest` with random bytes.
    pub fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), RngError> {
        let mut rng = self.0.lock().map_err(|_| RngError::LockPoisoned)?;
        rng.try_fill_bytes(dest)
            .map_err(|_| RngError::NotEnoughRandomness(dest.len()))
    }

    /// Random salt of `len` bytes. An empty salt is allowed.
    pub fn salt(&self, len: usize) -> Result<Vec<u8>, RngError> {
        let mut salt = vec![0; len];
        if len > 0 {
            self.fill_bytes(&mut salt)?;
        }
        Ok(salt)
    }
}

impl Default for Rng {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum RngError {
    #[error("rng is unusable after a panic while drawing")]
    LockPoisoned,

    #[error("could not draw {0} random bytes")]
    NotEnoughRandomness(usize),
}

#[cfg(test)]
mod tests {
    use crate::invite::{INVITE_ID_SUFFIX, InviteId};

    use super::Rng;

    #[test]
    fn seeded_invite_ids_repeat() {
        let ids = |seed| {
            let rng = Rng::from_seed(seed);
            [InviteId::random(&rng).unwrap(), InviteId::random(&rng).unwrap()]
        };

        let [first, second] = ids([1; 32]);
        assert_ne!(first, second);
        assert_eq!(ids([1; 32]), [first, second]);
        assert_ne!(ids([2; 32])[0], first);
        assert_eq!(first.as_bytes().last(), Some(&INVITE_ID_SUFFIX));
    }

    #[test]
    fn salts() {
        let rng = Rng::new();
        assert!(rng.salt(0).unwrap().is_empty());

        let salt = rng.salt(18).unwrap();
        assert_eq!(salt.len(), 18);
        assert_ne!(salt, rng.salt(18).unwrap());
    }
}
