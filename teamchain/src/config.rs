// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use teamchain_core::link::LINK_VERSION;

/// Number of random bytes salting every invite section.
pub const DEFAULT_ENTROPY_LEN: usize = 18;

/// Configuration for building and committing team transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Format version written into every link header.
    pub(crate) link_version: u64,

    /// Number of random bytes attached to every invite section.
    ///
    /// Two invite sections with identical invites still produce different links this way.
    pub(crate) entropy_len: usize,
}

impl Config {
    pub fn new() -> Self {
        Self {
            link_version: LINK_VERSION,
            entropy_len: DEFAULT_ENTROPY_LEN,
        }
    }

    pub fn with_entropy_len(mut self, entropy_len: usize) -> Self {
        self.entropy_len = entropy_len;
        self
    }

    pub fn link_version(&self) -> u64 {
        self.link_version
    }

    pub fn entropy_len(&self) -> usize {
        self.entropy_len
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
