// SPDX-License-Identifier: MIT OR Apache-2.0

//! Import of a user's reset chain.
//!
//! Every account reset (or deletion) is recorded by the server as a reset event. The events are
//! handed to us as raw JSON strings which we parse into [`ResetEvent`]s, each paired with the
//! SHA-512 digest of its raw bytes so later links can refer to them.
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use thiserror::Error;
use tracing::debug;

use crate::user::{EldestSeqno, Uid};

/// Size of reset event digests.
pub const RESET_DIGEST_LEN: usize = 64;

/// SHA-512 digest of a raw reset event.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResetDigest([u8; RESET_DIGEST_LEN]);

impl ResetDigest {
    /// Calculate the digest of the provided bytes.
    pub fn new(buf: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(buf.as_ref());
        let mut digest = [0u8; RESET_DIGEST_LEN];
        digest.copy_from_slice(&hasher.finalize());
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; RESET_DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ResetDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ResetDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResetDigest").field(&self.to_hex()).finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetType {
    /// Account was reset, the user starts over with a new eldest key.
    Reset,

    /// Account was deleted.
    Delete,
}

/// Merkle root the server recorded the reset event under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetMerkleRoot {
    pub hash_meta: String,
    pub seqno: u64,
}

/// State of the user right before the reset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPrev {
    #[serde(default)]
    pub eldest_kid: Option<String>,
    pub public_seqno: EldestSeqno,
    /// Hash of the previous reset event, absent on the first one.
    #[serde(default)]
    pub reset: Option<String>,
}

/// One event of a user's reset chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetEvent {
    pub ctime: u64,
    pub merkle_root: ResetMerkleRoot,
    pub prev: ResetPrev,
    pub reset_seqno: u64,
    #[serde(rename = "type")]
    pub reset_type: ResetType,
    pub uid: Uid,
}

/// Ordered, parsed reset events together with the digest of their raw representation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetChain(Vec<(ResetEvent, ResetDigest)>);

impl ResetChain {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ResetEvent, ResetDigest)> {
        self.0.iter()
    }

    /// Latest reset event of the chain, if any.
    pub fn latest(&self) -> Option<&(ResetEvent, ResetDigest)> {
        self.0.last()
    }

    pub fn into_inner(self) -> Vec<(ResetEvent, ResetDigest)> {
        self.0
    }
}

/// Parse and hash a sequence of raw reset events.
///
/// The order of the input is kept. If any event fails to parse, the whole import is aborted and no
/// events are returned.
pub fn import_reset_chain<I, T>(raw_events: I) -> Result<ResetChain, ResetChainError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut events = Vec::new();

    for (index, raw) in raw_events.into_iter().enumerate() {
        let raw = raw.as_ref();
        let digest = ResetDigest::new(raw);
        let event: ResetEvent = serde_json::from_slice(raw)
            .map_err(|err| ResetChainError::InvalidEvent(index, err))?;
        events.push((event, digest));
    }

    debug!(events = events.len(), "imported reset chain");

    Ok(ResetChain(events))
}

#[derive(Error, Debug)]
pub enum ResetChainError {
    #[error("reset event at position {0} could not be parsed: {1}")]
    InvalidEvent(usize, serde_json::Error),
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::{ResetChainError, ResetDigest, ResetType, import_reset_chain};

    fn raw_event(reset_seqno: u64, reset_type: &str) -> String {
        format!(
            r#"{{"ctime":{},"merkle_root":{{"hash_meta":"aa","seqno":{}}},"prev":{{"eldest_kid":"0120","public_seqno":{},"reset":null}},"reset_seqno":{},"type":"{}","uid":"0102030405060708090a0b0c0d0e0f19"}}"#,
            1_500_000_000 + reset_seqno,
            reset_seqno * 10,
            reset_seqno + 3,
            reset_seqno,
            reset_type,
        )
    }

    #[test]
    fn import_in_order() {
        let raw = [raw_event(1, "reset"), raw_event(2, "reset"), raw_event(3, "delete")];

        let chain = import_reset_chain(&raw).unwrap();
        assert_eq!(chain.len(), 3);

        for (index, (event, digest)) in chain.iter().enumerate() {
            assert_eq!(event.reset_seqno, index as u64 + 1);
            assert_eq!(*digest, ResetDigest::new(raw[index].as_bytes()));
        }

        let (latest, _) = chain.latest().unwrap();
        assert_eq!(latest.reset_type, ResetType::Delete);
    }

    #[test]
    fn malformed_event_aborts_import() {
        let raw = [
            raw_event(1, "reset"),
            "{\"ctime\": \"not a number\"}".to_string(),
            raw_event(3, "reset"),
        ];

        assert_matches!(
            import_reset_chain(&raw),
            Err(ResetChainError::InvalidEvent(1, _))
        );
    }

    #[test]
    fn empty_input() {
        let raw: Vec<String> = Vec::new();
        assert!(import_reset_chain(raw).unwrap().is_empty());
    }

    #[test]
    fn digest_is_wide() {
        let digest = ResetDigest::new(b"event");
        assert_eq!(digest.as_bytes().len(), 64);
        assert_eq!(digest.to_hex().len(), 128);
    }
}
