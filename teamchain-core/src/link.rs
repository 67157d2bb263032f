// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed, hash-linked team chain links.
//!
//! Every link consists of a [`Header`] and a body. The header commits to the body via its hash
//! and size, to the previous link via `backlink` and to a recent global Merkle root. The header is
//! signed by the acting device and the hash of the signed header is the id of the link.
//!
//! ```text
//! seq_num:   1          2          3
//!         [ link ] <- [ link ] <- [ link ]
//!             \           \           \
//!            body        body        body
//! ```
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cbor::{EncodeError, encode_cbor};
use crate::hash::Hash;
use crate::id::fixed_id;
use crate::identity::{PublicKey, Signature, Signer};
use crate::serde::{deserialize_hex, serialize_hex};

/// Size of team ids.
pub const TEAM_ID_LEN: usize = 16;

/// Latest supported link format version.
pub const LINK_VERSION: u64 = 2;

/// Position of a link in the team chain. The first link has sequence number 1.
pub type SeqNum = u64;

fixed_id!(
    /// Identifier of a team.
    TeamId,
    TEAM_ID_LEN
);

/// Type of the mutation a link carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    /// Adds, removes or changes the role of members and completes invites.
    #[serde(rename = "team.change_membership")]
    ChangeMembership,

    /// Creates or cancels invites.
    #[serde(rename = "team.invite")]
    Invite,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkType::ChangeMembership => "team.change_membership",
            LinkType::Invite => "team.invite",
        };

        write!(f, "{}", s)
    }
}

/// Root of the global Merkle tree a link was created against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleRoot {
    pub seqno: u64,
    pub hash: Hash,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub version: u64,
    pub team_id: TeamId,
    pub public_key: PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    pub link_type: LinkType,
    pub seq_num: SeqNum,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlink: Option<Hash>,
    pub merkle_root: MerkleRoot,
    pub body_size: u64,
    pub body_hash: Hash,
}

impl Header {
    /// CBOR representation of this header.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        encode_cbor(self)
    }

    /// Sign the header with the given signer. Any previous signature is replaced.
    pub fn sign<S: Signer>(&mut self, signer: &S) -> Result<(), EncodeError> {
        // Make sure the signature is not already set before we encode
        self.signature = None;
        self.public_key = signer.public_key();

        let bytes = self.to_bytes()?;
        self.signature = Some(signer.sign(&bytes));
        Ok(())
    }

    /// Returns true if the header carries a valid signature of its claimed public key.
    pub fn verify(&self) -> bool {
        let Some(claimed_signature) = self.signature else {
            return false;
        };

        let mut unsigned_header = self.clone();
        unsigned_header.signature = None;
        match unsigned_header.to_bytes() {
            Ok(unsigned_bytes) => self.public_key.verify(&unsigned_bytes, &claimed_signature),
            Err(_) => false,
        }
    }

    /// Hash of the encoded (signed) header, the id of the link.
    pub fn hash(&self) -> Result<Hash, EncodeError> {
        Ok(Hash::new(self.to_bytes()?))
    }
}

/// Signed link ready to be posted to the team chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainLink {
    pub hash: Hash,
    pub header: Header,
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")]
    pub body: Vec<u8>,
}

impl ChainLink {
    /// Assemble a link from a signed header and the body it commits to.
    pub fn new(header: Header, body: Vec<u8>) -> Result<Self, LinkError> {
        let hash = header.hash()?;
        let link = Self { hash, header, body };
        validate_link(&link)?;
        Ok(link)
    }

    pub fn seq_num(&self) -> SeqNum {
        self.header.seq_num
    }

    pub fn link_type(&self) -> LinkType {
        self.header.link_type
    }

    pub fn backlink(&self) -> Option<Hash> {
        self.header.backlink
    }
}

impl PartialEq for ChainLink {
    fn eq(&self, other: &Self) -> bool {
        self.hash.eq(&other.hash)
    }
}

impl Eq for ChainLink {}

/// Checks that a link is well-formed on its own: it is signed, its hash matches the header and the
/// header matches the body.
///
/// This does not check the link against the state of a team chain.
pub fn validate_link(link: &ChainLink) -> Result<(), LinkError> {
    let header = &link.header;

    if header.version > LINK_VERSION {
        return Err(LinkError::UnsupportedVersion(header.version, LINK_VERSION));
    }

    if header.seq_num == 0 {
        return Err(LinkError::InvalidSeqNum);
    }

    if header.seq_num == 1 && header.backlink.is_some() {
        return Err(LinkError::BacklinkMismatch);
    }

    if header.seq_num > 1 && header.backlink.is_none() {
        return Err(LinkError::BacklinkMismatch);
    }

    if header.signature.is_none() {
        return Err(LinkError::MissingSignature);
    }

    if !header.verify() {
        return Err(LinkError::SignatureMismatch);
    }

    if header.body_size != link.body.len() as u64 || header.body_hash != Hash::new(&link.body) {
        return Err(LinkError::BodyMismatch);
    }

    if header.hash()? != link.hash {
        return Err(LinkError::HashMismatch);
    }

    Ok(())
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("link version {0} is not supported, needs to be <= {1}")]
    UnsupportedVersion(u64, u64),

    #[error("sequence number of a link can't be 0")]
    InvalidSeqNum,

    #[error("backlink needs to be set on every link but the first")]
    BacklinkMismatch,

    #[error("link needs to be signed")]
    MissingSignature,

    #[error("signature does not match claimed public key")]
    SignatureMismatch,

    #[error("body hash and size do not match given body")]
    BodyMismatch,

    #[error("link hash does not match its header")]
    HashMismatch,

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::hash::Hash;
    use crate::identity::{PrivateKey, Signer};

    use super::{ChainLink, Header, LINK_VERSION, LinkError, LinkType, MerkleRoot, TeamId};

    fn header(private_key: &PrivateKey, seq_num: u64, backlink: Option<Hash>, body: &[u8]) -> Header {
        Header {
            version: LINK_VERSION,
            team_id: TeamId::from_bytes([4; 16]),
            public_key: private_key.public_key(),
            signature: None,
            link_type: LinkType::ChangeMembership,
            seq_num,
            backlink,
            merkle_root: MerkleRoot {
                seqno: 100,
                hash: Hash::new(b"root"),
            },
            body_size: body.len() as u64,
            body_hash: Hash::new(body),
        }
    }

    #[test]
    fn sign_and_link() {
        let private_key = PrivateKey::from_bytes(&[1; 32]);
        let body = b"section".to_vec();

        let mut header_1 = header(&private_key, 1, None, &body);
        header_1.sign(&private_key).unwrap();
        assert!(header_1.verify());
        let link_1 = ChainLink::new(header_1, body.clone()).unwrap();

        let mut header_2 = header(&private_key, 2, Some(link_1.hash), &body);
        header_2.sign(&private_key).unwrap();
        let link_2 = ChainLink::new(header_2, body).unwrap();

        assert_eq!(link_2.backlink(), Some(link_1.hash));
        assert_ne!(link_1.hash, link_2.hash);
    }

    #[test]
    fn reject_tampered_links() {
        let private_key = PrivateKey::from_bytes(&[1; 32]);
        let body = b"section".to_vec();

        let unsigned = header(&private_key, 1, None, &body);
        assert_matches!(
            ChainLink::new(unsigned.clone(), body.clone()),
            Err(LinkError::MissingSignature)
        );

        let mut signed = unsigned;
        signed.sign(&private_key).unwrap();
        assert_matches!(
            ChainLink::new(signed.clone(), b"other".to_vec()),
            Err(LinkError::BodyMismatch)
        );

        let mut forged = signed;
        forged.seq_num = 5;
        forged.backlink = Some(Hash::new(b"previous"));
        assert_matches!(
            ChainLink::new(forged, body),
            Err(LinkError::SignatureMismatch)
        );
    }

    #[test]
    fn backlink_rules() {
        let private_key = PrivateKey::from_bytes(&[1; 32]);
        let body = b"section".to_vec();

        let mut header = header(&private_key, 3, None, &body);
        header.sign(&private_key).unwrap();
        assert_matches!(
            ChainLink::new(header, body),
            Err(LinkError::BacklinkMismatch)
        );
    }
}
