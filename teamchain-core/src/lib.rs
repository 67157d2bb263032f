// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data-types for team membership chains.
//!
//! A team's membership history is an append-only chain of signed links. Each [`ChainLink`]
//! carries a [`Header`] with a strictly increasing sequence number, the hash of the previous link
//! and a reference to the Merkle root it was created against, plus a CBOR-encoded body describing
//! the membership mutation.
//!
//! This crate contains the identifiers and primitives every other part of the system agrees on:
//! users and their versions, roles, invites, assertions, links and the reset-chain importer.
pub mod assertion;
pub mod cbor;
pub mod hash;
mod id;
pub mod identity;
pub mod invite;
pub mod link;
pub mod reset;
pub mod rng;
mod serde;
pub mod role;
pub mod user;

pub use assertion::{Assertion, AssertionError};
pub use cbor::{DecodeError, EncodeError, decode_cbor, encode_cbor};
pub use hash::Hash;
pub use id::IdError;
pub use identity::{IdentityError, PrivateKey, PublicKey, Signature, Signer};
pub use invite::{InviteCategory, InviteId, InviteType, TeamInvite};
pub use link::{
    ChainLink, Header, LinkError, LinkType, MerkleRoot, SeqNum, TeamId, validate_link,
};
pub use reset::{
    ResetChain, ResetChainError, ResetDigest, ResetEvent, ResetType, import_reset_chain,
};
pub use rng::{Rng, RngError};
pub use role::TeamRole;
pub use crate::serde::{deserialize_hex, serialize_hex};
pub use user::{EldestSeqno, Uid, UserVersion, UserVersionError, UserVersionPercentForm};
