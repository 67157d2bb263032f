// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use teamchain_core::{
    Assertion, ChainLink, TeamId, Uid, UserVersion, deserialize_hex, serialize_hex,
};

use crate::section::PerTeamKeySection;

/// User as returned by identity resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedUser {
    /// Username in its normalized form.
    pub username: String,

    /// Current version of the user.
    pub user_version: UserVersion,

    /// True if the user has a per-user key and can become a member directly. Users without one
    /// can only be invited.
    pub has_puk: bool,
}

/// Identity proof a user made on an external service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    pub key: String,
    pub value: String,
}

/// External proofs of a user, keyed by service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProofSet(BTreeMap<String, Vec<Proof>>);

impl ProofSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, service: &str, value: &str) {
        self.0.entry(service.to_owned()).or_default().push(Proof {
            key: service.to_owned(),
            value: value.to_owned(),
        });
    }

    /// All proofs for the given service.
    pub fn get(&self, service: &str) -> &[Proof] {
        self.0.get(service).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Result of resolving an assertion to a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveResult {
    pub uid: Uid,
    pub username: Option<String>,
}

/// Assertion which was resolved for a user and still needs to be verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAssertion {
    pub uid: Uid,
    pub assertion: Assertion,
    pub result: ResolveResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseId(String);

impl LeaseId {
    pub fn new(id: &str) -> Self {
        Self(id.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LeaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Downgrade lease handed out by the server.
///
/// While the lease is held no other party can use privileges of the users it was requested for.
/// Leases expire on their own but should always be cancelled as soon as they are not needed
/// anymore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lease {
    pub id: LeaseId,
}

/// Team secret encrypted for one recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretBox {
    pub uid: Uid,
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")]
    pub ciphertext: Vec<u8>,
}

/// Team secret of one generation encrypted for all recipients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretBoxes {
    pub generation: u64,
    pub boxes: Vec<SecretBox>,
}

/// Secret of an implicit team encrypted for one of its admins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplicitAdminBox {
    pub team_id: TeamId,
    #[serde(rename = "box")]
    pub secret_box: SecretBox,
}

/// Key material produced for the members affected by a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecipientBoxes {
    pub secret_boxes: Option<SecretBoxes>,
    pub implicit_admin_boxes: Vec<ImplicitAdminBox>,

    /// Set if a new per-team key generation was created for this transaction.
    pub per_team_key: Option<PerTeamKeySection>,
}

/// Signed links and accompanying material posted to the server in a single request.
///
/// The server applies either all links in the given order or none of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigBatch {
    pub sigs: Vec<ChainLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downgrade_lease_id: Option<LeaseId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implicit_team_keys: Vec<ImplicitAdminBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_team_key: Option<SecretBoxes>,
}

/// Change notification broadcast after a transaction was posted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeamChangeSet {
    pub membership_changed: bool,
    pub key_rotated: bool,
}
