// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bodies of team chain links.
//!
//! Every link carries one CBOR-encoded [`TeamSection`]. Which optional parts of a section are set
//! depends on the link type: membership changes carry members and completed invites, invite links
//! carry the invite batch and fresh entropy.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use teamchain_core::{
    Hash, InviteId, LinkType, Rng, RngError, SeqNum, TeamId, UserVersionPercentForm,
    deserialize_hex, serialize_hex,
};

use crate::payload::InviteBatch;

/// Proof that the author of a link is allowed to administer the team, pointing at the link which
/// granted them that role.
///
/// Implicit admins of a subteam point at a link of the parent team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProof {
    pub team_id: TeamId,
    pub seq_num: SeqNum,
    pub link_type: LinkType,
    pub link_hash: Hash,
}

/// Random salt making every invite section unique.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entropy(
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")] Vec<u8>,
);

impl Entropy {
    pub fn random(rng: &Rng, len: usize) -> Result<Self, RngError> {
        Ok(Self(rng.salt(len)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Entropy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Entropy").field(&hex::encode(&self.0)).finish()
    }
}

/// Members per role as they appear in a membership change section. Members listed under `none`
/// are removed from the team.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembersSection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<UserVersionPercentForm>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admins: Vec<UserVersionPercentForm>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writers: Vec<UserVersionPercentForm>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readers: Vec<UserVersionPercentForm>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub none: Vec<UserVersionPercentForm>,
}

/// New per-team key generation, announced in the first link of a transaction which removes
/// members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerTeamKeySection {
    pub generation: u64,
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")]
    pub encryption_key: Vec<u8>,
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")]
    pub signing_key: Vec<u8>,
}

/// Body of a team chain link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSection {
    pub id: TeamId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminProof>,
    pub implicit: bool,
    pub public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<MembersSection>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub completed_invites: BTreeMap<InviteId, UserVersionPercentForm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invites: Option<InviteBatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy: Option<Entropy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_team_key: Option<PerTeamKeySection>,
}

impl TeamSection {
    /// Section with the fields every link of a team shares.
    pub fn new(id: TeamId, admin: Option<AdminProof>, implicit: bool, public: bool) -> Self {
        Self {
            id,
            admin,
            implicit,
            public,
            members: None,
            completed_invites: BTreeMap::new(),
            invites: None,
            entropy: None,
            per_team_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use teamchain_core::{Rng, TeamId, Uid, UserVersion, decode_cbor, encode_cbor};

    use super::{Entropy, MembersSection, TeamSection};

    #[test]
    fn entropy_length() {
        let rng = Rng::from_seed([1; 32]);
        let entropy = Entropy::random(&rng, 18).unwrap();
        assert_eq!(entropy.as_bytes().len(), 18);
        assert_ne!(entropy, Entropy::random(&rng, 18).unwrap());
    }

    #[test]
    fn empty_parts_are_omitted() {
        let section = TeamSection::new(TeamId::from_bytes([3; 16]), None, false, true);
        let json = serde_json::to_value(&section).unwrap();
        let object = json.as_object().unwrap();

        assert!(object.contains_key("id"));
        assert!(!object.contains_key("admin"));
        assert!(!object.contains_key("members"));
        assert!(!object.contains_key("completed_invites"));
        assert!(!object.contains_key("entropy"));
    }

    #[test]
    fn cbor_body() {
        let uv = UserVersion::new(Uid::from_bytes([1; 16]), 1);
        let mut section = TeamSection::new(TeamId::from_bytes([3; 16]), None, true, false);
        section.members = Some(MembersSection {
            writers: vec![uv.percent_form()],
            ..Default::default()
        });

        let bytes = encode_cbor(&section).unwrap();
        let decoded: TeamSection = decode_cbor(&bytes[..]).unwrap();
        assert_eq!(decoded, section);
    }
}
