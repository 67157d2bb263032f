// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending team invites.
//!
//! Invites stand in for users who can't be added as members directly. Keybase-type invites name a
//! user version which doesn't have a per-user key (PUK) yet, social invites name an assertion like
//! `alice@twitter` which is later completed by whoever proves ownership of it.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::fixed_id;
use crate::rng::{Rng, RngError};
use crate::role::TeamRole;
use crate::user::UserVersion;

/// Size of invite ids.
pub const INVITE_ID_LEN: usize = 16;

/// Last byte of every invite id.
pub const INVITE_ID_SUFFIX: u8 = 0x27;

fixed_id!(
    /// Identifier of a team invite.
    InviteId,
    INVITE_ID_LEN
);

impl InviteId {
    /// Generate a new random invite id.
    pub fn random(rng: &Rng) -> Result<Self, RngError> {
        let mut bytes = [0; INVITE_ID_LEN];
        rng.fill_bytes(&mut bytes[..INVITE_ID_LEN - 1])?;
        bytes[INVITE_ID_LEN - 1] = INVITE_ID_SUFFIX;
        Ok(Self::from_bytes(bytes))
    }
}

/// Broad category of an invite type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InviteCategory {
    /// Invite for a keybase user without a PUK.
    Keybase,

    /// Invite for a social assertion, like `alice@twitter`.
    Social,

    /// Invite sent out via email.
    Email,

    /// Invite which is redeemed with a shared secret token.
    Seitan,
}

/// Type tag of an invite.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum InviteType {
    Keybase,
    Email,
    Seitan,

    /// Social service the invite's name is an identity on (`twitter`, `github`, ..).
    Social(String),
}

impl InviteType {
    pub fn category(&self) -> InviteCategory {
        match self {
            InviteType::Keybase => InviteCategory::Keybase,
            InviteType::Email => InviteCategory::Email,
            InviteType::Seitan => InviteCategory::Seitan,
            InviteType::Social(_) => InviteCategory::Social,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InviteType::Keybase => "keybase",
            InviteType::Email => "email",
            InviteType::Seitan => "seitan_invite_token",
            InviteType::Social(service) => service,
        }
    }
}

impl From<&str> for InviteType {
    fn from(value: &str) -> Self {
        match value {
            "keybase" => InviteType::Keybase,
            "email" => InviteType::Email,
            "seitan_invite_token" => InviteType::Seitan,
            service => InviteType::Social(service.to_string()),
        }
    }
}

impl From<String> for InviteType {
    fn from(value: String) -> Self {
        InviteType::from(value.as_str())
    }
}

impl From<InviteType> for String {
    fn from(value: InviteType) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for InviteType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(InviteType::from(value))
    }
}

impl fmt::Display for InviteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Active invite of a team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInvite {
    pub id: InviteId,
    pub invite_type: InviteType,
    pub name: String,
    pub role: TeamRole,
}

impl TeamInvite {
    /// Keybase-type invite for a user version without PUK.
    pub fn keybase(id: InviteId, user_version: &UserVersion, role: TeamRole) -> Self {
        Self {
            id,
            invite_type: InviteType::Keybase,
            name: user_version.percent_form().to_string(),
            role,
        }
    }

    /// Social invite for an identity on the given service.
    pub fn social(id: InviteId, service: &str, name: &str, role: TeamRole) -> Self {
        Self {
            id,
            invite_type: InviteType::Social(service.to_string()),
            name: name.to_string(),
            role,
        }
    }

    pub fn category(&self) -> InviteCategory {
        self.invite_type.category()
    }

    /// The user version a keybase-type invite was made for.
    ///
    /// Returns `None` for all other invite types or if the invite name is malformed.
    pub fn keybase_user_version(&self) -> Option<UserVersion> {
        match self.invite_type {
            InviteType::Keybase => self.name.parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::rng::Rng;
    use crate::role::TeamRole;
    use crate::user::{Uid, UserVersion};

    use super::{INVITE_ID_SUFFIX, InviteCategory, InviteId, InviteType, TeamInvite};

    #[test]
    fn random_invite_ids() {
        let rng = Rng::from_seed([1; 32]);
        let id_1 = InviteId::random(&rng).unwrap();
        let id_2 = InviteId::random(&rng).unwrap();

        assert_ne!(id_1, id_2);
        assert_eq!(id_1.as_bytes()[15], INVITE_ID_SUFFIX);
        assert!(id_1.to_hex().ends_with("27"));
    }

    #[test]
    fn invite_type_strings() {
        assert_eq!(InviteType::from("keybase"), InviteType::Keybase);
        assert_eq!(
            InviteType::from("twitter"),
            InviteType::Social("twitter".into())
        );
        assert_eq!(InviteType::from("twitter").category(), InviteCategory::Social);

        let json = serde_json::to_string(&InviteType::Social("github".into())).unwrap();
        assert_eq!(json, "\"github\"");
    }

    #[test]
    fn keybase_user_version() {
        let rng = Rng::from_seed([1; 32]);
        let uv = UserVersion::new(Uid::from_bytes([9; 16]), 2);

        let invite = TeamInvite::keybase(InviteId::random(&rng).unwrap(), &uv, TeamRole::Writer);
        assert_eq!(invite.keybase_user_version(), Some(uv));

        let social = TeamInvite::social(
            InviteId::random(&rng).unwrap(),
            "twitter",
            "alice",
            TeamRole::Reader,
        );
        assert_eq!(social.keybase_user_version(), None);
    }
}
