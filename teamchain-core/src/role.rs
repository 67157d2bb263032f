// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a user inside a team. Greater roles contain all permissions of the lower ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    /// Not a member (anymore).
    #[default]
    None,

    /// Permission to read team data.
    Reader,

    /// Permission to read and write team data.
    Writer,

    /// Permission to change the team membership.
    Admin,

    /// Permission to change the team membership, including other owners and admins. Not allowed
    /// in subteams.
    Owner,
}

impl TeamRole {
    /// Role grants membership.
    pub fn is_member(&self) -> bool {
        !matches!(self, TeamRole::None)
    }

    /// Role is admin or owner.
    pub fn is_admin_or_above(&self) -> bool {
        matches!(self, TeamRole::Admin | TeamRole::Owner)
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TeamRole::None => "none",
            TeamRole::Reader => "reader",
            TeamRole::Writer => "writer",
            TeamRole::Admin => "admin",
            TeamRole::Owner => "owner",
        };

        write!(f, "{}", s)
    }
}
