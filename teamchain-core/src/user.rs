// SPDX-License-Identifier: MIT OR Apache-2.0

//! Users and their versions.
//!
//! A user is identified by a stable [`Uid`] which never changes, even when the account gets
//! reset. Every reset starts a new "incarnation" of the user, marked by a higher eldest sequence
//! number. A [`UserVersion`] names exactly one of these incarnations and is what gets added to or
//! removed from a team.
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{IdError, fixed_id};

/// Size of user ids.
pub const UID_LEN: usize = 16;

fixed_id!(
    /// Stable identifier of a user, constant across account resets.
    Uid,
    UID_LEN
);

/// Epoch marker of a user, advanced on every account reset.
///
/// Zero is a valid value and denotes a user who is in the middle of a reset (reset but not yet
/// provisioned again).
pub type EldestSeqno = u64;

/// One incarnation of a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserVersion {
    pub uid: Uid,
    pub eldest_seqno: EldestSeqno,
}

impl UserVersion {
    pub fn new(uid: Uid, eldest_seqno: EldestSeqno) -> Self {
        Self { uid, eldest_seqno }
    }

    /// Returns true if both versions belong to the same stable user id.
    pub fn same_user(&self, other: &UserVersion) -> bool {
        self.uid == other.uid
    }

    /// Returns true if this version is a later incarnation of the same user.
    pub fn supersedes(&self, other: &UserVersion) -> bool {
        self.same_user(other) && self.eldest_seqno > other.eldest_seqno
    }

    /// Textual `uid%eldest_seqno` form of this version.
    ///
    /// This form is used as the name of keybase-type invites and to express invite completions.
    pub fn percent_form(&self) -> UserVersionPercentForm {
        UserVersionPercentForm(format!("{}%{}", self.uid, self.eldest_seqno))
    }
}

impl fmt::Display for UserVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%{}", self.uid, self.eldest_seqno)
    }
}

/// User version encoded as `uid%eldest_seqno` string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserVersionPercentForm(String);

impl UserVersionPercentForm {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the string back into a user version.
    pub fn user_version(&self) -> Result<UserVersion, UserVersionError> {
        self.0.parse()
    }
}

impl fmt::Display for UserVersionPercentForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserVersion> for UserVersionPercentForm {
    fn from(value: UserVersion) -> Self {
        value.percent_form()
    }
}

impl FromStr for UserVersion {
    type Err = UserVersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (uid, eldest_seqno) = value
            .split_once('%')
            .ok_or_else(|| UserVersionError::MissingSeparator(value.to_string()))?;
        let uid: Uid = uid.parse()?;
        let eldest_seqno: EldestSeqno = eldest_seqno.parse()?;
        Ok(Self { uid, eldest_seqno })
    }
}

#[derive(Error, Debug)]
pub enum UserVersionError {
    #[error("user version \"{0}\" is missing the '%' separator")]
    MissingSeparator(String),

    #[error("invalid uid in user version: {0}")]
    InvalidUid(#[from] IdError),

    #[error("invalid eldest seqno in user version: {0}")]
    InvalidEldestSeqno(#[from] ParseIntError),
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::{Uid, UserVersion, UserVersionError};

    #[test]
    fn percent_form() {
        let uv = UserVersion::new(Uid::from_bytes([0xab; 16]), 5);
        let percent_form = uv.percent_form();

        assert_eq!(
            percent_form.as_str(),
            "abababababababababababababababab%5"
        );
        assert_eq!(percent_form.user_version().unwrap(), uv);
    }

    #[test]
    fn supersedes() {
        let uid = Uid::from_bytes([1; 16]);
        let old = UserVersion::new(uid, 1);
        let new = UserVersion::new(uid, 4);
        let stranger = UserVersion::new(Uid::from_bytes([2; 16]), 9);

        assert!(new.supersedes(&old));
        assert!(!old.supersedes(&new));
        assert!(!stranger.supersedes(&old));
    }

    #[test]
    fn invalid_percent_forms() {
        assert_matches!(
            "abab".parse::<UserVersion>(),
            Err(UserVersionError::MissingSeparator(_))
        );
        assert_matches!(
            "zz%1".parse::<UserVersion>(),
            Err(UserVersionError::InvalidUid(_))
        );
        assert_matches!(
            "abababababababababababababababab%x".parse::<UserVersion>(),
            Err(UserVersionError::InvalidEldestSeqno(_))
        );
    }
}
