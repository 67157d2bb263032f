// SPDX-License-Identifier: MIT OR Apache-2.0

use teamchain_core::{
    AssertionError, EldestSeqno, EncodeError, LinkError, RngError, TeamRole, Uid, UserVersion,
};
use thiserror::Error;

use crate::context::Cancelled;
use crate::team::PrecheckError;
use crate::traits::{
    CommitServices, KeyDistributor, LeaseProvider, MerkleClient, TeamAuthority, TeamServer,
    UserResolver,
};

/// Errors while adding mutations to a transaction.
///
/// A failed operation leaves the transaction untouched, callers can skip the affected user and
/// continue building the transaction.
#[derive(Debug, Error)]
pub enum BuildError<R>
where
    R: UserResolver,
{
    #[error("can't add members by username to implicit team")]
    ImplicitTeam,

    #[error("only implicit teams can re-add members by user version")]
    NotImplicitTeam,

    #[error("subteams can't have owners")]
    SubteamOwner,

    #[error("can't add or invite user with role {0}")]
    InvalidRole(TeamRole),

    #[error("user {0} is already a member but has no per-user key")]
    AlreadyMemberWithoutPuk(String),

    #[error("user {0} is already a member of team \"{1}\"")]
    AlreadyMember(String, String),

    #[error("user {0} is already invited to team \"{1}\"")]
    AlreadyInvited(String, String),

    #[error(
        "newer version of user {username} (uid: {uid}) already exists in the team ({existing} > {incoming})"
    )]
    SupersededUser {
        username: String,
        uid: Uid,
        existing: EldestSeqno,
        incoming: EldestSeqno,
    },

    #[error("could not find {0} in transaction")]
    UserNotInTransaction(UserVersion),

    #[error("re-adding a member to an implicit team would create {0} links")]
    TooManyLinks(usize),

    #[error("{0}")]
    Resolve(R::Error),

    #[error(transparent)]
    Assertion(#[from] AssertionError),

    #[error(transparent)]
    Rng(#[from] RngError),
}

/// Errors while committing a transaction.
///
/// Nothing was posted when any of these occur. The transaction can't be retried as-is, the team
/// needs to be reloaded and the transaction built again.
#[derive(Debug, Error)]
pub enum CommitError<S>
where
    S: CommitServices,
{
    #[error("there are no links to post")]
    NoPayloads,

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("got a new per-team key but no link removes members to attach it to")]
    OrphanedPerTeamKey,

    #[error("{0}")]
    KeyDistributor(<S as KeyDistributor>::Error),

    #[error("{0}")]
    Merkle(<S as MerkleClient>::Error),

    #[error("{0}")]
    Authority(<S as TeamAuthority>::Error),

    #[error("{0}")]
    Lease(<S as LeaseProvider>::Error),

    #[error("{0}")]
    Server(<S as TeamServer>::Error),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Precheck(#[from] PrecheckError),

    #[error(transparent)]
    Rng(#[from] RngError),
}
