// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to the services transactions depend on.
//!
//! Building a transaction needs to look up users and their proofs, committing it talks to the
//! Merkle tree, the lease service, the key manager and finally the team server. None of these are
//! implemented here, every call receives the [`Context`] of the running operation.
use teamchain_core::{Assertion, MerkleRoot, TeamId, Uid};

use crate::context::Context;
use crate::member_set::MemberSet;
use crate::section::AdminProof;
use crate::team::TeamChain;
use crate::types::{
    Lease, LeaseId, ProofSet, RecipientBoxes, ResolveResult, ResolvedAssertion, ResolvedUser,
    SigBatch, TeamChangeSet,
};

/// Resolve usernames to users and load their external proofs.
pub trait UserResolver {
    type Error: std::error::Error;

    fn resolve_user(
        &self,
        ctx: &Context,
        username: &str,
    ) -> impl Future<Output = Result<ResolvedUser, Self::Error>>;

    fn fetch_proofs(
        &self,
        ctx: &Context,
        username: &str,
    ) -> impl Future<Output = Result<ProofSet, Self::Error>>;
}

/// Resolve social assertions to users.
///
/// A resolution can't be trusted before it was verified.
pub trait AssertionResolver {
    type Error: std::error::Error;

    fn resolve(
        &self,
        ctx: &Context,
        assertion: &Assertion,
    ) -> impl Future<Output = Result<ResolveResult, Self::Error>>;

    fn verify(
        &self,
        ctx: &Context,
        resolved: &ResolvedAssertion,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

pub trait MerkleClient {
    type Error: std::error::Error;

    /// Fetch the latest root of the global Merkle tree, bypassing any cache.
    fn force_refresh(
        &self,
        ctx: &Context,
    ) -> impl Future<Output = Result<MerkleRoot, Self::Error>>;
}

pub trait LeaseProvider {
    type Error: std::error::Error;

    /// Request a lease protecting the privileges of the given users from being used while they
    /// are downgraded. Returns the lease and the Merkle root it was handed out at.
    fn request_downgrade_lease(
        &self,
        ctx: &Context,
        team_id: TeamId,
        uids: &[Uid],
    ) -> impl Future<Output = Result<(Lease, MerkleRoot), Self::Error>>;

    fn cancel_downgrade_lease(
        &self,
        ctx: &Context,
        lease_id: &LeaseId,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Key manager of a team.
pub trait KeyDistributor {
    type Error: std::error::Error;

    /// Make sure the shared secret of the team is loaded.
    fn ensure_shared_secret(
        &self,
        ctx: &Context,
        team: &TeamChain,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Encrypt the team secret for all affected members. Removing members rotates the per-team
    /// key.
    fn recipient_boxes(
        &self,
        ctx: &Context,
        team: &TeamChain,
        members: &MemberSet,
    ) -> impl Future<Output = Result<RecipientBoxes, Self::Error>>;
}

pub trait TeamAuthority {
    type Error: std::error::Error;

    /// Proof that the local user can administer the team. `None` if no proof is needed, for
    /// example when the user is an admin of the team itself.
    fn admin_permission(
        &self,
        ctx: &Context,
        team: &TeamChain,
    ) -> impl Future<Output = Result<Option<AdminProof>, Self::Error>>;
}

pub trait TeamServer {
    type Error: std::error::Error;

    /// Post all links of a transaction. Either all of them are accepted or none.
    fn post_multi(
        &self,
        ctx: &Context,
        batch: SigBatch,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    fn notify(
        &self,
        ctx: &Context,
        team_id: TeamId,
        changes: TeamChangeSet,
    ) -> impl Future<Output = ()>;
}

/// All services needed to commit a transaction.
pub trait CommitServices:
    MerkleClient + LeaseProvider + KeyDistributor + TeamAuthority + TeamServer
{
}

impl<T> CommitServices for T where
    T: MerkleClient + LeaseProvider + KeyDistributor + TeamAuthority + TeamServer
{
}
