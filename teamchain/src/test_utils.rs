// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory services for testing transactions without a server.
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use teamchain_core::{Assertion, Hash, MerkleRoot, TeamId, Uid, UserVersion};
use thiserror::Error;

use crate::context::Context;
use crate::member_set::MemberSet;
use crate::section::{AdminProof, PerTeamKeySection};
use crate::team::TeamChain;
use crate::traits::{
    AssertionResolver, KeyDistributor, LeaseProvider, MerkleClient, TeamAuthority, TeamServer,
    UserResolver,
};
use crate::types::{
    Lease, LeaseId, ProofSet, RecipientBoxes, ResolveResult, ResolvedAssertion, ResolvedUser,
    SecretBox, SecretBoxes, SigBatch, TeamChangeSet,
};

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// User version with a uid filled with the given byte.
pub fn user_version(n: u8, eldest_seqno: u64) -> UserVersion {
    UserVersion::new(Uid::from_bytes([n; 16]), eldest_seqno)
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TestError(pub String);

/// Users, proofs and assertions known to the tests.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    users: HashMap<String, ResolvedUser>,
    proofs: HashMap<String, ProofSet>,
    assertions: HashMap<String, Uid>,
    unverifiable: HashSet<String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: &str, user_version: UserVersion, has_puk: bool) -> Self {
        self.users.insert(
            username.to_owned(),
            ResolvedUser {
                username: username.to_owned(),
                user_version,
                has_puk,
            },
        );
        self
    }

    pub fn with_proof(mut self, username: &str, service: &str, value: &str) -> Self {
        self.proofs
            .entry(username.to_owned())
            .or_default()
            .add(service, value);
        self
    }

    /// Let the assertion `value@service` resolve to the given user.
    pub fn with_assertion(mut self, assertion: &str, uid: Uid) -> Self {
        self.assertions.insert(assertion.to_owned(), uid);
        self
    }

    /// Let verification of the assertion fail even though it resolves.
    pub fn with_unverifiable(mut self, assertion: &str) -> Self {
        self.unverifiable.insert(assertion.to_owned());
        self
    }
}

impl UserResolver for MemoryResolver {
    type Error = TestError;

    async fn resolve_user(
        &self,
        _ctx: &Context,
        username: &str,
    ) -> Result<ResolvedUser, Self::Error> {
        self.users
            .get(username)
            .cloned()
            .ok_or_else(|| TestError(format!("user {username} not found")))
    }

    async fn fetch_proofs(&self, _ctx: &Context, username: &str) -> Result<ProofSet, Self::Error> {
        Ok(self.proofs.get(username).cloned().unwrap_or_default())
    }
}

impl AssertionResolver for MemoryResolver {
    type Error = TestError;

    async fn resolve(
        &self,
        _ctx: &Context,
        assertion: &Assertion,
    ) -> Result<ResolveResult, Self::Error> {
        let uid = self
            .assertions
            .get(&assertion.to_string())
            .ok_or_else(|| TestError(format!("assertion {assertion} does not resolve")))?;

        Ok(ResolveResult {
            uid: *uid,
            username: None,
        })
    }

    async fn verify(
        &self,
        _ctx: &Context,
        resolved: &ResolvedAssertion,
    ) -> Result<(), Self::Error> {
        if self.unverifiable.contains(&resolved.assertion.to_string()) {
            return Err(TestError(format!(
                "assertion {} failed verification",
                resolved.assertion
            )));
        }
        Ok(())
    }
}

/// Step at which [`MemoryServices`] fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    SharedSecret,
    MerkleRefresh,
    Lease,
    LeaseCancel,
    RecipientBoxes,
    Post,
}

/// When [`MemoryServices`] hand out a new per-team key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyRotation {
    #[default]
    Never,
    OnRemoval,
    Always,
}

/// Calls the services received.
#[derive(Debug, Default)]
pub struct Recorded {
    pub requested_leases: Vec<(LeaseId, Vec<Uid>)>,
    pub cancelled_leases: Vec<LeaseId>,
    pub posted: Vec<SigBatch>,
    pub notifications: Vec<(TeamId, TeamChangeSet)>,
}

/// Merkle tree, lease service, key manager and team server in memory.
#[derive(Debug)]
pub struct MemoryServices {
    merkle_root: MerkleRoot,
    lease_root: MerkleRoot,
    admin: Option<AdminProof>,
    key_rotation: KeyRotation,
    failure: Option<Failure>,
    cancel_on_lease: Option<Context>,
    recorded: Mutex<Recorded>,
}

impl Default for MemoryServices {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServices {
    pub fn new() -> Self {
        Self {
            merkle_root: MerkleRoot {
                seqno: 100,
                hash: Hash::new(b"merkle root"),
            },
            lease_root: MerkleRoot {
                seqno: 101,
                hash: Hash::new(b"lease merkle root"),
            },
            admin: None,
            key_rotation: KeyRotation::default(),
            failure: None,
            cancel_on_lease: None,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn with_admin_proof(mut self, admin: AdminProof) -> Self {
        self.admin = Some(admin);
        self
    }

    pub fn with_key_rotation(mut self, key_rotation: KeyRotation) -> Self {
        self.key_rotation = key_rotation;
        self
    }

    pub fn with_failure(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Cancel the given context while a granted lease is still on its way to the caller.
    pub fn with_cancel_on_lease(mut self, ctx: Context) -> Self {
        self.cancel_on_lease = Some(ctx);
        self
    }

    pub fn merkle_root(&self) -> MerkleRoot {
        self.merkle_root
    }

    pub fn lease_root(&self) -> MerkleRoot {
        self.lease_root
    }

    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }

    fn fail_at(&self, failure: Failure) -> Result<(), TestError> {
        if self.failure == Some(failure) {
            return Err(TestError(format!("{failure:?} failed")));
        }
        Ok(())
    }
}

impl MerkleClient for MemoryServices {
    type Error = TestError;

    async fn force_refresh(&self, _ctx: &Context) -> Result<MerkleRoot, Self::Error> {
        self.fail_at(Failure::MerkleRefresh)?;
        Ok(self.merkle_root)
    }
}

impl LeaseProvider for MemoryServices {
    type Error = TestError;

    async fn request_downgrade_lease(
        &self,
        _ctx: &Context,
        _team_id: TeamId,
        uids: &[Uid],
    ) -> Result<(Lease, MerkleRoot), Self::Error> {
        self.fail_at(Failure::Lease)?;

        let mut recorded = self.recorded();
        let id = LeaseId::new(&format!("lease-{}", recorded.requested_leases.len()));
        recorded.requested_leases.push((id.clone(), uids.to_vec()));

        drop(recorded);

        // The lease is granted, the caller only learns about it after the next poll.
        if let Some(ctx) = &self.cancel_on_lease {
            ctx.cancel();
            tokio::task::yield_now().await;
        }

        Ok((Lease { id }, self.lease_root))
    }

    async fn cancel_downgrade_lease(
        &self,
        _ctx: &Context,
        lease_id: &LeaseId,
    ) -> Result<(), Self::Error> {
        self.recorded().cancelled_leases.push(lease_id.clone());
        self.fail_at(Failure::LeaseCancel)
    }
}

impl KeyDistributor for MemoryServices {
    type Error = TestError;

    async fn ensure_shared_secret(
        &self,
        _ctx: &Context,
        _team: &TeamChain,
    ) -> Result<(), Self::Error> {
        self.fail_at(Failure::SharedSecret)
    }

    async fn recipient_boxes(
        &self,
        _ctx: &Context,
        _team: &TeamChain,
        members: &MemberSet,
    ) -> Result<RecipientBoxes, Self::Error> {
        self.fail_at(Failure::RecipientBoxes)?;

        let rotate = match self.key_rotation {
            KeyRotation::Never => false,
            KeyRotation::OnRemoval => !members.none.is_empty(),
            KeyRotation::Always => true,
        };
        let generation = if rotate { 2 } else { 1 };

        let boxes: Vec<SecretBox> = members
            .recipients()
            .map(|user_version| SecretBox {
                uid: user_version.uid,
                ciphertext: user_version.uid.as_bytes().to_vec(),
            })
            .collect();

        let secret_boxes =
            (rotate || !boxes.is_empty()).then_some(SecretBoxes { generation, boxes });

        let per_team_key = rotate.then(|| PerTeamKeySection {
            generation,
            encryption_key: vec![1; 32],
            signing_key: vec![2; 32],
        });

        Ok(RecipientBoxes {
            secret_boxes,
            implicit_admin_boxes: Vec::new(),
            per_team_key,
        })
    }
}

impl TeamAuthority for MemoryServices {
    type Error = TestError;

    async fn admin_permission(
        &self,
        _ctx: &Context,
        _team: &TeamChain,
    ) -> Result<Option<AdminProof>, Self::Error> {
        Ok(self.admin.clone())
    }
}

impl TeamServer for MemoryServices {
    type Error = TestError;

    async fn post_multi(&self, _ctx: &Context, batch: SigBatch) -> Result<(), Self::Error> {
        self.fail_at(Failure::Post)?;
        self.recorded().posted.push(batch);
        Ok(())
    }

    async fn notify(&self, _ctx: &Context, team_id: TeamId, changes: TeamChangeSet) {
        self.recorded().notifications.push((team_id, changes));
    }
}
