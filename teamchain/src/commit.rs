// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commit phase of a team transaction.
//!
//! Committing turns the payloads of a sealed transaction into signed links and posts all of them
//! to the server in one request:
//!
//! 1. Make sure the team secret is loaded and fetch a fresh Merkle root.
//! 2. Get an admin proof, used for all links of the transaction.
//! 3. If any member loses privileges, acquire a downgrade lease. The lease is cancelled again
//!    after the commit finished, whether it succeeded or not.
//! 4. Build one section per payload and request key boxes for all affected members. A new
//!    per-team key goes into the first membership change removing members.
//! 5. Sign the links, each pointing at the previous one, check them against the local chain and
//!    post them.
//! 6. Notify about the changed membership.
use teamchain_core::{ChainLink, Hash, Header, LinkError, MerkleRoot, Rng, Signer, encode_cbor};
use tracing::{Instrument, debug, debug_span, warn};

use crate::config::Config;
use crate::context::{Cancelled, Context};
use crate::error::CommitError;
use crate::member_set::MemberSet;
use crate::payload::{Payload, Payloads};
use crate::section::{AdminProof, Entropy, TeamSection};
use crate::team::TeamChain;
use crate::traits::CommitServices;
use crate::types::{LeaseId, SigBatch, TeamChangeSet};

/// Transaction which can't be changed anymore and is ready to be committed.
#[derive(Debug)]
pub struct SealedTransaction<'a> {
    team: &'a TeamChain,
    rng: &'a Rng,
    config: Config,
    payloads: Payloads,
}

/// What all links of one commit are bound to.
struct PostTarget<'a> {
    admin: Option<AdminProof>,
    member_set: &'a MemberSet,
    merkle_root: MerkleRoot,
    lease_id: Option<&'a LeaseId>,
}

impl<'a> SealedTransaction<'a> {
    pub(crate) fn new(
        team: &'a TeamChain,
        rng: &'a Rng,
        config: Config,
        payloads: Payloads,
    ) -> Self {
        Self {
            team,
            rng,
            config,
            payloads,
        }
    }

    pub fn team(&self) -> &TeamChain {
        self.team
    }

    pub fn payloads(&self) -> &Payloads {
        &self.payloads
    }

    /// Sign and post all links of this transaction.
    ///
    /// Posting happens exactly once, there are no retries. To try again after a failure reload
    /// the team and build a new transaction, as the sequence numbers and Merkle root of this one
    /// are likely to be outdated.
    ///
    /// Cancelling the context aborts the commit before the links are posted. An acquired
    /// downgrade lease is still cancelled in that case.
    ///
    /// Don't drop the returned future to abort a commit, cancel the context instead. A future
    /// dropped after the lease was granted never releases it and the lease only expires on the
    /// server.
    pub async fn commit<S, K>(
        self,
        ctx: &Context,
        services: &S,
        signer: &K,
    ) -> Result<TeamChangeSet, CommitError<S>>
    where
        S: CommitServices,
        K: Signer,
    {
        let span = debug_span!(
            parent: ctx.span(),
            "commit",
            team_id = %self.team.id(),
            payloads = self.payloads.len()
        );
        self.commit_inner(ctx, services, signer)
            .instrument(span)
            .await
    }

    async fn commit_inner<S, K>(
        &self,
        ctx: &Context,
        services: &S,
        signer: &K,
    ) -> Result<TeamChangeSet, CommitError<S>>
    where
        S: CommitServices,
        K: Signer,
    {
        if self.payloads.is_empty() {
            return Err(CommitError::NoPayloads);
        }

        debug!("attempting to post {} link(s)", self.payloads.len());

        let team = self.team;

        ctx.run_until_cancelled(services.ensure_shared_secret(ctx, team))
            .await?
            .map_err(CommitError::KeyDistributor)?;

        let merkle_root = ctx
            .run_until_cancelled(services.force_refresh(ctx))
            .await?
            .map_err(CommitError::Merkle)?;

        let admin = ctx
            .run_until_cancelled(services.admin_permission(ctx, team))
            .await?
            .map_err(CommitError::Authority)?;

        let mut member_set = MemberSet::new();
        for payload in self.payloads.iter() {
            match payload {
                Payload::ChangeMembership(change) => {
                    member_set.append(MemberSet::from_change(change))
                }
                Payload::Invites(_) => (),
            }
        }

        let downgrades = member_set.downgraded_users(team);
        if downgrades.is_empty() {
            let target = PostTarget {
                admin,
                member_set: &member_set,
                merkle_root,
                lease_id: None,
            };
            return self.post(ctx, services, signer, target).await;
        }

        if ctx.is_cancelled() {
            return Err(Cancelled.into());
        }

        // Not raced against cancellation: a granted lease needs to be released again.
        debug!(users = downgrades.len(), "requesting downgrade lease");
        let (lease, lease_root) = services
            .request_downgrade_lease(ctx, team.id(), &downgrades)
            .await
            .map_err(CommitError::Lease)?;

        let result = if ctx.is_cancelled() {
            Err(Cancelled.into())
        } else {
            let target = PostTarget {
                admin,
                member_set: &member_set,
                merkle_root: lease_root,
                lease_id: Some(&lease.id),
            };
            self.post(ctx, services, signer, target).await
        };

        if let Err(err) = services.cancel_downgrade_lease(ctx, &lease.id).await {
            warn!(lease_id = %lease.id, "failed to cancel downgrade lease: {err}");
        }

        result
    }

    async fn post<S, K>(
        &self,
        ctx: &Context,
        services: &S,
        signer: &K,
        target: PostTarget<'_>,
    ) -> Result<TeamChangeSet, CommitError<S>>
    where
        S: CommitServices,
        K: Signer,
    {
        let team = self.team;

        let mut sections = Vec::with_capacity(self.payloads.len());
        for payload in self.payloads.iter() {
            let mut section = TeamSection::new(
                team.id(),
                target.admin.clone(),
                team.is_implicit(),
                team.is_public(),
            );

            match payload {
                Payload::ChangeMembership(change) => {
                    section.members = Some(MemberSet::from_change(change).section());
                    section.completed_invites = change.completed_invites().clone();
                }
                Payload::Invites(batch) => {
                    section.invites = Some(batch.clone());
                    section.entropy = Some(Entropy::random(self.rng, self.config.entropy_len())?);
                }
            }

            sections.push(section);
        }

        let boxes = ctx
            .run_until_cancelled(services.recipient_boxes(ctx, team, target.member_set))
            .await?
            .map_err(CommitError::KeyDistributor)?;

        let key_rotated = boxes.per_team_key.is_some();
        if let Some(per_team_key) = boxes.per_team_key {
            let index = self
                .payloads
                .iter()
                .position(|payload| match payload {
                    Payload::ChangeMembership(change) => change.has_removals(),
                    Payload::Invites(_) => false,
                })
                .ok_or(CommitError::OrphanedPerTeamKey)?;
            sections[index].per_team_key = Some(per_team_key);
        }

        let links = self.sign_links(signer, target.merkle_root, sections)?;

        if let Err(err) = team.precheck_links(&links) {
            debug!("precheck failed: {err}");
            return Err(err.into());
        }

        if ctx.is_cancelled() {
            return Err(Cancelled.into());
        }

        let batch = SigBatch {
            sigs: links,
            downgrade_lease_id: target.lease_id.cloned(),
            implicit_team_keys: boxes.implicit_admin_boxes,
            per_team_key: boxes.secret_boxes,
        };

        services
            .post_multi(ctx, batch)
            .await
            .map_err(CommitError::Server)?;

        let changes = TeamChangeSet {
            membership_changed: true,
            key_rotated,
        };
        services.notify(ctx, team.id(), changes).await;

        Ok(changes)
    }

    /// Turn sections into a chain of signed links continuing the current chain tip.
    fn sign_links<K: Signer>(
        &self,
        signer: &K,
        merkle_root: MerkleRoot,
        sections: Vec<TeamSection>,
    ) -> Result<Vec<ChainLink>, LinkError> {
        let team = self.team;
        let mut seq_num = team.next_seq_num();
        let mut backlink = team.latest_link();

        let mut links = Vec::with_capacity(sections.len());
        for (payload, section) in self.payloads.iter().zip(sections) {
            let body = encode_cbor(&section)?;

            let mut header = Header {
                version: self.config.link_version(),
                team_id: team.id(),
                public_key: signer.public_key(),
                signature: None,
                link_type: payload.link_type(),
                seq_num,
                backlink,
                merkle_root,
                body_size: body.len() as u64,
                body_hash: Hash::new(&body),
            };
            header.sign(signer)?;

            let link = ChainLink::new(header, body)?;
            debug!(
                seq_num,
                link_type = %link.link_type(),
                hash = %link.hash,
                "prepared link"
            );

            seq_num += 1;
            backlink = Some(link.hash);
            links.push(link);
        }

        Ok(links)
    }
}
