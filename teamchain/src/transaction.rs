// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build phase of a team transaction.
//!
//! A [`Transaction`] collects membership changes and invites for one team in memory. Every
//! operation either applies all of its effects or none, so callers adding many users at once can
//! skip the ones which fail and carry on with the rest. Nothing leaves the process before the
//! transaction is sealed and committed.
//!
//! Transactions are not meant to be shared: only one caller should build a transaction per team
//! at a time.
use std::collections::BTreeMap;

use teamchain_core::{
    Assertion, InviteCategory, InviteId, InviteType, Rng, TeamInvite, TeamRole, Uid, UserVersion,
};
use tracing::{Instrument, debug, debug_span};

use crate::commit::SealedTransaction;
use crate::config::Config;
use crate::context::Context;
use crate::error::BuildError;
use crate::payload::Payloads;
use crate::team::TeamChain;
use crate::traits::{AssertionResolver, UserResolver};
use crate::types::ResolvedAssertion;

/// Mutations for one team which are committed together.
#[derive(Debug)]
pub struct Transaction<'a, R> {
    team: &'a TeamChain,
    resolver: &'a R,
    rng: &'a Rng,
    config: Config,
    payloads: Payloads,
}

impl<'a, R> Transaction<'a, R>
where
    R: UserResolver,
{
    pub fn new(team: &'a TeamChain, resolver: &'a R, rng: &'a Rng) -> Self {
        Self {
            team,
            resolver,
            rng,
            config: Config::default(),
            payloads: Payloads::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn team(&self) -> &TeamChain {
        self.team
    }

    /// Mutations collected so far, in the order their links will be created.
    pub fn payloads(&self) -> &Payloads {
        &self.payloads
    }

    /// Cancel all active keybase invites for any version of the given user.
    fn sweep_keybase_invites(&mut self, uid: Uid) {
        let team = self.team;
        for invite in team.keybase_invites_for(uid) {
            self.payloads.invites().cancel(invite.id);
        }
    }

    /// Remove all versions of the given user which are currently members.
    fn sweep_crypto_members(&mut self, uid: Uid) {
        let team = self.team;
        for user_version in team.members_with_uid(uid) {
            self.payloads.membership_change().remove(user_version);
        }
    }

    fn create_invite(&mut self, id: InviteId, user_version: &UserVersion, role: TeamRole) {
        let invite = TeamInvite::keybase(id, user_version, role);
        self.payloads.invites().invite(&invite);
    }

    /// Mark every active keybase invite of the user as completed by the given version.
    ///
    /// The completions are recorded on the membership change adding that version.
    fn complete_all_keybase_invites(
        &mut self,
        user_version: &UserVersion,
    ) -> Result<(), BuildError<R>> {
        let team = self.team;
        let change = self
            .payloads
            .membership_change_adding(user_version)
            .ok_or(BuildError::UserNotInTransaction(*user_version))?;

        for invite in team.keybase_invites_for(user_version.uid) {
            change.complete_invite(invite.id, user_version);
        }

        Ok(())
    }

    /// Add a user to the team by username.
    ///
    /// Users with a per-user key become members directly, users without one get a keybase
    /// invite. Any other representation of the same user in the team, an older membership or an
    /// earlier invite, is removed in the same transaction.
    pub async fn add_member_by_username(
        &mut self,
        ctx: &Context,
        username: &str,
        role: TeamRole,
    ) -> Result<(), BuildError<R>> {
        let span = debug_span!(parent: ctx.span(), "add_member_by_username", %username, %role);
        self.add_member_by_username_inner(ctx, username, role)
            .instrument(span)
            .await
    }

    async fn add_member_by_username_inner(
        &mut self,
        ctx: &Context,
        username: &str,
        role: TeamRole,
    ) -> Result<(), BuildError<R>> {
        let team = self.team;
        if team.is_implicit() {
            return Err(BuildError::ImplicitTeam);
        }

        let user = self
            .resolver
            .resolve_user(ctx, username)
            .await
            .map_err(BuildError::Resolve)?;
        debug!(
            normalized = %user.username,
            user_version = %user.user_version,
            has_puk = user.has_puk,
            "resolved user"
        );

        // No changes to the payloads before all checks passed.

        if role == TeamRole::None {
            return Err(BuildError::InvalidRole(role));
        }

        if role == TeamRole::Owner && team.is_subteam() {
            return Err(BuildError::SubteamOwner);
        }

        let user_version = user.user_version;
        if team.is_member(&user_version) {
            if !user.has_puk {
                return Err(BuildError::AlreadyMemberWithoutPuk(user.username));
            }
            return Err(BuildError::AlreadyMember(
                user.username,
                team.name().to_owned(),
            ));
        }

        // A user in the middle of a reset has no PUK yet and may have an eldest seqno lower
        // than the version in the team, they still get invited.
        if let Some(existing) = team.user_version_by_uid(user_version.uid) {
            if user.has_puk && existing.supersedes(&user_version) {
                return Err(BuildError::SupersededUser {
                    username: user.username,
                    uid: user_version.uid,
                    existing: existing.eldest_seqno,
                    incoming: user_version.eldest_seqno,
                });
            }
        }

        let invite_name = user_version.percent_form().to_string();
        let active_invite = team.find_active_invite(&invite_name, &InviteType::Keybase);
        let queued_invite = self
            .payloads
            .invite_batch()
            .is_some_and(|batch| batch.is_inviting(&invite_name, &InviteType::Keybase));
        if (active_invite.is_some() || queued_invite) && !user.has_puk {
            return Err(BuildError::AlreadyInvited(
                user.username,
                team.name().to_owned(),
            ));
        }

        let invite_id = if user.has_puk {
            None
        } else {
            Some(InviteId::random(self.rng)?)
        };

        self.sweep_keybase_invites(user_version.uid);
        self.sweep_crypto_members(user_version.uid);

        match invite_id {
            Some(invite_id) => {
                debug!(%invite_id, "user has no puk, invite required");
                self.create_invite(invite_id, &user_version, role);
            }
            None => {
                self.payloads.membership_change().add(user_version, role);
            }
        }

        Ok(())
    }

    /// Add a user version back to an implicit team.
    ///
    /// Produces exactly one link. Users with a per-user key are added as members, replacing all
    /// other member versions of the same user and completing their pending keybase invites.
    /// Users without one get a new keybase invite replacing their pending ones, older member
    /// versions stay until that invite is completed.
    pub fn re_add_member_to_implicit_team(
        &mut self,
        user_version: UserVersion,
        has_puk: bool,
        role: TeamRole,
    ) -> Result<(), BuildError<R>> {
        if !self.team.is_implicit() {
            return Err(BuildError::NotImplicitTeam);
        }

        if role == TeamRole::None {
            return Err(BuildError::InvalidRole(role));
        }

        let invite_name = user_version.percent_form().to_string();
        let queued_invite = self
            .payloads
            .invite_batch()
            .is_some_and(|batch| batch.is_inviting(&invite_name, &InviteType::Keybase));
        if !has_puk && queued_invite {
            return Err(BuildError::AlreadyInvited(
                invite_name,
                self.team.name().to_owned(),
            ));
        }

        let invite_id = if has_puk {
            None
        } else {
            Some(InviteId::random(self.rng)?)
        };

        let before = self.payloads.clone();

        match invite_id {
            None => {
                self.payloads.membership_change().add(user_version, role);
                self.sweep_crypto_members(user_version.uid);
                if let Err(err) = self.complete_all_keybase_invites(&user_version) {
                    self.payloads = before;
                    return Err(err);
                }
            }
            Some(invite_id) => {
                self.create_invite(invite_id, &user_version, role);
                self.sweep_keybase_invites(user_version.uid);
            }
        }

        if self.payloads.len() != 1 {
            let num_links = self.payloads.len();
            self.payloads = before;
            return Err(BuildError::TooManyLinks(num_links));
        }

        Ok(())
    }

    /// Finish building. The sealed transaction can only be committed.
    pub fn seal(self) -> SealedTransaction<'a> {
        SealedTransaction::new(self.team, self.rng, self.config, self.payloads)
    }
}

impl<R> Transaction<'_, R>
where
    R: UserResolver + AssertionResolver,
{
    /// Complete all social invites of the team which the given user proved to own.
    ///
    /// The user version needs to be added by this transaction already, completions are recorded
    /// on the membership change adding it.
    pub async fn complete_social_invites_for(
        &mut self,
        ctx: &Context,
        user_version: UserVersion,
        username: &str,
    ) -> Result<(), BuildError<R>> {
        let span = debug_span!(
            parent: ctx.span(),
            "complete_social_invites_for",
            %user_version,
            %username
        );
        self.complete_social_invites_for_inner(ctx, user_version, username)
            .instrument(span)
            .await
    }

    async fn complete_social_invites_for_inner(
        &mut self,
        ctx: &Context,
        user_version: UserVersion,
        username: &str,
    ) -> Result<(), BuildError<R>> {
        let team = self.team;
        if team.num_active_invites() == 0 {
            debug!("no active invites in team");
            return Ok(());
        }

        if self
            .payloads
            .membership_change_adding(&user_version)
            .is_none()
        {
            return Err(BuildError::UserNotInTransaction(user_version));
        }

        let proofs = self
            .resolver
            .fetch_proofs(ctx, username)
            .await
            .map_err(BuildError::Resolve)?;

        let mut completed = BTreeMap::new();

        for invite in team.active_invites() {
            if invite.category() != InviteCategory::Social {
                continue;
            }

            let service = invite.invite_type.as_str();
            let Some(proof) = proofs
                .get(service)
                .iter()
                .find(|proof| proof.value == invite.name)
            else {
                continue;
            };

            let assertion = Assertion::new(&invite.name, service)?;
            debug!(key = %proof.key, value = %proof.value, %assertion, "found proof for invite");

            let result = match self.resolver.resolve(ctx, &assertion).await {
                Ok(result) if result.uid == user_version.uid => result,
                Ok(result) => {
                    debug!(%assertion, uid = %result.uid, "assertion resolves to another user");
                    continue;
                }
                Err(err) => {
                    debug!(%assertion, "could not resolve assertion: {err}");
                    continue;
                }
            };

            let resolved = ResolvedAssertion {
                uid: user_version.uid,
                assertion,
                result,
            };

            match self.resolver.verify(ctx, &resolved).await {
                Ok(()) => {
                    debug!(invite_id = %invite.id, "found completed invite");
                    completed.insert(invite.id, user_version.percent_form());
                }
                Err(err) => {
                    debug!(assertion = %resolved.assertion, "assertion failed verification: {err}");
                }
            }
        }

        debug!("checked invites, adding {} completion(s)", completed.len());
        if let Some(change) = self.payloads.membership_change_adding(&user_version) {
            change.extend_completed_invites(completed);
        }

        Ok(())
    }
}
