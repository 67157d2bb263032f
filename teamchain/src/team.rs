// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only view on the current state of a team chain.
//!
//! Loading and caching chains is done elsewhere, transactions only ever read from a [`TeamChain`]
//! and never mutate it. After a transaction was posted the caller is expected to reload the team.
use std::collections::BTreeMap;

use teamchain_core::{
    ChainLink, Hash, InviteId, InviteType, LinkError, SeqNum, TeamId, TeamInvite, TeamRole, Uid,
    UserVersion, validate_link,
};
use thiserror::Error;

/// Snapshot of a team chain at the time a transaction is being built.
#[derive(Clone, Debug)]
pub struct TeamChain {
    id: TeamId,
    name: String,
    implicit: bool,
    public: bool,
    parent: Option<TeamId>,
    latest_seq_num: SeqNum,
    latest_link: Option<Hash>,
    members: BTreeMap<UserVersion, TeamRole>,
    active_invites: BTreeMap<InviteId, TeamInvite>,
}

impl TeamChain {
    /// Empty team without any links yet.
    pub fn new(id: TeamId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            implicit: false,
            public: false,
            parent: None,
            latest_seq_num: 0,
            latest_link: None,
            members: BTreeMap::new(),
            active_invites: BTreeMap::new(),
        }
    }

    pub fn with_implicit(mut self, implicit: bool) -> Self {
        self.implicit = implicit;
        self
    }

    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    /// Mark this team as a subteam of the given parent.
    pub fn with_parent(mut self, parent: TeamId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the tip of the chain, the last link known to the server.
    pub fn with_latest_link(mut self, seq_num: SeqNum, hash: Hash) -> Self {
        self.latest_seq_num = seq_num;
        self.latest_link = Some(hash);
        self
    }

    /// Set the role of a user version. Role `None` keeps the user version in the log as a
    /// former member.
    pub fn with_member(mut self, user_version: UserVersion, role: TeamRole) -> Self {
        self.members.insert(user_version, role);
        self
    }

    pub fn with_active_invite(mut self, invite: TeamInvite) -> Self {
        self.active_invites.insert(invite.id, invite);
        self
    }

    pub fn id(&self) -> TeamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_subteam(&self) -> bool {
        self.parent.is_some()
    }

    pub fn parent(&self) -> Option<TeamId> {
        self.parent
    }

    /// Sequence number the next link appended to this chain needs to have.
    pub fn next_seq_num(&self) -> SeqNum {
        self.latest_seq_num + 1
    }

    /// Hash of the last link of this chain, `None` if the chain is empty.
    pub fn latest_link(&self) -> Option<Hash> {
        self.latest_link
    }

    /// Current role of a user version, `None` if it never was or is not a member anymore.
    pub fn role(&self, user_version: &UserVersion) -> TeamRole {
        self.members
            .get(user_version)
            .copied()
            .unwrap_or(TeamRole::None)
    }

    pub fn is_member(&self, user_version: &UserVersion) -> bool {
        self.role(user_version).is_member()
    }

    pub fn is_admin_or_owner(&self, user_version: &UserVersion) -> bool {
        self.role(user_version).is_admin_or_above()
    }

    /// All user versions with the given uid which currently hold a role in the team.
    pub fn members_with_uid(&self, uid: Uid) -> impl Iterator<Item = UserVersion> + '_ {
        self.members
            .iter()
            .filter(move |(user_version, role)| user_version.uid == uid && role.is_member())
            .map(|(user_version, _)| *user_version)
    }

    /// Member version of the given user. When multiple versions of the same user are members the
    /// most recent one is returned.
    pub fn user_version_by_uid(&self, uid: Uid) -> Option<UserVersion> {
        self.members_with_uid(uid)
            .max_by_key(|user_version| user_version.eldest_seqno)
    }

    pub fn active_invites(&self) -> impl Iterator<Item = &TeamInvite> {
        self.active_invites.values()
    }

    pub fn num_active_invites(&self) -> usize {
        self.active_invites.len()
    }

    pub fn find_active_invite(&self, name: &str, invite_type: &InviteType) -> Option<&TeamInvite> {
        self.active_invites
            .values()
            .find(|invite| invite.name == name && &invite.invite_type == invite_type)
    }

    /// Active keybase invites of any version of the given user.
    pub fn keybase_invites_for(&self, uid: Uid) -> impl Iterator<Item = &TeamInvite> {
        self.active_invites.values().filter(move |invite| {
            invite
                .keybase_user_version()
                .is_some_and(|user_version| user_version.uid == uid)
        })
    }

    /// Checks links created for this team before they get posted.
    ///
    /// Every link needs to be valid on its own and the links need to continue the chain exactly
    /// where the local state of it ends: sequence numbers increase by one starting at
    /// [`TeamChain::next_seq_num`], and every link points at the one before it, the first at the
    /// current chain tip.
    pub fn precheck_links(&self, links: &[ChainLink]) -> Result<(), PrecheckError> {
        if links.is_empty() {
            return Err(PrecheckError::NoLinks);
        }

        let mut expected_seq_num = self.next_seq_num();
        let mut expected_backlink = self.latest_link;

        for link in links {
            validate_link(link)?;

            if link.header.team_id != self.id {
                return Err(PrecheckError::TeamMismatch(link.header.team_id, self.id));
            }

            if link.seq_num() != expected_seq_num {
                return Err(PrecheckError::SeqNumMismatch(link.seq_num(), expected_seq_num));
            }

            if link.backlink() != expected_backlink {
                return Err(PrecheckError::BacklinkMismatch(link.seq_num()));
            }

            expected_seq_num += 1;
            expected_backlink = Some(link.hash);
        }

        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum PrecheckError {
    #[error("no links to check")]
    NoLinks,

    #[error("link was created for team {0} but expected {1}")]
    TeamMismatch(TeamId, TeamId),

    #[error("link has sequence number {0} but expected {1}")]
    SeqNumMismatch(SeqNum, SeqNum),

    #[error("link with sequence number {0} does not point at the previous link")]
    BacklinkMismatch(SeqNum),

    #[error(transparent)]
    Link(#[from] LinkError),
}

#[cfg(test)]
mod tests {
    use teamchain_core::{
        Hash, InviteId, InviteType, TeamId, TeamInvite, TeamRole, Uid, UserVersion,
    };

    use super::TeamChain;

    #[test]
    fn member_queries() {
        let uid = Uid::from_bytes([1; 16]);
        let old = UserVersion::new(uid, 1);
        let new = UserVersion::new(uid, 5);
        let gone = UserVersion::new(Uid::from_bytes([2; 16]), 1);

        let team = TeamChain::new(TeamId::from_bytes([9; 16]), "acme")
            .with_member(old, TeamRole::Reader)
            .with_member(new, TeamRole::Admin)
            .with_member(gone, TeamRole::None);

        assert!(team.is_member(&old));
        assert!(!team.is_member(&gone));
        assert!(team.is_admin_or_owner(&new));
        assert!(!team.is_admin_or_owner(&old));
        assert_eq!(team.user_version_by_uid(uid), Some(new));
        assert_eq!(team.user_version_by_uid(gone.uid), None);
        assert_eq!(team.members_with_uid(uid).count(), 2);
    }

    #[test]
    fn chain_tip() {
        let team = TeamChain::new(TeamId::from_bytes([9; 16]), "acme");
        assert_eq!(team.next_seq_num(), 1);
        assert_eq!(team.latest_link(), None);

        let tip = Hash::new(b"tip");
        let team = team.with_latest_link(7, tip);
        assert_eq!(team.next_seq_num(), 8);
        assert_eq!(team.latest_link(), Some(tip));
    }

    #[test]
    fn invite_queries() {
        let alice = UserVersion::new(Uid::from_bytes([1; 16]), 3);
        let keybase = TeamInvite::keybase(InviteId::from_bytes([1; 16]), &alice, TeamRole::Writer);
        let social = TeamInvite::social(
            InviteId::from_bytes([2; 16]),
            "github",
            "alice",
            TeamRole::Reader,
        );

        let team = TeamChain::new(TeamId::from_bytes([9; 16]), "acme")
            .with_active_invite(keybase.clone())
            .with_active_invite(social);

        assert_eq!(team.num_active_invites(), 2);
        assert_eq!(
            team.find_active_invite(&alice.percent_form().to_string(), &InviteType::Keybase),
            Some(&keybase)
        );
        assert_eq!(team.find_active_invite("alice", &InviteType::Keybase), None);
        assert_eq!(team.keybase_invites_for(alice.uid).count(), 1);
    }
}
