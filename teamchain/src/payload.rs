// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mutations accumulated by a transaction.
//!
//! A transaction holds at most one payload per kind. All membership changes of a transaction
//! aggregate into one [`MembershipChange`], all invite changes into one [`InviteBatch`]. Every
//! payload turns into exactly one link when the transaction gets committed, in the order the
//! payloads were first created.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use teamchain_core::{
    InviteId, InviteType, LinkType, TeamInvite, TeamRole, UserVersion, UserVersionPercentForm,
};

/// Adds, removes and invite completions for crypto members.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MembershipChange {
    adds: Vec<(UserVersion, TeamRole)>,
    removes: Vec<UserVersion>,
    completed_invites: BTreeMap<InviteId, UserVersionPercentForm>,
}

impl MembershipChange {
    /// Queue adding a member with the given role. Adding the same user version again replaces the
    /// previously queued role.
    pub(crate) fn add(&mut self, user_version: UserVersion, role: TeamRole) {
        match self.adds.iter_mut().find(|(uv, _)| *uv == user_version) {
            Some((_, queued_role)) => *queued_role = role,
            None => self.adds.push((user_version, role)),
        }
    }

    /// Queue removing a member.
    pub(crate) fn remove(&mut self, user_version: UserVersion) {
        if !self.removes.contains(&user_version) {
            self.removes.push(user_version);
        }
    }

    /// Mark an invite as completed by the given user version.
    pub(crate) fn complete_invite(&mut self, id: InviteId, user_version: &UserVersion) {
        self.completed_invites.insert(id, user_version.percent_form());
    }

    pub(crate) fn extend_completed_invites(
        &mut self,
        completed: BTreeMap<InviteId, UserVersionPercentForm>,
    ) {
        self.completed_invites.extend(completed);
    }

    pub fn adds(&self) -> &[(UserVersion, TeamRole)] {
        &self.adds
    }

    pub fn removes(&self) -> &[UserVersion] {
        &self.removes
    }

    pub fn completed_invites(&self) -> &BTreeMap<InviteId, UserVersionPercentForm> {
        &self.completed_invites
    }

    /// Returns true if the user version is queued to be added.
    pub fn is_adding(&self, user_version: &UserVersion) -> bool {
        self.adds.iter().any(|(uv, _)| uv == user_version)
    }

    /// Returns true if at least one member gets removed.
    pub fn has_removals(&self) -> bool {
        !self.removes.is_empty()
    }
}

/// New invite as it appears in an invite section. The role is given by the list it is in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionInvite {
    pub id: InviteId,
    #[serde(rename = "type")]
    pub invite_type: InviteType,
    pub name: String,
}

impl From<&TeamInvite> for SectionInvite {
    fn from(invite: &TeamInvite) -> Self {
        Self {
            id: invite.id,
            invite_type: invite.invite_type.clone(),
            name: invite.name.clone(),
        }
    }
}

/// New invites per role and cancelled invites.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteBatch {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) owners: Vec<SectionInvite>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) admins: Vec<SectionInvite>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) writers: Vec<SectionInvite>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) readers: Vec<SectionInvite>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) cancel: Vec<InviteId>,
}

impl InviteBatch {
    /// Queue a new invite into the list of its role.
    ///
    /// Invites with role `None` can't be expressed, callers need to reject them up front.
    pub(crate) fn invite(&mut self, invite: &TeamInvite) {
        let list = match invite.role {
            TeamRole::Owner => &mut self.owners,
            TeamRole::Admin => &mut self.admins,
            TeamRole::Writer => &mut self.writers,
            TeamRole::Reader => &mut self.readers,
            TeamRole::None => return,
        };
        list.push(SectionInvite::from(invite));
    }

    /// Queue cancelling an active invite.
    pub(crate) fn cancel(&mut self, id: InviteId) {
        if !self.cancel.contains(&id) {
            self.cancel.push(id);
        }
    }

    /// All new invites together with their role.
    pub fn invites(&self) -> impl Iterator<Item = (&SectionInvite, TeamRole)> {
        fn with_role(
            list: &[SectionInvite],
            role: TeamRole,
        ) -> impl Iterator<Item = (&SectionInvite, TeamRole)> {
            list.iter().map(move |invite| (invite, role))
        }

        with_role(&self.owners, TeamRole::Owner)
            .chain(with_role(&self.admins, TeamRole::Admin))
            .chain(with_role(&self.writers, TeamRole::Writer))
            .chain(with_role(&self.readers, TeamRole::Reader))
    }

    /// Returns true if a new invite of the given type and name is queued.
    pub fn is_inviting(&self, name: &str, invite_type: &InviteType) -> bool {
        self.invites()
            .any(|(invite, _)| invite.name == name && &invite.invite_type == invite_type)
    }

    pub fn cancelled(&self) -> &[InviteId] {
        &self.cancel
    }
}

/// Kind of a payload, one link type per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    ChangeMembership,
    Invites,
}

/// One mutation of a transaction which becomes one link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    ChangeMembership(MembershipChange),
    Invites(InviteBatch),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::ChangeMembership(_) => PayloadKind::ChangeMembership,
            Payload::Invites(_) => PayloadKind::Invites,
        }
    }

    pub fn link_type(&self) -> LinkType {
        match self {
            Payload::ChangeMembership(_) => LinkType::ChangeMembership,
            Payload::Invites(_) => LinkType::Invite,
        }
    }
}

/// Ordered payloads of a transaction, at most one per kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payloads(Vec<Payload>);

impl Payloads {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    fn get_or_create(&mut self, kind: PayloadKind) -> &mut Payload {
        let index = match self.0.iter().position(|payload| payload.kind() == kind) {
            Some(index) => index,
            None => {
                let payload = match kind {
                    PayloadKind::ChangeMembership => {
                        Payload::ChangeMembership(MembershipChange::default())
                    }
                    PayloadKind::Invites => Payload::Invites(InviteBatch::default()),
                };
                self.0.push(payload);
                self.0.len() - 1
            }
        };

        &mut self.0[index]
    }

    /// The membership change of this transaction, created if it doesn't exist yet.
    pub(crate) fn membership_change(&mut self) -> &mut MembershipChange {
        match self.get_or_create(PayloadKind::ChangeMembership) {
            Payload::ChangeMembership(change) => change,
            Payload::Invites(_) => unreachable!("payload kind was looked up by position"),
        }
    }

    /// The invite batch of this transaction, created if it doesn't exist yet.
    pub(crate) fn invites(&mut self) -> &mut InviteBatch {
        match self.get_or_create(PayloadKind::Invites) {
            Payload::Invites(batch) => batch,
            Payload::ChangeMembership(_) => unreachable!("payload kind was looked up by position"),
        }
    }

    /// The invite batch of this transaction, if any invites were changed yet.
    pub(crate) fn invite_batch(&self) -> Option<&InviteBatch> {
        self.0.iter().find_map(|payload| match payload {
            Payload::Invites(batch) => Some(batch),
            Payload::ChangeMembership(_) => None,
        })
    }

    /// The membership change which queues adding the given user version, if any.
    pub(crate) fn membership_change_adding(
        &mut self,
        user_version: &UserVersion,
    ) -> Option<&mut MembershipChange> {
        self.0.iter_mut().find_map(|payload| match payload {
            Payload::ChangeMembership(change) if change.is_adding(user_version) => Some(change),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Payload> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Payload] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use teamchain_core::{InviteId, Rng, TeamInvite, TeamRole, Uid, UserVersion};

    use super::{Payload, PayloadKind, Payloads};

    fn uv(n: u8) -> UserVersion {
        UserVersion::new(Uid::from_bytes([n; 16]), 1)
    }

    #[test]
    fn one_payload_per_kind() {
        let rng = Rng::from_seed([1; 32]);
        let mut payloads = Payloads::new();

        payloads.invites().cancel(InviteId::random(&rng).unwrap());
        payloads.membership_change().add(uv(1), TeamRole::Writer);
        payloads.membership_change().remove(uv(2));
        payloads.invites().invite(&TeamInvite::keybase(
            InviteId::random(&rng).unwrap(),
            &uv(3),
            TeamRole::Reader,
        ));
        payloads.membership_change().add(uv(4), TeamRole::Admin);

        assert_eq!(payloads.len(), 2);

        // First-seen order is kept.
        let kinds: Vec<PayloadKind> = payloads.iter().map(Payload::kind).collect();
        assert_eq!(kinds, vec![PayloadKind::Invites, PayloadKind::ChangeMembership]);

        let Payload::ChangeMembership(change) = &payloads.as_slice()[1] else {
            panic!("expected membership change");
        };
        assert_eq!(change.adds().len(), 2);
        assert_eq!(change.removes(), &[uv(2)]);
    }

    #[test]
    fn coalesce_repeated_mutations() {
        let rng = Rng::from_seed([1; 32]);
        let invite_id = InviteId::random(&rng).unwrap();
        let mut payloads = Payloads::new();

        payloads.membership_change().add(uv(1), TeamRole::Reader);
        payloads.membership_change().add(uv(1), TeamRole::Writer);
        payloads.membership_change().remove(uv(2));
        payloads.membership_change().remove(uv(2));
        payloads.invites().cancel(invite_id);
        payloads.invites().cancel(invite_id);

        let change = payloads.membership_change();
        assert_eq!(change.adds(), &[(uv(1), TeamRole::Writer)]);
        assert_eq!(change.removes(), &[uv(2)]);
        assert_eq!(payloads.invites().cancelled(), &[invite_id]);
    }

    #[test]
    fn find_membership_change_by_add() {
        let mut payloads = Payloads::new();
        assert!(payloads.membership_change_adding(&uv(1)).is_none());

        payloads.membership_change().add(uv(1), TeamRole::Writer);
        assert!(payloads.membership_change_adding(&uv(1)).is_some());
        assert!(payloads.membership_change_adding(&uv(2)).is_none());
    }

    #[test]
    fn invites_per_role() {
        let rng = Rng::from_seed([1; 32]);
        let mut payloads = Payloads::new();

        for (n, role) in [(1, TeamRole::Reader), (2, TeamRole::Admin), (3, TeamRole::Owner)] {
            payloads.invites().invite(&TeamInvite::keybase(
                InviteId::random(&rng).unwrap(),
                &uv(n),
                role,
            ));
        }

        let roles: Vec<TeamRole> = payloads.invites().invites().map(|(_, role)| role).collect();
        assert_eq!(roles, vec![TeamRole::Owner, TeamRole::Admin, TeamRole::Reader]);
    }
}
