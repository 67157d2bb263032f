// SPDX-License-Identifier: MIT OR Apache-2.0

//! Members affected by membership changes, grouped by their new role.
use teamchain_core::{TeamRole, Uid, UserVersion};

use crate::payload::MembershipChange;
use crate::section::MembersSection;
use crate::team::TeamChain;

/// User versions affected by one or many membership changes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberSet {
    pub owners: Vec<UserVersion>,
    pub admins: Vec<UserVersion>,
    pub writers: Vec<UserVersion>,
    pub readers: Vec<UserVersion>,
    pub none: Vec<UserVersion>,
}

impl MemberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_change(change: &MembershipChange) -> Self {
        let mut set = Self::new();
        for (user_version, role) in change.adds() {
            set.list_mut(*role).push(*user_version);
        }
        set.none.extend_from_slice(change.removes());
        set
    }

    fn list_mut(&mut self, role: TeamRole) -> &mut Vec<UserVersion> {
        match role {
            TeamRole::Owner => &mut self.owners,
            TeamRole::Admin => &mut self.admins,
            TeamRole::Writer => &mut self.writers,
            TeamRole::Reader => &mut self.readers,
            TeamRole::None => &mut self.none,
        }
    }

    /// Merge another set into this one.
    pub fn append(&mut self, other: MemberSet) {
        self.owners.extend(other.owners);
        self.admins.extend(other.admins);
        self.writers.extend(other.writers);
        self.readers.extend(other.readers);
        self.none.extend(other.none);
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
            && self.admins.is_empty()
            && self.writers.is_empty()
            && self.readers.is_empty()
            && self.none.is_empty()
    }

    /// Members who receive the team secret, everyone who is added with any role.
    pub fn recipients(&self) -> impl Iterator<Item = &UserVersion> {
        self.owners
            .iter()
            .chain(self.admins.iter())
            .chain(self.writers.iter())
            .chain(self.readers.iter())
    }

    /// Users who lose privileges in the team.
    ///
    /// These are all removed users and every user who is currently an admin or owner and gets
    /// set to a non-admin role.
    pub fn downgraded_users(&self, team: &TeamChain) -> Vec<Uid> {
        let demoted = self
            .writers
            .iter()
            .chain(self.readers.iter())
            .filter(|user_version| team.is_admin_or_owner(user_version));

        let mut uids: Vec<Uid> = Vec::new();
        for user_version in self.none.iter().chain(demoted) {
            if !uids.contains(&user_version.uid) {
                uids.push(user_version.uid);
            }
        }
        uids
    }

    pub fn section(&self) -> MembersSection {
        let percent_forms =
            |list: &[UserVersion]| list.iter().map(UserVersion::percent_form).collect();

        MembersSection {
            owners: percent_forms(&self.owners),
            admins: percent_forms(&self.admins),
            writers: percent_forms(&self.writers),
            readers: percent_forms(&self.readers),
            none: percent_forms(&self.none),
        }
    }
}

#[cfg(test)]
mod tests {
    use teamchain_core::{TeamId, TeamRole, Uid, UserVersion};

    use crate::payload::Payloads;
    use crate::team::TeamChain;

    use super::MemberSet;

    fn uv(n: u8) -> UserVersion {
        UserVersion::new(Uid::from_bytes([n; 16]), 1)
    }

    #[test]
    fn downgrades() {
        let team = TeamChain::new(TeamId::from_bytes([1; 16]), "acme")
            .with_member(uv(1), TeamRole::Admin)
            .with_member(uv(2), TeamRole::Owner)
            .with_member(uv(3), TeamRole::Writer)
            .with_member(uv(4), TeamRole::Reader);

        let mut payloads = Payloads::new();
        let change = payloads.membership_change();
        // Admin becomes writer.
        change.add(uv(1), TeamRole::Writer);
        // Owner stays admin, not a downgrade.
        change.add(uv(2), TeamRole::Admin);
        // Reader gets promoted.
        change.add(uv(4), TeamRole::Writer);
        change.remove(uv(3));

        let set = MemberSet::from_change(change);
        let downgraded = set.downgraded_users(&team);
        assert_eq!(downgraded, vec![uv(3).uid, uv(1).uid]);
    }

    #[test]
    fn no_downgrades_for_new_members() {
        let team = TeamChain::new(TeamId::from_bytes([1; 16]), "acme");

        let mut payloads = Payloads::new();
        payloads.membership_change().add(uv(1), TeamRole::Reader);

        let set = MemberSet::from_change(payloads.membership_change());
        assert!(set.downgraded_users(&team).is_empty());
        assert_eq!(set.recipients().count(), 1);
    }

    #[test]
    fn section_and_append() {
        let mut payloads = Payloads::new();
        payloads.membership_change().add(uv(1), TeamRole::Owner);
        payloads.membership_change().remove(uv(2));

        let mut set = MemberSet::new();
        assert!(set.is_empty());
        set.append(MemberSet::from_change(payloads.membership_change()));
        set.append(MemberSet::from_change(payloads.membership_change()));

        let section = set.section();
        assert_eq!(section.owners, vec![uv(1).percent_form(), uv(1).percent_form()]);
        assert_eq!(section.none, vec![uv(2).percent_form(), uv(2).percent_form()]);
        assert!(section.writers.is_empty());
    }
}
