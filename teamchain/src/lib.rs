// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build membership transactions for a team and post them as signed chain links.
//!
//! Adding a single user to a team can require several mutations at once: older versions of the
//! user need to be removed, stale invites cancelled, and removing members rotates the team key.
//! A [`Transaction`] collects all of these into at most one membership change and one invite
//! batch, each becoming one link of the team chain.
//!
//! Transactions go through two phases. While building, mutations only change in-memory state and
//! a failed operation leaves the transaction as it was. After [`Transaction::seal`] the
//! [`SealedTransaction`] can only be committed: the links are signed, chained to the current tip
//! of the team chain and posted to the server in a single request which is accepted or rejected
//! as a whole.
//!
//! ```ignore
//! let mut tx = Transaction::new(&team, &resolver, &rng);
//! tx.add_member_by_username(&ctx, "alice", TeamRole::Writer).await?;
//! tx.add_member_by_username(&ctx, "bob", TeamRole::Reader).await?;
//! tx.seal().commit(&ctx, &services, &private_key).await?;
//! ```
pub mod commit;
pub mod config;
pub mod context;
pub mod error;
pub mod member_set;
pub mod payload;
pub mod section;
pub mod team;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod traits;
pub mod transaction;
pub mod types;

pub use commit::SealedTransaction;
pub use config::Config;
pub use context::{Cancelled, Context};
pub use error::{BuildError, CommitError};
pub use member_set::MemberSet;
pub use payload::{InviteBatch, MembershipChange, Payload, PayloadKind, Payloads};
pub use team::{PrecheckError, TeamChain};
pub use transaction::Transaction;
