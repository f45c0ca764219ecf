//! Session snapshot.

use crate::identity::{Token, User};

/// The pairing of an authenticated identity and its bearer credential.
///
/// # Invariants
///
/// - `is_authenticated()` holds iff **both** fields are present. A token
///   without a verified user (stale credential at startup) or a user
///   without a token are both unauthenticated states.
/// - The durable snapshot persists the `user` subset only; the token lives
///   in the vault with its own lifecycle so it can be erased independently
///   of the profile cache.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    /// Server-verified identity, absent until verification or login.
    pub user: Option<User>,
    /// Bearer credential, absent after logout or on first run.
    pub token: Option<Token>,
}

impl Session {
    /// An empty session with neither user nor token.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True iff both the user and the token are present.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}
