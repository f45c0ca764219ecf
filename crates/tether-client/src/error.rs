//! Session operation error types.

use tether_core::{AuthError, ProfileError};
use thiserror::Error;

/// Errors from session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The credential exchange was rejected or unreachable. The session is
    /// left untouched; the caller surfaces this on the login form.
    #[error("login failed: {0}")]
    Login(AuthError),

    /// A login or logout is already in flight for this session. Concurrent
    /// attempts are rejected instead of interleaved so two divergent
    /// session writes can never race.
    #[error("another session operation is in flight")]
    OperationInFlight,

    /// The durable profile snapshot could not be written or read.
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl SessionError {
    /// Returns true if retrying the operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Login(e) => e.is_transient(),
            Self::OperationInFlight => true,
            Self::Profile(_) => false,
        }
    }
}
