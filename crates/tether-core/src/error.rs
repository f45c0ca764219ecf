//! Error taxonomy for auth operations and profile persistence.

use thiserror::Error;

/// Errors from the auth transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Credential exchange rejected; user-correctable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Transport-level failure reaching the server.
    #[error("network error: {reason}")]
    Network {
        /// Description of the transport failure.
        reason: String,
    },

    /// The presented token was rejected during identity verification.
    #[error("unauthorized")]
    Unauthorized,
}

impl AuthError {
    /// Returns true if this error is transient (retrying may succeed).
    ///
    /// `InvalidCredentials` and `Unauthorized` are decisions by the server
    /// about the presented credentials; retrying with the same inputs
    /// cannot change the outcome.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// Errors from the durable profile snapshot codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// Snapshot could not be encoded.
    #[error("profile encode failed: {reason}")]
    Encode {
        /// Description of the encode failure.
        reason: String,
    },

    /// Snapshot bytes could not be decoded.
    #[error("profile decode failed: {reason}")]
    Decode {
        /// Description of the decode failure.
        reason: String,
    },

    /// Snapshot was written by an unknown format version.
    #[error("unsupported profile format version: {version}")]
    UnsupportedVersion {
        /// The version byte found in the snapshot.
        version: u8,
    },
}
