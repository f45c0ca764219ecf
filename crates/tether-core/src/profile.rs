//! Durable profile snapshot codec.
//!
//! The session store persists the `user` subset of its state across
//! restarts. Snapshots are CBOR-encoded and carry a format version so that
//! a future layout change can be detected instead of misdecoded.
//!
//! The bearer token is intentionally absent from this format; it is stored
//! through the [`TokenVault`](crate::TokenVault) contract and has its own
//! lifecycle.

use serde::{Deserialize, Serialize};

use crate::{error::ProfileError, identity::User};

/// Current snapshot format version.
pub const PROFILE_FORMAT_VERSION: u8 = 1;

/// On-disk layout of the persisted subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ProfileSnapshot {
    /// Format version, for forward-compatibility checks.
    version: u8,
    /// The persisted user, if any.
    user: Option<User>,
}

/// Encode the persisted subset to snapshot bytes.
pub fn encode_profile(user: Option<&User>) -> Result<Vec<u8>, ProfileError> {
    let snapshot = ProfileSnapshot { version: PROFILE_FORMAT_VERSION, user: user.cloned() };

    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&snapshot, &mut bytes)
        .map_err(|e| ProfileError::Encode { reason: e.to_string() })?;

    Ok(bytes)
}

/// Decode snapshot bytes back into the persisted subset.
///
/// # Errors
///
/// Returns [`ProfileError::Decode`] for corrupt bytes and
/// [`ProfileError::UnsupportedVersion`] for snapshots written by an unknown
/// format version.
pub fn decode_profile(bytes: &[u8]) -> Result<Option<User>, ProfileError> {
    let snapshot: ProfileSnapshot = ciborium::de::from_reader(bytes)
        .map_err(|e| ProfileError::Decode { reason: e.to_string() })?;

    if snapshot.version != PROFILE_FORMAT_VERSION {
        return Err(ProfileError::UnsupportedVersion { version: snapshot.version });
    }

    Ok(snapshot.user)
}
