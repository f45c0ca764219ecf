//! Core types and collaborator contracts for the Tether session layer.
//!
//! This crate defines the data model shared by the session state machines
//! (identities, bearer tokens, session snapshots), the durable profile
//! snapshot codec, the error taxonomy, and the contracts of the external
//! collaborators (auth transport, token vault, profile store, response
//! cache, realtime transport).
//!
//! # Design
//!
//! Everything here is pure data and trait definitions. No I/O happens in
//! this crate: the state machines in `tether-client` emit actions, and the
//! embedding application executes them against implementations of the
//! contracts defined here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod contract;
mod error;
mod identity;
mod profile;
mod session;

pub use contract::{
    AuthTransport, CURRENT_USER_KEY, LoginSuccess, ProfileStore, RealtimeTransport, ResponseCache,
    TokenVault,
};
pub use error::{AuthError, ProfileError};
pub use identity::{Role, Token, User, UserId};
pub use profile::{decode_profile, encode_profile, PROFILE_FORMAT_VERSION};
pub use session::Session;

/// Identifier for a single realtime connection attempt.
///
/// Allocated monotonically by the channel lifecycle manager. Transport
/// events are tagged with the `ChannelId` they belong to, so events from a
/// logically closed channel can be recognized and discarded instead of
/// firing against fresh state.
pub type ChannelId = u64;
