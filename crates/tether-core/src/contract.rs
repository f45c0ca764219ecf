//! Contracts of the external collaborators.
//!
//! The session layer never performs I/O itself: the state machines in
//! `tether-client` emit actions, and the embedding application executes
//! them against implementations of these traits (an HTTP client, browser
//! storage, a WebSocket library, a response cache). The harness crate
//! provides in-memory fakes for all of them.

use crate::{
    error::{AuthError, ProfileError},
    identity::{Token, User, UserId},
    ChannelId,
};

/// Response cache key for the identity-check ("who am I") result.
///
/// Invalidated after a successful login so a reload re-verifies from the
/// server instead of trusting a race-stale cache entry.
pub const CURRENT_USER_KEY: &str = "current-user";

/// Successful credential exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    /// Bearer credential for subsequent requests.
    pub access_token: Token,
    /// The authenticated identity.
    pub user: User,
}

/// Remote authentication endpoints.
///
/// Calls are issued by the driver in response to orchestrator actions and
/// their results fed back as completion events; the state machines never
/// block on them.
pub trait AuthTransport {
    /// Exchange credentials for a token and identity.
    fn login(&mut self, email: &str, password: &str) -> Result<LoginSuccess, AuthError>;

    /// Terminate the server-side session. Best-effort: a failure here must
    /// never block local logout.
    fn logout(&mut self) -> Result<(), AuthError>;

    /// Resolve the identity behind the stored token.
    fn current_user(&mut self) -> Result<User, AuthError>;
}

/// Durable storage for bearer tokens.
///
/// Independent of the profile snapshot so the security-sensitive credential
/// can be erased without touching the rest of the persisted state.
pub trait TokenVault {
    /// The token surviving from a previous run, if any.
    fn stored_token(&self) -> Option<Token>;

    /// Persist a freshly issued token.
    fn store_token(&mut self, token: &Token);

    /// Erase all stored tokens.
    fn clear_tokens(&mut self);
}

/// Durable storage for the persisted profile subset.
pub trait ProfileStore {
    /// Load the persisted user, if any.
    fn load(&self) -> Result<Option<User>, ProfileError>;

    /// Persist the current user subset (or its absence).
    fn save(&mut self, user: Option<&User>) -> Result<(), ProfileError>;
}

/// General response cache of the embedding application.
///
/// Invalidated on auth transitions so no request made while logged in as
/// user A is ever served while acting as user B.
pub trait ResponseCache {
    /// Drop a single cached entry.
    fn invalidate(&mut self, key: &str);

    /// Drop everything.
    fn clear(&mut self);
}

/// Realtime transport opening the actual socket.
///
/// `connect` is non-blocking; the transport later reports `open`, `close`
/// and `error` events tagged with the [`ChannelId`] they belong to. The
/// channel lifecycle manager discards events carrying a stale id, which is
/// what makes listener deregistration effective.
///
/// The transport holds no queryable handle to the current connection; the
/// lifecycle manager owns the live [`ChannelId`] and exposes it through its
/// own accessor, so the contract stays a pair of fire-and-forget calls.
pub trait RealtimeTransport {
    /// Open a connection for the given identity.
    fn connect(&mut self, channel: ChannelId, user: UserId);

    /// Close the connection. Synchronous from the caller's perspective;
    /// the transport may still emit a final close event for the id.
    fn disconnect(&mut self, channel: ChannelId);
}
