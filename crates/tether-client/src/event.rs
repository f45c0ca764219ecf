//! Events fed into the state machines and actions they produce.

use tether_core::{AuthError, ChannelId, LoginSuccess, Session, User, UserId};

/// Correlation id for an in-flight remote call.
///
/// Completions carry the id of the request they answer; a completion whose
/// id no longer matches the machine's in-flight request (cancelled by
/// teardown, superseded by a newer intent) is discarded instead of being
/// applied to stale state.
pub type RequestId = u64;

/// Events fed into the [`SessionOrchestrator`](crate::SessionOrchestrator).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Process start: trigger startup verification if a stored token is
    /// present but no user is loaded.
    Start,

    /// UI-triggered login intent.
    LoginRequested {
        /// Login email.
        email: String,
        /// Plaintext password, forwarded to the auth transport.
        password: String,
    },

    /// The auth transport finished the credential exchange.
    LoginCompleted {
        /// Request this completion answers.
        request: RequestId,
        /// Outcome of the remote call.
        result: Result<LoginSuccess, AuthError>,
    },

    /// The auth transport finished the startup identity lookup.
    VerifyCompleted {
        /// Request this completion answers.
        request: RequestId,
        /// Outcome of the remote call.
        result: Result<User, AuthError>,
    },

    /// UI-triggered logout intent.
    LogoutRequested,

    /// The auth transport finished the (best-effort) remote logout.
    LogoutCompleted {
        /// Request this completion answers.
        request: RequestId,
        /// Outcome of the remote call. Failure never blocks local logout.
        result: Result<(), AuthError>,
    },

    /// The owning scope is being destroyed; discard in-flight results.
    Teardown,
}

/// Actions produced by the [`SessionOrchestrator`](crate::SessionOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Issue the "who am I" lookup and feed the result back as
    /// [`SessionEvent::VerifyCompleted`].
    FetchCurrentUser {
        /// Correlation id to echo in the completion.
        request: RequestId,
    },

    /// Issue the credential exchange and feed the result back as
    /// [`SessionEvent::LoginCompleted`].
    CallLogin {
        /// Correlation id to echo in the completion.
        request: RequestId,
        /// Login email.
        email: String,
        /// Plaintext password.
        password: String,
    },

    /// Issue the remote logout and feed the result back as
    /// [`SessionEvent::LogoutCompleted`].
    CallLogout {
        /// Correlation id to echo in the completion.
        request: RequestId,
    },

    /// Invalidate the identity-check entry in the response cache.
    InvalidateCurrentUser,

    /// Clear the response cache entirely.
    ClearResponseCache,
}

/// Events fed into the [`ChannelManager`](crate::ChannelManager).
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A committed session snapshot, drained from the store subscription.
    Session(Session),

    /// Transport reports the connection is open.
    Opened(ChannelId),

    /// Transport reports the connection closed.
    Closed(ChannelId),

    /// Transport reports a connection error.
    TransportError(ChannelId),

    /// The owning scope is being destroyed; close synchronously.
    Teardown,
}

/// Actions produced by the [`ChannelManager`](crate::ChannelManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    /// Open a connection for the given identity.
    Connect {
        /// Id of the new connection attempt.
        channel: ChannelId,
        /// Identity to bind the connection to.
        user: UserId,
    },

    /// Remove all event listeners registered on the channel. Always emitted
    /// before the matching [`ChannelAction::Disconnect`] so no callback can
    /// fire against a logically closed channel.
    DeregisterListeners {
        /// The channel being torn down.
        channel: ChannelId,
    },

    /// Close the transport connection.
    Disconnect {
        /// The channel being torn down.
        channel: ChannelId,
    },
}
