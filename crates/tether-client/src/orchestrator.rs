//! Session orchestrator.
//!
//! Sequences the three session-changing operations (startup verification,
//! login, logout) so a partial failure never leaves the session, the
//! response cache, or the channel in an inconsistent combination.

use tether_core::{ProfileStore, Session, Token, TokenVault, User};

use crate::{
    error::SessionError,
    event::{RequestId, SessionAction, SessionEvent},
    store::SessionStore,
};

/// Which remote call is currently in flight, tagged with its request id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Verifying(RequestId),
    LoggingIn(RequestId),
    LoggingOut(RequestId),
}

/// Caller-facing session status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Verified identity, if any.
    pub user: Option<User>,
    /// Bearer credential, if any.
    pub token: Option<Token>,
    /// True while startup verification or a login is in flight.
    pub is_loading: bool,
    /// True iff both user and token are present.
    pub is_authenticated: bool,
}

/// Sequences session transitions so they are atomic from observers'
/// viewpoint.
///
/// Owns the [`SessionStore`] exclusively: every mutation goes through
/// [`handle`](Self::handle). The orchestrator is a pure state machine; it
/// emits [`SessionAction`]s for the caller to execute against the auth
/// transport and the response cache, and consumes the completions as
/// events.
///
/// # Cancellation
///
/// Each remote call carries a [`RequestId`]. A completion whose id does not
/// match the current in-flight request (superseded, or cancelled by
/// [`SessionEvent::Teardown`]) is discarded, never applied to stale state.
pub struct SessionOrchestrator<V: TokenVault, P: ProfileStore> {
    store: SessionStore<V, P>,
    phase: Phase,
    verify_issued: bool,
    next_request: RequestId,
}

impl<V: TokenVault, P: ProfileStore> SessionOrchestrator<V, P> {
    /// Wrap a rehydrated store.
    pub fn new(store: SessionStore<V, P>) -> Self {
        Self { store, phase: Phase::Idle, verify_issued: false, next_request: 0 }
    }

    /// Read access to the owned store.
    pub fn store(&self) -> &SessionStore<V, P> {
        &self.store
    }

    /// Mutable access to the owned store, for subscription management by
    /// observers. Calling the setters directly through this bypasses the
    /// orchestrator's sequencing and is a contract violation.
    pub fn store_mut(&mut self) -> &mut SessionStore<V, P> {
        &mut self.store
    }

    /// Current caller-facing status.
    pub fn status(&self) -> SessionStatus {
        let session = self.store.session();
        SessionStatus {
            user: session.user.clone(),
            token: session.token.clone(),
            is_loading: matches!(self.phase, Phase::Verifying(_) | Phase::LoggingIn(_)),
            is_authenticated: session.is_authenticated(),
        }
    }

    /// Current session snapshot.
    pub fn session(&self) -> &Session {
        self.store.session()
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Returns a typed [`SessionError`] when a login attempt fails or a
    /// concurrent operation is rejected. The session is never left outside
    /// its defined states: a returned error implies the store was not
    /// mutated by this event.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<SessionAction>, SessionError> {
        match event {
            SessionEvent::Start => Ok(self.handle_start()),
            SessionEvent::LoginRequested { email, password } => {
                self.handle_login_requested(email, password)
            },
            SessionEvent::LoginCompleted { request, result } => {
                self.handle_login_completed(request, result)
            },
            SessionEvent::VerifyCompleted { request, result } => {
                self.handle_verify_completed(request, result)
            },
            SessionEvent::LogoutRequested => self.handle_logout_requested(),
            SessionEvent::LogoutCompleted { request, result } => {
                self.handle_logout_completed(request, result)
            },
            SessionEvent::Teardown => {
                // Any in-flight completion now mismatches and is discarded.
                self.phase = Phase::Idle;
                Ok(vec![])
            },
        }
    }

    /// Startup verification: issued at most once, and only when a token
    /// survived the reload without a loaded user.
    fn handle_start(&mut self) -> Vec<SessionAction> {
        let session = self.store.session();
        if session.token.is_none() || session.user.is_some() || self.verify_issued {
            return vec![];
        }

        self.verify_issued = true;
        let request = self.alloc_request();
        self.phase = Phase::Verifying(request);
        tracing::debug!(request, "verifying stored token");

        vec![SessionAction::FetchCurrentUser { request }]
    }

    fn handle_login_requested(
        &mut self,
        email: String,
        password: String,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase != Phase::Idle {
            return Err(SessionError::OperationInFlight);
        }

        let request = self.alloc_request();
        self.phase = Phase::LoggingIn(request);

        Ok(vec![SessionAction::CallLogin { request, email, password }])
    }

    fn handle_login_completed(
        &mut self,
        request: RequestId,
        result: Result<tether_core::LoginSuccess, tether_core::AuthError>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase != Phase::LoggingIn(request) {
            tracing::debug!(request, "discarding stale login completion");
            return Ok(vec![]);
        }
        self.phase = Phase::Idle;

        match result {
            Ok(success) => {
                // One observable transition, then drop the cached identity
                // check so a reload re-verifies from the server.
                self.store.set_credentials(success.access_token, success.user)?;
                Ok(vec![SessionAction::InvalidateCurrentUser])
            },
            Err(e) => Err(SessionError::Login(e)),
        }
    }

    fn handle_verify_completed(
        &mut self,
        request: RequestId,
        result: Result<User, tether_core::AuthError>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase != Phase::Verifying(request) {
            tracing::debug!(request, "discarding stale verification completion");
            return Ok(vec![]);
        }
        self.phase = Phase::Idle;

        match result {
            Ok(user) => {
                self.store.set_user(Some(user))?;
                Ok(vec![])
            },
            Err(e) => {
                // Token-but-no-user is a defined unauthenticated state.
                // Stale-token decisions belong to the auth boundary; the
                // store is not cleared and verification is not retried.
                tracing::warn!(error = %e, "identity verification failed");
                Ok(vec![])
            },
        }
    }

    fn handle_logout_requested(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        match self.phase {
            Phase::LoggingIn(_) | Phase::LoggingOut(_) => {
                return Err(SessionError::OperationInFlight);
            },
            Phase::Verifying(request) => {
                // Logout is user intent; an in-flight verification is
                // superseded and its completion will be discarded.
                tracing::debug!(request, "logout supersedes in-flight verification");
            },
            Phase::Idle => {},
        }

        let request = self.alloc_request();
        self.phase = Phase::LoggingOut(request);

        Ok(vec![SessionAction::CallLogout { request }])
    }

    fn handle_logout_completed(
        &mut self,
        request: RequestId,
        result: Result<(), tether_core::AuthError>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase != Phase::LoggingOut(request) {
            tracing::debug!(request, "discarding stale logout completion");
            return Ok(vec![]);
        }
        self.phase = Phase::Idle;

        if let Err(e) = result {
            // Best-effort: once the user's intent is "log out", the local
            // session goes regardless of the server.
            tracing::warn!(error = %e, "remote logout failed; clearing locally anyway");
        }

        self.store.clear();
        Ok(vec![SessionAction::ClearResponseCache])
    }

    fn alloc_request(&mut self) -> RequestId {
        let request = self.next_request;
        self.next_request += 1;
        request
    }
}
