//! In-memory fakes for the collaborator contracts.
//!
//! The vault and profile store keep their data behind shared `Rc` handles,
//! so a test can clone a fake, rebuild the session stack on top of the
//! clone and observe durability across a simulated reload. Everything is
//! single-threaded, matching the event-loop model of the real embedding.

use std::{cell::RefCell, collections::HashMap, collections::VecDeque, rc::Rc};

use tether_client::ChannelEvent;
use tether_core::{
    decode_profile, encode_profile, AuthError, AuthTransport, ChannelId, LoginSuccess,
    ProfileError, ProfileStore, RealtimeTransport, ResponseCache, Token, TokenVault, User, UserId,
};

/// Durable token storage backed by a shared cell.
#[derive(Clone, Default)]
pub struct MemoryVault {
    token: Rc<RefCell<Option<Token>>>,
}

impl MemoryVault {
    /// An empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a token as if a previous run had stored it.
    pub fn seed(&self, token: Token) {
        *self.token.borrow_mut() = Some(token);
    }
}

impl TokenVault for MemoryVault {
    fn stored_token(&self) -> Option<Token> {
        self.token.borrow().clone()
    }

    fn store_token(&mut self, token: &Token) {
        *self.token.borrow_mut() = Some(token.clone());
    }

    fn clear_tokens(&mut self) {
        *self.token.borrow_mut() = None;
    }
}

/// Durable profile storage holding encoded snapshot bytes, so the CBOR
/// codec is exercised on every save/load.
#[derive(Clone, Default)]
pub struct MemoryProfiles {
    bytes: Rc<RefCell<Option<Vec<u8>>>>,
}

impl MemoryProfiles {
    /// An empty profile store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored bytes, e.g. with garbage to simulate
    /// corruption.
    pub fn set_raw(&self, bytes: Vec<u8>) {
        *self.bytes.borrow_mut() = Some(bytes);
    }
}

impl ProfileStore for MemoryProfiles {
    fn load(&self) -> Result<Option<User>, ProfileError> {
        match &*self.bytes.borrow() {
            Some(bytes) => decode_profile(bytes),
            None => Ok(None),
        }
    }

    fn save(&mut self, user: Option<&User>) -> Result<(), ProfileError> {
        *self.bytes.borrow_mut() = Some(encode_profile(user)?);
        Ok(())
    }
}

/// Fake auth server with a credential table and a reachability switch.
#[derive(Clone, Default)]
pub struct FakeAuthServer {
    inner: Rc<RefCell<AuthServerState>>,
}

#[derive(Default)]
struct AuthServerState {
    accounts: HashMap<String, (String, User)>,
    /// Identity the currently stored token resolves to, if any.
    active: Option<User>,
    unreachable: bool,
    revoke_tokens: bool,
}

impl FakeAuthServer {
    /// A reachable server with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a login account.
    pub fn register(&self, email: &str, password: &str, user: User) {
        self.inner
            .borrow_mut()
            .accounts
            .insert(email.to_string(), (password.to_string(), user));
    }

    /// Pretend the stored token resolves to this identity (pairs with
    /// [`MemoryVault::seed`] for startup-verification scenarios).
    pub fn set_active_identity(&self, user: Option<User>) {
        self.inner.borrow_mut().active = user;
    }

    /// Toggle network reachability.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.borrow_mut().unreachable = !reachable;
    }

    /// Make the server reject every presented token.
    pub fn revoke_tokens(&self) {
        self.inner.borrow_mut().revoke_tokens = true;
    }
}

impl AuthTransport for FakeAuthServer {
    fn login(&mut self, email: &str, password: &str) -> Result<LoginSuccess, AuthError> {
        let mut state = self.inner.borrow_mut();
        if state.unreachable {
            return Err(AuthError::Network { reason: "server unreachable".to_string() });
        }

        let user = match state.accounts.get(email) {
            Some((expected, user)) if expected == password => user.clone(),
            _ => return Err(AuthError::InvalidCredentials),
        };

        state.active = Some(user.clone());
        let token = Token::new(format!("token-{}", user.id));
        Ok(LoginSuccess { access_token: token, user })
    }

    fn logout(&mut self) -> Result<(), AuthError> {
        let mut state = self.inner.borrow_mut();
        if state.unreachable {
            return Err(AuthError::Network { reason: "server unreachable".to_string() });
        }
        state.active = None;
        Ok(())
    }

    fn current_user(&mut self) -> Result<User, AuthError> {
        let state = self.inner.borrow();
        if state.unreachable {
            return Err(AuthError::Network { reason: "server unreachable".to_string() });
        }
        if state.revoke_tokens {
            return Err(AuthError::Unauthorized);
        }
        state.active.clone().ok_or(AuthError::Unauthorized)
    }
}

/// Operations recorded by [`RecordingCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    /// A single entry was invalidated.
    Invalidate(String),
    /// The whole cache was cleared.
    Clear,
}

/// Response cache that records its operations.
#[derive(Clone, Default)]
pub struct RecordingCache {
    ops: Rc<RefCell<Vec<CacheOp>>>,
}

impl RecordingCache {
    /// An empty recording cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in order.
    pub fn ops(&self) -> Vec<CacheOp> {
        self.ops.borrow().clone()
    }
}

impl ResponseCache for RecordingCache {
    fn invalidate(&mut self, key: &str) {
        self.ops.borrow_mut().push(CacheOp::Invalidate(key.to_string()));
    }

    fn clear(&mut self) {
        self.ops.borrow_mut().push(CacheOp::Clear);
    }
}

/// Connection-level operations recorded by [`RecordingTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    /// A connection was opened for an identity.
    Connect {
        /// Connection attempt id.
        channel: ChannelId,
        /// Identity the connection was bound to.
        user: UserId,
    },
    /// A connection was closed.
    Disconnect {
        /// Connection attempt id.
        channel: ChannelId,
    },
    /// The server dropped the connection (not a client op, but it ends the
    /// channel's liveness and the log validator must see it).
    Dropped {
        /// Connection attempt id.
        channel: ChannelId,
    },
}

/// Realtime transport that records connects/disconnects and echoes the
/// matching open/close reports back as channel events.
#[derive(Clone)]
pub struct RecordingTransport {
    inner: Rc<RefCell<TransportState>>,
}

struct TransportState {
    log: Vec<TransportOp>,
    events: VecDeque<ChannelEvent>,
    auto_open: bool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    /// A transport that confirms every connect with an open report.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(TransportState {
                log: Vec::new(),
                events: VecDeque::new(),
                auto_open: true,
            })),
        }
    }

    /// Suppress automatic open reports; connects then stay in
    /// `Connecting` until the test emits its own report.
    pub fn set_auto_open(&self, auto_open: bool) {
        self.inner.borrow_mut().auto_open = auto_open;
    }

    /// The connect/disconnect log, in order.
    pub fn log(&self) -> Vec<TransportOp> {
        self.inner.borrow().log.clone()
    }

    /// Simulate the server dropping the given connection.
    pub fn drop_connection(&self, channel: ChannelId) {
        let mut state = self.inner.borrow_mut();
        state.log.push(TransportOp::Dropped { channel });
        state.events.push_back(ChannelEvent::TransportError(channel));
    }

    /// Next pending transport report, if any.
    pub fn take_event(&self) -> Option<ChannelEvent> {
        self.inner.borrow_mut().events.pop_front()
    }

    /// Assert helper: at most one connection is ever live, every disconnect
    /// closes the channel opened right before it, and server drops end the
    /// matching channel's liveness.
    pub fn log_alternates(&self) -> bool {
        let mut live: Option<ChannelId> = None;
        for op in self.inner.borrow().log.iter() {
            match *op {
                TransportOp::Connect { channel, .. } => {
                    if live.is_some() {
                        return false;
                    }
                    live = Some(channel);
                },
                TransportOp::Disconnect { channel } => {
                    if live != Some(channel) {
                        return false;
                    }
                    live = None;
                },
                TransportOp::Dropped { channel } => {
                    if live == Some(channel) {
                        live = None;
                    }
                },
            }
        }
        true
    }
}

impl RealtimeTransport for RecordingTransport {
    fn connect(&mut self, channel: ChannelId, user: UserId) {
        let mut state = self.inner.borrow_mut();
        state.log.push(TransportOp::Connect { channel, user });
        if state.auto_open {
            state.events.push_back(ChannelEvent::Opened(channel));
        }
    }

    fn disconnect(&mut self, channel: ChannelId) {
        let mut state = self.inner.borrow_mut();
        state.log.push(TransportOp::Disconnect { channel });
        // The transport always confirms a requested close.
        state.events.push_back(ChannelEvent::Closed(channel));
    }
}
