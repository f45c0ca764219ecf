//! World driver - wires the state machines to the fake collaborators.
//!
//! The `World` owns one full session stack (store, orchestrator, channel
//! manager, notifications) plus the fakes, executes every action the
//! machines emit, and feeds completions and transport reports back in. It
//! is the single-threaded event loop the real embedding would provide.

use std::collections::VecDeque;

use tether_client::{
    ChannelAction, ChannelEvent, ChannelManager, Notifications, SessionAction, SessionError,
    SessionEvent, SessionOrchestrator, SessionStatus, SessionStore, SubscriptionId,
};
use tether_core::{
    AuthTransport, ChannelId, RealtimeTransport, ResponseCache, Session, CURRENT_USER_KEY,
};

use crate::fakes::{FakeAuthServer, MemoryProfiles, MemoryVault, RecordingCache, RecordingTransport};

/// One full session stack wired to fakes.
pub struct World {
    orchestrator: SessionOrchestrator<MemoryVault, MemoryProfiles>,
    channel: ChannelManager,
    notifications: Notifications,
    auth: FakeAuthServer,
    cache: RecordingCache,
    transport: RecordingTransport,
    vault: MemoryVault,
    profiles: MemoryProfiles,
    channel_sub: SubscriptionId,
    notify_sub: SubscriptionId,
    deregistered: Vec<ChannelId>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// A cold-started world: empty durable storage, reachable server with
    /// no accounts, transport that confirms every connect.
    pub fn new() -> Self {
        let vault = MemoryVault::new();
        let profiles = MemoryProfiles::new();
        let auth = FakeAuthServer::new();
        let cache = RecordingCache::new();
        let transport = RecordingTransport::new();

        let mut world = Self::wire(vault, profiles, auth, cache, transport);
        world.pump();
        world
    }

    /// Rebuild the session stack from the current durable storage, as a
    /// process restart would. The server, cache log and transport log
    /// survive so tests can assert across the reload.
    pub fn reload(&mut self) {
        // The dying process closes its socket. Reports queued for its
        // event loop die with it; the fresh stack must not see them.
        let actions = self.channel.handle(ChannelEvent::Teardown);
        self.run_channel_actions(actions);
        while self.transport.take_event().is_some() {}

        let fresh = Self::wire(
            self.vault.clone(),
            self.profiles.clone(),
            self.auth.clone(),
            self.cache.clone(),
            self.transport.clone(),
        );
        *self = fresh;
        self.pump();
    }

    fn wire(
        vault: MemoryVault,
        profiles: MemoryProfiles,
        auth: FakeAuthServer,
        cache: RecordingCache,
        transport: RecordingTransport,
    ) -> Self {
        let store = SessionStore::open(vault.clone(), profiles.clone());
        let mut orchestrator = SessionOrchestrator::new(store);
        let channel_sub = orchestrator.store_mut().subscribe();
        let notify_sub = orchestrator.store_mut().subscribe();

        Self {
            orchestrator,
            channel: ChannelManager::new(),
            notifications: Notifications::new(),
            auth,
            cache,
            transport,
            vault,
            profiles,
            channel_sub,
            notify_sub,
            deregistered: Vec::new(),
        }
    }

    /// The fake auth server (shared handle).
    pub fn auth(&self) -> &FakeAuthServer {
        &self.auth
    }

    /// The recording response cache (shared handle).
    pub fn cache(&self) -> &RecordingCache {
        &self.cache
    }

    /// The recording transport (shared handle).
    pub fn transport(&self) -> &RecordingTransport {
        &self.transport
    }

    /// The durable token storage (shared handle).
    pub fn vault(&self) -> &MemoryVault {
        &self.vault
    }

    /// The durable profile storage (shared handle).
    pub fn profiles(&self) -> &MemoryProfiles {
        &self.profiles
    }

    /// The channel lifecycle manager.
    pub fn channel(&self) -> &ChannelManager {
        &self.channel
    }

    /// The notification state.
    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Mutable notification state (UI capabilities: increment, clear).
    pub fn notifications_mut(&mut self) -> &mut Notifications {
        &mut self.notifications
    }

    /// Channels whose listeners have been deregistered, in order.
    pub fn deregistered(&self) -> &[ChannelId] {
        &self.deregistered
    }

    /// Caller-facing session status.
    pub fn status(&self) -> SessionStatus {
        self.orchestrator.status()
    }

    /// Current session snapshot.
    pub fn session(&self) -> Session {
        self.orchestrator.session().clone()
    }

    /// Process start: trigger startup verification if applicable.
    pub fn boot(&mut self) -> Result<(), SessionError> {
        self.apply(SessionEvent::Start)
    }

    /// Drive a full login round-trip.
    pub fn login(&mut self, email: &str, password: &str) -> Result<(), SessionError> {
        self.apply(SessionEvent::LoginRequested {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    /// Drive a full logout round-trip.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.apply(SessionEvent::LogoutRequested)
    }

    /// Destroy the owning scope: cancel in-flight work, close the channel
    /// synchronously, release the store subscriptions.
    pub fn teardown(&mut self) {
        // Orchestrator teardown cannot fail.
        let _ = self.apply(SessionEvent::Teardown);
        let actions = self.channel.handle(ChannelEvent::Teardown);
        self.run_channel_actions(actions);
        self.orchestrator.store_mut().unsubscribe(self.channel_sub);
        self.orchestrator.store_mut().unsubscribe(self.notify_sub);
    }

    /// Simulate the server dropping the live connection.
    pub fn drop_channel(&mut self) {
        if let Some(id) = self.channel.channel() {
            self.transport.drop_connection(id);
            self.pump();
        }
    }

    /// Feed one event into the orchestrator and run the resulting actions,
    /// completions and downstream reactions to quiescence.
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let mut queue = VecDeque::from([event]);
        let mut outcome = Ok(());

        while let Some(event) = queue.pop_front() {
            match self.orchestrator.handle(event) {
                Ok(actions) => {
                    for action in actions {
                        if let Some(completion) = self.execute(action) {
                            queue.push_back(completion);
                        }
                    }
                },
                Err(e) => outcome = Err(e),
            }
            self.pump();
        }

        outcome
    }

    /// Execute one orchestrator action against the fakes; remote calls
    /// yield the completion event to feed back.
    fn execute(&mut self, action: SessionAction) -> Option<SessionEvent> {
        match action {
            SessionAction::FetchCurrentUser { request } => {
                Some(SessionEvent::VerifyCompleted { request, result: self.auth.current_user() })
            },
            SessionAction::CallLogin { request, email, password } => Some(
                SessionEvent::LoginCompleted { request, result: self.auth.login(&email, &password) },
            ),
            SessionAction::CallLogout { request } => {
                Some(SessionEvent::LogoutCompleted { request, result: self.auth.logout() })
            },
            SessionAction::InvalidateCurrentUser => {
                self.cache.invalidate(CURRENT_USER_KEY);
                None
            },
            SessionAction::ClearResponseCache => {
                self.cache.clear();
                None
            },
        }
    }

    /// Drain committed snapshots into the observers and transport reports
    /// into the channel manager until nothing moves.
    fn pump(&mut self) {
        loop {
            let mut progressed = false;

            while let Some(snapshot) = self.orchestrator.store_mut().poll(self.channel_sub) {
                progressed = true;
                let actions = self.channel.handle(ChannelEvent::Session(snapshot));
                self.run_channel_actions(actions);
            }

            while let Some(snapshot) = self.orchestrator.store_mut().poll(self.notify_sub) {
                progressed = true;
                self.notifications.observe_session(&snapshot);
            }

            while let Some(event) = self.transport.take_event() {
                progressed = true;
                let actions = self.channel.handle(event);
                self.run_channel_actions(actions);
            }

            if !progressed {
                break;
            }
        }
    }

    fn run_channel_actions(&mut self, actions: Vec<ChannelAction>) {
        for action in actions {
            match action {
                ChannelAction::Connect { channel, user } => {
                    self.transport.connect(channel, user);
                },
                ChannelAction::DeregisterListeners { channel } => {
                    self.deregistered.push(channel);
                },
                ChannelAction::Disconnect { channel } => {
                    self.transport.disconnect(channel);
                },
            }
        }
    }
}
