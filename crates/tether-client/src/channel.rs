//! Realtime channel lifecycle manager.
//!
//! Owns the process's single realtime connection and opens/closes it in
//! lockstep with authentication transitions. Pure state machine: session
//! snapshots and transport reports come in, connect/disconnect actions go
//! out, the caller drives the actual transport.

use tether_core::{ChannelId, Session, UserId};

use crate::event::{ChannelAction, ChannelEvent};

/// Lifecycle states of the realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No connection and none requested.
    Closed,
    /// A connect was issued; waiting for the transport to report open.
    Connecting,
    /// The transport reported the connection open.
    Open,
    /// A disconnect was issued; waiting for the transport to confirm.
    Closing,
}

/// Owns the single realtime connection bound to the authenticated identity.
///
/// # Invariants
///
/// - At most one live channel per identity at any time: a new `Connect` is
///   only ever emitted from `Closed`, either on first authentication or
///   after the previous channel's teardown has been confirmed.
/// - `DeregisterListeners` always precedes the matching `Disconnect`, and
///   transport events tagged with a retired [`ChannelId`] are discarded, so
///   no callback fires against a logically closed channel.
/// - A transport-initiated drop lands in `Closed` with no automatic
///   reconnect; reconnection policy (backoff, cap, jitter) is a deliberate
///   extension point, not a hidden retry loop.
pub struct ChannelManager {
    state: ChannelState,
    channel: Option<ChannelId>,
    user: Option<UserId>,
    /// Identity to connect for once the current teardown completes
    /// (identity switch without an intervening unauthenticated state).
    pending: Option<UserId>,
    next_channel: ChannelId,
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelManager {
    /// A manager with no connection.
    pub fn new() -> Self {
        Self { state: ChannelState::Closed, channel: None, user: None, pending: None, next_channel: 0 }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Handle of the current connection attempt, if any.
    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    /// True only while the transport has reported the connection open.
    pub fn is_connected(&self) -> bool {
        self.state == ChannelState::Open
    }

    /// Process an event and return resulting actions.
    ///
    /// Infallible: unexpected or stale events are discarded (logged at
    /// `debug!`), never applied.
    pub fn handle(&mut self, event: ChannelEvent) -> Vec<ChannelAction> {
        match event {
            ChannelEvent::Session(snapshot) => self.handle_session(&snapshot),
            ChannelEvent::Opened(id) => self.handle_opened(id),
            ChannelEvent::Closed(id) => self.handle_closed(id),
            ChannelEvent::TransportError(id) => {
                // An errored transport is a closed transport; it only ever
                // surfaces as `is_connected = false`.
                self.handle_closed(id)
            },
            ChannelEvent::Teardown => self.handle_teardown(),
        }
    }

    fn handle_session(&mut self, snapshot: &Session) -> Vec<ChannelAction> {
        let target = if snapshot.is_authenticated() {
            snapshot.user.as_ref().map(|u| u.id)
        } else {
            None
        };

        match (self.state, target) {
            (ChannelState::Closed, Some(user)) => self.begin_connect(user),
            (ChannelState::Closed, None) => vec![],

            (ChannelState::Connecting | ChannelState::Open, Some(user)) => {
                if self.user == Some(user) {
                    return vec![];
                }
                // Identity switch: tear down first, reconnect for the new
                // id only after the close is confirmed.
                self.pending = Some(user);
                self.close_current()
            },
            (ChannelState::Connecting | ChannelState::Open, None) => {
                self.pending = None;
                self.close_current()
            },

            // Already tearing down; just update where to go afterwards.
            (ChannelState::Closing, target) => {
                self.pending = target;
                vec![]
            },
        }
    }

    fn handle_opened(&mut self, id: ChannelId) -> Vec<ChannelAction> {
        if self.state == ChannelState::Connecting && self.channel == Some(id) {
            self.state = ChannelState::Open;
        } else {
            tracing::debug!(channel = id, "discarding open report for retired channel");
        }
        vec![]
    }

    fn handle_closed(&mut self, id: ChannelId) -> Vec<ChannelAction> {
        if self.channel != Some(id) {
            tracing::debug!(channel = id, "discarding close report for retired channel");
            return vec![];
        }

        match self.state {
            ChannelState::Closing => {
                self.retire_channel();
                match self.pending.take() {
                    Some(user) => self.begin_connect(user),
                    None => vec![],
                }
            },
            ChannelState::Connecting | ChannelState::Open => {
                tracing::debug!(channel = id, "transport dropped the connection");
                self.retire_channel();
                vec![]
            },
            ChannelState::Closed => vec![],
        }
    }

    fn handle_teardown(&mut self) -> Vec<ChannelAction> {
        let actions = match (self.state, self.channel) {
            (ChannelState::Connecting | ChannelState::Open, Some(id)) => vec![
                ChannelAction::DeregisterListeners { channel: id },
                ChannelAction::Disconnect { channel: id },
            ],
            // Closing: the disconnect is already on its way; Closed: nothing
            // to do. Either way the scope is gone, so drop everything now.
            _ => vec![],
        };

        self.retire_channel();
        self.state = ChannelState::Closed;
        self.pending = None;
        actions
    }

    fn begin_connect(&mut self, user: UserId) -> Vec<ChannelAction> {
        let id = self.next_channel;
        self.next_channel += 1;

        self.channel = Some(id);
        self.user = Some(user);
        self.state = ChannelState::Connecting;
        tracing::debug!(channel = id, user, "opening realtime channel");

        vec![ChannelAction::Connect { channel: id, user }]
    }

    fn close_current(&mut self) -> Vec<ChannelAction> {
        let Some(id) = self.channel else {
            self.state = ChannelState::Closed;
            return vec![];
        };

        self.state = ChannelState::Closing;
        vec![
            ChannelAction::DeregisterListeners { channel: id },
            ChannelAction::Disconnect { channel: id },
        ]
    }

    fn retire_channel(&mut self) {
        self.channel = None;
        self.user = None;
        self.state = ChannelState::Closed;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tether_core::{Role, Token, User};

    use super::*;

    fn authenticated(id: u64) -> Session {
        Session {
            user: Some(User {
                id,
                email: format!("u{id}@example.com"),
                full_name: format!("User {id}"),
                role: Role::Retailer,
            }),
            token: Some(Token::new("t")),
        }
    }

    fn connect_id(actions: &[ChannelAction]) -> ChannelId {
        match actions {
            [ChannelAction::Connect { channel, .. }] => *channel,
            other => panic!("expected a single Connect, got {other:?}"),
        }
    }

    fn open_channel(manager: &mut ChannelManager, user: u64) -> ChannelId {
        let actions = manager.handle(ChannelEvent::Session(authenticated(user)));
        let id = connect_id(&actions);
        manager.handle(ChannelEvent::Opened(id));
        assert!(manager.is_connected());
        id
    }

    #[test]
    fn authentication_opens_a_channel() {
        let mut manager = ChannelManager::new();

        let actions = manager.handle(ChannelEvent::Session(authenticated(1)));
        assert!(matches!(actions[..], [ChannelAction::Connect { user: 1, .. }]));
        assert_eq!(manager.state(), ChannelState::Connecting);
        assert!(!manager.is_connected());
    }

    #[test]
    fn transport_open_report_connects() {
        let mut manager = ChannelManager::new();
        open_channel(&mut manager, 1);
        assert_eq!(manager.state(), ChannelState::Open);
    }

    #[test]
    fn unauthenticated_snapshot_tears_down_in_order() {
        let mut manager = ChannelManager::new();
        let id = open_channel(&mut manager, 1);

        let actions = manager.handle(ChannelEvent::Session(Session::empty()));
        assert_eq!(
            actions,
            vec![
                ChannelAction::DeregisterListeners { channel: id },
                ChannelAction::Disconnect { channel: id },
            ]
        );
        assert_eq!(manager.state(), ChannelState::Closing);

        let actions = manager.handle(ChannelEvent::Closed(id));
        assert!(actions.is_empty());
        assert_eq!(manager.state(), ChannelState::Closed);
        assert_eq!(manager.channel(), None);
    }

    #[test]
    fn same_identity_snapshot_is_a_no_op() {
        let mut manager = ChannelManager::new();
        open_channel(&mut manager, 1);

        let actions = manager.handle(ChannelEvent::Session(authenticated(1)));
        assert!(actions.is_empty());
        assert!(manager.is_connected());
    }

    #[test]
    fn identity_switch_reconnects_after_teardown() {
        let mut manager = ChannelManager::new();
        let old = open_channel(&mut manager, 1);

        let actions = manager.handle(ChannelEvent::Session(authenticated(2)));
        assert_eq!(
            actions,
            vec![
                ChannelAction::DeregisterListeners { channel: old },
                ChannelAction::Disconnect { channel: old },
            ]
        );
        assert_eq!(manager.state(), ChannelState::Closing);

        // The new connect is withheld until the old close is confirmed.
        let actions = manager.handle(ChannelEvent::Closed(old));
        assert!(matches!(actions[..], [ChannelAction::Connect { user: 2, .. }]));
        assert_eq!(manager.state(), ChannelState::Connecting);
        assert_ne!(manager.channel(), Some(old));
    }

    #[test]
    fn logout_during_identity_switch_cancels_reconnect() {
        let mut manager = ChannelManager::new();
        let old = open_channel(&mut manager, 1);

        manager.handle(ChannelEvent::Session(authenticated(2)));
        manager.handle(ChannelEvent::Session(Session::empty()));

        let actions = manager.handle(ChannelEvent::Closed(old));
        assert!(actions.is_empty());
        assert_eq!(manager.state(), ChannelState::Closed);
    }

    #[test]
    fn transport_drop_closes_without_reconnect() {
        let mut manager = ChannelManager::new();
        let id = open_channel(&mut manager, 1);

        let actions = manager.handle(ChannelEvent::TransportError(id));
        assert!(actions.is_empty());
        assert_eq!(manager.state(), ChannelState::Closed);
        assert!(!manager.is_connected());
    }

    #[test]
    fn stale_transport_events_are_ignored() {
        let mut manager = ChannelManager::new();
        let old = open_channel(&mut manager, 1);

        manager.handle(ChannelEvent::Session(Session::empty()));
        manager.handle(ChannelEvent::Closed(old));
        let fresh = connect_id(&manager.handle(ChannelEvent::Session(authenticated(1))));

        // Late reports for the retired channel must not disturb the new one.
        manager.handle(ChannelEvent::Opened(old));
        assert!(!manager.is_connected());
        manager.handle(ChannelEvent::Closed(old));
        assert_eq!(manager.state(), ChannelState::Connecting);

        manager.handle(ChannelEvent::Opened(fresh));
        assert!(manager.is_connected());
    }

    #[test]
    fn teardown_closes_synchronously() {
        let mut manager = ChannelManager::new();
        let id = open_channel(&mut manager, 1);

        let actions = manager.handle(ChannelEvent::Teardown);
        assert_eq!(
            actions,
            vec![
                ChannelAction::DeregisterListeners { channel: id },
                ChannelAction::Disconnect { channel: id },
            ]
        );
        assert_eq!(manager.state(), ChannelState::Closed);
        assert_eq!(manager.channel(), None);
    }

    #[test]
    fn teardown_while_closed_is_a_no_op() {
        let mut manager = ChannelManager::new();
        assert!(manager.handle(ChannelEvent::Teardown).is_empty());
        assert_eq!(manager.state(), ChannelState::Closed);
    }

    #[test]
    fn connects_alternate_with_disconnects() {
        let mut manager = ChannelManager::new();
        let mut log = Vec::new();

        let mut drive = |manager: &mut ChannelManager, event: ChannelEvent, log: &mut Vec<_>| {
            for action in manager.handle(event) {
                match action {
                    ChannelAction::Connect { .. } | ChannelAction::Disconnect { .. } => {
                        log.push(action);
                    },
                    ChannelAction::DeregisterListeners { .. } => {},
                }
            }
        };

        drive(&mut manager, ChannelEvent::Session(authenticated(1)), &mut log);
        drive(&mut manager, ChannelEvent::Opened(0), &mut log);
        drive(&mut manager, ChannelEvent::Session(authenticated(2)), &mut log);
        drive(&mut manager, ChannelEvent::Closed(0), &mut log);
        drive(&mut manager, ChannelEvent::Session(Session::empty()), &mut log);
        drive(&mut manager, ChannelEvent::Closed(1), &mut log);

        for pair in log.chunks(2) {
            match pair {
                [ChannelAction::Connect { channel: a, .. }, ChannelAction::Disconnect { channel: b }] => {
                    assert_eq!(a, b);
                },
                other => panic!("opens and closes must alternate, got {other:?}"),
            }
        }
    }
}
