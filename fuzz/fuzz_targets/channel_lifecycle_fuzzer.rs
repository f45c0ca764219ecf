//! Fuzz target for the [`ChannelManager`] state machine
//!
//! Prevent duplicate live channels and callbacks on retired channels via
//! hostile event orderings
//!
//! # Strategy
//!
//! - Event sequences: Arbitrary session snapshots, transport reports, and
//!   teardowns
//! - Stale ids: Open/close/error reports for channels retired long ago
//! - Interleaving: Identity switches racing transport confirmations
//!
//! # Invariants
//!
//! - `Open` ONLY reachable via `Connect` followed by the matching `Opened`
//! - Never two `Connect`s without an intervening `Disconnect` or drop
//! - `DeregisterListeners` always precedes its matching `Disconnect`
//! - After `Teardown` the manager is `Closed` until a new snapshot arrives
//! - Stale transport reports never change state or emit actions
//! - NEVER panic on any event ordering

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tether_client::{ChannelAction, ChannelEvent, ChannelManager, ChannelState};
use tether_core::{ChannelId, Role, Session, Token, User};

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    /// Committed session snapshot.
    Snapshot(FuzzSession),
    /// Transport reports a channel open.
    Opened { channel: u8 },
    /// Transport reports a channel closed.
    Closed { channel: u8 },
    /// Transport reports a connection error.
    TransportError { channel: u8 },
    /// Owning scope destroyed.
    Teardown,
}

#[derive(Debug, Clone, Arbitrary)]
enum FuzzSession {
    /// No user, no token.
    Empty,
    /// Token survived a reload but the user is not loaded yet.
    TokenOnly,
    /// Fully authenticated identity.
    Authenticated { user_id: u8, role: FuzzRole },
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzRole {
    Admin,
    Retailer,
    ShopOwner,
    DeliveryBoy,
}

impl From<FuzzRole> for Role {
    fn from(role: FuzzRole) -> Self {
        match role {
            FuzzRole::Admin => Role::Admin,
            FuzzRole::Retailer => Role::Retailer,
            FuzzRole::ShopOwner => Role::ShopOwner,
            FuzzRole::DeliveryBoy => Role::DeliveryBoy,
        }
    }
}

fn session_from_fuzzed(fuzzed: &FuzzSession) -> Session {
    match fuzzed {
        FuzzSession::Empty => Session::empty(),
        FuzzSession::TokenOnly => {
            Session { user: None, token: Some(Token::new("fuzz-token")) }
        },
        FuzzSession::Authenticated { user_id, role } => Session {
            user: Some(User {
                id: u64::from(*user_id),
                email: format!("fuzz-{user_id}@example.com"),
                full_name: format!("Fuzz {user_id}"),
                role: (*role).into(),
            }),
            token: Some(Token::new("fuzz-token")),
        },
    }
}

fuzz_target!(|events: Vec<FuzzEvent>| {
    let mut manager = ChannelManager::new();

    // Liveness as the transport would see it: the channel whose Connect has
    // not yet been answered by a Disconnect.
    let mut live: Option<ChannelId> = None;
    // Channels the transport actually knows about.
    let mut issued: Vec<ChannelId> = Vec::new();

    for event in events {
        let previous_state = manager.state();
        let previous_channel = manager.channel();

        let channel_event = match &event {
            FuzzEvent::Snapshot(fuzzed) => ChannelEvent::Session(session_from_fuzzed(fuzzed)),
            FuzzEvent::Opened { channel } => ChannelEvent::Opened(ChannelId::from(*channel)),
            FuzzEvent::Closed { channel } => ChannelEvent::Closed(ChannelId::from(*channel)),
            FuzzEvent::TransportError { channel } => {
                ChannelEvent::TransportError(ChannelId::from(*channel))
            },
            FuzzEvent::Teardown => ChannelEvent::Teardown,
        };

        let stale = match channel_event {
            ChannelEvent::Opened(id)
            | ChannelEvent::Closed(id)
            | ChannelEvent::TransportError(id) => previous_channel != Some(id),
            _ => false,
        };

        let actions = manager.handle(channel_event);

        if stale {
            assert!(actions.is_empty(), "stale report produced actions: {actions:?}");
            assert_eq!(manager.state(), previous_state, "stale report changed state");
            assert_eq!(manager.channel(), previous_channel, "stale report changed channel");
        }

        let mut deregistered: Option<ChannelId> = None;
        for action in &actions {
            match *action {
                ChannelAction::Connect { channel, .. } => {
                    assert!(live.is_none(), "second Connect while {live:?} is live");
                    assert!(!issued.contains(&channel), "channel id reused: {channel}");
                    issued.push(channel);
                    live = Some(channel);
                },
                ChannelAction::DeregisterListeners { channel } => {
                    assert_eq!(live, Some(channel), "deregister for a channel that is not live");
                    deregistered = Some(channel);
                },
                ChannelAction::Disconnect { channel } => {
                    assert_eq!(live, Some(channel), "disconnect for a channel that is not live");
                    assert_eq!(
                        deregistered,
                        Some(channel),
                        "disconnect without prior listener deregistration"
                    );
                    live = None;
                },
            }
        }

        // A transport-initiated end of the live channel needs no Disconnect.
        if manager.state() == ChannelState::Closed
            && previous_state != ChannelState::Closed
            && actions.is_empty()
        {
            live = None;
        }

        if manager.is_connected() {
            assert!(
                manager.channel().is_some(),
                "connected without a channel handle"
            );
        }

        if matches!(event, FuzzEvent::Teardown) {
            assert_eq!(manager.state(), ChannelState::Closed, "teardown must land in Closed");
            assert_eq!(manager.channel(), None, "teardown must retire the channel");
            live = None;
        }
    }

    // Closed stays closed under transport noise.
    if manager.state() == ChannelState::Closed {
        for id in 0..4_u64 {
            assert!(manager.handle(ChannelEvent::Opened(id)).is_empty());
            assert!(manager.handle(ChannelEvent::Closed(id)).is_empty());
        }
        assert_eq!(manager.state(), ChannelState::Closed);
    }
});
