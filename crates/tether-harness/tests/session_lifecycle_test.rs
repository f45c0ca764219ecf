//! End-to-end session lifecycle scenarios.
//!
//! Each test drives a full stack (store, orchestrator, channel manager,
//! notifications) against the in-memory fakes and asserts the observable
//! outcome: authentication status, durable storage, cache operations and
//! the transport's connect/disconnect log.

#![allow(clippy::unwrap_used)]

use tether_client::{ChannelState, SessionError, SessionOrchestrator, SessionStore};
use tether_core::{AuthError, Role, Token, TokenVault, User, CURRENT_USER_KEY};
use tether_harness::{CacheOp, MemoryProfiles, MemoryVault, TransportOp, World};

fn user(id: u64, role: Role) -> User {
    User {
        id,
        email: format!("u{id}@example.com"),
        full_name: format!("User {id}"),
        role,
    }
}

/// World with one registered account (`u1@example.com` / `pw`).
fn world_with_account(role: Role) -> World {
    let world = World::new();
    world.auth().register("u1@example.com", "pw", user(1, role));
    world
}

#[test]
fn cold_start_stays_logged_out() {
    let mut world = World::new();
    world.boot().unwrap();

    assert!(!world.status().is_authenticated);
    assert!(world.transport().log().is_empty());
    assert_eq!(world.notifications().count(), 0);
}

#[test]
fn startup_with_stored_token_verifies_and_connects() {
    let mut world = World::new();
    world.vault().seed(Token::new("stored"));
    world.auth().set_active_identity(Some(user(7, Role::ShopOwner)));
    world.reload();

    world.boot().unwrap();

    let status = world.status();
    assert!(status.is_authenticated);
    assert_eq!(status.user, Some(user(7, Role::ShopOwner)));
    assert!(!status.is_loading);

    assert!(world.channel().is_connected());
    assert_eq!(world.transport().log(), vec![TransportOp::Connect { channel: 0, user: 7 }]);
    assert_eq!(world.notifications().count(), 3);
}

#[test]
fn startup_with_unreachable_server_falls_back_to_logged_out() {
    let mut world = World::new();
    world.vault().seed(Token::new("stored"));
    world.auth().set_reachable(false);
    world.reload();

    world.boot().unwrap();

    assert!(!world.status().is_authenticated);
    // The token stays put: stale-token decisions belong to an explicit
    // logout, not a transient network failure.
    assert_eq!(world.vault().stored_token(), Some(Token::new("stored")));
    assert!(world.transport().log().is_empty());
}

#[test]
fn startup_with_revoked_token_stays_logged_out_without_clearing() {
    let mut world = World::new();
    world.vault().seed(Token::new("revoked"));
    world.auth().revoke_tokens();
    world.reload();

    world.boot().unwrap();

    assert!(!world.status().is_authenticated);
    assert_eq!(world.vault().stored_token(), Some(Token::new("revoked")));
}

#[test]
fn login_success_connects_and_invalidates_identity_cache() {
    let mut world = world_with_account(Role::Retailer);

    world.login("u1@example.com", "pw").unwrap();

    assert!(world.status().is_authenticated);
    assert!(world.channel().is_connected());
    assert_eq!(world.transport().log(), vec![TransportOp::Connect { channel: 0, user: 1 }]);
    assert_eq!(world.cache().ops(), vec![CacheOp::Invalidate(CURRENT_USER_KEY.to_string())]);
    assert_eq!(world.notifications().count(), 2);
    assert_eq!(world.vault().stored_token(), Some(Token::new("token-1")));
}

#[test]
fn login_with_bad_password_changes_nothing() {
    let mut world = world_with_account(Role::Retailer);
    let before = world.session();

    let result = world.login("u1@example.com", "wrong");

    assert_eq!(result, Err(SessionError::Login(AuthError::InvalidCredentials)));
    assert_eq!(world.session(), before);
    assert!(world.transport().log().is_empty());
    assert!(world.cache().ops().is_empty());
}

#[test]
fn login_with_unreachable_server_changes_nothing() {
    let mut world = world_with_account(Role::Retailer);
    world.auth().set_reachable(false);

    let result = world.login("u1@example.com", "pw");

    assert!(matches!(result, Err(SessionError::Login(AuthError::Network { .. }))));
    assert!(!world.status().is_authenticated);
    assert!(world.transport().log().is_empty());
}

#[test]
fn logout_clears_everything_even_when_remote_fails() {
    let mut world = world_with_account(Role::Admin);
    world.login("u1@example.com", "pw").unwrap();
    world.auth().set_reachable(false);

    world.logout().unwrap();

    assert!(!world.status().is_authenticated);
    assert_eq!(world.notifications().count(), 0);
    assert_eq!(world.channel().state(), ChannelState::Closed);
    assert_eq!(world.vault().stored_token(), None);
    assert_eq!(world.cache().ops().last(), Some(&CacheOp::Clear));

    // The channel's listeners were deregistered before the disconnect.
    assert_eq!(world.deregistered(), &[0]);
    assert!(world.transport().log_alternates());
}

#[test]
fn reload_after_login_restores_session_without_verification() {
    let mut world = world_with_account(Role::ShopOwner);
    world.login("u1@example.com", "pw").unwrap();

    // Make a skipped verification observable: if the fresh stack asked the
    // server "who am I", it would fail loudly.
    world.auth().set_reachable(false);
    world.reload();
    world.boot().unwrap();

    let status = world.status();
    assert!(status.is_authenticated);
    assert_eq!(status.user, Some(user(1, Role::ShopOwner)));
    assert!(world.channel().is_connected());
    assert!(world.transport().log_alternates());
    // Fresh process, fresh counter: reseeded from the role, not carried.
    assert_eq!(world.notifications().count(), 3);
}

#[test]
fn corrupt_profile_snapshot_recovers_via_verification() {
    let mut world = world_with_account(Role::DeliveryBoy);
    world.login("u1@example.com", "pw").unwrap();

    world.profiles().set_raw(vec![0xde, 0xad, 0xbe, 0xef]);
    world.reload();
    world.boot().unwrap();

    // User subset was unreadable, but the token survived and the server
    // still recognizes it.
    assert!(world.status().is_authenticated);
    assert_eq!(world.status().user, Some(user(1, Role::DeliveryBoy)));
}

#[test]
fn identity_switch_tears_down_before_reconnecting() {
    let world = World::new();
    world.auth().register("a@example.com", "pw", user(1, Role::Retailer));
    world.auth().register("b@example.com", "pw", user(2, Role::ShopOwner));
    let mut world = world;

    world.login("a@example.com", "pw").unwrap();
    world.login("b@example.com", "pw").unwrap();

    assert_eq!(
        world.transport().log(),
        vec![
            TransportOp::Connect { channel: 0, user: 1 },
            TransportOp::Disconnect { channel: 0 },
            TransportOp::Connect { channel: 1, user: 2 },
        ]
    );
    assert!(world.transport().log_alternates());
    assert!(world.channel().is_connected());
    assert_eq!(world.notifications().count(), 3);
}

#[test]
fn role_change_with_same_id_reseeds_without_reconnect() {
    let world = World::new();
    world.auth().register("retail@example.com", "pw", user(1, Role::Retailer));
    world.auth().register("shop@example.com", "pw", user(1, Role::ShopOwner));
    let mut world = world;

    world.login("retail@example.com", "pw").unwrap();
    world.notifications_mut().increment();

    world.login("shop@example.com", "pw").unwrap();

    // Same user id: the socket is reused, only the counter reseeds.
    assert_eq!(world.transport().log(), vec![TransportOp::Connect { channel: 0, user: 1 }]);
    assert_eq!(world.notifications().count(), 3);
}

#[test]
fn transport_drop_disconnects_without_logging_out() {
    let mut world = world_with_account(Role::Retailer);
    world.login("u1@example.com", "pw").unwrap();

    world.drop_channel();

    assert!(world.status().is_authenticated);
    assert!(!world.channel().is_connected());
    assert_eq!(world.channel().state(), ChannelState::Closed);
    // No hidden retry loop: no further connect after the drop.
    assert_eq!(
        world.transport().log(),
        vec![TransportOp::Connect { channel: 0, user: 1 }, TransportOp::Dropped { channel: 0 }]
    );
    assert_eq!(world.notifications().count(), 2);
}

#[test]
fn teardown_closes_the_channel_synchronously() {
    let mut world = world_with_account(Role::Admin);
    world.login("u1@example.com", "pw").unwrap();

    world.teardown();

    assert_eq!(world.channel().state(), ChannelState::Closed);
    assert_eq!(world.deregistered(), &[0]);
    assert!(world.transport().log_alternates());
}

#[test]
fn direct_store_mutation_bypasses_the_sequencing() {
    // The setters are reachable through store_mut, but calling them outside
    // the orchestrator skips the actions that keep everything else in step.
    // This pins down what the violation looks like, so nobody mistakes it
    // for a supported path.
    let store = SessionStore::open(MemoryVault::new(), MemoryProfiles::new());
    let mut orchestrator = SessionOrchestrator::new(store);
    let sub = orchestrator.store_mut().subscribe();
    let _ = orchestrator.store_mut().poll(sub);

    orchestrator.store_mut().set_token(Some(Token::new("t")));
    orchestrator.store_mut().set_user(Some(user(1, Role::Retailer))).unwrap();

    // The session reads authenticated, yet no action was emitted: the
    // response cache was never invalidated and nothing drove the channel.
    assert!(orchestrator.status().is_authenticated);

    // Worse, observers saw a token-without-user window that the login
    // path's single committed transition never exposes.
    let first = orchestrator.store_mut().poll(sub).unwrap();
    assert!(first.token.is_some());
    assert!(!first.is_authenticated());
    let second = orchestrator.store_mut().poll(sub).unwrap();
    assert!(second.is_authenticated());
}

#[test]
fn logout_while_logged_out_is_a_clean_no_op() {
    let mut world = World::new();
    world.boot().unwrap();

    world.logout().unwrap();

    assert!(!world.status().is_authenticated);
    assert!(world.transport().log().is_empty());
    // The unconditional local clear still runs.
    assert_eq!(world.cache().ops(), vec![CacheOp::Clear]);
}
