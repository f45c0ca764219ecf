//! Notification state.
//!
//! A derived unread counter, reseeded whenever the authenticated identity
//! or its role changes and reset to zero when the user becomes absent.
//! Nothing here is persisted; every process start begins at zero.

use tether_core::{Role, Session, UserId};
use thiserror::Error;

/// Notification state accessed outside an active provider scope.
///
/// This is a programmer-error marker, not a recoverable runtime condition:
/// the caller wired its components wrong. Surfaced as a typed error rather
/// than a panic so the violation shows up at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("notification state accessed outside its provider scope")]
pub struct MissingProvider;

/// The unread-notification counter and its reseeding rule.
///
/// The role-based seed below is a stand-in: the production source of truth
/// for unread counts is the realtime channel's events. Deriving the counter
/// independently of the channel means the two can desynchronize (a channel
/// drop leaves the counter stale), so any real feed must replace
/// `observe_session`'s seeding rather than add to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notifications {
    count: u32,
    seeded_for: Option<(UserId, Role)>,
}

impl Notifications {
    /// A counter at zero with no observed identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Overwrite the count (e.g. with a server-reported total).
    pub fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    /// Add one. No upper bound.
    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    /// Reset to zero without forgetting the observed identity.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// React to a committed session snapshot: reseed when the authenticated
    /// `(id, role)` pair changes, reset when the user becomes absent.
    pub fn observe_session(&mut self, snapshot: &Session) {
        let Some(user) = snapshot.user.as_ref().filter(|_| snapshot.is_authenticated()) else {
            self.count = 0;
            self.seeded_for = None;
            return;
        };

        let identity = (user.id, user.role);
        if self.seeded_for != Some(identity) {
            self.count = initial_count(user.role);
            self.seeded_for = Some(identity);
        }
    }
}

/// Illustrative role seed; replaced by the server-reported unread total in
/// a production feed.
fn initial_count(role: Role) -> u32 {
    match role {
        Role::Admin => 5,
        Role::ShopOwner => 3,
        Role::Retailer => 2,
        Role::DeliveryBoy => 1,
    }
}

/// Explicit provider scope for [`Notifications`].
///
/// Components receive the scope by reference from whoever constructed it;
/// there is no ambient lookup. Accessing an unprovided scope yields
/// [`MissingProvider`] instead of panicking.
#[derive(Debug, Default)]
pub struct NotificationScope {
    inner: Option<Notifications>,
}

impl NotificationScope {
    /// A scope with no provider; every access fails with
    /// [`MissingProvider`].
    pub fn unprovided() -> Self {
        Self { inner: None }
    }

    /// A scope providing the given state.
    pub fn provide(notifications: Notifications) -> Self {
        Self { inner: Some(notifications) }
    }

    /// Read access to the provided state.
    pub fn get(&self) -> Result<&Notifications, MissingProvider> {
        self.inner.as_ref().ok_or(MissingProvider)
    }

    /// Mutable access to the provided state.
    pub fn get_mut(&mut self) -> Result<&mut Notifications, MissingProvider> {
        self.inner.as_mut().ok_or(MissingProvider)
    }

    /// Drop the provider, returning the final state. Subsequent accesses
    /// fail with [`MissingProvider`].
    pub fn teardown(&mut self) -> Option<Notifications> {
        self.inner.take()
    }
}
