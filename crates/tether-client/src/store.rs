//! Session store.
//!
//! Owns the `{user, token}` snapshot, writes the durable subset through the
//! injected storage contracts, and hands committed snapshots to explicitly
//! registered subscribers. The store is constructed and passed down by the
//! caller; there is no process-wide singleton.

use std::collections::VecDeque;

use tether_core::{ProfileError, ProfileStore, Session, Token, TokenVault, User};

/// Identifier for a store subscription.
pub type SubscriptionId = u64;

struct Subscriber {
    id: SubscriptionId,
    queue: VecDeque<Session>,
}

/// Holds the session snapshot and its durable subset.
///
/// # Persistence split
///
/// The `user` subset is persisted through the [`ProfileStore`] on every
/// mutation; the token is written through to the [`TokenVault`], which has
/// its own lifecycle so the credential can be erased independently of the
/// profile cache.
///
/// # Observation
///
/// Subscribers register with [`subscribe`](Self::subscribe) and drain
/// committed snapshots with [`poll`](Self::poll). Each mutation commits
/// exactly one snapshot, so an observer can never see a half-applied
/// transition (a user without its token on the login path, or one cleared
/// field on the logout path). Subscribers must unsubscribe when their scope
/// is torn down.
///
/// # Mutation discipline
///
/// The setters are public, but in a running application only the session
/// orchestrator may call them; anything else bypasses the sequencing that
/// keeps the session, the caches and the channel consistent. The harness
/// tests exercise this as a contract violation.
pub struct SessionStore<V: TokenVault, P: ProfileStore> {
    session: Session,
    vault: V,
    profiles: P,
    subscribers: Vec<Subscriber>,
    next_subscription: SubscriptionId,
}

impl<V: TokenVault, P: ProfileStore> SessionStore<V, P> {
    /// Rehydrate a store from durable storage.
    ///
    /// The token is read from the vault and the persisted user subset from
    /// the profile store. A corrupt profile snapshot is discarded (the user
    /// re-verifies from the server) rather than treated as fatal.
    pub fn open(vault: V, profiles: P) -> Self {
        let token = vault.stored_token();
        let user = match profiles.load() {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable profile snapshot");
                None
            },
        };

        Self {
            session: Session { user, token },
            vault,
            profiles,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Current snapshot.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Register an observer. The returned id drains committed snapshots via
    /// [`poll`](Self::poll) and must be released with
    /// [`unsubscribe`](Self::unsubscribe) on teardown.
    ///
    /// The current snapshot is queued immediately, so an observer that
    /// registers after rehydration still sees the state it missed.
    pub fn subscribe(&mut self) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        let queue = VecDeque::from([self.session.clone()]);
        self.subscribers.push(Subscriber { id, queue });
        id
    }

    /// Remove an observer and drop its pending snapshots.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|s| s.id != id);
    }

    /// Next committed snapshot for the given subscription, if any.
    pub fn poll(&mut self, id: SubscriptionId) -> Option<Session> {
        self.subscribers.iter_mut().find(|s| s.id == id).and_then(|s| s.queue.pop_front())
    }

    /// Overwrite the user field and persist the subset.
    ///
    /// Persistence happens before the in-memory state changes, so a failed
    /// write leaves the snapshot untouched.
    pub fn set_user(&mut self, user: Option<User>) -> Result<Session, ProfileError> {
        self.profiles.save(user.as_ref())?;
        self.session.user = user;
        Ok(self.commit())
    }

    /// Overwrite the token field.
    ///
    /// A fresh token is written through to the vault. Setting the field
    /// absent does not touch the vault; only [`clear`](Self::clear) purges
    /// stored credentials.
    pub fn set_token(&mut self, token: Option<Token>) -> Session {
        if let Some(token) = &token {
            self.vault.store_token(token);
        }
        self.session.token = token;
        self.commit()
    }

    /// Set both fields as one observable transition (the login path).
    ///
    /// Subscribers see a single committed snapshot with both fields
    /// present; there is no token-without-user window.
    pub fn set_credentials(&mut self, token: Token, user: User) -> Result<Session, ProfileError> {
        self.profiles.save(Some(&user))?;
        self.vault.store_token(&token);
        self.session.user = Some(user);
        self.session.token = Some(token);
        Ok(self.commit())
    }

    /// Purge the vault, then set both fields absent as one observable
    /// transition (the logout path).
    ///
    /// Infallible: local logout must never be blocked. A failed persist of
    /// the emptied subset is logged and tolerated; the next successful
    /// mutation overwrites it.
    pub fn clear(&mut self) -> Session {
        self.vault.clear_tokens();
        if let Err(e) = self.profiles.save(None) {
            tracing::warn!(error = %e, "failed to persist cleared profile");
        }
        self.session.user = None;
        self.session.token = None;
        self.commit()
    }

    fn commit(&mut self) -> Session {
        for subscriber in &mut self.subscribers {
            subscriber.queue.push_back(self.session.clone());
        }
        self.session.clone()
    }
}
