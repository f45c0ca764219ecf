//! Session, channel and notification state machines.
//!
//! Action-based lifecycle layer keeping a user's authentication state, a
//! single realtime connection, and a derived notification counter
//! consistent with each other across login, logout, reload and transport
//! failure.
//!
//! # Architecture
//!
//! Every component is a pure state machine that:
//! - Receives events from the caller (user intents, call completions,
//!   transport reports, committed session snapshots)
//! - Produces actions for the caller to execute (issue auth calls, open or
//!   close the realtime connection, invalidate caches)
//! - Performs no I/O of its own; the collaborator contracts live in
//!   `tether-core` and are implemented by the embedding application
//!
//! # Components
//!
//! - [`SessionStore`]: owns the `{user, token}` snapshot, its durable
//!   subset, and explicit observer subscriptions
//! - [`SessionOrchestrator`]: sequences startup verification, login and
//!   logout so observers never see a partially updated session
//! - [`ChannelManager`]: owns the single realtime connection, opened and
//!   closed in lockstep with authentication transitions
//! - [`Notifications`]: the derived unread counter, reseeded on identity
//!   or role changes

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod channel;
mod error;
mod event;
mod notify;
mod orchestrator;
mod store;

pub use channel::{ChannelManager, ChannelState};
pub use error::SessionError;
pub use event::{ChannelAction, ChannelEvent, RequestId, SessionAction, SessionEvent};
pub use notify::{MissingProvider, NotificationScope, Notifications};
pub use orchestrator::{SessionOrchestrator, SessionStatus};
pub use store::{SessionStore, SubscriptionId};
pub use tether_core::{ChannelId, Session};
