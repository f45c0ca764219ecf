//! Deterministic test harness for the Tether session layer.
//!
//! Provides in-memory fakes for every collaborator contract, a [`World`]
//! driver that wires the state machines to those fakes and executes their
//! actions, and a reference [`SessionModel`] used as the oracle for
//! model-based property tests.
//!
//! # Architecture
//!
//! ```text
//! Operation sequence (proptest / arbitrary)
//!          │
//!    ┌─────┴─────┐
//!    ▼           ▼
//!  World     SessionModel
//!  (real)    (oracle)
//!    └─────┬─────┘
//!          ▼
//!   compare observable state
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod fakes;
mod model;

pub use driver::World;
pub use fakes::{
    CacheOp, FakeAuthServer, MemoryProfiles, MemoryVault, RecordingCache, RecordingTransport,
    TransportOp,
};
pub use model::{Operation, SessionModel};
