//! Match engine - shared, lock-protected match sessions
//!
//! Wraps the pure rule engine from `parchis-core` for use by many concurrent
//! connections:
//!
//! - [`session`]: [`MatchSession`] holds the single `Mutex<GameEngine>`, applies
//!   intents with their automatic follow-ups and tags events with an audience.
//! - [`lifecycle`]: [`MatchManager`] creates, replaces and drops sessions.
//!
//! Nothing here performs I/O; the transport writes the returned events after
//! the lock is released.

pub mod lifecycle;
pub mod session;

pub use parchis_core as core;
pub use parchis_types as types;

pub use lifecycle::MatchManager;
pub use session::{Audience, Intent, MatchSession, MatchView, Outbound, SessionConfig};
