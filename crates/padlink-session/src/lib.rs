//! Session registry for the Padlink controller relay.
//!
//! The registry is the single source of truth for which game sessions
//! exist and who is seated in them:
//!
//! 1. **Sessions** — one per kiosk game instance, created by the game
//!    screen (or implicitly by an early controller join).
//! 2. **Seats** — one per live controller connection, with a stable
//!    1-based player number and a reconnect token.
//! 3. **Game state** — the last-broadcast blob, shallow-merged on every
//!    publish and snapshotted when a seat is archived.
//!
//! # How it fits in the stack
//!
//! ```text
//! Endpoints (above)  ← controller/game-screen handlers mutate the registry
//!     ↕
//! Registry (this crate)  ← owns the session table, no I/O, no timers
//!     ↕
//! Protocol (below)  ← provides SessionId, PlayerNumber, GameState
//! ```
//!
//! The reconnection archive lives in its own crate (`padlink-reconnect`);
//! the registry only learns about it through the `has_pending` argument
//! of [`SessionRegistry::garbage_collect_if_empty`].

mod registry;
mod session;

pub use registry::{RemovedSeat, SessionRegistry};
pub use session::{SeatedPlayer, Session};
