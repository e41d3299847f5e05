//! Reconnection manager for the Padlink controller relay.
//!
//! A phone that drops mid-game keeps its seat reservable for a grace
//! period: the seat is archived here under its one-time reconnect
//! token, together with a snapshot of the game state at disconnect
//! time. Within the grace period, presenting the token resumes the
//! seat; afterwards the entry is gone.
//!
//! Expiry is two-tier, deliberately avoiding per-entry timers:
//!
//! 1. **Lazy** — [`ReconnectArchive::peek`] checks the entry's age at
//!    reconnect-attempt time.
//! 2. **Periodic** — a single [`spawn_sweeper`] task evicts stale
//!    entries on a fixed interval, bounding how long dead entries hold
//!    memory (and keep empty sessions alive).

mod archive;
mod error;
mod sweeper;

pub use archive::{PendingReconnection, ReconnectArchive, ReconnectConfig};
pub use error::ReconnectError;
pub use sweeper::spawn_sweeper;
