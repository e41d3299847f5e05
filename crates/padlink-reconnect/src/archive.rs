//! The token-keyed archive of recently disconnected seats.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use padlink_protocol::{GameState, PlayerNumber, SessionId};

use crate::ReconnectError;

/// Grace-period configuration.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// How long a dropped seat stays resumable.
    pub grace: Duration,

    /// How often the background sweeper scans for stale entries. The
    /// sweep is the upper bound on eviction slack: an entry can outlive
    /// the grace period by at most one interval before it's removed
    /// (lazy checks still refuse it in the meantime).
    pub sweep_interval: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

/// An archived seat awaiting resumption.
#[derive(Debug, Clone)]
pub struct PendingReconnection {
    /// The session the seat belonged to.
    pub session_id: SessionId,
    /// The seat number to restore.
    pub player_number: PlayerNumber,
    /// Copy of the session's game state at disconnect time, handed back
    /// in the `reconnected` reply so the client can restore UI context.
    pub snapshot: GameState,
    /// When the seat's connection dropped. Entries older than the grace
    /// period are dead even if the sweeper hasn't removed them yet.
    pub disconnected_at: Instant,
}

impl PendingReconnection {
    fn expired(&self, grace: Duration) -> bool {
        self.disconnected_at.elapsed() > grace
    }
}

/// Time-boxed key-value archive, keyed by reconnect token.
///
/// Isolated from session and player logic: it knows nothing about live
/// connections, only tokens, timestamps, and snapshots. Not thread-safe
/// by itself — the server serializes access through a mutex, same as
/// the session registry.
pub struct ReconnectArchive {
    entries: HashMap<String, PendingReconnection>,
    config: ReconnectConfig,
}

impl ReconnectArchive {
    /// Creates an empty archive with the given config.
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
        }
    }

    /// Returns the archive's configuration.
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// Archives a dropped seat under its token, stamped with `now`.
    ///
    /// Tokens are minted fresh per join, so a duplicate should not
    /// happen; if it does, the old entry is silently overwritten rather
    /// than treated as an error.
    pub fn archive(
        &mut self,
        token: String,
        session_id: SessionId,
        player_number: PlayerNumber,
        snapshot: GameState,
    ) {
        tracing::info!(
            %session_id,
            player = %player_number,
            "seat archived for reconnection"
        );
        self.entries.insert(
            token,
            PendingReconnection {
                session_id,
                player_number,
                snapshot,
                disconnected_at: Instant::now(),
            },
        );
    }

    /// Looks up a token without consuming it, applying the lazy expiry
    /// check: an entry past the grace period is removed on the spot and
    /// reported as [`ReconnectError::TokenInvalid`].
    ///
    /// The caller validates session match and existence against the
    /// result, then calls [`consume`](Self::consume) only on success —
    /// a refused attempt leaves the entry in place for a retry or the
    /// sweeper.
    pub fn peek(
        &mut self,
        token: &str,
    ) -> Result<&PendingReconnection, ReconnectError> {
        let expired = self
            .entries
            .get(token)
            .is_some_and(|e| e.expired(self.config.grace));
        if expired {
            self.entries.remove(token);
            return Err(ReconnectError::TokenInvalid);
        }
        self.entries
            .get(token)
            .ok_or(ReconnectError::TokenInvalid)
    }

    /// Atomically fetches and removes an entry. Returns `None` if the
    /// token is absent (never archived, already consumed, or swept).
    pub fn consume(
        &mut self,
        token: &str,
    ) -> Option<PendingReconnection> {
        self.entries.remove(token)
    }

    /// Returns `true` if any live entry references the session — used
    /// by the registry's garbage-collection check to keep a momentarily
    /// empty session alive through the grace period.
    pub fn has_entries_for(&self, session_id: &SessionId) -> bool {
        self.entries
            .values()
            .any(|e| &e.session_id == session_id)
    }

    /// Evicts every entry older than the grace period, logging each
    /// eviction. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let grace = self.config.grace;
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            let keep = !entry.expired(grace);
            if !keep {
                tracing::info!(
                    session_id = %entry.session_id,
                    player = %entry.player_number,
                    "pending reconnection expired (grace period elapsed)"
                );
            }
            keep
        });
        before - self.entries.len()
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
