//! The session registry: tracks every game session and its seats.
//!
//! This is the single source of truth consulted by both endpoints. It's
//! deliberately lenient where the kiosk UX needs it to be:
//!
//! - Joining an unknown session implicitly creates it — a controller may
//!   scan the QR code a beat before the game screen finishes its own
//!   setup, and rejecting that join would strand the player.
//! - Publishing state to an unknown session is a no-op, not an error.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself — plain `HashMap`s,
//! no locks. The server wraps it in a `tokio::sync::Mutex` and every
//! mutation happens as one atomic step under that lock. Keeping the
//! registry synchronous makes the lifecycle testable without a runtime.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use padlink_protocol::{GameState, PlayerNumber, SessionId};
use padlink_transport::ConnectionId;
use rand::Rng;

use crate::{SeatedPlayer, Session};

/// Everything a caller needs to know about a seat it just removed:
/// whether to archive it, and what to tell the game screen.
#[derive(Debug)]
pub struct RemovedSeat {
    /// The session the seat belonged to.
    pub session_id: SessionId,
    /// The departed seat's number.
    pub number: PlayerNumber,
    /// The seat's reconnect token, for archival.
    pub reconnect_token: String,
    /// Seats still live in the session after the removal.
    pub remaining: usize,
    /// Copy of the session's game state at removal time. `None` means
    /// the game never published — a lobby departure, nothing to resume.
    pub snapshot: Option<GameState>,
}

/// Maps session ids to live sessions and connections to their seats.
///
/// ## Lifecycle
///
/// ```text
/// create_session() ─→ join() ─→ remove_seat() ─→ garbage_collect_if_empty()
///        │              │              │
///        │              │              └─→ (archived seat) restore_seat()
///        │              └─ implicit create on unknown id
///        └─ destroy_owned_by() on game-screen disconnect
/// ```
#[derive(Default)]
pub struct SessionRegistry {
    /// All live sessions, keyed by session id.
    sessions: HashMap<SessionId, Session>,

    /// Index from a controller connection to the session it's seated
    /// in. Kept in sync with `sessions` so input relay is a single
    /// lookup instead of a scan.
    seats: HashMap<ConnectionId, SessionId>,
}

impl SessionRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh session owned by a game-screen connection.
    ///
    /// Never fails: the id is minted here (time prefix + random
    /// suffix) and the initial state is `{gameId, status: "waiting"}`.
    pub fn create_session(
        &mut self,
        owner: ConnectionId,
        game_id: serde_json::Value,
    ) -> SessionId {
        let id = generate_session_id();

        let mut state = GameState::new();
        state.insert("gameId".into(), game_id);
        state.insert("status".into(), "waiting".into());

        self.sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                owner: Some(owner),
                players: Vec::new(),
                game_state: Some(state),
            },
        );

        tracing::info!(session_id = %id, %owner, "session created");
        id
    }

    /// Seats a controller connection in a session, creating the session
    /// implicitly if it doesn't exist yet.
    ///
    /// The seat number is `requested` when given, otherwise seat count
    /// plus one. An explicitly requested number is accepted without a
    /// collision check — the original kiosk behaved this way and the
    /// game screen is the only party that hands out explicit numbers.
    pub fn join(
        &mut self,
        session_id: SessionId,
        connection: ConnectionId,
        requested: Option<PlayerNumber>,
    ) -> SeatedPlayer {
        let session = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| {
                tracing::info!(
                    session_id = %session_id,
                    "implicit session created by early join"
                );
                Session {
                    id: session_id.clone(),
                    owner: None,
                    players: Vec::new(),
                    game_state: None,
                }
            });

        let number = requested
            .unwrap_or(PlayerNumber(session.players.len() as u32 + 1));
        let seat = SeatedPlayer {
            connection,
            number,
            reconnect_token: generate_token(),
        };

        session.players.push(seat.clone());
        self.seats.insert(connection, session.id.clone());

        tracing::info!(
            session_id = %session.id,
            %connection,
            player = %number,
            players = session.players.len(),
            "player joined"
        );
        seat
    }

    /// Re-seats a reconnecting controller with its archived number and
    /// the *same* token it held before (reused, not reminted).
    ///
    /// Returns the new seat count, or `None` if the session vanished —
    /// the caller validates existence first under the same lock, so
    /// `None` here means a logic error upstream.
    pub fn restore_seat(
        &mut self,
        session_id: &SessionId,
        connection: ConnectionId,
        number: PlayerNumber,
        reconnect_token: String,
    ) -> Option<usize> {
        let session = self.sessions.get_mut(session_id)?;
        session.players.push(SeatedPlayer {
            connection,
            number,
            reconnect_token,
        });
        self.seats.insert(connection, session_id.clone());

        tracing::info!(
            session_id = %session_id,
            %connection,
            player = %number,
            "player reconnected"
        );
        Some(session.players.len())
    }

    /// Returns the session and seat number a connection occupies, if any.
    ///
    /// This is the relay fast path — called for every dpad/button frame.
    pub fn seat_of(
        &self,
        connection: ConnectionId,
    ) -> Option<(SessionId, PlayerNumber)> {
        let session_id = self.seats.get(&connection)?;
        let seat = self.sessions.get(session_id)?.seat(connection)?;
        Some((session_id.clone(), seat.number))
    }

    /// Removes the seat held by a connection.
    ///
    /// The caller decides what to do with the result: archive it (mid-
    /// game disconnect) or drop it (lobby departure). Returns `None` if
    /// the connection holds no seat — e.g. a close racing a join.
    pub fn remove_seat(
        &mut self,
        connection: ConnectionId,
    ) -> Option<RemovedSeat> {
        let session_id = self.seats.remove(&connection)?;
        let session = self.sessions.get_mut(&session_id)?;

        let idx = session
            .players
            .iter()
            .position(|p| p.connection == connection)?;
        let seat = session.players.remove(idx);

        tracing::info!(
            session_id = %session_id,
            %connection,
            player = %seat.number,
            remaining = session.players.len(),
            "player left"
        );

        Some(RemovedSeat {
            session_id,
            number: seat.number,
            reconnect_token: seat.reconnect_token,
            remaining: session.players.len(),
            snapshot: session.game_state.clone(),
        })
    }

    /// Shallow-merges `partial` into a session's game state.
    ///
    /// Returns `false` (and does nothing) if the session is unknown.
    pub fn publish_state(
        &mut self,
        session_id: &SessionId,
        partial: &GameState,
    ) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(session) => {
                session.merge_state(partial);
                true
            }
            None => false,
        }
    }

    /// Removes every session owned by a game-screen connection.
    ///
    /// This is the hard teardown path: no grace period, no archival on
    /// the owner side. Returns the ids so the caller can notify each
    /// session's controllers.
    pub fn destroy_owned_by(
        &mut self,
        owner: ConnectionId,
    ) -> Vec<SessionId> {
        let doomed: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.owner == Some(owner))
            .map(|s| s.id.clone())
            .collect();

        for id in &doomed {
            if let Some(session) = self.sessions.remove(id) {
                for seat in &session.players {
                    self.seats.remove(&seat.connection);
                }
                tracing::info!(
                    session_id = %id,
                    players = session.players.len(),
                    "session destroyed (owner disconnected)"
                );
            }
        }
        doomed
    }

    /// Deletes a session if it has zero seats and, per the caller, no
    /// pending reconnection still references it. Returns whether the
    /// session was deleted.
    ///
    /// Called after every seat removal. The pending check keeps a
    /// momentarily empty session alive so an archived player can still
    /// come back to it.
    pub fn garbage_collect_if_empty(
        &mut self,
        session_id: &SessionId,
        has_pending: bool,
    ) -> bool {
        let empty = self
            .sessions
            .get(session_id)
            .is_some_and(|s| s.players.is_empty());

        if empty && !has_pending {
            self.sessions.remove(session_id);
            tracing::info!(%session_id, "empty session garbage-collected");
            true
        } else {
            false
        }
    }

    /// Looks up a session by id.
    pub fn session(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a session id with a time-based prefix and a random suffix.
///
/// The format mirrors what the kiosk embeds in its QR-code URLs:
/// `game_{unix_millis}_{8 hex chars}`. Collisions are accepted as
/// negligible; this is not a cryptographic guarantee.
fn generate_session_id() -> SessionId {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix: u32 = rand::rng().random();
    SessionId(format!("game_{millis}_{suffix:08x}"))
}

/// Generates a reconnect token: `rc_` plus 32 hex chars (128 bits).
///
/// The token is a shared secret between the server and one specific
/// client; 128 bits makes guessing a live token infeasible.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    let hex: String =
        bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("rc_{hex}")
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`, naming convention
    //! `test_{function}_{scenario}_{expected}`.
    //!
    //! The registry has no timers and no I/O, so the full seat lifecycle
    //! is testable synchronously.

    use super::*;
    use serde_json::json;

    // -- Helpers ----------------------------------------------------------

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn delta(key: &str, value: serde_json::Value) -> GameState {
        GameState::from_iter([(key.to_string(), value)])
    }

    // =====================================================================
    // create_session()
    // =====================================================================

    #[test]
    fn test_create_session_stores_waiting_state_and_owner() {
        let mut reg = SessionRegistry::new();

        let id = reg.create_session(conn(1), json!("snake"));

        let session = reg.session(&id).expect("session should exist");
        assert_eq!(session.owner, Some(conn(1)));
        assert!(session.players.is_empty());
        let state = session.game_state.as_ref().unwrap();
        assert_eq!(state["gameId"], json!("snake"));
        assert_eq!(state["status"], json!("waiting"));
    }

    #[test]
    fn test_create_session_ids_are_unique_and_url_shaped() {
        let mut reg = SessionRegistry::new();

        let a = reg.create_session(conn(1), json!("snake"));
        let b = reg.create_session(conn(1), json!("snake"));

        assert_ne!(a, b);
        assert!(a.as_str().starts_with("game_"));
        assert!(
            !a.as_str().contains(['/', '?', '#', ' ']),
            "id must be usable as a URL path segment"
        );
    }

    #[test]
    fn test_create_session_same_owner_may_own_several() {
        let mut reg = SessionRegistry::new();

        reg.create_session(conn(1), json!("snake"));
        reg.create_session(conn(1), json!("pong"));

        assert_eq!(reg.len(), 2);
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_assigns_sequential_numbers() {
        // Each auto-assigned number equals prior seat count + 1.
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));

        let s1 = reg.join(id.clone(), conn(10), None);
        let s2 = reg.join(id.clone(), conn(11), None);
        let s3 = reg.join(id.clone(), conn(12), None);

        assert_eq!(s1.number, PlayerNumber(1));
        assert_eq!(s2.number, PlayerNumber(2));
        assert_eq!(s3.number, PlayerNumber(3));
    }

    #[test]
    fn test_join_unknown_session_implicitly_creates_it() {
        // Lenient join: the controller can arrive before the screen.
        let mut reg = SessionRegistry::new();

        let seat =
            reg.join(SessionId::from("game_early"), conn(10), None);

        assert_eq!(seat.number, PlayerNumber(1));
        let session = reg.session(&SessionId::from("game_early")).unwrap();
        assert_eq!(session.owner, None, "nobody owns an implicit session");
        assert!(session.game_state.is_none(), "no state until published");
    }

    #[test]
    fn test_join_honors_requested_number() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));

        let seat = reg.join(id, conn(10), Some(PlayerNumber(4)));

        assert_eq!(seat.number, PlayerNumber(4));
    }

    #[test]
    fn test_join_accepts_duplicate_requested_number_unvalidated() {
        // Explicit numbers are not collision-checked — preserved
        // behavior from the original kiosk, deliberate non-fix.
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));
        reg.join(id.clone(), conn(10), Some(PlayerNumber(1)));

        let seat = reg.join(id.clone(), conn(11), Some(PlayerNumber(1)));

        assert_eq!(seat.number, PlayerNumber(1));
        assert_eq!(reg.session(&id).unwrap().players.len(), 2);
    }

    #[test]
    fn test_join_mints_unique_prefixed_tokens() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));

        let s1 = reg.join(id.clone(), conn(10), None);
        let s2 = reg.join(id.clone(), conn(11), None);

        assert!(s1.reconnect_token.starts_with("rc_"));
        assert_eq!(s1.reconnect_token.len(), 3 + 32);
        assert_ne!(s1.reconnect_token, s2.reconnect_token);
    }

    // =====================================================================
    // seat_of()
    // =====================================================================

    #[test]
    fn test_seat_of_returns_session_and_number() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));
        reg.join(id.clone(), conn(10), None);

        assert_eq!(
            reg.seat_of(conn(10)),
            Some((id, PlayerNumber(1)))
        );
    }

    #[test]
    fn test_seat_of_unknown_connection_returns_none() {
        let reg = SessionRegistry::new();
        assert!(reg.seat_of(conn(99)).is_none());
    }

    // =====================================================================
    // remove_seat()
    // =====================================================================

    #[test]
    fn test_remove_seat_returns_null_snapshot_before_publish() {
        // A lobby departure carries no resumable state.
        let mut reg = SessionRegistry::new();
        reg.join(SessionId::from("game_x"), conn(10), None);

        let removed = reg.remove_seat(conn(10)).expect("seat existed");

        assert!(removed.snapshot.is_none());
        assert_eq!(removed.remaining, 0);
    }

    #[test]
    fn test_remove_seat_snapshots_published_state() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));
        reg.join(id.clone(), conn(10), None);
        reg.publish_state(&id, &delta("status", json!("playing")));

        let removed = reg.remove_seat(conn(10)).unwrap();

        let snapshot = removed.snapshot.expect("state was published");
        assert_eq!(snapshot["status"], json!("playing"));
        assert_eq!(snapshot["gameId"], json!("snake"));
    }

    #[test]
    fn test_remove_seat_unknown_connection_returns_none() {
        let mut reg = SessionRegistry::new();
        assert!(reg.remove_seat(conn(99)).is_none());
    }

    #[test]
    fn test_remove_seat_does_not_renumber_survivors() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));
        reg.join(id.clone(), conn(10), None);
        reg.join(id.clone(), conn(11), None);

        reg.remove_seat(conn(10)).unwrap();

        // Seat 2 keeps its number; numbers may go non-contiguous.
        assert_eq!(
            reg.seat_of(conn(11)),
            Some((id, PlayerNumber(2)))
        );
    }

    #[test]
    fn test_remove_seat_clears_relay_index() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));
        reg.join(id, conn(10), None);
        reg.remove_seat(conn(10)).unwrap();

        assert!(reg.seat_of(conn(10)).is_none());
    }

    // =====================================================================
    // restore_seat()
    // =====================================================================

    #[test]
    fn test_restore_seat_reuses_number_and_token() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));
        let seat = reg.join(id.clone(), conn(10), None);
        let removed = reg.remove_seat(conn(10)).unwrap();

        let total = reg
            .restore_seat(
                &id,
                conn(20),
                removed.number,
                removed.reconnect_token.clone(),
            )
            .expect("session still exists");

        assert_eq!(total, 1);
        let restored = reg.session(&id).unwrap().seat(conn(20)).unwrap();
        assert_eq!(restored.number, seat.number);
        assert_eq!(restored.reconnect_token, seat.reconnect_token);
    }

    #[test]
    fn test_restore_seat_vanished_session_returns_none() {
        let mut reg = SessionRegistry::new();
        assert!(reg
            .restore_seat(
                &SessionId::from("game_gone"),
                conn(20),
                PlayerNumber(1),
                "rc_x".into(),
            )
            .is_none());
    }

    // =====================================================================
    // publish_state()
    // =====================================================================

    #[test]
    fn test_publish_state_merges_shallow() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));

        assert!(reg.publish_state(&id, &delta("status", json!("playing"))));
        assert!(reg.publish_state(&id, &delta("round", json!(2))));

        let state =
            reg.session(&id).unwrap().game_state.as_ref().unwrap();
        assert_eq!(state["status"], json!("playing"));
        assert_eq!(state["round"], json!(2));
        assert_eq!(state["gameId"], json!("snake"));
    }

    #[test]
    fn test_publish_state_unknown_session_is_noop() {
        let mut reg = SessionRegistry::new();
        assert!(!reg.publish_state(
            &SessionId::from("game_gone"),
            &delta("status", json!("playing")),
        ));
    }

    // =====================================================================
    // destroy_owned_by()
    // =====================================================================

    #[test]
    fn test_destroy_owned_by_removes_all_owned_sessions() {
        let mut reg = SessionRegistry::new();
        let a = reg.create_session(conn(1), json!("snake"));
        let b = reg.create_session(conn(1), json!("pong"));
        let other = reg.create_session(conn(2), json!("tetris"));

        let mut destroyed = reg.destroy_owned_by(conn(1));
        destroyed.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        let mut expected = vec![a, b];
        expected.sort_by(|x, y| x.as_str().cmp(y.as_str()));

        assert_eq!(destroyed, expected);
        assert_eq!(reg.len(), 1);
        assert!(reg.session(&other).is_some());
    }

    #[test]
    fn test_destroy_owned_by_unseats_controllers() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));
        reg.join(id, conn(10), None);

        reg.destroy_owned_by(conn(1));

        assert!(
            reg.seat_of(conn(10)).is_none(),
            "seat index must not outlive the session"
        );
    }

    #[test]
    fn test_destroy_owned_by_ignores_implicit_sessions() {
        // Implicit sessions have no owner; a screen disconnect must not
        // sweep them up.
        let mut reg = SessionRegistry::new();
        reg.join(SessionId::from("game_early"), conn(10), None);

        let destroyed = reg.destroy_owned_by(conn(1));

        assert!(destroyed.is_empty());
        assert_eq!(reg.len(), 1);
    }

    // =====================================================================
    // garbage_collect_if_empty()
    // =====================================================================

    #[test]
    fn test_gc_deletes_empty_session_without_pending() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));
        reg.join(id.clone(), conn(10), None);
        reg.remove_seat(conn(10)).unwrap();

        assert!(reg.garbage_collect_if_empty(&id, false));
        assert!(reg.session(&id).is_none());
    }

    #[test]
    fn test_gc_keeps_session_with_pending_reconnection() {
        // An archived seat must keep its session alive for the grace
        // period.
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));
        reg.join(id.clone(), conn(10), None);
        reg.remove_seat(conn(10)).unwrap();

        assert!(!reg.garbage_collect_if_empty(&id, true));
        assert!(reg.session(&id).is_some());
    }

    #[test]
    fn test_gc_keeps_session_with_seated_players() {
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));
        reg.join(id.clone(), conn(10), None);
        reg.join(id.clone(), conn(11), None);
        reg.remove_seat(conn(11)).unwrap();

        assert!(!reg.garbage_collect_if_empty(&id, false));
        assert!(reg.session(&id).is_some());
    }

    #[test]
    fn test_gc_unknown_session_returns_false() {
        let mut reg = SessionRegistry::new();
        assert!(!reg
            .garbage_collect_if_empty(&SessionId::from("game_gone"), false));
    }

    // =====================================================================
    // Full lifecycle
    // =====================================================================

    #[test]
    fn test_full_lifecycle_join_drop_restore() {
        // The registry half of a mid-game reconnect: join, publish,
        // drop, restore with the archived identity.
        let mut reg = SessionRegistry::new();
        let id = reg.create_session(conn(1), json!("snake"));

        let seat = reg.join(id.clone(), conn(10), None);
        reg.publish_state(&id, &delta("status", json!("playing")));

        let removed = reg.remove_seat(conn(10)).unwrap();
        assert_eq!(removed.snapshot.as_ref().unwrap()["status"], "playing");

        // Grace period: session survives because a pending entry exists.
        assert!(!reg.garbage_collect_if_empty(&id, true));

        let total = reg
            .restore_seat(&id, conn(20), removed.number, removed.reconnect_token)
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(
            reg.seat_of(conn(20)),
            Some((id, seat.number))
        );
    }
}
