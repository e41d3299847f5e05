//! The controller endpoint: per-connection handler for phones.
//!
//! Each accepted `/controller` connection gets its own Tokio task
//! running this handler. The flow is:
//!   1. Loop: receive frames → decode [`ControllerMessage`] → dispatch
//!   2. On close (clean or not): remove the seat, archive it if the
//!      game had published state, notify the screen, GC the session.
//!
//! A frame that fails to decode is logged and skipped — phones on store
//! wifi misbehave, and robustness beats strictness here.

use std::sync::Arc;

use padlink_protocol::{
    Codec, ControllerEvent, ControllerMessage, PlayerNumber, ScreenEvent,
    SessionId,
};
use padlink_reconnect::{
    PendingReconnection, ReconnectArchive, ReconnectError,
};
use padlink_session::{RemovedSeat, SessionRegistry};
use padlink_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::server::{deliver, ServerState};
use crate::PadlinkError;

/// Handles a single controller connection from accept to close.
///
/// Cleanup runs regardless of how the message loop ended, so a recv
/// error disconnects the seat the same way a clean close does.
pub(crate) async fn handle_controller<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), PadlinkError> {
    let conn_id = conn.id();
    tracing::info!(%conn_id, "controller connected");

    let result = message_loop(&conn, &state).await;
    disconnect(conn_id, &state).await;

    tracing::info!(%conn_id, "controller disconnected");
    result
}

async fn message_loop<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
) -> Result<(), PadlinkError> {
    let conn_id = conn.id();

    loop {
        let text = match conn.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Ok(());
            }
        };

        let msg: ControllerMessage = match state.codec.decode(&text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(
                    %conn_id, error = %e, "ignoring undecodable frame"
                );
                continue;
            }
        };

        match msg {
            ControllerMessage::JoinSession {
                session_id,
                player_number,
            } => {
                handle_join(conn, state, session_id, player_number)
                    .await?;
            }

            ControllerMessage::ReconnectSession {
                reconnect_token,
                session_id,
            } => {
                handle_reconnect(conn, state, reconnect_token, session_id)
                    .await?;
            }

            ControllerMessage::Dpad { direction, pressed } => {
                relay(conn_id, state, |player_number| {
                    ScreenEvent::ControllerDpad {
                        player_number,
                        direction,
                        pressed,
                    }
                })
                .await?;
            }

            ControllerMessage::Button { button, pressed } => {
                relay(conn_id, state, |player_number| {
                    ScreenEvent::ControllerButton {
                        player_number,
                        button,
                        pressed,
                    }
                })
                .await?;
            }

            ControllerMessage::Input { data } => {
                relay(conn_id, state, |player_number| {
                    ScreenEvent::ControllerInput {
                        player_number,
                        data,
                    }
                })
                .await?;
            }
        }
    }
}

/// Seats the controller and acknowledges with a fresh reconnect token.
///
/// A second `join-session` from an already-seated connection is ignored
/// rather than double-seated.
async fn handle_join<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    session_id: SessionId,
    requested: Option<PlayerNumber>,
) -> Result<(), PadlinkError> {
    let conn_id = conn.id();

    let (seat, total) = {
        let mut registry = state.registry.lock().await;
        if let Some((seated_in, _)) = registry.seat_of(conn_id) {
            tracing::debug!(
                %conn_id,
                session_id = %seated_in,
                "already seated; ignoring join"
            );
            return Ok(());
        }
        let seat = registry.join(session_id.clone(), conn_id, requested);
        let total = registry
            .session(&session_id)
            .map(|s| s.players.len())
            .unwrap_or(1);
        (seat, total)
    };

    let screen = {
        let mut hub = state.hub.lock().await;
        hub.register_controller(session_id.clone(), conn.clone());
        hub.screen_of(&session_id)
    };

    let joined = ControllerEvent::Joined {
        session_id,
        player_number: seat.number,
        total_players: total,
        reconnect_token: seat.reconnect_token,
    };
    conn.send(&state.codec.encode(&joined)?).await?;

    if let Some(screen) = screen {
        deliver(
            &screen,
            &state.codec,
            &ScreenEvent::PlayerJoined {
                player_number: seat.number,
                total_players: total,
            },
        )
        .await;
    }
    Ok(())
}

/// Resumes an archived seat, or tells the client why it can't.
///
/// A refused attempt leaves the archive entry where it was (unless it
/// had expired) so the client can retry until the sweeper gets it.
async fn handle_reconnect<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    reconnect_token: String,
    session_id: SessionId,
) -> Result<(), PadlinkError> {
    let conn_id = conn.id();

    // Validation and restoration happen as one atomic step under both
    // locks, so a racing screen disconnect can't half-resume the seat.
    let outcome = {
        let mut registry = state.registry.lock().await;
        let mut archive = state.archive.lock().await;
        resume_seat(
            &mut registry,
            &mut archive,
            conn_id,
            &reconnect_token,
            &session_id,
        )
    };

    let (entry, total) = match outcome {
        Ok(resumed) => resumed,
        Err(e) => {
            tracing::info!(%conn_id, %session_id, reason = %e, "reconnect refused");
            let reply = ControllerEvent::ReconnectFailed {
                reason: e.to_string(),
            };
            conn.send(&state.codec.encode(&reply)?).await?;
            return Ok(());
        }
    };

    let screen = {
        let mut hub = state.hub.lock().await;
        hub.register_controller(session_id.clone(), conn.clone());
        hub.screen_of(&session_id)
    };

    let reply = ControllerEvent::Reconnected {
        session_id,
        player_number: entry.player_number,
        total_players: total,
        game_state: entry.snapshot,
    };
    conn.send(&state.codec.encode(&reply)?).await?;

    if let Some(screen) = screen {
        deliver(
            &screen,
            &state.codec,
            &ScreenEvent::PlayerReconnected {
                player_number: entry.player_number,
                total_players: total,
            },
        )
        .await;
    }
    Ok(())
}

/// Validates a reconnect attempt and, on success, consumes the archive
/// entry and restores the seat. Pure bookkeeping — no I/O — so the
/// refusal taxonomy is testable without sockets.
///
/// Checks run in order: token first (lazy expiry applies), then the
/// session the token was archived for, then whether that session is
/// still alive. Only a fully validated attempt consumes the entry.
fn resume_seat(
    registry: &mut SessionRegistry,
    archive: &mut ReconnectArchive,
    connection: ConnectionId,
    token: &str,
    session_id: &SessionId,
) -> Result<(PendingReconnection, usize), ReconnectError> {
    let entry = archive.peek(token)?;
    if &entry.session_id != session_id {
        return Err(ReconnectError::SessionMismatch);
    }
    if registry.session(session_id).is_none() {
        return Err(ReconnectError::SessionGone);
    }

    let entry =
        archive.consume(token).ok_or(ReconnectError::TokenInvalid)?;
    let total = registry
        .restore_seat(
            session_id,
            connection,
            entry.player_number,
            token.to_string(),
        )
        .ok_or(ReconnectError::SessionGone)?;

    Ok((entry, total))
}

/// Relays one input event to the sender's game screen, stamping it with
/// the sender's seat number.
///
/// Input from an unseated connection is dropped; so is input for a
/// session whose screen isn't connected. Neither is an error for the
/// phone — it just keeps mashing buttons.
async fn relay<C: Codec>(
    conn_id: ConnectionId,
    state: &Arc<ServerState<C>>,
    event: impl FnOnce(PlayerNumber) -> ScreenEvent,
) -> Result<(), PadlinkError> {
    let Some((session_id, number)) =
        state.registry.lock().await.seat_of(conn_id)
    else {
        tracing::debug!(%conn_id, "input from unseated controller dropped");
        return Ok(());
    };

    let Some(screen) = state.hub.lock().await.screen_of(&session_id)
    else {
        return Ok(());
    };

    deliver(&screen, &state.codec, &event(number)).await;
    Ok(())
}

/// Seat teardown, run when the handler exits for any reason.
///
/// Archives the seat only if the session had published game state — a
/// lobby departure has nothing to resume, so the screen is told
/// `can_reconnect: false` and the seat is simply gone.
async fn disconnect<C: Codec>(
    conn_id: ConnectionId,
    state: &Arc<ServerState<C>>,
) {
    let (session_id, number, remaining, can_reconnect) = {
        let mut registry = state.registry.lock().await;
        let Some(removed) = registry.remove_seat(conn_id) else {
            // Never joined, or its session was already destroyed.
            return;
        };
        let RemovedSeat {
            session_id,
            number,
            reconnect_token,
            remaining,
            snapshot,
        } = removed;

        let mut archive = state.archive.lock().await;
        let can_reconnect = snapshot.is_some();
        if let Some(snapshot) = snapshot {
            archive.archive(
                reconnect_token,
                session_id.clone(),
                number,
                snapshot,
            );
        }
        registry.garbage_collect_if_empty(
            &session_id,
            archive.has_entries_for(&session_id),
        );

        (session_id, number, remaining, can_reconnect)
    };

    let screen = {
        let mut hub = state.hub.lock().await;
        hub.remove_controller(&session_id, conn_id);
        hub.screen_of(&session_id)
    };

    if let Some(screen) = screen {
        deliver(
            &screen,
            &state.codec,
            &ScreenEvent::PlayerDisconnected {
                player_number: number,
                total_players: remaining,
                can_reconnect,
            },
        )
        .await;
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! `resume_seat` holds the whole refusal taxonomy, and it's pure
    //! bookkeeping — so the orderings and edge cases live here, while
    //! the socket-level flows live in the crate's integration tests.

    use super::*;
    use padlink_protocol::GameState;
    use padlink_reconnect::ReconnectConfig;
    use serde_json::json;
    use std::time::Duration;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn archive_with_grace(secs: u64) -> ReconnectArchive {
        ReconnectArchive::new(ReconnectConfig {
            grace: Duration::from_secs(secs),
            sweep_interval: Duration::from_secs(3600),
        })
    }

    /// Seats a player, publishes state, drops the seat, archives it.
    /// Returns (session id, token).
    fn seed_archived_seat(
        registry: &mut SessionRegistry,
        archive: &mut ReconnectArchive,
    ) -> (SessionId, String) {
        let id = registry.create_session(conn(1), json!("snake"));
        registry.join(id.clone(), conn(10), None);
        registry.publish_state(
            &id,
            &GameState::from_iter([(
                "status".to_string(),
                json!("playing"),
            )]),
        );
        let removed = registry.remove_seat(conn(10)).unwrap();
        let snapshot = removed.snapshot.unwrap();
        archive.archive(
            removed.reconnect_token.clone(),
            id.clone(),
            removed.number,
            snapshot,
        );
        (id, removed.reconnect_token)
    }

    #[test]
    fn test_resume_seat_restores_number_and_snapshot() {
        let mut registry = SessionRegistry::new();
        let mut archive = archive_with_grace(3600);
        let (id, token) = seed_archived_seat(&mut registry, &mut archive);

        let (entry, total) =
            resume_seat(&mut registry, &mut archive, conn(20), &token, &id)
                .expect("resume within grace should succeed");

        assert_eq!(entry.player_number, PlayerNumber(1));
        assert_eq!(entry.snapshot["status"], json!("playing"));
        assert_eq!(total, 1);
        assert_eq!(
            registry.seat_of(conn(20)),
            Some((id, PlayerNumber(1)))
        );
        assert!(archive.is_empty(), "entry consumed on success");
    }

    #[test]
    fn test_resume_seat_unknown_token_is_invalid() {
        let mut registry = SessionRegistry::new();
        let mut archive = archive_with_grace(3600);
        let (id, _) = seed_archived_seat(&mut registry, &mut archive);

        let err =
            resume_seat(&mut registry, &mut archive, conn(20), "rc_bogus", &id)
                .unwrap_err();

        assert_eq!(err, ReconnectError::TokenInvalid);
        assert_eq!(archive.len(), 1, "real entry untouched");
    }

    #[test]
    fn test_resume_seat_expired_token_is_invalid() {
        let mut registry = SessionRegistry::new();
        let mut archive = archive_with_grace(0);
        let (id, token) = seed_archived_seat(&mut registry, &mut archive);

        let err =
            resume_seat(&mut registry, &mut archive, conn(20), &token, &id)
                .unwrap_err();

        assert_eq!(err, ReconnectError::TokenInvalid);
        assert!(archive.is_empty(), "expired entry removed lazily");
    }

    #[test]
    fn test_resume_seat_wrong_session_is_mismatch() {
        let mut registry = SessionRegistry::new();
        let mut archive = archive_with_grace(3600);
        let (_, token) = seed_archived_seat(&mut registry, &mut archive);
        let other = registry.create_session(conn(2), json!("pong"));

        let err =
            resume_seat(&mut registry, &mut archive, conn(20), &token, &other)
                .unwrap_err();

        assert_eq!(err, ReconnectError::SessionMismatch);
        assert_eq!(archive.len(), 1, "refusal leaves the entry in place");
    }

    #[test]
    fn test_resume_seat_destroyed_session_is_gone() {
        let mut registry = SessionRegistry::new();
        let mut archive = archive_with_grace(3600);
        let (id, token) = seed_archived_seat(&mut registry, &mut archive);
        registry.destroy_owned_by(conn(1));

        let err =
            resume_seat(&mut registry, &mut archive, conn(20), &token, &id)
                .unwrap_err();

        assert_eq!(err, ReconnectError::SessionGone);
        assert_eq!(
            archive.len(),
            1,
            "entry lingers until the sweeper takes it"
        );
    }

    #[test]
    fn test_resume_seat_consumed_token_cannot_resume_twice() {
        let mut registry = SessionRegistry::new();
        let mut archive = archive_with_grace(3600);
        let (id, token) = seed_archived_seat(&mut registry, &mut archive);

        resume_seat(&mut registry, &mut archive, conn(20), &token, &id)
            .unwrap();
        let err =
            resume_seat(&mut registry, &mut archive, conn(21), &token, &id)
                .unwrap_err();

        assert_eq!(err, ReconnectError::TokenInvalid);
    }
}
