//! The game-screen endpoint: per-connection handler for kiosk screens.
//!
//! A screen drives the session lifecycle: it creates sessions, starts
//! and ends games, and publishes state deltas that fan out to every
//! seated controller. When the screen's connection drops, every session
//! it owns is destroyed on the spot — the kiosk UX treats a dead screen
//! as game over, with no grace period on the screen side.

use std::sync::Arc;

use padlink_protocol::{
    Codec, ControllerEvent, GameState, ScreenEvent, ScreenMessage,
    SessionId,
};
use padlink_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::server::{deliver, ServerState};
use crate::PadlinkError;

/// Handles a single game-screen connection from accept to close.
pub(crate) async fn handle_screen<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), PadlinkError> {
    let conn_id = conn.id();
    tracing::info!(%conn_id, "game screen connected");

    let result = message_loop(&conn, &state).await;
    teardown(conn_id, &state).await;

    tracing::info!(%conn_id, "game screen disconnected");
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

        let msg: ScreenMessage = match state.codec.decode(&text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(
                    %conn_id, error = %e, "ignoring undecodable frame"
                );
                continue;
            }
        };

        match msg {
            ScreenMessage::CreateSession { game_id } => {
                let session_id = state
                    .registry
                    .lock()
                    .await
                    .create_session(conn_id, game_id);

                state
                    .hub
                    .lock()
                    .await
                    .register_screen(session_id.clone(), conn.clone());

                let ack = ScreenEvent::SessionCreated { session_id };
                conn.send(&state.codec.encode(&ack)?).await?;
            }

            ScreenMessage::StartGame { session_id } => {
                // Flip the status and read back the game id in one
                // registry pass; an unknown session is a silent no-op.
                let game_id = {
                    let mut registry = state.registry.lock().await;
                    let Some(session) = registry.session(&session_id)
                    else {
                        tracing::debug!(
                            %session_id,
                            "start-game for unknown session ignored"
                        );
                        continue;
                    };
                    let game_id = session
                        .game_state
                        .as_ref()
                        .and_then(|s| s.get("gameId"))
                        .cloned()
                        .unwrap_or(serde_json::Value::Null);
                    registry.publish_state(
                        &session_id,
                        &status_delta("playing"),
                    );
                    game_id
                };

                tracing::info!(%session_id, "game started");
                broadcast(
                    state,
                    &session_id,
                    &ControllerEvent::GameStarted { game_id },
                )
                .await;
            }

            ScreenMessage::EndGame {
                session_id,
                results,
            } => {
                let known = state
                    .registry
                    .lock()
                    .await
                    .publish_state(&session_id, &status_delta("ended"));
                if !known {
                    tracing::debug!(
                        %session_id,
                        "end-game for unknown session ignored"
                    );
                    continue;
                }

                tracing::info!(%session_id, "game ended");
                broadcast(
                    state,
                    &session_id,
                    &ControllerEvent::GameEnded { results },
                )
                .await;
            }

            ScreenMessage::GameState { session_id, state: delta } => {
                let known = state
                    .registry
                    .lock()
                    .await
                    .publish_state(&session_id, &delta);
                if !known {
                    tracing::debug!(
                        %session_id,
                        "game-state for unknown session ignored"
                    );
                    continue;
                }

                // Controllers get the delta as sent, not the merged
                // whole — they track their own view.
                broadcast(
                    state,
                    &session_id,
                    &ControllerEvent::GameStateUpdate { state: delta },
                )
                .await;
            }
        }
    }
}

/// Sends one event to every controller seated in a session.
async fn broadcast<C: Codec>(
    state: &Arc<ServerState<C>>,
    session_id: &SessionId,
    event: &ControllerEvent,
) {
    let controllers =
        state.hub.lock().await.controllers_of(session_id);
    for controller in controllers {
        deliver(&controller, &state.codec, event).await;
    }
}

fn status_delta(status: &str) -> GameState {
    GameState::from_iter([("status".to_string(), status.into())])
}

/// Hard teardown of everything the screen owned, run when the handler
/// exits for any reason.
///
/// Every controller in a destroyed session hears `game-disconnected`
/// exactly once. Archived seats for those sessions are left to the
/// sweeper; an attempt to use one fails with "Session no longer
/// exists".
async fn teardown<C: Codec>(
    conn_id: ConnectionId,
    state: &Arc<ServerState<C>>,
) {
    state.registry.lock().await.destroy_owned_by(conn_id);
    let dropped = state.hub.lock().await.drop_screen(conn_id);

    for (session_id, controllers) in dropped {
        tracing::info!(
            %session_id,
            controllers = controllers.len(),
            "notifying controllers of screen disconnect"
        );
        for controller in controllers {
            deliver(
                &controller,
                &state.codec,
                &ControllerEvent::GameDisconnected,
            )
            .await;
        }
    }
}
