//! Session types: one kiosk game instance and the seats inside it.

use padlink_protocol::{GameState, PlayerNumber, SessionId};
use padlink_transport::ConnectionId;

/// One active controller's membership in a session.
#[derive(Debug, Clone)]
pub struct SeatedPlayer {
    /// The underlying controller connection.
    pub connection: ConnectionId,

    /// 1-based seat number, assigned at join time and reused verbatim on
    /// reconnection. Explicitly requested numbers are accepted without
    /// collision checks (see the join docs).
    pub number: PlayerNumber,

    /// One-time credential for resuming this seat after a disconnect.
    ///
    /// Minted at join time as `rc_` plus 32 hex chars (128 bits) and
    /// handed to the client in the `joined` reply. On reconnection the
    /// same token is restored, not reminted — the client keeps using
    /// the credential it already has.
    pub reconnect_token: String,
}

/// One kiosk game instance awaiting or hosting players.
///
/// Lifecycle: created by the game screen's `create-session` (or
/// implicitly by an early controller join); mutated by joins, leaves,
/// input and state publishes; destroyed when the owning screen
/// disconnects, or deferred-deleted once the last seat leaves and no
/// archived reconnection still references it.
#[derive(Debug, Clone)]
pub struct Session {
    /// The session's opaque id, as embedded in the QR-code URL.
    pub id: SessionId,

    /// The game-screen connection that created the session. `None` for
    /// implicitly created sessions — the controller arrived before the
    /// screen, so nobody owns it yet.
    pub owner: Option<ConnectionId>,

    /// Seated players in join order. Order is display-only; numbers
    /// need not stay contiguous after departures.
    pub players: Vec<SeatedPlayer>,

    /// Last-broadcast game state, `None` until the screen publishes.
    /// A `None` here at disconnect time means "nothing to resume" —
    /// the seat is not archived.
    pub game_state: Option<GameState>,
}

impl Session {
    /// Shallow-merges `partial` into the game state: top-level keys of
    /// `partial` overwrite existing ones, everything else is kept. The
    /// first publish simply installs `partial`.
    pub fn merge_state(&mut self, partial: &GameState) {
        match &mut self.game_state {
            Some(state) => {
                for (key, value) in partial {
                    state.insert(key.clone(), value.clone());
                }
            }
            None => self.game_state = Some(partial.clone()),
        }
    }

    /// Looks up a seat by its connection id.
    pub fn seat(&self, connection: ConnectionId) -> Option<&SeatedPlayer> {
        self.players.iter().find(|p| p.connection == connection)
    }
}
