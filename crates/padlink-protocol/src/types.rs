//! Core protocol types: identities, input enums, and the channel messages.
//!
//! These are the structures that travel on the wire between the kiosk
//! screen, the phones, and the relay. The serde attributes are load-
//! bearing: the kiosk's web clients expect kebab-case event names and
//! camelCase payload fields, so every enum here carries
//! `#[serde(tag = "event", rename_all = "kebab-case",
//! rename_all_fields = "camelCase")]`.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a game session.
///
/// Opaque string of the form `game_{unix_millis}_{hex suffix}` — unique
/// enough to embed in a QR-code URL without casual collision, but not a
/// security boundary. Newtype wrapper so a session id can't be confused
/// with a reconnect token (both are strings on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the id as a string slice (URL-path-safe).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A 1-based seat number within a session.
///
/// Assigned at join time as seat-count + 1 unless the client requests a
/// specific number. Stable for the life of the seat and reused on
/// reconnection. Numbers need not stay contiguous after departures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerNumber(pub u32);

impl fmt::Display for PlayerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The application-defined game state blob.
///
/// Opaque to the relay beyond shallow merging: updates overwrite
/// matching top-level keys, no deep merge.
pub type GameState = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Input enums
// ---------------------------------------------------------------------------

/// D-pad direction of a `dpad` event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DpadDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Face/system button of a `button` event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PadButton {
    A,
    B,
    Start,
    Select,
}

// ---------------------------------------------------------------------------
// Controller channel
// ---------------------------------------------------------------------------

/// Messages a controller (phone) sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ControllerMessage {
    /// Join a session by id, optionally requesting a specific seat
    /// number. An unknown id implicitly creates the session — the
    /// controller may connect a beat before the game screen is ready.
    JoinSession {
        session_id: SessionId,
        #[serde(default)]
        player_number: Option<PlayerNumber>,
    },

    /// Resume a previously held seat with a reconnect token.
    ReconnectSession {
        reconnect_token: String,
        session_id: SessionId,
    },

    /// D-pad press or release.
    Dpad {
        direction: DpadDirection,
        pressed: bool,
    },

    /// Button press or release.
    Button { button: PadButton, pressed: bool },

    /// Generic fallback relay — arbitrary payload forwarded verbatim.
    Input {
        #[serde(flatten)]
        data: GameState,
    },
}

/// Messages the relay sends to a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ControllerEvent {
    /// Acknowledges `join-session`. The `reconnect_token` is the one-time
    /// credential for resuming this seat after a disconnect.
    Joined {
        session_id: SessionId,
        player_number: PlayerNumber,
        total_players: usize,
        reconnect_token: String,
    },

    /// Acknowledges `reconnect-session`. Carries the game-state snapshot
    /// taken at disconnect time so the client can restore its UI context.
    Reconnected {
        session_id: SessionId,
        player_number: PlayerNumber,
        total_players: usize,
        game_state: GameState,
    },

    /// The reconnect attempt was refused; the client should fall back to
    /// a fresh `join-session`.
    ReconnectFailed { reason: String },

    /// Broadcast from the game screen: the game has started.
    GameStarted { game_id: serde_json::Value },

    /// Broadcast from the game screen: the game has ended.
    GameEnded { results: serde_json::Value },

    /// The owning game screen disconnected; the session is gone.
    GameDisconnected,

    /// A game-state delta published by the game screen (the delta, not
    /// the merged whole).
    GameStateUpdate { state: GameState },
}

// ---------------------------------------------------------------------------
// Game-screen channel
// ---------------------------------------------------------------------------

/// Messages the kiosk game screen sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ScreenMessage {
    /// Create a fresh session for a game. Always succeeds.
    CreateSession { game_id: serde_json::Value },

    /// Mark the session as playing and notify all controllers.
    StartGame { session_id: SessionId },

    /// Mark the session as ended and send results to all controllers.
    EndGame {
        session_id: SessionId,
        #[serde(default)]
        results: serde_json::Value,
    },

    /// Shallow-merge a state delta into the session's game state and
    /// forward the delta to all controllers.
    GameState {
        session_id: SessionId,
        state: GameState,
    },
}

/// Messages the relay sends to the kiosk game screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ScreenEvent {
    /// Acknowledges `create-session` with the freshly minted id.
    SessionCreated { session_id: SessionId },

    /// A controller took a seat in one of this screen's sessions.
    PlayerJoined {
        player_number: PlayerNumber,
        total_players: usize,
    },

    /// A disconnected controller resumed its seat.
    PlayerReconnected {
        player_number: PlayerNumber,
        total_players: usize,
    },

    /// A controller left. `can_reconnect` tells the screen whether the
    /// seat was archived for the grace period.
    PlayerDisconnected {
        player_number: PlayerNumber,
        total_players: usize,
        can_reconnect: bool,
    },

    /// Relayed `dpad` input, with the sender's seat number injected.
    ControllerDpad {
        player_number: PlayerNumber,
        direction: DpadDirection,
        pressed: bool,
    },

    /// Relayed `button` input, with the sender's seat number injected.
    ControllerButton {
        player_number: PlayerNumber,
        button: PadButton,
        pressed: bool,
    },

    /// Relayed generic input, forwarded verbatim with the sender's seat
    /// number injected.
    ControllerInput {
        player_number: PlayerNumber,
        #[serde(flatten)]
        data: GameState,
    },
}

// =========================================================================
// Tests
// =========================================================================
