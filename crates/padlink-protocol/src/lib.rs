//! Wire protocol for the Padlink controller relay.
//!
//! This crate defines the "language" spoken on the two WebSocket
//! channels of the kiosk:
//!
//! - **Controller channel** (`/controller`) — phones acting as gamepads:
//!   [`ControllerMessage`] inbound, [`ControllerEvent`] outbound.
//! - **Game-screen channel** (`/game`) — the kiosk display hosting a
//!   session: [`ScreenMessage`] inbound, [`ScreenEvent`] outbound.
//!
//! Every frame is one JSON object discriminated by an `"event"` field
//! with a kebab-case name and camelCase payload fields, e.g.
//! `{"event":"join-session","sessionId":"game_17…"}`. Game state is an
//! opaque, shallow-merged JSON object ([`GameState`]) — the relay never
//! interprets it beyond merging.
//!
//! The protocol layer knows nothing about connections or sessions. It
//! only defines message shapes and how to encode/decode them
//! ([`Codec`] / [`JsonCodec`]).

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ControllerEvent, ControllerMessage, DpadDirection, GameState,
    PadButton, PlayerNumber, ScreenEvent, ScreenMessage, SessionId,
};
