//! # Padlink
//!
//! Session relay for in-store kiosks: phones become gamepads for the
//! game running on the kiosk screen.
//!
//! A kiosk screen connects on `/game` and creates a session; phones
//! scan the session id off a QR code, connect on `/controller`, and
//! join. The relay forwards controller input to the screen (stamped
//! with the sender's seat number) and fans the screen's lifecycle and
//! state events out to every seated phone. A phone that drops mid-game
//! can resume its seat within a grace period using a reconnect token.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use padlink::PadlinkServer;
//!
//! # async fn run() -> Result<(), padlink::PadlinkError> {
//! let server = PadlinkServer::builder()
//!     .bind("0.0.0.0:3001")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod controller;
mod error;
mod hub;
mod screen;
mod server;

pub use error::PadlinkError;
pub use server::{
    PadlinkServer, PadlinkServerBuilder, CONTROLLER_PATH, GAME_PATH,
};

pub use padlink_protocol::{
    Codec, ControllerEvent, ControllerMessage, DpadDirection, GameState,
    JsonCodec, PadButton, PlayerNumber, ProtocolError, ScreenEvent,
    ScreenMessage, SessionId,
};
pub use padlink_reconnect::{ReconnectConfig, ReconnectError};
pub use padlink_transport::{ConnectionId, TransportError};
