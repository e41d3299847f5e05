//! Codec trait and the JSON implementation.
//!
//! The relay's wire format is JSON text frames, but the endpoints only
//! depend on the [`Codec`] trait — swapping in a different encoding
//! (e.g. a compact binary one for embedded screens) would not touch the
//! handlers.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Converts between message types and text frames.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message into one text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<String, ProtocolError>;

    /// Deserializes one text frame into a message.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the frame is malformed or
    /// missing required fields. Endpoints treat this as "ignore the
    /// frame", never as a fatal condition.
    fn decode<T: DeserializeOwned>(
        &self,
        text: &str,
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON via `serde_json`.
///
/// Human-readable, inspectable in browser DevTools, and what the kiosk's
/// web clients already speak.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        text: &str,
    ) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
