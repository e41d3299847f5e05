//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
///
/// A `Decode` error on an inbound frame is routine — the kiosk favors
/// robustness, so endpoints log it at debug level and move on rather
/// than tearing down the connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into a frame).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown event name,
    /// or a missing required field.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message is invalid at the protocol level even though it
    /// parsed — e.g. a connection to an unknown namespace path.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
