//! Unified error type for the Padlink relay.

use padlink_protocol::ProtocolError;
use padlink_reconnect::ReconnectError;
use padlink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `padlink` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PadlinkError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A refused reconnection attempt.
    #[error(transparent)]
    Reconnect(#[from] ReconnectError),
}
