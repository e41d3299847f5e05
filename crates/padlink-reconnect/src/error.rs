//! Reconnection failure taxonomy.

/// Why a reconnect attempt was refused.
///
/// The `Display` strings are part of the wire contract: they travel to
/// the client verbatim as the `reason` of a `reconnect-failed` event,
/// and the controller page shows them to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReconnectError {
    /// The token is unknown, already consumed, or past the grace
    /// period. One string for all three — the client can't act on the
    /// difference, it just falls back to a fresh join.
    #[error("Token expired or invalid")]
    TokenInvalid,

    /// The token is live but was archived for a different session than
    /// the one the client asked to rejoin.
    #[error("Session mismatch")]
    SessionMismatch,

    /// The archived session was destroyed during the grace window (its
    /// game screen disconnected).
    #[error("Session no longer exists")]
    SessionGone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings_match_wire_contract() {
        assert_eq!(
            ReconnectError::TokenInvalid.to_string(),
            "Token expired or invalid"
        );
        assert_eq!(
            ReconnectError::SessionMismatch.to_string(),
            "Session mismatch"
        );
        assert_eq!(
            ReconnectError::SessionGone.to_string(),
            "Session no longer exists"
        );
    }
}
