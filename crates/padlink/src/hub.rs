//! The relay hub: maps sessions to the live connections in them.
//!
//! The session registry knows *who* sits where; the hub knows *how to
//! reach them*. It holds cloned connection handles, one per game screen
//! and one per seated controller, keyed by session. All methods are
//! synchronous and return clones — the caller drops the hub lock before
//! doing any network I/O on the handles.

use std::collections::HashMap;

use padlink_protocol::SessionId;
use padlink_transport::{Connection, ConnectionId};

/// Connection handles for every session's screen and controllers.
///
/// Generic over the connection type so the routing logic is testable
/// without sockets. Not thread-safe by itself; the server wraps it in a
/// `tokio::sync::Mutex`, same as the registry and the archive.
pub struct RelayHub<C: Connection> {
    /// The owning game screen of each session, when one is connected.
    /// An implicitly created session has no screen entry until its
    /// screen claims it (which the current kiosk flow never does, so
    /// broadcasts to such a session simply go nowhere).
    screens: HashMap<SessionId, C>,

    /// Seated controllers per session, keyed by connection id so a
    /// departure removes exactly one handle.
    controllers: HashMap<SessionId, HashMap<ConnectionId, C>>,
}

impl<C: Connection> RelayHub<C> {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self {
            screens: HashMap::new(),
            controllers: HashMap::new(),
        }
    }

    /// Records `conn` as the screen for a session.
    pub fn register_screen(&mut self, session_id: SessionId, conn: C) {
        self.screens.insert(session_id, conn);
    }

    /// Records `conn` as a seated controller in a session.
    pub fn register_controller(&mut self, session_id: SessionId, conn: C) {
        self.controllers
            .entry(session_id)
            .or_default()
            .insert(conn.id(), conn);
    }

    /// Removes one controller handle from a session, dropping the
    /// session's controller map once it empties.
    pub fn remove_controller(
        &mut self,
        session_id: &SessionId,
        connection: ConnectionId,
    ) {
        if let Some(room) = self.controllers.get_mut(session_id) {
            room.remove(&connection);
            if room.is_empty() {
                self.controllers.remove(session_id);
            }
        }
    }

    /// Returns a handle to the session's screen, if one is connected.
    pub fn screen_of(&self, session_id: &SessionId) -> Option<C> {
        self.screens.get(session_id).cloned()
    }

    /// Returns handles to every controller seated in a session.
    pub fn controllers_of(&self, session_id: &SessionId) -> Vec<C> {
        self.controllers
            .get(session_id)
            .map(|room| room.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Tears down every session whose screen is `screen`: removes the
    /// screen entries and the controller rooms, returning each doomed
    /// session's controllers so the caller can notify them.
    ///
    /// Keyed by connection id rather than session id so that sessions
    /// already garbage-collected from the registry still get their hub
    /// entries cleaned up here.
    pub fn drop_screen(
        &mut self,
        screen: ConnectionId,
    ) -> Vec<(SessionId, Vec<C>)> {
        let doomed: Vec<SessionId> = self
            .screens
            .iter()
            .filter(|(_, conn)| conn.id() == screen)
            .map(|(id, _)| id.clone())
            .collect();

        doomed
            .into_iter()
            .map(|id| {
                self.screens.remove(&id);
                let room = self
                    .controllers
                    .remove(&id)
                    .map(|room| room.into_values().collect())
                    .unwrap_or_default();
                (id, room)
            })
            .collect()
    }
}

impl<C: Connection> Default for RelayHub<C> {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
