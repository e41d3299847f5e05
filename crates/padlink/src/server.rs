//! `PadlinkServer` builder and server loop.
//!
//! This is the entry point for running the relay. It ties together all
//! the layers: transport → protocol → session registry → reconnect
//! archive, and routes each accepted connection to the controller or
//! game-screen endpoint by its upgrade path.

use std::sync::Arc;

use padlink_protocol::{Codec, JsonCodec};
use padlink_reconnect::{
    spawn_sweeper, ReconnectArchive, ReconnectConfig,
};
use padlink_session::SessionRegistry;
use padlink_transport::{
    Connection, Transport, WebSocketConnection, WebSocketTransport,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::controller::handle_controller;
use crate::hub::RelayHub;
use crate::screen::handle_screen;
use crate::PadlinkError;

/// Upgrade path controllers (phones) connect on.
pub const CONTROLLER_PATH: &str = "/controller";

/// Upgrade path kiosk game screens connect on.
pub const GAME_PATH: &str = "/game";

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Interior
/// mutability via `Mutex` where needed. Lock order is fixed: registry
/// before archive, and never either of them together with the hub.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Mutex<SessionRegistry>,
    pub(crate) archive: Arc<Mutex<ReconnectArchive>>,
    pub(crate) hub: Mutex<RelayHub<WebSocketConnection>>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Padlink server.
///
/// # Example
///
/// ```rust,ignore
/// use padlink::PadlinkServer;
///
/// let server = PadlinkServer::builder()
///     .bind("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct PadlinkServerBuilder {
    bind_addr: String,
    reconnect_config: ReconnectConfig,
}

impl PadlinkServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            reconnect_config: ReconnectConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the reconnection grace-period configuration.
    pub fn reconnect_config(mut self, config: ReconnectConfig) -> Self {
        self.reconnect_config = config;
        self
    }

    /// Builds and starts the server, including the background sweep
    /// over the reconnect archive.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` as defaults.
    pub async fn build(
        self,
    ) -> Result<PadlinkServer<JsonCodec>, PadlinkError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let archive = Arc::new(Mutex::new(ReconnectArchive::new(
            self.reconnect_config,
        )));
        let sweeper = spawn_sweeper(Arc::clone(&archive));

        let state = Arc::new(ServerState {
            registry: Mutex::new(SessionRegistry::new()),
            archive,
            hub: Mutex::new(RelayHub::new()),
            codec: JsonCodec,
        });

        Ok(PadlinkServer {
            transport,
            state,
            sweeper,
        })
    }
}

impl Default for PadlinkServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Padlink relay server.
///
/// Call [`run()`](Self::run) to start accepting connections. Dropping
/// the server (e.g. when a test aborts the task running it) stops the
/// background sweeper.
pub struct PadlinkServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    sweeper: JoinHandle<()>,
}

impl PadlinkServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> PadlinkServerBuilder {
        PadlinkServerBuilder::new()
    }
}

impl<C: Codec + Clone + 'static> PadlinkServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections, routes each by its upgrade path,
    /// and spawns a handler task per connection. Runs until the process
    /// is terminated.
    pub async fn run(mut self) -> Result<(), PadlinkError> {
        tracing::info!("Padlink relay running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = route_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

impl<C: Codec> Drop for PadlinkServer<C> {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

/// Best-effort delivery to a peer other than the handler's own client.
///
/// Broadcasts must not couple peers together: one unreachable phone
/// cannot be allowed to error out the screen's handler (or vice versa),
/// so failures here are logged and swallowed.
pub(crate) async fn deliver<C: Codec, T: serde::Serialize>(
    conn: &WebSocketConnection,
    codec: &C,
    event: &T,
) {
    match codec.encode(event) {
        Ok(text) => {
            if let Err(e) = conn.send(&text).await {
                tracing::debug!(
                    conn_id = %conn.id(),
                    error = %e,
                    "dropped event for unreachable peer"
                );
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to encode event");
        }
    }
}

/// Dispatches a fresh connection to the endpoint its path names.
///
/// A connection on any other path is closed immediately — the kiosk
/// clients only ever dial the two known namespaces.
async fn route_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), PadlinkError> {
    match conn.path() {
        CONTROLLER_PATH => handle_controller(conn, state).await,
        GAME_PATH => handle_screen(conn, state).await,
        other => {
            tracing::debug!(
                conn_id = %conn.id(),
                path = other,
                "rejecting connection on unknown path"
            );
            conn.close().await?;
            Ok(())
        }
    }
}
