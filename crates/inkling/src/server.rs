//! `InklingServer` builder and server loop.
//!
//! This is the entry point for running an Inkling game server. It ties
//! together all the layers: transport → protocol → session → room.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use inkling_protocol::JsonCodec;
use inkling_room::{EngineConfig, InMemoryRoomStore, RoomStore};
use inkling_session::SessionManager;
use inkling_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::InklingError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Neither
/// mutex is ever held across network I/O.
pub(crate) struct ServerState<S: RoomStore> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<S>,
    pub(crate) codec: JsonCodec,
    pub(crate) idle_timeout: Duration,
    pub(crate) started: Instant,
}

/// Builder for configuring and starting an Inkling server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), inkling::InklingError> {
/// let server = inkling::InklingServer::builder()
///     .bind("0.0.0.0:4000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct InklingServerBuilder {
    bind_addr: String,
    engine: EngineConfig,
    idle_timeout: Duration,
    seed: Option<u64>,
}

impl InklingServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            engine: defaults.engine_config(),
            idle_timeout: defaults.idle_timeout,
            seed: None,
        }
    }

    /// Takes address, grace period and idle timeout from `config`.
    pub fn config(self, config: &ServerConfig) -> Self {
        self.bind(&config.bind_addr())
            .engine_config(config.engine_config())
            .idle_timeout(config.idle_timeout)
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the timings every room runs with.
    pub fn engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Sets how long a silent connection is kept open.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Seeds room codes and every room's RNG, for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Binds the listener with the default in-memory room store.
    pub async fn build(self) -> Result<InklingServer<InMemoryRoomStore>, InklingError> {
        let store = match self.seed {
            Some(seed) => InMemoryRoomStore::with_seed(self.engine.clone(), seed),
            None => InMemoryRoomStore::new(self.engine.clone()),
        };
        self.build_with_store(store).await
    }

    /// Binds the listener with a caller-supplied room store.
    pub async fn build_with_store<S: RoomStore>(
        self,
        store: S,
    ) -> Result<InklingServer<S>, InklingError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new()),
            rooms: Mutex::new(store),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
            started: Instant::now(),
        });

        Ok(InklingServer { transport, state })
    }
}

impl Default for InklingServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Inkling game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct InklingServer<S: RoomStore> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S>>,
}

impl InklingServer<InMemoryRoomStore> {
    /// Creates a new builder.
    pub fn builder() -> InklingServerBuilder {
        InklingServerBuilder::new()
    }
}

impl<S: RoomStore> InklingServer<S> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), InklingError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Inkling server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
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
