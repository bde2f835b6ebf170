//! `PokerforgeServer` builder and server loop.
//!
//! This is the entry point for running a Pokerforge server. It ties the
//! layers together: transport → protocol → lifecycle → registry/fan-out.

use std::sync::Arc;
use std::time::Duration;

use pokerforge_protocol::{Codec, JsonCodec};
use pokerforge_transport::{Transport, WebSocketTransport};

use crate::config::{LivenessConfig, ServerConfig};
use crate::coordinator::Coordinator;
use crate::handler::handle_connection;
use crate::PokerforgeError;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Pokerforge server.
///
/// # Example
///
/// ```rust,ignore
/// use pokerforge::prelude::*;
///
/// let server = PokerforgeServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct PokerforgeServerBuilder {
    config: ServerConfig,
    coordinator: Option<Arc<Coordinator>>,
}

impl PokerforgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            coordinator: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the ping interval and liveness timeout.
    pub fn liveness(mut self, ping_interval: Duration, timeout: Duration) -> Self {
        self.config.liveness = LivenessConfig {
            ping_interval,
            timeout,
        };
        self
    }

    /// Sets how many pushes each connection may have queued.
    pub fn outbox_capacity(mut self, capacity: usize) -> Self {
        self.config.outbox_capacity = capacity;
        self
    }

    /// Serves an existing coordinator instead of creating a fresh one.
    pub fn coordinator(mut self, coordinator: Arc<Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Binds the listener with the JSON codec.
    pub async fn build(self) -> Result<PokerforgeServer<JsonCodec>, PokerforgeError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Binds the listener, speaking `codec` on every connection.
    pub async fn build_with_codec<C: Codec>(
        self,
        codec: C,
    ) -> Result<PokerforgeServer<C>, PokerforgeError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            coordinator: self.coordinator.unwrap_or_default(),
            codec,
            config: self.config,
        });

        Ok(PokerforgeServer { transport, state })
    }
}

impl Default for PokerforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Pokerforge server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PokerforgeServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl PokerforgeServer {
    /// Creates a new builder.
    pub fn builder() -> PokerforgeServerBuilder {
        PokerforgeServerBuilder::new()
    }
}

impl<C: Codec> PokerforgeServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The coordinator every connection of this server shares.
    pub fn coordinator(&self) -> Arc<Coordinator> {
        Arc::clone(&self.state.coordinator)
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), PokerforgeError> {
        tracing::info!(
            ping_interval = ?self.state.config.liveness.ping_interval,
            timeout = ?self.state.config.liveness.timeout,
            outbox_capacity = self.state.config.outbox_capacity,
            "Pokerforge server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
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
