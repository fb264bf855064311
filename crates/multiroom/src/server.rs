//! `MultiroomServer` builder and accept loop.
//!
//! Ties the layers together: the WebSocket transport accepts connections,
//! each connection gets a task that decodes client envelopes and hands
//! them to the room coordinator, and the coordinator's replies flow back
//! through the same task.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use multiroom_protocol::{Codec, JsonCodec};
use multiroom_room::{
    CoordinatorConfig, CoordinatorHandle, EntityPlacement, SpaceLoader, spawn_coordinator,
};
use multiroom_transport::{Transport, WebSocketTransport};
use serde::{Deserialize, Serialize};

use crate::MultiroomError;
use crate::handler::handle_connection;

/// Server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,
    /// Close a connection after this long without any inbound frame,
    /// WebSocket pings included. Closing a connection counts as a
    /// disconnect, so an idle room occupant loses its place. `None`
    /// (the default) keeps idle connections open.
    pub idle_timeout: Option<Duration>,
    /// Room coordinator settings.
    pub coordinator: CoordinatorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout: None,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

/// Shared state handed to every connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: CoordinatorHandle,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for a [`MultiroomServer`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use multiroom::prelude::*;
///
/// # async fn run() -> Result<(), MultiroomError> {
/// let loader = Arc::new(MemorySpaceLoader::new(["Arena", "Dungeon"]));
/// let server = MultiroomServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(loader, LogPlacement)
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MultiroomServerBuilder {
    config: ServerConfig,
}

impl MultiroomServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the idle timeout for connections.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Sets the coordinator configuration.
    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.config.coordinator = config;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener, starts the coordinator, and returns a server
    /// speaking JSON.
    pub async fn build<L, P>(
        self,
        loader: Arc<L>,
        placement: P,
    ) -> Result<MultiroomServer<JsonCodec>, MultiroomError>
    where
        L: SpaceLoader,
        P: EntityPlacement,
    {
        self.build_with_codec(JsonCodec, loader, placement).await
    }

    /// Like [`build`](Self::build) with a custom codec.
    pub async fn build_with_codec<C, L, P>(
        self,
        codec: C,
        loader: Arc<L>,
        placement: P,
    ) -> Result<MultiroomServer<C>, MultiroomError>
    where
        C: Codec,
        L: SpaceLoader,
        P: EntityPlacement,
    {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let coordinator = spawn_coordinator(self.config.coordinator, loader, placement);
        let state = Arc::new(ServerState {
            coordinator,
            codec,
            idle_timeout: self.config.idle_timeout,
        });
        Ok(MultiroomServer { transport, state })
    }
}

/// A bound server. Call [`run`](Self::run) to start accepting.
pub struct MultiroomServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl MultiroomServer<JsonCodec> {
    pub fn builder() -> MultiroomServerBuilder {
        MultiroomServerBuilder::new()
    }
}

impl<C: Codec> MultiroomServer<C> {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, MultiroomError> {
        Ok(self.transport.local_addr()?)
    }

    /// A handle to the room coordinator, for in-process queries.
    pub fn coordinator(&self) -> CoordinatorHandle {
        self.state.coordinator.clone()
    }

    /// Accepts connections until the process exits.
    pub async fn run(self) -> Result<(), MultiroomError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then stops the
    /// coordinator, which unloads every loaded space.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), MultiroomError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Multiroom server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
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
                },
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
            }
        }

        self.state.coordinator.shutdown().await?;
        tracing::info!("Multiroom server stopped");
        Ok(())
    }
}
