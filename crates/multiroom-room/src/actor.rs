//! The coordinator actor.
//!
//! A single Tokio task owns the [`Coordinator`] and is the only place
//! room state changes. The outside world talks to it through a
//! [`CoordinatorHandle`]; space loads and unloads run as futures polled
//! by the same task, so they suspend without ever running concurrently
//! with a state change.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use multiroom_protocol::ClientMessage;
use multiroom_session::{OutboundReceiver, OutboundSender, outbound_channel};
use multiroom_tick::TickScheduler;
use multiroom_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::{
    Coordinator, CoordinatorConfig, CoordinatorStats, EntityPlacement, RoomError, RoomSummary,
    SpaceCommand, SpaceError, SpaceHandle, SpaceLoader, WorkflowId,
};

/// Commands sent to the coordinator task.
enum CoordinatorCommand {
    Connect {
        conn_id: ConnectionId,
        outbound: OutboundSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Disconnect {
        conn_id: ConnectionId,
    },
    Message {
        conn_id: ConnectionId,
        msg: ClientMessage,
    },
    ListRooms {
        reply: oneshot::Sender<Vec<RoomSummary>>,
    },
    RoomOf {
        conn_id: ConnectionId,
        reply: oneshot::Sender<Option<String>>,
    },
    Stats {
        reply: oneshot::Sender<CoordinatorStats>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the running coordinator. Cheap to clone.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    /// Registers a connection and returns the receiver its messages will
    /// arrive on.
    pub async fn on_connect(&self, conn_id: ConnectionId) -> Result<OutboundReceiver, RoomError> {
        let (outbound, inbound) = outbound_channel();
        self.request(|reply| CoordinatorCommand::Connect {
            conn_id,
            outbound,
            reply,
        })
        .await??;
        Ok(inbound)
    }

    /// Reports that a connection is gone.
    pub async fn on_disconnect(&self, conn_id: ConnectionId) -> Result<(), RoomError> {
        self.send(CoordinatorCommand::Disconnect { conn_id }).await
    }

    /// Delivers a client message (fire-and-forget). Replies, if any,
    /// arrive on the connection's outbound receiver.
    pub async fn on_message(&self, conn_id: ConnectionId, msg: ClientMessage) -> Result<(), RoomError> {
        self.send(CoordinatorCommand::Message { conn_id, msg }).await
    }

    /// Snapshot of the catalog.
    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, RoomError> {
        self.request(|reply| CoordinatorCommand::ListRooms { reply })
            .await
    }

    /// The room a connection occupies.
    pub async fn room_of(&self, conn_id: ConnectionId) -> Result<Option<String>, RoomError> {
        self.request(|reply| CoordinatorCommand::RoomOf { conn_id, reply })
            .await
    }

    pub async fn stats(&self) -> Result<CoordinatorStats, RoomError> {
        self.request(|reply| CoordinatorCommand::Stats { reply })
            .await
    }

    /// Stops the coordinator. Resolves once in-flight loads and unloads
    /// have finished and every loaded space has been unloaded.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.request(|reply| CoordinatorCommand::Shutdown { reply })
            .await
    }

    /// `true` once the coordinator task has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: CoordinatorCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CoordinatorCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }
}

/// Starts the coordinator task.
///
/// The loader is shared so the caller can keep using it (for example to
/// inspect what is loaded).
pub fn spawn_coordinator<L, P>(
    config: CoordinatorConfig,
    loader: Arc<L>,
    placement: P,
) -> CoordinatorHandle
where
    L: SpaceLoader,
    P: EntityPlacement,
{
    let (sender, receiver) = mpsc::channel(config.command_channel_size.max(1));
    let ticks = TickScheduler::new(config.tick_config());
    let actor = CoordinatorActor {
        core: Coordinator::new(config, placement),
        loader,
        receiver,
        ticks,
        in_progress: FuturesUnordered::new(),
        shutdown_reply: None,
    };
    tokio::spawn(actor.run());
    CoordinatorHandle { sender }
}

/// A finished load or unload, ready to be applied.
enum SpaceCompletion {
    Loaded {
        workflow: WorkflowId,
        result: Result<SpaceHandle, SpaceError>,
    },
    Unloaded {
        handle: SpaceHandle,
        result: Result<(), SpaceError>,
    },
}

struct CoordinatorActor<L, P> {
    core: Coordinator<P>,
    loader: Arc<L>,
    receiver: mpsc::Receiver<CoordinatorCommand>,
    ticks: TickScheduler,
    in_progress: FuturesUnordered<BoxFuture<'static, SpaceCompletion>>,
    shutdown_reply: Option<oneshot::Sender<()>>,
}

impl<L: SpaceLoader, P: EntityPlacement> CoordinatorActor<L, P> {
    async fn run(mut self) {
        info!(
            drain_rate_hz = self.ticks.rate_hz(),
            "room coordinator started"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Some(done) = self.in_progress.next(), if !self.in_progress.is_empty() => {
                    self.handle_completion(done);
                }
                _ = self.ticks.wait_for_tick() => {
                    self.drain();
                    if let Some(elapsed) = self.ticks.record_tick_end() {
                        trace!(?elapsed, "tick drain finished");
                    }
                    continue;
                }
            }
            if self.ticks.is_event_driven() {
                self.drain();
            }
        }

        self.shutdown().await;
        if let Some(reply) = self.shutdown_reply.take() {
            let _ = reply.send(());
        }
        info!("room coordinator stopped");
    }

    /// Returns `false` when the loop should stop.
    fn handle_command(&mut self, cmd: CoordinatorCommand) -> bool {
        match cmd {
            CoordinatorCommand::Connect {
                conn_id,
                outbound,
                reply,
            } => {
                let _ = reply.send(self.core.connect(conn_id, outbound));
            }
            CoordinatorCommand::Disconnect { conn_id } => {
                self.core.disconnect(conn_id);
            }
            CoordinatorCommand::Message { conn_id, msg } => {
                if let Err(e) = self.core.handle_message(conn_id, msg) {
                    debug!(%conn_id, error = %e, "request rejected");
                }
            }
            CoordinatorCommand::ListRooms { reply } => {
                let _ = reply.send(self.core.list());
            }
            CoordinatorCommand::RoomOf { conn_id, reply } => {
                let _ = reply.send(self.core.room_of(conn_id).map(str::to_string));
            }
            CoordinatorCommand::Stats { reply } => {
                let _ = reply.send(self.core.stats());
            }
            CoordinatorCommand::Shutdown { reply } => {
                self.shutdown_reply = Some(reply);
                return false;
            }
        }
        true
    }

    fn handle_completion(&mut self, done: SpaceCompletion) {
        match done {
            SpaceCompletion::Loaded { workflow, result } => {
                self.core.complete_load(workflow, result);
            }
            SpaceCompletion::Unloaded { handle, result } => {
                self.core.complete_unload(handle, result);
            }
        }
    }

    fn drain(&mut self) {
        for cmd in self.core.drain() {
            self.start(cmd);
        }
    }

    fn start(&mut self, cmd: SpaceCommand) {
        let loader = Arc::clone(&self.loader);
        let op = match cmd {
            SpaceCommand::Load { workflow, space_id } => {
                let limit = self.core.config().load_timeout;
                async move {
                    let result = with_timeout(limit, loader.load_space(&space_id)).await;
                    SpaceCompletion::Loaded { workflow, result }
                }
                .boxed()
            }
            SpaceCommand::Unload { handle } => {
                let limit = self.core.config().unload_timeout;
                async move {
                    let result = with_timeout(limit, loader.unload_space(handle)).await;
                    SpaceCompletion::Unloaded { handle, result }
                }
                .boxed()
            }
        };
        self.in_progress.push(op);
    }

    /// Lets in-flight operations finish, then unloads every loaded space.
    async fn shutdown(&mut self) {
        info!(
            in_flight = self.in_progress.len(),
            "room coordinator shutting down"
        );
        while let Some(done) = self.in_progress.next().await {
            self.handle_completion(done);
        }

        let limit = self.core.config().unload_timeout;
        for handle in self.core.shutdown() {
            match with_timeout(limit, self.loader.unload_space(handle)).await {
                Ok(()) => debug!(space = %handle, "space unloaded on shutdown"),
                Err(e) => warn!(space = %handle, error = %e, "space unload failed on shutdown"),
            }
        }
    }
}

/// Runs `op`, failing with [`SpaceError::TimedOut`] past `limit`.
async fn with_timeout<T>(
    limit: Option<Duration>,
    op: impl Future<Output = Result<T, SpaceError>>,
) -> Result<T, SpaceError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, op)
            .await
            .unwrap_or(Err(SpaceError::TimedOut(limit))),
        None => op.await,
    }
}
