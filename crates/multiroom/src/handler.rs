//! Per-connection task: decode inbound envelopes, forward them to the
//! coordinator, and write the coordinator's replies back to the socket.
//!
//! The flow is:
//!   1. Register with the coordinator, which returns the outbound queue
//!   2. Loop: inbound frame → coordinator, outbound message → socket
//!   3. On exit, the guard reports the disconnect

use std::sync::Arc;

use multiroom_protocol::{ClientMessage, Codec, Envelope};
use multiroom_room::CoordinatorHandle;
use multiroom_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::MultiroomError;
use crate::server::ServerState;

/// Reports the disconnect when the connection task exits, however it
/// exits. `Drop` is synchronous, so the report is sent from a spawned task.
struct DisconnectGuard {
    conn_id: ConnectionId,
    coordinator: CoordinatorHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            if coordinator.on_disconnect(conn_id).await.is_err() {
                tracing::debug!(%conn_id, "coordinator gone before disconnect");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), MultiroomError> {
    let conn_id = conn.id();
    let mut outbound = state.coordinator.on_connect(conn_id).await?;
    let _guard = DisconnectGuard {
        conn_id,
        coordinator: state.coordinator.clone(),
    };
    tracing::info!(%conn_id, "client connected");

    let mut seq: u64 = 0;
    loop {
        tokio::select! {
            incoming = conn.recv_within(state.idle_timeout) => {
                match incoming {
                    Ok(Some(data)) => forward(&state, conn_id, &data).await?,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::info!(%conn_id, error = %e, "connection dropped");
                        break;
                    }
                }
            }
            Some(msg) = outbound.recv() => {
                seq += 1;
                let bytes = state.codec.encode(&Envelope { seq, payload: msg })?;
                conn.send(&bytes).await?;
            }
        }
    }

    if conn.is_open() {
        let _ = conn.close().await;
    }
    // _guard drops here → coordinator sees the disconnect.
    Ok(())
}

/// Decodes a client envelope and hands its payload to the coordinator.
/// Frames that do not decode are dropped.
async fn forward<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    data: &[u8],
) -> Result<(), MultiroomError> {
    let envelope: Envelope<ClientMessage> = match state.codec.decode(data) {
        Ok(env) => env,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "dropping undecodable frame");
            return Ok(());
        }
    };
    tracing::trace!(%conn_id, seq = envelope.seq, "client message");
    state
        .coordinator
        .on_message(conn_id, envelope.payload)
        .await?;
    Ok(())
}
