use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use multiroom::prelude::*;
use tracing_subscriber::EnvFilter;

const SPACES: [&str; 3] = ["ArenaSpace", "DungeonSpace", "ForestSpace"];

// ---------------------------------------------------------------------------
// Entity placement
// ---------------------------------------------------------------------------

/// Tracks which space each connection's entity is in.
#[derive(Default)]
struct ArenaPlacement {
    positions: Mutex<HashMap<ConnectionId, Option<SpaceHandle>>>,
}

impl ArenaPlacement {
    fn with_positions<R>(&self, f: impl FnOnce(&mut HashMap<ConnectionId, Option<SpaceHandle>>) -> R) -> Option<R> {
        // A poisoned map only loses demo bookkeeping.
        self.positions.lock().ok().map(|mut map| f(&mut map))
    }
}

impl EntityPlacement for ArenaPlacement {
    fn spawn_lobby_entity(&self, conn_id: ConnectionId) {
        self.with_positions(|map| map.insert(conn_id, None));
        tracing::info!(%conn_id, "lobby entity spawned");
    }

    fn replace_controlled_entity(&self, conn_id: ConnectionId, kind: EntityKind) {
        tracing::info!(%conn_id, ?kind, "entity replaced");
    }

    fn relocate(&self, conn_id: ConnectionId, space: SpaceHandle) {
        let occupants = self.with_positions(|map| {
            map.insert(conn_id, Some(space));
            map.values().filter(|s| **s == Some(space)).count()
        });
        tracing::info!(%conn_id, %space, ?occupants, "entity relocated");
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());

    let loader = Arc::new(MemorySpaceLoader::new(SPACES).with_delay(Duration::from_millis(250)));
    let server = MultiroomServer::builder()
        .bind(&bind)
        .build(loader, ArenaPlacement::default())
        .await?;

    tracing::info!(addr = %server.local_addr()?, spaces = ?SPACES, "arena server listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await?;
    Ok(())
}
