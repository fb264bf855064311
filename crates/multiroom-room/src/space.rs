//! The asynchronous resource gateway: loading and unloading spaces.
//!
//! A *space* is whatever isolated resource backs a room (a scene, a
//! simulation world, a map). The coordinator never touches spaces
//! directly; it asks a [`SpaceLoader`] and gets back an opaque
//! [`SpaceHandle`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

/// Opaque reference to a loaded space. Only meaningful to the loader
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceHandle(u64);

impl SpaceHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "space-{}", self.0)
    }
}

/// Errors reported by a [`SpaceLoader`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpaceError {
    /// The identifier does not name a space the loader knows.
    #[error("unknown space {0:?}")]
    Unresolvable(String),

    /// The handle is not (or no longer) loaded.
    #[error("{0} is not loaded")]
    InvalidHandle(SpaceHandle),

    /// The operation did not finish in time.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// Anything else the backend reports.
    #[error("space backend error: {0}")]
    Backend(String),
}

/// Loads and unloads spaces on behalf of the coordinator.
///
/// Both operations may take arbitrarily long. The coordinator keeps
/// handling other events while they run and serializes them itself, so
/// an implementation never sees two loads (or two unloads) at once.
pub trait SpaceLoader: Send + Sync + 'static {
    /// Loads the space named by `space_id` alongside any already loaded.
    fn load_space(
        &self,
        space_id: &str,
    ) -> impl Future<Output = Result<SpaceHandle, SpaceError>> + Send;

    /// Releases a space previously returned by [`load_space`](Self::load_space).
    fn unload_space(
        &self,
        handle: SpaceHandle,
    ) -> impl Future<Output = Result<(), SpaceError>> + Send;
}

/// In-process loader over a fixed set of space identifiers.
///
/// Each load hands out a fresh handle after an optional delay, which is
/// enough to exercise the coordinator's suspension points in tests and
/// demos.
#[derive(Debug)]
pub struct MemorySpaceLoader {
    known: HashSet<String>,
    delay: Duration,
    next_handle: AtomicU64,
    loaded: Mutex<HashMap<SpaceHandle, String>>,
}

impl MemorySpaceLoader {
    /// A loader that resolves exactly `known` and completes immediately.
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
            delay: Duration::ZERO,
            next_handle: AtomicU64::new(1),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Makes every load and unload sleep for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Identifiers this loader resolves.
    pub fn knows(&self, space_id: &str) -> bool {
        self.known.contains(space_id)
    }

    /// Handles currently loaded, sorted.
    pub async fn loaded(&self) -> Vec<SpaceHandle> {
        let mut handles: Vec<_> = self.loaded.lock().await.keys().copied().collect();
        handles.sort();
        handles
    }

    /// The identifier a loaded handle was created from.
    pub async fn space_of(&self, handle: SpaceHandle) -> Option<String> {
        self.loaded.lock().await.get(&handle).cloned()
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl SpaceLoader for MemorySpaceLoader {
    async fn load_space(&self, space_id: &str) -> Result<SpaceHandle, SpaceError> {
        self.pause().await;
        if !self.knows(space_id) {
            return Err(SpaceError::Unresolvable(space_id.to_string()));
        }
        let handle = SpaceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.loaded.lock().await.insert(handle, space_id.to_string());
        tracing::debug!(%handle, space_id, "space loaded");
        Ok(handle)
    }

    async fn unload_space(&self, handle: SpaceHandle) -> Result<(), SpaceError> {
        self.pause().await;
        match self.loaded.lock().await.remove(&handle) {
            Some(space_id) => {
                tracing::debug!(%handle, %space_id, "space unloaded");
                Ok(())
            }
            None => Err(SpaceError::InvalidHandle(handle)),
        }
    }
}
