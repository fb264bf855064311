//! FIFO serializers for room creation and teardown.
//!
//! Both serializers have the same shape: a queue of pending items and an
//! in-flight flag. At most one item is in flight; the next one can only
//! start once [`SerialQueue::finish`] has been called for the current one.
//!
//! ```text
//! push() ──→ [pending ...] ──begin()──→ [in flight] ──finish()──→ idle
//! ```

use std::collections::VecDeque;
use std::time::Instant;

use multiroom_protocol::CreateRoomMessage;
use multiroom_transport::ConnectionId;

use crate::SpaceHandle;

/// A create request waiting for the creation serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCreateRequest {
    pub requester: ConnectionId,
    pub room_name: String,
    pub room_data: String,
    pub space_id: String,
    pub max_occupancy: usize,
}

impl PendingCreateRequest {
    pub fn from_message(requester: ConnectionId, msg: CreateRoomMessage) -> Self {
        Self {
            requester,
            room_name: msg.room_name,
            room_data: msg.room_data,
            space_id: msg.space_identifier,
            max_occupancy: msg.max_players,
        }
    }
}

/// A loaded space waiting to be unloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTeardown {
    pub handle: SpaceHandle,
    /// Room the space belonged to, for logging.
    pub room_name: String,
    pub queued_at: Instant,
}

impl PendingTeardown {
    pub fn new(handle: SpaceHandle, room_name: impl Into<String>) -> Self {
        Self {
            handle,
            room_name: room_name.into(),
            queued_at: Instant::now(),
        }
    }
}

/// A FIFO queue with at most one item in flight.
#[derive(Debug)]
pub struct SerialQueue<T> {
    pending: VecDeque<T>,
    in_flight: bool,
    capacity: usize,
}

/// Serializes room creation.
pub type CreationSerializer = SerialQueue<PendingCreateRequest>;

/// Serializes space teardown.
pub type TeardownSerializer = SerialQueue<PendingTeardown>;

impl<T> SerialQueue<T> {
    /// A queue that holds at most `capacity` pending items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: false,
            capacity,
        }
    }

    /// A queue with no capacity limit.
    pub fn unbounded() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Appends an item.
    ///
    /// # Errors
    /// Hands the item back if the queue is at capacity.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.pending.len() >= self.capacity {
            return Err(item);
        }
        self.pending.push_back(item);
        Ok(())
    }

    /// Takes the head and marks it in flight. `None` if something is
    /// already in flight or nothing is pending.
    ///
    /// A caller that rejects the returned item must still call
    /// [`finish`](Self::finish) before the next one can begin.
    pub fn begin(&mut self) -> Option<T> {
        if self.in_flight {
            return None;
        }
        let item = self.pending.pop_front()?;
        self.in_flight = true;
        Some(item)
    }

    /// Clears the in-flight flag.
    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// `true` if any pending item matches.
    pub fn any(&self, f: impl FnMut(&T) -> bool) -> bool {
        self.pending.iter().any(f)
    }

    /// Pending items, not counting the one in flight.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl CreationSerializer {
    /// `true` if `conn_id` has a request waiting.
    pub fn has_request_from(&self, conn_id: ConnectionId) -> bool {
        self.any(|r| r.requester == conn_id)
    }
}

impl TeardownSerializer {
    /// `true` if `handle` is already waiting to be unloaded.
    pub fn is_queued(&self, handle: SpaceHandle) -> bool {
        self.any(|t| t.handle == handle)
    }
}
