use serde::{Deserialize, Serialize};

/// Point-in-time occupancy of the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Accepted and waiting for a slot.
    pub queued: usize,
    /// Currently executing.
    pub running: usize,
    /// Dispatched, waiting for the backend acknowledgment. Holds no slot.
    pub awaiting_ack: usize,
    pub core_size: usize,
    pub queue_size: usize,
}

impl QueueCounts {
    /// No task waiting for or holding an execution slot.
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.running == 0
    }
}
