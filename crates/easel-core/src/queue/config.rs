//! Queue sizing.

/// Concurrency and backlog limits.
///
/// At most `core_size` units execute at once and at most `queue_size` more
/// wait for a slot. Anything beyond that is rejected with `QUEUE_FULL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub core_size: usize,
    pub queue_size: usize,
}

impl QueueConfig {
    pub fn new(core_size: usize, queue_size: usize) -> Self {
        Self {
            core_size: core_size.max(1),
            queue_size,
        }
    }

    /// Total number of admitted tasks (running + waiting) the queue holds.
    pub fn capacity(&self) -> usize {
        self.core_size + self.queue_size
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(3, 10)
    }
}
