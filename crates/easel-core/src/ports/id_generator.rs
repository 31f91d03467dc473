//! IdGenerator port - task ids and correlation tokens.

use crate::domain::ids::{Nonce, TaskId};
use crate::ports::Clock;
use ulid::Ulid;

/// Generates globally unique ids.
///
/// # Thread Safety
/// - `Send + Sync`: shared by every submitter.
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    /// A fresh correlation token; never reused across tasks.
    fn generate_nonce(&self) -> Nonce;
}

/// ULID-based generator. The timestamp part comes from the injected clock,
/// the remaining 80 bits are random.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        TaskId::from(self.next_ulid())
    }

    fn generate_nonce(&self) -> Nonce {
        Nonce::from(self.next_ulid())
    }
}
