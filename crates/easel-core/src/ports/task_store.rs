//! TaskStore port - persistence of task records.

use async_trait::async_trait;

use crate::domain::{StoreError, Task, TaskId};

/// Persists task records by id.
///
/// Implementations must make each `save` atomic per task id: several
/// pipelines may write status transitions for the same record.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert or replace the record for `task.id()`.
    async fn save(&self, task: &Task) -> Result<(), StoreError>;

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;
}
