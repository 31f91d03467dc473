//! InMemoryTaskStore - task records for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::{StoreError, Task, TaskId};
use crate::ports::TaskStore;

/// Keeps the latest snapshot of every task.
///
/// Records are stored encoded, so a reader never observes a half-updated
/// task and the encode path is the same one a real backend would take.
#[derive(Default)]
pub struct InMemoryTaskStore {
    records: RwLock<HashMap<TaskId, Value>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Every stored task, oldest id first.
    pub async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let records = self.records.read().await;
        let mut tasks = records
            .values()
            .map(|value| serde_json::from_value::<Task>(value.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        tasks.sort_by_key(|task| task.id().as_ulid());
        Ok(tasks)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let value = serde_json::to_value(task)?;
        self.records.write().await.insert(task.id(), value);
        Ok(())
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let records = self.records.read().await;
        match records.get(&id) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Nonce, TaskAction, TaskStatus};
    use ulid::Ulid;

    fn task(prompt: &str) -> Task {
        Task::new(TaskId::from_ulid(Ulid::new()), TaskAction::Create, prompt)
    }

    #[tokio::test]
    async fn save_then_get_returns_same_task() {
        let store = InMemoryTaskStore::new();
        let mut task = task("a lighthouse at dusk");
        task.assign_nonce(Nonce::from_ulid(Ulid::new()));

        store.save(&task).await.unwrap();

        assert_eq!(store.get(task.id()).await.unwrap(), Some(task));
    }

    #[tokio::test]
    async fn save_replaces_previous_snapshot() {
        let store = InMemoryTaskStore::new();
        let mut task = task("prompt");
        store.save(&task).await.unwrap();

        task.status = TaskStatus::Submitted;
        store.save(&task).await.unwrap();

        assert_eq!(store.len().await, 1);
        let stored = store.get(task.id()).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Submitted);
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let store = InMemoryTaskStore::new();
        assert!(store.is_empty().await);
        assert!(
            store
                .get(TaskId::from_ulid(Ulid::new()))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn list_is_ordered_by_id() {
        let store = InMemoryTaskStore::new();
        let first = Task::new(TaskId::from_ulid(Ulid::from_parts(1, 1)), TaskAction::Create, "one");
        let second = Task::new(TaskId::from_ulid(Ulid::from_parts(2, 1)), TaskAction::Create, "two");
        store.save(&second).await.unwrap();
        store.save(&first).await.unwrap();

        let prompts: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.prompt)
            .collect();
        assert_eq!(prompts, vec!["one", "two"]);
    }
}
