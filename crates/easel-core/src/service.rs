//! TaskService - the submission surface.
//!
//! Builds tasks, checks action parameters, then routes every action through the
//! [`ActionPipeline`] and the [`TaskQueue`].

use std::sync::Arc;

use tracing::warn;

use crate::domain::{
    CompositeDimensions, InlineAsset, Nonce, ResultCode, StoreError, SubmitResult, Task, TaskAction,
    TaskId,
};
use crate::pipeline::ActionPipeline;
use crate::ports::{Clock, IdGenerator, RemoteDispatcher, Target, TaskStore};
use crate::queue::{Completion, QueueConfig, QueueCounts, TaskQueue};

/// Image positions addressable by upscale and variation.
const IMAGE_INDEXES: std::ops::RangeInclusive<u8> = 1..=4;

/// Number of images a composite accepts.
const COMPOSITE_ASSETS: std::ops::RangeInclusive<usize> = 2..=5;

pub struct TaskService {
    pipeline: ActionPipeline,
    queue: TaskQueue,
    store: Arc<dyn TaskStore>,
    ids: Arc<dyn IdGenerator>,
}

impl TaskService {
    /// Wire the pipeline and start the queue. Must be called from within a
    /// Tokio runtime.
    pub fn new(
        config: QueueConfig,
        remote: Arc<dyn RemoteDispatcher>,
        store: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            pipeline: ActionPipeline::new(remote, Arc::clone(&store)),
            queue: TaskQueue::start(config, Arc::clone(&store), clock),
            store,
            ids,
        }
    }

    /// A fresh task with its id and correlation token assigned.
    pub fn new_task(&self, action: TaskAction, prompt: impl Into<String>) -> Task {
        let mut task = Task::new(self.ids.generate_task_id(), action, prompt);
        task.assign_nonce(self.ids.generate_nonce());
        task
    }

    pub async fn submit_create(&self, task: Task, assets: Vec<InlineAsset>) -> SubmitResult {
        if let Err(rejected) = expect_action(&task, &[TaskAction::Create]) {
            return rejected;
        }
        let work = self.pipeline.create(assets);
        self.queue.submit(task, work).await
    }

    pub async fn submit_upscale(&self, task: Task, target: Target, index: u8) -> SubmitResult {
        if let Err(rejected) = expect_action(&task, &[TaskAction::Upscale])
            .and_then(|()| expect_index(&task, index))
        {
            return rejected;
        }
        let work = self.pipeline.upscale(target, index);
        self.queue.submit(task, work).await
    }

    pub async fn submit_variation(&self, task: Task, target: Target, index: u8) -> SubmitResult {
        if let Err(rejected) = expect_action(&task, &[TaskAction::Variation])
            .and_then(|()| expect_index(&task, index))
        {
            return rejected;
        }
        let work = self.pipeline.variation(target, index);
        self.queue.submit(task, work).await
    }

    pub async fn submit_reroll(&self, task: Task, target: Target) -> SubmitResult {
        if let Err(rejected) = expect_action(&task, &[TaskAction::Reroll]) {
            return rejected;
        }
        let work = self.pipeline.reroll(target);
        self.queue.submit(task, work).await
    }

    pub async fn submit_describe(&self, task: Task, asset: InlineAsset) -> SubmitResult {
        if let Err(rejected) = expect_action(&task, &[TaskAction::Describe]) {
            return rejected;
        }
        let work = self.pipeline.describe(asset);
        self.queue.submit(task, work).await
    }

    pub async fn submit_composite(
        &self,
        task: Task,
        assets: Vec<InlineAsset>,
        dimensions: CompositeDimensions,
    ) -> SubmitResult {
        if let Err(rejected) = expect_action(&task, &[TaskAction::Composite]) {
            return rejected;
        }
        if !COMPOSITE_ASSETS.contains(&assets.len()) {
            return invalid(
                &task,
                format!(
                    "composite takes {} to {} images, got {}",
                    COMPOSITE_ASSETS.start(),
                    COMPOSITE_ASSETS.end(),
                    assets.len()
                ),
            );
        }
        let work = self.pipeline.composite(assets, dimensions);
        self.queue.submit(task, work).await
    }

    pub async fn submit_zoom(&self, task: Task, target: Target) -> SubmitResult {
        if let Err(rejected) =
            expect_action(&task, &[TaskAction::ZoomNear, TaskAction::ZoomFar])
        {
            return rejected;
        }
        let work = self.pipeline.zoom(&task, target);
        self.queue.submit(task, work).await
    }

    pub async fn submit_vary(&self, task: Task, target: Target) -> SubmitResult {
        if let Err(rejected) =
            expect_action(&task, &[TaskAction::VaryHigh, TaskAction::VaryLow])
        {
            return rejected;
        }
        let work = self.pipeline.vary(&task, target);
        self.queue.submit(task, work).await
    }

    pub async fn submit_pan(&self, task: Task, target: Target) -> SubmitResult {
        if let Err(rejected) = expect_action(
            &task,
            &[
                TaskAction::PanUp,
                TaskAction::PanDown,
                TaskAction::PanLeft,
                TaskAction::PanRight,
            ],
        ) {
            return rejected;
        }
        let work = self.pipeline.pan(&task, target);
        self.queue.submit(task, work).await
    }

    /// Latest stored record for `id`.
    pub async fn task(&self, id: TaskId) -> Result<Task, StoreError> {
        self.store.get(id).await?.ok_or(StoreError::NotFound(id))
    }

    /// Withdraw a task still waiting for a slot.
    pub async fn cancel(&self, id: TaskId) -> bool {
        self.queue.cancel(id).await
    }

    /// In-flight task matching a backend message's correlation token.
    pub fn find_running_by_nonce(&self, nonce: Nonce) -> Option<Task> {
        self.queue.find_running_by_nonce(nonce)
    }

    /// Record the backend's final word on a dispatched task.
    pub async fn acknowledge(&self, nonce: Nonce, completion: Completion) -> Option<Task> {
        self.queue.acknowledge(nonce, completion).await
    }

    pub fn counts(&self) -> QueueCounts {
        self.queue.counts()
    }

    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}

fn expect_action(task: &Task, allowed: &[TaskAction]) -> Result<(), SubmitResult> {
    if allowed.contains(&task.action) {
        return Ok(());
    }
    Err(invalid(
        task,
        format!("task action {} does not match this submission", task.action),
    ))
}

fn expect_index(task: &Task, index: u8) -> Result<(), SubmitResult> {
    if IMAGE_INDEXES.contains(&index) {
        return Ok(());
    }
    Err(invalid(
        task,
        format!(
            "image index must be between {} and {}, got {index}",
            IMAGE_INDEXES.start(),
            IMAGE_INDEXES.end()
        ),
    ))
}

fn invalid(task: &Task, description: String) -> SubmitResult {
    warn!(task_id = %task.id(), "rejected submission: {description}");
    let mut rejected = SubmitResult::rejected(ResultCode::InvalidActionParameter, description);
    rejected.task_id = Some(task.id());
    rejected
}
