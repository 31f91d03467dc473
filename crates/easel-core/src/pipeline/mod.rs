//! Action pipeline: composes one [`UnitOfWork`] per job action.
//!
//! Upload-carrying actions (create, describe, composite) upload each asset in
//! order and stop at the first non-success envelope. Every other action issues
//! exactly one dispatch with parameters resolved from [`params`].

pub mod params;
pub mod work;

use std::sync::Arc;

use crate::domain::{CompositeDimensions, InlineAsset, Task};
use crate::ports::{RemoteDispatcher, Target, TaskStore};

pub use self::work::{
    CompositeWork, CreateWork, DescribeWork, DispatchWork, SingleAction, UnitOfWork,
};

/// Builds units of work bound to the injected collaborators.
#[derive(Clone)]
pub struct ActionPipeline {
    remote: Arc<dyn RemoteDispatcher>,
    store: Arc<dyn TaskStore>,
}

impl ActionPipeline {
    pub fn new(remote: Arc<dyn RemoteDispatcher>, store: Arc<dyn TaskStore>) -> Self {
        Self { remote, store }
    }

    pub fn create(&self, assets: Vec<InlineAsset>) -> Box<dyn UnitOfWork> {
        Box::new(CreateWork {
            remote: Arc::clone(&self.remote),
            store: Arc::clone(&self.store),
            assets,
        })
    }

    pub fn describe(&self, asset: InlineAsset) -> Box<dyn UnitOfWork> {
        Box::new(DescribeWork {
            remote: Arc::clone(&self.remote),
            asset,
        })
    }

    pub fn composite(
        &self,
        assets: Vec<InlineAsset>,
        dimensions: CompositeDimensions,
    ) -> Box<dyn UnitOfWork> {
        Box::new(CompositeWork {
            remote: Arc::clone(&self.remote),
            assets,
            dimensions,
        })
    }

    pub fn upscale(&self, target: Target, index: u8) -> Box<dyn UnitOfWork> {
        self.single(SingleAction::Upscale { target, index })
    }

    pub fn variation(&self, target: Target, index: u8) -> Box<dyn UnitOfWork> {
        self.single(SingleAction::Variation { target, index })
    }

    pub fn reroll(&self, target: Target) -> Box<dyn UnitOfWork> {
        self.single(SingleAction::Reroll { target })
    }

    pub fn zoom(&self, task: &Task, target: Target) -> Box<dyn UnitOfWork> {
        let zoom = params::zoom_ratio(task.action);
        self.single(SingleAction::Zoom { target, zoom })
    }

    pub fn vary(&self, task: &Task, target: Target) -> Box<dyn UnitOfWork> {
        let strength = params::vary_strength(task.action);
        self.single(SingleAction::Vary { target, strength })
    }

    pub fn pan(&self, task: &Task, target: Target) -> Box<dyn UnitOfWork> {
        let direction = params::pan_direction(task.action);
        self.single(SingleAction::Pan { target, direction })
    }

    fn single(&self, action: SingleAction) -> Box<dyn UnitOfWork> {
        Box::new(DispatchWork {
            remote: Arc::clone(&self.remote),
            action,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{RecordingRemote, RecordingStore};
    use super::*;
    use crate::domain::{Nonce, ResultCode, ResultEnvelope, TaskAction, TaskId};
    use crate::impls::TimeoutDispatcher;
    use crate::ports::DispatchCall;
    use std::time::Duration;
    use ulid::Ulid;

    fn task(action: TaskAction, prompt: &str) -> (Task, Nonce) {
        let mut task = Task::new(TaskId::from_ulid(Ulid::new()), action, prompt);
        let nonce = Nonce::from_ulid(Ulid::new());
        task.assign_nonce(nonce);
        (task, nonce)
    }

    fn png(byte: u8) -> InlineAsset {
        InlineAsset::new("image/png", vec![byte])
    }

    fn pipeline() -> (ActionPipeline, Arc<RecordingRemote>, Arc<RecordingStore>) {
        let remote = Arc::new(RecordingRemote::default());
        let store = Arc::new(RecordingStore::default());
        (ActionPipeline::new(remote.clone(), store.clone()), remote, store)
    }

    #[tokio::test]
    async fn create_without_assets_dispatches_original_prompt() {
        let (pipeline, remote, store) = pipeline();
        let (mut task, nonce) = task(TaskAction::Create, "a red fox");

        let result = pipeline.create(vec![]).execute(&mut task).await;

        assert!(result.is_success());
        assert_eq!(remote.upload_count(), 0);
        assert_eq!(store.save_count(), 0);
        assert_eq!(
            remote.dispatched(),
            vec![DispatchCall::Create {
                prompt: "a red fox".to_string(),
                nonce
            }]
        );
        assert_eq!(task.prompt, "a red fox");
    }

    #[tokio::test]
    async fn create_with_assets_prefixes_prompt_and_persists_before_dispatch() {
        let (pipeline, remote, store) = pipeline();
        let (mut task, nonce) = task(TaskAction::Create, "a red fox");
        let id = task.id();

        let result = pipeline.create(vec![png(1), png(2)]).execute(&mut task).await;

        assert!(result.is_success());
        let expected_prompt = format!(
            "https://cdn.test/{id}.png https://cdn.test/{id}.png a red fox"
        );
        assert_eq!(task.prompt, expected_prompt);
        assert_eq!(task.prompt_en, expected_prompt);
        assert_eq!(task.description, format!("/imagine {expected_prompt}"));

        let saves = store.saves.lock().unwrap().clone();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].prompt, expected_prompt);

        assert_eq!(
            remote.dispatched(),
            vec![DispatchCall::Create {
                prompt: expected_prompt,
                nonce
            }]
        );
    }

    #[tokio::test]
    async fn create_stops_at_first_failed_upload() {
        let (pipeline, remote, store) = pipeline();
        let (mut task, _) = task(TaskAction::Create, "a red fox");
        let failure = ResultEnvelope::failure(ResultCode::UploadFailed, "413 payload too large");
        remote.script_upload(failure.clone());

        let result = pipeline.create(vec![png(1), png(2)]).execute(&mut task).await;

        assert_eq!(result, failure);
        assert_eq!(remote.upload_count(), 1);
        assert!(remote.dispatched().is_empty());
        assert_eq!(store.save_count(), 0);
        assert_eq!(task.prompt, "a red fox");
    }

    #[tokio::test]
    async fn create_persistence_failure_never_dispatches() {
        let remote = Arc::new(RecordingRemote::default());
        let store = Arc::new(RecordingStore::failing());
        let pipeline = ActionPipeline::new(remote.clone(), store);
        let (mut task, _) = task(TaskAction::Create, "a red fox");

        let result = pipeline.create(vec![png(1)]).execute(&mut task).await;

        assert_eq!(result.code, ResultCode::PersistenceFailed);
        assert!(remote.dispatched().is_empty());
    }

    #[tokio::test]
    async fn composite_uploads_in_order_and_passes_refs_through() {
        let (pipeline, remote, _) = pipeline();
        let (mut task, nonce) = task(TaskAction::Composite, "");
        for name in ["first", "second", "third"] {
            remote.script_upload(ResultEnvelope::success(name.to_string()));
        }

        let result = pipeline
            .composite(vec![png(1), png(2), png(3)], CompositeDimensions::Landscape)
            .execute(&mut task)
            .await;

        assert!(result.is_success());
        assert_eq!(remote.upload_count(), 3);
        assert_eq!(
            remote.dispatched(),
            vec![DispatchCall::Composite {
                file_names: vec!["first".into(), "second".into(), "third".into()],
                dimensions: CompositeDimensions::Landscape,
                nonce
            }]
        );
    }

    #[tokio::test]
    async fn describe_dispatches_uploaded_reference() {
        let (pipeline, remote, _) = pipeline();
        let (mut task, nonce) = task(TaskAction::Describe, "");
        remote.script_upload(ResultEnvelope::success("hosted.jpg".to_string()));

        let result = pipeline
            .describe(InlineAsset::new("image/jpeg", vec![9]))
            .execute(&mut task)
            .await;

        assert!(result.is_success());
        assert_eq!(
            remote.uploads.lock().unwrap().clone(),
            vec![format!("{}.jpg", task.id())]
        );
        assert_eq!(
            remote.dispatched(),
            vec![DispatchCall::Describe {
                file_name: "hosted.jpg".into(),
                nonce
            }]
        );
    }

    #[tokio::test]
    async fn upload_success_without_reference_is_an_upload_failure() {
        let (pipeline, remote, _) = pipeline();
        let (mut task, _) = task(TaskAction::Describe, "");
        remote.script_upload(ResultEnvelope {
            code: ResultCode::Success,
            description: "ok".into(),
            payload: None,
        });

        let result = pipeline.describe(png(1)).execute(&mut task).await;

        assert_eq!(result.code, ResultCode::UploadFailed);
        assert!(remote.dispatched().is_empty());
    }

    #[tokio::test]
    async fn single_dispatch_actions_resolve_parameters() {
        let (pipeline, remote, _) = pipeline();
        let target = Target::new("m-1", "h-1").with_flags(64);

        let (mut zoom, zoom_nonce) = task(TaskAction::ZoomNear, "");
        pipeline.zoom(&zoom, target.clone()).execute(&mut zoom).await;
        let (mut vary, vary_nonce) = task(TaskAction::VaryLow, "");
        pipeline.vary(&vary, target.clone()).execute(&mut vary).await;
        let (mut pan, pan_nonce) = task(TaskAction::PanLeft, "");
        pipeline.pan(&pan, target.clone()).execute(&mut pan).await;

        assert_eq!(
            remote.dispatched(),
            vec![
                DispatchCall::Zoom {
                    target: target.clone(),
                    zoom: "75",
                    nonce: zoom_nonce
                },
                DispatchCall::Vary {
                    target: target.clone(),
                    strength: "low_variation",
                    nonce: vary_nonce
                },
                DispatchCall::Pan {
                    target,
                    direction: "pan_left",
                    nonce: pan_nonce
                },
            ]
        );
    }

    #[tokio::test]
    async fn upscale_variation_reroll_carry_target_and_index() {
        let (pipeline, remote, _) = pipeline();
        let target = Target::new("m-2", "h-2");

        let (mut up, up_nonce) = task(TaskAction::Upscale, "");
        pipeline.upscale(target.clone(), 3).execute(&mut up).await;
        let (mut var, var_nonce) = task(TaskAction::Variation, "");
        pipeline.variation(target.clone(), 2).execute(&mut var).await;
        let (mut rr, rr_nonce) = task(TaskAction::Reroll, "");
        pipeline.reroll(target.clone()).execute(&mut rr).await;

        assert_eq!(
            remote.dispatched(),
            vec![
                DispatchCall::Upscale {
                    target: target.clone(),
                    index: 3,
                    nonce: up_nonce
                },
                DispatchCall::Variation {
                    target: target.clone(),
                    index: 2,
                    nonce: var_nonce
                },
                DispatchCall::Reroll {
                    target,
                    nonce: rr_nonce
                },
            ]
        );
    }

    #[tokio::test]
    async fn dispatch_failure_is_returned_verbatim() {
        let (pipeline, remote, _) = pipeline();
        let failure = ResultEnvelope::failure(ResultCode::DispatchFailed, "interaction rejected: 400");
        remote.fail_dispatch(failure.clone());
        let (mut task, _) = task(TaskAction::Reroll, "");

        let result = pipeline.reroll(Target::new("m", "h")).execute(&mut task).await;

        assert_eq!(result, failure);
    }

    #[tokio::test]
    async fn missing_nonce_is_rejected_before_any_remote_call() {
        let (pipeline, remote, _) = pipeline();
        let mut task = Task::new(TaskId::from_ulid(Ulid::new()), TaskAction::Create, "x");

        let result = pipeline.create(vec![png(1)]).execute(&mut task).await;

        assert_eq!(result.code, ResultCode::InvalidActionParameter);
        assert_eq!(remote.upload_count(), 0);
        assert!(remote.dispatched().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_upload_times_out_and_aborts_create() {
        let remote = Arc::new(RecordingRemote::default());
        remote.stall();
        let store = Arc::new(RecordingStore::default());
        let bounded = TimeoutDispatcher::new(remote.clone(), Duration::from_secs(30));
        let pipeline = ActionPipeline::new(Arc::new(bounded), store.clone());
        let (mut task, _) = task(TaskAction::Create, "a red fox");

        let result = pipeline.create(vec![png(1), png(2)]).execute(&mut task).await;

        assert_eq!(result.code, ResultCode::Timeout);
        assert_eq!(remote.upload_count(), 1);
        assert!(remote.dispatched().is_empty());
        assert_eq!(store.save_count(), 0);
        assert_eq!(task.prompt, "a red fox");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_composite_upload_times_out_before_dispatch() {
        let remote = Arc::new(RecordingRemote::default());
        remote.stall();
        let bounded = TimeoutDispatcher::new(remote.clone(), Duration::from_secs(30));
        let pipeline = ActionPipeline::new(Arc::new(bounded), Arc::new(RecordingStore::default()));
        let (mut task, _) = task(TaskAction::Composite, "");

        let result = pipeline
            .composite(vec![png(1), png(2)], CompositeDimensions::Square)
            .execute(&mut task)
            .await;

        assert_eq!(result.code, ResultCode::Timeout);
        assert_eq!(remote.upload_count(), 1);
        assert!(remote.dispatched().is_empty());
    }
}
