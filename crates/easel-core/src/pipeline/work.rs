//! Units of work: the deferred commands handed to the queue.
//!
//! A unit owns its collaborators and action context. The queue lends it the
//! task for the duration of [`UnitOfWork::execute`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{
    CompositeDimensions, InlineAsset, Nonce, ResultCode, ResultEnvelope, Task, TaskId,
};
use crate::ports::{DispatchCall, RemoteDispatcher, Target, TaskStore};

/// A composed sequence of upload steps followed by one dispatch.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Run every step. The first non-success envelope is returned unchanged.
    async fn execute(self: Box<Self>, task: &mut Task) -> ResultEnvelope<String>;
}

fn require_nonce(task: &Task) -> Result<Nonce, ResultEnvelope<String>> {
    task.nonce().ok_or_else(|| {
        ResultEnvelope::failure(
            ResultCode::InvalidActionParameter,
            format!("task {} has no correlation token", task.id()),
        )
    })
}

/// Upload `assets` in order, collecting the hosted references.
async fn upload_all(
    remote: &dyn RemoteDispatcher,
    task_id: TaskId,
    assets: &[InlineAsset],
) -> Result<Vec<String>, ResultEnvelope<String>> {
    let mut refs = Vec::with_capacity(assets.len());
    for asset in assets {
        let file_name = asset.file_name(task_id);
        debug!(task_id = %task_id, file_name = %file_name, "uploading asset");
        let uploaded = remote.upload(&file_name, asset).await;
        if !uploaded.is_success() {
            warn!(task_id = %task_id, code = %uploaded.code, "upload failed: {}", uploaded.description);
            return Err(uploaded);
        }
        match uploaded.payload {
            Some(reference) => refs.push(reference),
            None => {
                return Err(ResultEnvelope::failure(
                    ResultCode::UploadFailed,
                    format!("upload of {file_name} returned no reference"),
                ));
            }
        }
    }
    Ok(refs)
}

async fn dispatch(
    remote: &dyn RemoteDispatcher,
    task_id: TaskId,
    call: DispatchCall,
) -> ResultEnvelope<String> {
    let kind = call.kind();
    debug!(task_id = %task_id, kind, "dispatching");
    let result = remote.dispatch(call).await;
    if !result.is_success() {
        warn!(task_id = %task_id, kind, code = %result.code, "dispatch failed: {}", result.description);
    }
    result
}

/// Create: upload reference images, fold them into the prompt, persist, dispatch.
pub struct CreateWork {
    pub(crate) remote: Arc<dyn RemoteDispatcher>,
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) assets: Vec<InlineAsset>,
}

#[async_trait]
impl UnitOfWork for CreateWork {
    async fn execute(self: Box<Self>, task: &mut Task) -> ResultEnvelope<String> {
        let nonce = match require_nonce(task) {
            Ok(nonce) => nonce,
            Err(invalid) => return invalid,
        };
        let refs = match upload_all(self.remote.as_ref(), task.id(), &self.assets).await {
            Ok(refs) => refs,
            Err(failed) => return failed,
        };
        if !refs.is_empty() {
            task.prepend_image_refs(&refs);
            if let Err(e) = self.store.save(task).await {
                warn!(task_id = %task.id(), "failed to persist prompt update: {e}");
                return e.into_envelope();
            }
        }
        let call = DispatchCall::Create {
            prompt: task.prompt_en.clone(),
            nonce,
        };
        dispatch(self.remote.as_ref(), task.id(), call).await
    }
}

/// Describe: upload one image, ask the backend to describe it.
pub struct DescribeWork {
    pub(crate) remote: Arc<dyn RemoteDispatcher>,
    pub(crate) asset: InlineAsset,
}

#[async_trait]
impl UnitOfWork for DescribeWork {
    async fn execute(self: Box<Self>, task: &mut Task) -> ResultEnvelope<String> {
        let nonce = match require_nonce(task) {
            Ok(nonce) => nonce,
            Err(invalid) => return invalid,
        };
        let mut refs =
            match upload_all(self.remote.as_ref(), task.id(), std::slice::from_ref(&self.asset))
                .await
            {
                Ok(refs) => refs,
                Err(failed) => return failed,
            };
        let Some(file_name) = refs.pop() else {
            return ResultEnvelope::failure(ResultCode::UploadFailed, "describe upload produced no reference");
        };
        let call = DispatchCall::Describe { file_name, nonce };
        dispatch(self.remote.as_ref(), task.id(), call).await
    }
}

/// Composite: upload every image, blend them in input order.
pub struct CompositeWork {
    pub(crate) remote: Arc<dyn RemoteDispatcher>,
    pub(crate) assets: Vec<InlineAsset>,
    pub(crate) dimensions: CompositeDimensions,
}

#[async_trait]
impl UnitOfWork for CompositeWork {
    async fn execute(self: Box<Self>, task: &mut Task) -> ResultEnvelope<String> {
        let nonce = match require_nonce(task) {
            Ok(nonce) => nonce,
            Err(invalid) => return invalid,
        };
        let file_names = match upload_all(self.remote.as_ref(), task.id(), &self.assets).await {
            Ok(refs) => refs,
            Err(failed) => return failed,
        };
        let call = DispatchCall::Composite {
            file_names,
            dimensions: self.dimensions,
            nonce,
        };
        dispatch(self.remote.as_ref(), task.id(), call).await
    }
}

/// Parameters of an action that needs no upload. Variant parameters are
/// already resolved when the unit is composed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleAction {
    Upscale { target: Target, index: u8 },
    Variation { target: Target, index: u8 },
    Reroll { target: Target },
    Zoom { target: Target, zoom: &'static str },
    Vary { target: Target, strength: &'static str },
    Pan { target: Target, direction: &'static str },
}

impl SingleAction {
    fn into_call(self, nonce: Nonce) -> DispatchCall {
        match self {
            SingleAction::Upscale { target, index } => DispatchCall::Upscale { target, index, nonce },
            SingleAction::Variation { target, index } => {
                DispatchCall::Variation { target, index, nonce }
            }
            SingleAction::Reroll { target } => DispatchCall::Reroll { target, nonce },
            SingleAction::Zoom { target, zoom } => DispatchCall::Zoom { target, zoom, nonce },
            SingleAction::Vary { target, strength } => DispatchCall::Vary { target, strength, nonce },
            SingleAction::Pan { target, direction } => DispatchCall::Pan { target, direction, nonce },
        }
    }
}

/// Exactly one dispatch call, no uploads.
pub struct DispatchWork {
    pub(crate) remote: Arc<dyn RemoteDispatcher>,
    pub(crate) action: SingleAction,
}

#[async_trait]
impl UnitOfWork for DispatchWork {
    async fn execute(self: Box<Self>, task: &mut Task) -> ResultEnvelope<String> {
        let nonce = match require_nonce(task) {
            Ok(nonce) => nonce,
            Err(invalid) => return invalid,
        };
        let call = self.action.into_call(nonce);
        dispatch(self.remote.as_ref(), task.id(), call).await
    }
}
