//! Result envelopes: the one outcome shape shared by remote calls, pipeline
//! steps and the queue.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::TaskId;

/// Status code of an envelope. Only `Success` lets a pipeline continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Success,
    UploadFailed,
    DispatchFailed,
    QueueFull,
    Timeout,
    PersistenceFailed,
    InvalidActionParameter,
    Cancelled,
}

impl ResultCode {
    pub fn is_success(self) -> bool {
        matches!(self, ResultCode::Success)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultCode::Success => "SUCCESS",
            ResultCode::UploadFailed => "UPLOAD_FAILED",
            ResultCode::DispatchFailed => "DISPATCH_FAILED",
            ResultCode::QueueFull => "QUEUE_FULL",
            ResultCode::Timeout => "TIMEOUT",
            ResultCode::PersistenceFailed => "PERSISTENCE_FAILED",
            ResultCode::InvalidActionParameter => "INVALID_ACTION_PARAMETER",
            ResultCode::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// `{code, description, payload}` produced by every remote call and step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
    pub code: ResultCode,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T> ResultEnvelope<T> {
    pub fn success(payload: T) -> Self {
        Self {
            code: ResultCode::Success,
            description: "success".to_string(),
            payload: Some(payload),
        }
    }

    pub fn failure(code: ResultCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

/// Caller-facing result of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub code: ResultCode,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

impl SubmitResult {
    /// Report an envelope unchanged, tagged with the task it belongs to.
    pub fn from_envelope(task_id: TaskId, envelope: ResultEnvelope<String>) -> Self {
        Self {
            code: envelope.code,
            description: envelope.description,
            payload: envelope.payload,
            task_id: Some(task_id),
        }
    }

    pub fn rejected(code: ResultCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            payload: None,
            task_id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}
