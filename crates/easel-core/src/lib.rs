//! easel-core
//!
//! Submission engine for an image-generation backend. Each action becomes a
//! unit of work (uploads followed by one dispatch) that runs on a bounded FIFO
//! queue; every submission is answered with a uniform result envelope.
//!
//! # Modules
//! - **domain**: ids, actions, tasks, assets, result envelopes, errors
//! - **ports**: RemoteDispatcher, TaskStore, Clock, IdGenerator
//! - **pipeline**: action-to-parameter tables and units of work
//! - **queue**: bounded concurrency, FIFO admission, cancellation
//! - **impls**: in-memory store, timeout decorator
//! - **service**: the `submit_*` surface
//! - **config**: environment settings

pub mod config;
pub mod domain;
pub mod impls;
pub mod pipeline;
pub mod ports;
pub mod queue;
pub mod service;

pub use config::{ConfigError, EaselConfig};
pub use domain::{
    CompositeDimensions, InlineAsset, ResultCode, ResultEnvelope, SubmitResult, Task, TaskAction,
    TaskId, TaskStatus,
};
pub use queue::{Completion, QueueConfig, QueueCounts, TaskQueue};
pub use service::TaskService;
