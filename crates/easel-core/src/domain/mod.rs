//! Domain model: ids, actions, tasks, assets and result envelopes.

pub mod action;
pub mod asset;
pub mod errors;
pub mod ids;
pub mod result;
pub mod task;

pub use action::{CompositeDimensions, TaskAction};
pub use asset::{AssetError, InlineAsset};
pub use errors::StoreError;
pub use ids::{Nonce, TaskId};
pub use result::{ResultCode, ResultEnvelope, SubmitResult};
pub use task::{PROPERTY_NONCE, Task, TaskStatus};
