//! RemoteDispatcher port - the generation backend client.
//!
//! The wire protocol lives behind this trait. Every call returns a
//! [`ResultEnvelope`]; transport problems are reported through its code, never
//! as a Rust error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{CompositeDimensions, InlineAsset, Nonce, ResultEnvelope};

/// A previously generated message that an action operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub message_id: String,
    pub message_hash: String,
    #[serde(default)]
    pub flags: u32,
}

impl Target {
    pub fn new(message_id: impl Into<String>, message_hash: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            message_hash: message_hash.into(),
            flags: 0,
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

/// One dispatch call, one variant per action kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchCall {
    Create {
        prompt: String,
        nonce: Nonce,
    },
    Upscale {
        target: Target,
        index: u8,
        nonce: Nonce,
    },
    Variation {
        target: Target,
        index: u8,
        nonce: Nonce,
    },
    Reroll {
        target: Target,
        nonce: Nonce,
    },
    Describe {
        file_name: String,
        nonce: Nonce,
    },
    Composite {
        file_names: Vec<String>,
        dimensions: CompositeDimensions,
        nonce: Nonce,
    },
    Zoom {
        target: Target,
        zoom: &'static str,
        nonce: Nonce,
    },
    Vary {
        target: Target,
        strength: &'static str,
        nonce: Nonce,
    },
    Pan {
        target: Target,
        direction: &'static str,
        nonce: Nonce,
    },
}

impl DispatchCall {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchCall::Create { .. } => "create",
            DispatchCall::Upscale { .. } => "upscale",
            DispatchCall::Variation { .. } => "variation",
            DispatchCall::Reroll { .. } => "reroll",
            DispatchCall::Describe { .. } => "describe",
            DispatchCall::Composite { .. } => "composite",
            DispatchCall::Zoom { .. } => "zoom",
            DispatchCall::Vary { .. } => "vary",
            DispatchCall::Pan { .. } => "pan",
        }
    }

    pub fn nonce(&self) -> Nonce {
        match self {
            DispatchCall::Create { nonce, .. }
            | DispatchCall::Upscale { nonce, .. }
            | DispatchCall::Variation { nonce, .. }
            | DispatchCall::Reroll { nonce, .. }
            | DispatchCall::Describe { nonce, .. }
            | DispatchCall::Composite { nonce, .. }
            | DispatchCall::Zoom { nonce, .. }
            | DispatchCall::Vary { nonce, .. }
            | DispatchCall::Pan { nonce, .. } => *nonce,
        }
    }
}

/// Performs the network calls against the generation backend.
///
/// # Thread Safety
/// Shared by every unit of work through `Arc<dyn RemoteDispatcher>`.
#[async_trait]
pub trait RemoteDispatcher: Send + Sync {
    /// Store `asset` remotely; the payload on success is the hosted reference.
    async fn upload(&self, file_name: &str, asset: &InlineAsset) -> ResultEnvelope<String>;

    /// Issue an action; the payload on success is the acknowledgment reference.
    async fn dispatch(&self, call: DispatchCall) -> ResultEnvelope<String>;
}
