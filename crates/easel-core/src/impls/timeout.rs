//! TimeoutDispatcher - bounds every remote call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{InlineAsset, ResultCode, ResultEnvelope};
use crate::ports::{DispatchCall, RemoteDispatcher};

/// Wraps another dispatcher and turns a call that outlives `limit` into a
/// `TIMEOUT` envelope. The inner call is dropped at that point.
pub struct TimeoutDispatcher {
    inner: Arc<dyn RemoteDispatcher>,
    limit: Duration,
}

impl TimeoutDispatcher {
    pub fn new(inner: Arc<dyn RemoteDispatcher>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    fn timed_out(&self, what: &str) -> ResultEnvelope<String> {
        warn!(limit_ms = self.limit.as_millis() as u64, "{what} timed out");
        ResultEnvelope::failure(
            ResultCode::Timeout,
            format!("{what} did not complete within {:?}", self.limit),
        )
    }
}

#[async_trait]
impl RemoteDispatcher for TimeoutDispatcher {
    async fn upload(&self, file_name: &str, asset: &InlineAsset) -> ResultEnvelope<String> {
        match tokio::time::timeout(self.limit, self.inner.upload(file_name, asset)).await {
            Ok(envelope) => envelope,
            Err(_) => self.timed_out(&format!("upload of {file_name}")),
        }
    }

    async fn dispatch(&self, call: DispatchCall) -> ResultEnvelope<String> {
        let kind = call.kind();
        match tokio::time::timeout(self.limit, self.inner.dispatch(call)).await {
            Ok(envelope) => envelope,
            Err(_) => self.timed_out(&format!("{kind} dispatch")),
        }
    }
}
