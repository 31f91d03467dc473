//! Task record handed through pipeline and queue.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::TaskAction;
use super::ids::{Nonce, TaskId};

/// Property key holding the correlation token.
pub const PROPERTY_NONCE: &str = "nonce";

/// Lifecycle of a task.
///
/// - NotStart -> Submitted (accepted, waiting for a slot)
/// - Submitted -> InProgress (unit of work running, or dispatched and awaiting
///   the backend acknowledgment)
/// - Submitted -> Cancelled (withdrawn before a slot was granted)
/// - InProgress -> Success | Failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    NotStart,
    Submitted,
    InProgress,
    Success,
    Failure,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failure | TaskStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    pub action: TaskAction,
    pub prompt: String,
    /// Normalized (translated) prompt actually sent to the backend.
    pub prompt_en: String,
    pub description: String,
    #[serde(default)]
    properties: HashMap<String, serde_json::Value>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: TaskId, action: TaskAction, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        Self {
            id,
            action,
            prompt_en: prompt.clone(),
            prompt,
            description: String::new(),
            properties: HashMap::new(),
            status: TaskStatus::NotStart,
            progress: None,
            fail_reason: None,
            submit_time: None,
            start_time: None,
            finish_time: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Correlation token, if one has been assigned.
    pub fn nonce(&self) -> Option<Nonce> {
        self.properties
            .get(PROPERTY_NONCE)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }

    /// Assign the correlation token.
    ///
    /// Returns `false` and leaves the task untouched if a token is already set.
    pub fn assign_nonce(&mut self, nonce: Nonce) -> bool {
        if self.properties.contains_key(PROPERTY_NONCE) {
            return false;
        }
        self.properties.insert(
            PROPERTY_NONCE.to_string(),
            serde_json::Value::String(nonce.to_string()),
        );
        true
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    /// Set a free-form property. The nonce key is reserved for
    /// [`Task::assign_nonce`] and is ignored here.
    pub fn set_property(&mut self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        if key == PROPERTY_NONCE {
            return;
        }
        self.properties.insert(key, value);
    }

    pub fn properties(&self) -> &HashMap<String, serde_json::Value> {
        &self.properties
    }

    /// Prefix both prompt variants with uploaded image references and refresh
    /// the description.
    pub fn prepend_image_refs(&mut self, refs: &[String]) {
        if refs.is_empty() {
            return;
        }
        let joined = refs.join(" ");
        self.prompt = format!("{joined} {}", self.prompt);
        self.prompt_en = format!("{joined} {}", self.prompt_en);
        self.description = format!("/imagine {}", self.prompt);
    }

    pub fn mark_submitted(&mut self, at: DateTime<Utc>) {
        self.status = TaskStatus::Submitted;
        self.submit_time = Some(at);
    }

    pub fn mark_started(&mut self, at: DateTime<Utc>) {
        self.status = TaskStatus::InProgress;
        self.start_time = Some(at);
    }

    /// Dispatch accepted; the task now waits for the backend acknowledgment.
    pub fn mark_dispatched(&mut self) {
        self.status = TaskStatus::InProgress;
        self.progress = Some("0%".to_string());
    }

    /// Backend acknowledged the finished job.
    pub fn mark_succeeded(&mut self, at: DateTime<Utc>) {
        self.status = TaskStatus::Success;
        self.progress = Some("100%".to_string());
        self.finish_time = Some(at);
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
        self.status = TaskStatus::Failure;
        self.fail_reason = Some(reason.into());
        self.progress = None;
        self.finish_time = Some(at);
    }

    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) {
        self.status = TaskStatus::Cancelled;
        self.finish_time = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn task(prompt: &str) -> Task {
        Task::new(TaskId::from_ulid(Ulid::new()), TaskAction::Create, prompt)
    }

    #[test]
    fn nonce_is_assigned_once() {
        let mut t = task("a cat");
        let first = Nonce::from_ulid(Ulid::new());
        let second = Nonce::from_ulid(Ulid::new());

        assert!(t.assign_nonce(first));
        assert!(!t.assign_nonce(second));
        assert_eq!(t.nonce(), Some(first));
    }

    #[test]
    fn set_property_cannot_overwrite_nonce() {
        let mut t = task("a cat");
        let nonce = Nonce::from_ulid(Ulid::new());
        t.assign_nonce(nonce);
        t.set_property(PROPERTY_NONCE, serde_json::json!("forged"));
        t.set_property("channel", serde_json::json!("c-1"));

        assert_eq!(t.nonce(), Some(nonce));
        assert_eq!(t.property("channel"), Some(&serde_json::json!("c-1")));
    }

    #[test]
    fn prepend_image_refs_updates_both_prompts() {
        let mut t = task("a cat");
        t.prompt_en = "a cat, translated".to_string();
        t.prepend_image_refs(&["https://cdn/a.png".to_string(), "https://cdn/b.png".to_string()]);

        assert_eq!(t.prompt, "https://cdn/a.png https://cdn/b.png a cat");
        assert_eq!(t.prompt_en, "https://cdn/a.png https://cdn/b.png a cat, translated");
        assert_eq!(t.description, "/imagine https://cdn/a.png https://cdn/b.png a cat");
    }

    #[test]
    fn prepend_nothing_is_a_no_op() {
        let mut t = task("a cat");
        t.prepend_image_refs(&[]);
        assert_eq!(t.prompt, "a cat");
        assert!(t.description.is_empty());
    }

    #[test]
    fn status_terminality() {
        assert!(!TaskStatus::Submitted.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Failure.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }
}
