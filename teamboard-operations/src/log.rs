//! Activity log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

/// One executed operation, as recorded in the activity log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ULID of this entry
    pub id: String,

    pub timestamp: DateTime<Utc>,

    /// Canonical op string (e.g. "reorder task", "move task")
    pub op: String,

    /// Normalized input parameters
    pub input: Value,

    /// Result summary, or `{"error": ...}`
    pub output: Value,

    /// Who performed the operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// Time until the operation returned. For optimistic operations this covers the
    /// local phase only, remote settlement happens later.
    pub duration_ms: u64,
}

impl LogEntry {
    pub fn new(
        op: impl Into<String>,
        input: Value,
        output: Value,
        actor: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            timestamp: Utc::now(),
            op: op.into(),
            input,
            output,
            actor,
            duration_ms,
        }
    }

    /// Entry whose duration is measured from `started` to now
    pub fn since(op: impl Into<String>, input: Value, output: Value, started: Instant) -> Self {
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Self::new(op, input, output, None, duration_ms)
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.output.get("error").is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_actor_is_omitted_when_absent() {
        let entry = LogEntry::new("move task", json!({}), json!({"ok": true}), None, 3);
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("actor").is_none());
        assert_eq!(value["op"], "move task");
    }

    #[test]
    fn test_with_actor_and_error_flag() {
        let entry = LogEntry::since("reorder column", json!({}), json!({"error": "boom"}), Instant::now())
            .with_actor("alice");
        assert_eq!(entry.actor.as_deref(), Some("alice"));
        assert!(entry.is_error());
    }
}
