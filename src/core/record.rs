use crate::core::ReplayCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Outcome of one upstream lookup, persisted write-once.
///
/// `replay == None` is a confirmed absence under `request_id`, which is
/// different from a code that was never looked up (no record at all).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub replay: Option<JsonValue>,
    pub request_id: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl ReplayRecord {
    pub fn found(replay: JsonValue, request_id: impl Into<String>) -> Self {
        Self {
            replay: Some(replay),
            request_id: request_id.into(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn not_found(request_id: impl Into<String>) -> Self {
        Self {
            replay: None,
            request_id: request_id.into(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.replay.is_some()
    }

    /// Storage key scoped to the upstream query version.
    pub fn cache_key(request_id: &str, code: &ReplayCode) -> String {
        format!("Replay.{request_id}.{code}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_key_is_scoped_by_query_version() {
        let code = ReplayCode::parse("AAAABBBBCCCCDDDD").unwrap();
        assert_eq!(
            ReplayRecord::cache_key("abc123", &code),
            "Replay.abc123.AAAABBBBCCCCDDDD"
        );
    }

    #[test]
    fn negative_record_serializes_replay_as_null() {
        let record = ReplayRecord::not_found("q1");
        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(encoded["replay"], JsonValue::Null);
        assert_eq!(encoded["request_id"], "q1");

        let decoded: ReplayRecord = serde_json::from_value(encoded).unwrap();
        assert!(!decoded.is_found());
    }

    #[test]
    fn found_record_keeps_payload() {
        let record = ReplayRecord::found(json!({ "id": "x" }), "q1");
        assert!(record.is_found());
        assert!(record.created_at > 0);
    }
}
