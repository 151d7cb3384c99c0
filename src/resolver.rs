//! Cache-or-fetch resolution of replay codes.

use crate::assemble::decode_user_id;
use crate::coalesce::InFlight;
use crate::core::{ReplayCode, ReplayError, ReplayRecord, Result};
use crate::storage::RecordStore;
use crate::upstream::{ReplaySource, UpstreamOutcome};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ReplayResolver {
    source: Arc<dyn ReplaySource>,
    store: Arc<RecordStore>,
    in_flight: InFlight<ReplayCode, ReplayRecord>,
}

impl ReplayResolver {
    pub fn new(source: Arc<dyn ReplaySource>, store: Arc<RecordStore>) -> Self {
        Self {
            source,
            store,
            in_flight: InFlight::new(),
        }
    }

    /// Normalizes `raw_code` and resolves it.
    ///
    /// Malformed codes fail with [`ReplayError::InvalidCode`] before any
    /// storage or network access.
    pub async fn resolve(&self, raw_code: &str) -> Result<ReplayRecord> {
        let code = ReplayCode::parse(raw_code)?;
        self.resolve_code(&code).await
    }

    /// Returns the stored record for `code`, fetching it from upstream at
    /// most once across concurrent callers when it is not stored yet.
    ///
    /// A record with `replay == None` is a confirmed absence and is returned
    /// as data, not as an error.
    pub async fn resolve_code(&self, code: &ReplayCode) -> Result<ReplayRecord> {
        let key = ReplayRecord::cache_key(&self.source.query_id(), code);
        if let Some(record) = self.store.get::<ReplayRecord>(&key).await? {
            debug!(%code, "using cached data for replay code");
            return Ok(record);
        }

        let source = Arc::clone(&self.source);
        let store = Arc::clone(&self.store);
        let owned = code.clone();
        self.in_flight
            .acquire(code.clone(), move || fetch_and_store(source, store, owned))
            .await
    }

    /// Number of codes currently being fetched from upstream.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }
}

async fn fetch_and_store(
    source: Arc<dyn ReplaySource>,
    store: Arc<RecordStore>,
    code: ReplayCode,
) -> Result<ReplayRecord> {
    let request_id = source.query_id();
    let key = ReplayRecord::cache_key(&request_id, &code);

    // Another producer for this code may have settled between our cache miss
    // and this producer being registered.
    if let Some(record) = store.get::<ReplayRecord>(&key).await? {
        debug!(%code, "using cached data for replay code");
        return Ok(record);
    }

    debug!(%code, "searching for replay code");
    let record = match source.fetch_replay(&code).await {
        UpstreamOutcome::Found { replay, request_id } => {
            validate_replay(&replay)?;
            ReplayRecord::found(replay, request_id)
        }
        UpstreamOutcome::NotFound => {
            debug!(%code, "upstream has no replay for code");
            ReplayRecord::not_found(request_id)
        }
        UpstreamOutcome::Failed(err) => return Err(err),
    };

    // The record is stored under the key computed before the fetch, so a
    // query version change mid-flight cannot leave it unreachable.
    if let Err(err) = store.set(&key, &record).await {
        warn!(%code, error = %err, "failed to persist replay record");
    }

    Ok(record)
}

/// A found replay must carry a string `id` whose embedded user identifier
/// decodes. Anything else is rejected before it can reach the store.
fn validate_replay(replay: &JsonValue) -> Result<()> {
    let id = match replay.get("id") {
        Some(JsonValue::String(id)) => id,
        Some(_) => return Err(ReplayError::upstream_decode("replay.id is not a string")),
        None => return Err(ReplayError::upstream_decode("replay has no id field")),
    };

    decode_user_id(id).map(drop).map_err(|err| match err {
        ReplayError::IdentifierDecode(message) => ReplayError::UpstreamDecode(message),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    #[test]
    fn replay_without_string_id_is_rejected() {
        let id = STANDARD.encode("Replay-u-abcdefghij0123456789:AAAABBBBCCCCDDDD");
        assert!(validate_replay(&json!({ "id": id })).is_ok());
        assert!(matches!(
            validate_replay(&json!({ "id": 5 })),
            Err(ReplayError::UpstreamDecode(_))
        ));
        assert!(matches!(
            validate_replay(&json!({})),
            Err(ReplayError::UpstreamDecode(_))
        ));
    }

    #[test]
    fn replay_with_undecodable_id_is_an_upstream_decode_error() {
        for id in ["UmVwbGF5", "bm90IGEgcmVwbGF5IGlk", "!!!"] {
            assert!(
                matches!(
                    validate_replay(&json!({ "id": id })),
                    Err(ReplayError::UpstreamDecode(_))
                ),
                "expected {id} to be rejected"
            );
        }
    }
}
