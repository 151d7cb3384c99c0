use crate::core::{ReplayCode, ReplayError};
use crate::upstream::{ReplaySource, UpstreamOutcome};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::{Value as JsonValue, json};
use tracing::debug;

/// Connection settings for the upstream GraphQL endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub endpoint: String,
    /// Operator-supplied session token. Obtaining it is out of scope.
    pub bearer_token: String,
    /// Persisted query hash of the replay search query.
    pub query_id: String,
    pub web_view_version: Option<String>,
}

/// Looks replays up through a persisted GraphQL query.
pub struct GraphQlReplaySource {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl GraphQlReplaySource {
    pub fn new(client: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { client, config }
    }

    fn headers(&self) -> Result<HeaderMap, ReplayError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.bearer_token))
            .map_err(|e| ReplayError::transport("invalid bearer token header", e))?;
        headers.insert(AUTHORIZATION, bearer);

        if let Some(version) = &self.config.web_view_version {
            let version = HeaderValue::from_str(version)
                .map_err(|e| ReplayError::transport("invalid web view version header", e))?;
            headers.insert("x-web-view-ver", version);
        }
        Ok(headers)
    }

    async fn request(&self, code: &ReplayCode) -> Result<(u16, Vec<u8>), ReplayError> {
        let body = json!({
            "variables": { "code": code.as_str() },
            "extensions": {
                "persistedQuery": { "version": 1, "sha256Hash": self.config.query_id },
            },
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReplayError::transport("replay search request failed", e))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReplayError::transport("failed to read replay search response", e))?;
        Ok((status, bytes.to_vec()))
    }
}

#[async_trait]
impl ReplaySource for GraphQlReplaySource {
    fn query_id(&self) -> String {
        self.config.query_id.clone()
    }

    async fn fetch_replay(&self, code: &ReplayCode) -> UpstreamOutcome {
        debug!(%code, "searching upstream for replay");
        match self.request(code).await {
            Ok((status, body)) => classify_response(&self.config.query_id, status, &body),
            Err(err) => UpstreamOutcome::Failed(err),
        }
    }
}

/// Maps a raw upstream response onto an [`UpstreamOutcome`].
///
/// `data.replay == null` on a successful status is the upstream's "no such
/// replay" signal, whether or not it comes with a GraphQL `errors` list. A
/// non-success status is always a failure, never a cacheable absence.
pub fn classify_response(query_id: &str, status: u16, body: &[u8]) -> UpstreamOutcome {
    if !(200..300).contains(&status) {
        return UpstreamOutcome::Failed(ReplayError::unknown(
            format!("upstream returned status {status}"),
            json!({
                "kind": "upstream",
                "status": status,
                "body": String::from_utf8_lossy(body),
            }),
        ));
    }

    let Ok(parsed) = serde_json::from_slice::<JsonValue>(body) else {
        return UpstreamOutcome::Failed(ReplayError::upstream_decode(
            "replay search response is not JSON",
        ));
    };

    match parsed.pointer("/data/replay") {
        Some(replay @ JsonValue::Object(_)) => UpstreamOutcome::Found {
            replay: replay.clone(),
            request_id: query_id.to_string(),
        },
        Some(JsonValue::Null) => UpstreamOutcome::NotFound,
        Some(_) => UpstreamOutcome::Failed(ReplayError::upstream_decode(
            "data.replay is neither an object nor null",
        )),
        None => UpstreamOutcome::Failed(ReplayError::unknown(
            "replay search response has no data.replay field",
            json!({ "kind": "upstream", "status": status, "response": parsed }),
        )),
    }
}
