//! Boundary to the upstream replay service.
//!
//! The session/authentication client is opaque to this crate: anything that
//! can report its query version and look a code up implements
//! [`ReplaySource`].

pub mod graphql;

pub use graphql::{GraphQlReplaySource, UpstreamConfig, classify_response};

use crate::core::{ReplayCode, ReplayError};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Result of one upstream lookup.
///
/// An absent replay is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutcome {
    Found {
        replay: JsonValue,
        /// Query version that produced this result.
        request_id: String,
    },
    NotFound,
    Failed(ReplayError),
}

#[async_trait]
pub trait ReplaySource: Send + Sync {
    /// Version identifier of the lookup query; scopes cached records.
    fn query_id(&self) -> String;

    async fn fetch_replay(&self, code: &ReplayCode) -> UpstreamOutcome;
}
