use serde_json::{Value as JsonValue, json};
use thiserror::Error;

/// Every failure a replay lookup can surface.
///
/// The type is `Clone` because one settled in-flight computation hands the
/// same outcome to every caller that joined it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    #[error("Invalid replay code")]
    InvalidCode,

    #[error("Replay not found")]
    NotFound,

    #[error("Error decoding upstream response: {0}")]
    UpstreamDecode(String),

    #[error("Error decoding replay ID: {0}")]
    IdentifierDecode(String),

    #[error("Unable to download resource {resource}")]
    ResourceFetch {
        resource: String,
        status: Option<u16>,
        body: String,
    },

    #[error("{message}")]
    Unknown { message: String, data: JsonValue },
}

impl ReplayError {
    pub fn upstream_decode(message: impl Into<String>) -> Self {
        Self::UpstreamDecode(message.into())
    }

    pub fn identifier_decode(message: impl Into<String>) -> Self {
        Self::IdentifierDecode(message.into())
    }

    pub fn unknown(message: impl Into<String>, data: JsonValue) -> Self {
        Self::Unknown {
            message: message.into(),
            data,
        }
    }

    /// Wraps a storage failure with the operation that produced it.
    pub fn storage(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        let context = context.into();
        Self::Unknown {
            message: format!("{context}: {err}"),
            data: json!({ "kind": "storage", "context": context, "cause": err.to_string() }),
        }
    }

    /// Wraps a transport failure talking to an upstream host.
    pub fn transport(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        let context = context.into();
        Self::Unknown {
            message: format!("{context}: {err}"),
            data: json!({ "kind": "transport", "context": context, "cause": err.to_string() }),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidCode => 400,
            Self::NotFound => 404,
            Self::UpstreamDecode(_)
            | Self::IdentifierDecode(_)
            | Self::ResourceFetch { .. }
            | Self::Unknown { .. } => 500,
        }
    }

    /// Stable machine-readable code used as the `error` field of responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCode => "invalid_code",
            Self::NotFound => "not_found",
            Self::UpstreamDecode(_) => "upstream_decode_error",
            Self::IdentifierDecode(_) => "identifier_decode_error",
            Self::ResourceFetch { .. } => "resource_fetch_error",
            Self::Unknown { .. } => "unknown_error",
        }
    }

    /// Diagnostic payload surfaced as `error_data`.
    pub fn error_data(&self) -> Option<JsonValue> {
        match self {
            Self::ResourceFetch {
                resource,
                status,
                body,
            } => Some(json!({ "resource": resource, "status": status, "body": body })),
            Self::Unknown { data, .. } if !data.is_null() => Some(data.clone()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReplayError>;
