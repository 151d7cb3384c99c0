//! HTTP surface: router, handler and the JSON/error response mapping.
//!
//! Every body is JSON, minified unless the client's `Accept` header asks
//! for an HTML-ish media type, in which case it is indented for reading in
//! a browser.

pub mod app;
pub mod handlers;

pub use app::{AppState, HttpSettings, build_router};

use crate::core::{ReplayError, json};
use axum::http::header::{ACCEPT, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::error;

lazy_static! {
    static ref HTML_MEDIA_TYPE: Regex = Regex::new(r"(?i)/html\b").unwrap();
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_data: Option<JsonValue>,
}

impl From<&ReplayError> for ErrorResponse {
    fn from(err: &ReplayError) -> Self {
        Self {
            error: err.code().to_string(),
            error_message: err.to_string(),
            error_data: err.error_data(),
        }
    }
}

/// A serializable body plus the formatting the client asked for.
#[derive(Debug)]
pub struct JsonBody<T> {
    status: StatusCode,
    body: T,
    pretty: bool,
}

impl<T: Serialize> JsonBody<T> {
    pub fn ok(body: T, pretty: bool) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            pretty,
        }
    }

    pub fn with_status(status: StatusCode, body: T, pretty: bool) -> Self {
        Self {
            status,
            body,
            pretty,
        }
    }
}

impl<T: Serialize> IntoResponse for JsonBody<T> {
    fn into_response(self) -> Response {
        match json::encode(&self.body, self.pretty) {
            Ok(bytes) => (
                self.status,
                [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                bytes,
            )
                .into_response(),
            Err(err) => {
                error!(error = %err, "failed to encode response body");
                let fallback = br#"{"error":"unknown_error","error_message":"Failed to encode response"}"#;
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                    fallback.to_vec(),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    error: ReplayError,
    pretty: bool,
}

impl ApiError {
    pub fn new(error: ReplayError, pretty: bool) -> Self {
        Self { error, pretty }
    }

    pub fn error(&self) -> &ReplayError {
        &self.error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        JsonBody::with_status(status, ErrorResponse::from(&self.error), self.pretty).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// True when the `Accept` header names a `*/html` media type.
pub fn wants_pretty(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| HTML_MEDIA_TYPE.is_match(accept))
}

/// Base URL under which mirrored resources are advertised.
///
/// An operator-supplied base wins; otherwise it is rebuilt from
/// `X-Forwarded-Proto` and `Host`.
pub fn resources_url(
    settings: &HttpSettings,
    headers: &HeaderMap,
) -> crate::core::Result<Url> {
    let base = match &settings.base_url {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => {
            let host = headers
                .get(HOST)
                .and_then(|value| value.to_str().ok())
                .filter(|host| !host.is_empty())
                .ok_or_else(|| {
                    ReplayError::unknown("request has no Host header", JsonValue::Null)
                })?;
            let scheme = match headers
                .get("x-forwarded-proto")
                .and_then(|value| value.to_str().ok())
            {
                Some("https") => "https",
                _ => "http",
            };
            format!("{scheme}://{host}")
        }
    };

    let raw = format!("{base}/api/{}/resources/", settings.namespace);
    Url::parse(&raw).map_err(|e| {
        ReplayError::unknown(
            format!("invalid resource base URL {raw}"),
            serde_json::json!({ "kind": "url", "cause": e.to_string() }),
        )
    })
}
