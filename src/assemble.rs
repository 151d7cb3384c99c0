//! Builds the outward replay response from a resolved record.

use crate::core::{ReplayCode, ReplayError, ReplayRecord, Result};
use crate::mirror::ResourceUrlMap;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use lazy_static::lazy_static;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;

lazy_static! {
    static ref REPLAY_ID: Regex = Regex::new(r"^Replay-(u-[a-z0-9]{20}):([A-Z0-9]{16})$").unwrap();
}

/// Everything outside `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Deep link that opens a replay code in the companion app.
pub const SHARE_URL_PREFIX: &str =
    "https://s.nintendo.com/av5ja-lp1/znca/game/4834290508791808?p=";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayResponse {
    pub code: String,
    pub share_url: String,
    pub replay: JsonValue,
    pub request_id: String,
    pub npln_user_id: String,
}

/// Assembles the response for a found replay.
///
/// A negative record yields [`ReplayError::NotFound`].
pub fn assemble(
    code: &ReplayCode,
    record: &ReplayRecord,
    urls: &ResourceUrlMap,
) -> Result<ReplayResponse> {
    let Some(replay) = &record.replay else {
        return Err(ReplayError::NotFound);
    };

    let replay_id = replay
        .get("id")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ReplayError::identifier_decode("replay has no string id"))?;

    Ok(ReplayResponse {
        code: code.to_string(),
        share_url: share_url(code),
        replay: rewrite_resource_urls(replay, urls),
        request_id: record.request_id.clone(),
        npln_user_id: decode_user_id(replay_id)?,
    })
}

/// Returns a copy of `value` where every object's string `url` is replaced
/// by its mirrored URL when `urls` has one.
pub fn rewrite_resource_urls(value: &JsonValue, urls: &ResourceUrlMap) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut rewritten = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                let child = match (key.as_str(), child) {
                    ("url", JsonValue::String(url)) => match urls.get(url) {
                        Some(mirrored) => JsonValue::String(mirrored.to_string()),
                        None => child.clone(),
                    },
                    _ => rewrite_resource_urls(child, urls),
                };
                rewritten.insert(key.clone(), child);
            }
            JsonValue::Object(rewritten)
        }
        JsonValue::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| rewrite_resource_urls(item, urls))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

/// Decodes the NPLN user id embedded in a base64 replay id of the form
/// `Replay-u-<20 chars>:<code>`.
pub fn decode_user_id(replay_id: &str) -> Result<String> {
    let bytes = decode_base64(replay_id)
        .ok_or_else(|| ReplayError::identifier_decode("replay id is not base64"))?;
    let decoded = String::from_utf8(bytes)
        .map_err(|_| ReplayError::identifier_decode("replay id is not UTF-8"))?;

    REPLAY_ID
        .captures(&decoded)
        .and_then(|captures| captures.get(1))
        .map(|user| user.as_str().to_string())
        .ok_or_else(|| ReplayError::identifier_decode(format!("unexpected replay id {decoded:?}")))
}

/// Accepts standard and URL-safe alphabets, with or without padding.
fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let trimmed = input.trim().trim_end_matches('=');
    if trimmed.contains(['-', '_']) {
        URL_SAFE_NO_PAD.decode(trimmed).ok()
    } else {
        STANDARD_NO_PAD.decode(trimmed).ok()
    }
}

pub fn share_url(code: &ReplayCode) -> String {
    let inner = format!("/replay?code={}", encode_uri_component(&code.formatted()));
    format!("{SHARE_URL_PREFIX}{}", encode_uri_component(&inner))
}

fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}
