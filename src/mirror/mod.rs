//! Discovery and mirroring of upstream-hosted resources.
//!
//! Mirroring is two passes over the payload: [`collect_resource_urls`]
//! gathers every distinct `{ "url": "<origin>..." }` reference, then each URL
//! is downloaded at most once into the [`ResourceStore`]. Rewriting the
//! payload is a separate, pure step in [`crate::assemble`].

pub mod fetch;
pub mod path;

pub use fetch::{HttpResourceFetcher, ResourceFetcher};
pub use path::{canonicalize_resource_path, derive_resource_path};

use crate::coalesce::InFlight;
use crate::core::{ReplayError, Result};
use crate::storage::ResourceStore;
use futures::future::try_join_all;
use reqwest::Url;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Original upstream URL to locally served URL, built per response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceUrlMap {
    urls: BTreeMap<String, String>,
}

impl ResourceUrlMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, original: impl Into<String>, mirrored: impl Into<String>) {
        self.urls.insert(original.into(), mirrored.into());
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.urls.get(original).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.urls.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ResourceUrlMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

/// Collects the distinct `url` strings under `value` that start with
/// `origin` (compared case-insensitively).
pub fn collect_resource_urls(value: &JsonValue, origin: &str) -> BTreeSet<String> {
    let origin = origin.to_lowercase();
    let mut urls = BTreeSet::new();
    visit(value, &origin, &mut urls);
    urls
}

fn visit(value: &JsonValue, origin: &str, urls: &mut BTreeSet<String>) {
    match value {
        JsonValue::Object(map) => {
            if let Some(JsonValue::String(url)) = map.get("url") {
                if url.to_lowercase().starts_with(origin) {
                    urls.insert(url.clone());
                }
            }
            for child in map.values() {
                visit(child, origin, urls);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                visit(item, origin, urls);
            }
        }
        JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_) | JsonValue::Null => {}
    }
}

pub struct ResourceMirror {
    fetcher: Arc<dyn ResourceFetcher>,
    store: Arc<ResourceStore>,
    origin: String,
    in_flight: InFlight<String, String>,
}

impl ResourceMirror {
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        store: Arc<ResourceStore>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            store,
            origin: origin.into(),
            in_flight: InFlight::new(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Mirrors every origin-hosted resource referenced by `payload` and maps
    /// each original URL to its location under `base_url`.
    ///
    /// All downloads run concurrently; the first failure fails the call.
    pub async fn mirror(&self, payload: &JsonValue, base_url: &Url) -> Result<ResourceUrlMap> {
        let urls = collect_resource_urls(payload, &self.origin);

        let mirrored = try_join_all(urls.into_iter().map(|url| async move {
            let relative = self.fetch_and_mirror_one(&url).await?;
            let local = resolve_local_url(base_url, &relative)?;
            Ok::<_, ReplayError>((url, local))
        }))
        .await?;

        Ok(mirrored.into_iter().collect())
    }

    /// Ensures `url` is present in the mirror and returns its derived path.
    pub async fn fetch_and_mirror_one(&self, url: &str) -> Result<String> {
        let relative = derive_resource_path(url)?;

        let fetcher = Arc::clone(&self.fetcher);
        let store = Arc::clone(&self.store);
        let owned_url = url.to_string();
        let owned_relative = relative.clone();
        self.in_flight
            .acquire(relative, move || {
                download(fetcher, store, owned_url, owned_relative)
            })
            .await
    }

    /// Number of resources currently being downloaded.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }
}

async fn download(
    fetcher: Arc<dyn ResourceFetcher>,
    store: Arc<ResourceStore>,
    url: String,
    relative: String,
) -> Result<String> {
    if store.exists(&relative).await? {
        debug!(resource = %relative, "already downloaded resource");
        return Ok(relative);
    }

    debug!(resource = %relative, "fetching resource");
    let bytes = fetcher.fetch(&url).await.map_err(|err| match err {
        ReplayError::ResourceFetch { status, body, .. } => ReplayError::ResourceFetch {
            resource: relative.clone(),
            status,
            body,
        },
        other => other,
    })?;
    store.write(&relative, bytes).await?;
    debug!(resource = %relative, "downloaded resource");

    Ok(relative)
}

fn resolve_local_url(base_url: &Url, relative: &str) -> Result<String> {
    // "./" keeps a first segment containing ':' from parsing as a scheme.
    base_url
        .join(&format!("./{relative}"))
        .map(String::from)
        .map_err(|e| {
            ReplayError::unknown(
                format!("failed to resolve mirrored URL for {relative}"),
                serde_json::json!({ "kind": "url", "base": base_url.as_str(), "cause": e.to_string() }),
            )
        })
}
