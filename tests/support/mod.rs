#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use replay_lookup::mirror::ResourceFetcher;
use replay_lookup::{ReplayCode, ReplayError, ReplaySource, UpstreamOutcome};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const ORIGIN: &str = "https://api.lp1.av5ja.srv.nintendo.net/";
pub const QUERY_ID: &str = "0123456789abcdef";
pub const USER_ID: &str = "u-abcdefghij0123456789";

/// Upstream stand-in that counts lookups. Unknown codes are not found.
pub struct StubSource {
    outcomes: Mutex<HashMap<String, UpstreamOutcome>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl StubSource {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Each lookup sleeps for `delay`, widening the window in which
    /// concurrent callers overlap.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn set(&self, code: &str, outcome: UpstreamOutcome) {
        self.outcomes.lock().unwrap().insert(code.to_string(), outcome);
    }

    pub fn found(self, code: &str, replay: Value) -> Self {
        self.set(
            code,
            UpstreamOutcome::Found {
                replay,
                request_id: QUERY_ID.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplaySource for StubSource {
    fn query_id(&self) -> String {
        QUERY_ID.to_string()
    }

    async fn fetch_replay(&self, code: &ReplayCode) -> UpstreamOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcomes
            .lock()
            .unwrap()
            .get(code.as_str())
            .cloned()
            .unwrap_or(UpstreamOutcome::NotFound)
    }
}

/// Resource host stand-in serving fixed bodies and counting fetches per URL.
pub struct StubFetcher {
    bodies: Mutex<HashMap<String, Result<Vec<u8>, ReplayError>>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Duration,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            bodies: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            delay,
        }
    }

    pub fn serve(self, url: &str, body: &[u8]) -> Self {
        self.set(url, Ok(body.to_vec()));
        self
    }

    pub fn set(&self, url: &str, body: Result<Vec<u8>, ReplayError>) {
        self.bodies.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ResourceFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ReplayError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(ReplayError::ResourceFetch {
                    resource: url.to_string(),
                    status: Some(404),
                    body: "not found".to_string(),
                })
            })
    }
}

/// Base64 replay id in the shape the upstream uses.
pub fn replay_id(code: &str) -> String {
    STANDARD.encode(format!("Replay-{USER_ID}:{code}"))
}

/// Minimal replay payload referencing one origin image and one foreign image.
pub fn replay_payload(code: &str, image_url: &str) -> Value {
    json!({
        "id": replay_id(code),
        "replayCode": code,
        "vsStage": {
            "name": "Scorch Gorge",
            "image": { "url": image_url },
        },
        "player": {
            "name": "Player",
            "nameplate": {
                "background": { "image": { "url": "https://other-host/x.png" } },
            },
        },
    })
}
