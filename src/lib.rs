// ============================================================================
// Replay Lookup Library
// ============================================================================
//
// Resolves replay codes against an upstream service, caches every outcome
// (including "not found") on disk, and mirrors the images a replay references
// so clients never hit the upstream origin for them.
//
// Data flow per request:
//   code -> ReplayResolver (cache-or-fetch, coalesced per code)
//        -> ResourceMirror (collect URLs, download each once, coalesced per path)
//        -> assemble (rewrite URLs, derive user id and share link)

pub mod assemble;
pub mod coalesce;
pub mod config;
pub mod core;
pub mod mirror;
pub mod resolver;
pub mod service;
pub mod storage;
pub mod upstream;
pub mod web;

pub use assemble::ReplayResponse;
pub use coalesce::InFlight;
pub use crate::core::{ReplayCode, ReplayError, ReplayRecord, Result};
pub use mirror::{ResourceMirror, ResourceUrlMap};
pub use resolver::ReplayResolver;
pub use service::ReplayService;
pub use storage::{RecordStore, ResourceStore};
pub use upstream::{ReplaySource, UpstreamOutcome};
