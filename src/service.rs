use crate::assemble::{ReplayResponse, assemble};
use crate::core::{ReplayCode, ReplayError, Result};
use crate::mirror::ResourceMirror;
use crate::resolver::ReplayResolver;
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

/// Per-request orchestration: resolve, mirror, assemble.
#[derive(Clone)]
pub struct ReplayService {
    resolver: Arc<ReplayResolver>,
    mirror: Arc<ResourceMirror>,
}

impl ReplayService {
    pub fn new(resolver: Arc<ReplayResolver>, mirror: Arc<ResourceMirror>) -> Self {
        Self { resolver, mirror }
    }

    pub fn resolver(&self) -> &ReplayResolver {
        &self.resolver
    }

    pub fn mirror(&self) -> &ResourceMirror {
        &self.mirror
    }

    /// Looks up `code` and returns the outward record with every mirrored
    /// resource URL pointing under `resources_url`.
    pub async fn lookup(&self, code: &ReplayCode, resources_url: &Url) -> Result<ReplayResponse> {
        debug!(%code, "lookup");

        let record = self.resolver.resolve_code(code).await?;
        let Some(replay) = &record.replay else {
            return Err(ReplayError::NotFound);
        };

        let urls = self.mirror.mirror(replay, resources_url).await?;
        assemble(code, &record, &urls)
    }
}
