use crate::core::{ReplayError, Result};
use async_trait::async_trait;

/// Retrieves the bytes of a remote resource.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpResourceFetcher {
    client: reqwest::Client,
}

impl HttpResourceFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceFetcher for HttpResourceFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReplayError::transport(format!("failed to request resource {url}"), e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReplayError::transport(format!("failed to read resource {url}"), e))?;

        if !status.is_success() {
            return Err(ReplayError::ResourceFetch {
                resource: url.to_string(),
                status: Some(status.as_u16()),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(bytes.to_vec())
    }
}
