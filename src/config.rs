use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result, bail};
use reqwest::Url;

use crate::upstream::UpstreamConfig;
use crate::web::HttpSettings;

pub const DEFAULT_RESOURCE_ORIGIN: &str = "https://api.lp1.av5ja.srv.nintendo.net/";
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.lp1.av5ja.srv.nintendo.net/api/graphql";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub base_url: Option<String>,
    pub namespace: String,
    pub resource_origin: String,
    pub served_by: String,
    pub upstream: UpstreamConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let var_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let bind_addr = var_or("REPLAY_BIND_ADDR", "0.0.0.0:8080")
            .parse::<SocketAddr>()
            .context("REPLAY_BIND_ADDR must be a valid host:port")?;

        let data_dir = PathBuf::from(var_or("REPLAY_DATA_DIR", "data"));

        let base_url = var("BASE_URL");
        if let Some(base_url) = &base_url {
            Url::parse(base_url).context("BASE_URL must be an absolute URL")?;
        }

        let namespace = var_or("REPLAY_API_NAMESPACE", "splatnet3");
        if namespace.contains('/') {
            bail!("REPLAY_API_NAMESPACE must be a single path segment");
        }

        let resource_origin = var_or("REPLAY_RESOURCE_ORIGIN", DEFAULT_RESOURCE_ORIGIN);
        Url::parse(&resource_origin).context("REPLAY_RESOURCE_ORIGIN must be an absolute URL")?;

        let endpoint = var_or("UPSTREAM_GRAPHQL_URL", DEFAULT_GRAPHQL_URL);
        Url::parse(&endpoint).context("UPSTREAM_GRAPHQL_URL must be an absolute URL")?;

        let bearer_token = var("UPSTREAM_BEARER_TOKEN").context("UPSTREAM_BEARER_TOKEN is required")?;
        let query_id = var("UPSTREAM_QUERY_ID").context("UPSTREAM_QUERY_ID is required")?;

        Ok(Self {
            bind_addr,
            data_dir,
            base_url,
            namespace,
            resource_origin,
            served_by: var_or("HOSTNAME", "localhost"),
            upstream: UpstreamConfig {
                endpoint,
                bearer_token,
                query_id,
                web_view_version: var("UPSTREAM_WEB_VIEW_VERSION"),
            },
        })
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("persist")
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.data_dir.join("resources")
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            namespace: self.namespace.clone(),
            base_url: self.base_url.clone(),
            served_by: self.served_by.clone(),
        }
    }
}
