use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use replay_lookup::{
    config::AppConfig,
    mirror::{HttpResourceFetcher, ResourceMirror},
    resolver::ReplayResolver,
    service::ReplayService,
    storage::{RecordStore, ResourceStore},
    upstream::GraphQlReplaySource,
    web::{AppState, build_router},
    web::app::PRODUCT,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    let client = reqwest::Client::builder()
        .user_agent(PRODUCT)
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    let records = Arc::new(
        RecordStore::open(config.records_dir())
            .await
            .context("failed to open record store")?,
    );
    let resources = Arc::new(
        ResourceStore::open(config.resources_dir())
            .await
            .context("failed to open resource store")?,
    );

    let source = Arc::new(GraphQlReplaySource::new(client.clone(), config.upstream.clone()));
    let resolver = Arc::new(ReplayResolver::new(source, records));
    let mirror = Arc::new(ResourceMirror::new(
        Arc::new(HttpResourceFetcher::new(client)),
        Arc::clone(&resources),
        config.resource_origin.clone(),
    ));

    let state = AppState::new(ReplayService::new(resolver, mirror), config.http_settings());
    let app = build_router(state, resources.root());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(
        bind_addr = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        namespace = %config.namespace,
        "replay lookup started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("replay_lookup=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install ctrl+c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
