use std::path::Path;
use std::sync::Arc;

use axum::http::header::SERVER;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::service::ReplayService;
use crate::web::handlers::get_replay;

/// Product string advertised in `Server` headers.
pub const PRODUCT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Path segment in `/api/<namespace>/...`.
    pub namespace: String,
    /// Operator override for the advertised base URL.
    pub base_url: Option<String>,
    /// Value of the `X-Served-By` header.
    pub served_by: String,
}

#[derive(Clone)]
pub struct AppState {
    pub service: ReplayService,
    pub settings: Arc<HttpSettings>,
}

impl AppState {
    pub fn new(service: ReplayService, settings: HttpSettings) -> Self {
        Self {
            service,
            settings: Arc::new(settings),
        }
    }
}

/// Builds the API router. Mirrored resources under `resource_root` are served
/// at `/api/<namespace>/resources`.
pub fn build_router(state: AppState, resource_root: &Path) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");
    let namespace = state.settings.namespace.clone();
    let served_by = HeaderValue::from_str(&state.settings.served_by)
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));

    Router::new()
        .route(&format!("/api/{namespace}/replay/:code"), get(get_replay))
        .nest_service(
            &format!("/api/{namespace}/resources"),
            ServeDir::new(resource_root).append_index_html_on_directories(false),
        )
        .layer(SetResponseHeaderLayer::overriding(
            SERVER,
            HeaderValue::from_static(PRODUCT),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-server"),
            HeaderValue::from_static(PRODUCT),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-served-by"),
            served_by,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::OPTIONS]),
        )
        .with_state(state)
}
