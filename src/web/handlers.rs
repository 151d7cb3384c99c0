use axum::extract::{Path, State};
use axum::http::HeaderMap;
use tracing::{debug, error};

use crate::assemble::ReplayResponse;
use crate::core::{ReplayCode, ReplayError};
use crate::web::{ApiError, ApiResult, AppState, JsonBody, resources_url, wants_pretty};

pub async fn get_replay(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> ApiResult<JsonBody<ReplayResponse>> {
    let pretty = wants_pretty(&headers);
    let fail = |err: ReplayError| {
        log_failure(&code, &err);
        ApiError::new(err, pretty)
    };

    let replay_code = ReplayCode::parse(&code).map_err(fail)?;
    let resources_url = resources_url(&state.settings, &headers).map_err(fail)?;
    let response = state
        .service
        .lookup(&replay_code, &resources_url)
        .await
        .map_err(fail)?;

    Ok(JsonBody::ok(response, pretty))
}

fn log_failure(code: &str, err: &ReplayError) {
    if err.status() >= 500 {
        error!(code, error = %err, error_data = ?err.error_data(), "replay request failed");
    } else {
        debug!(code, error = %err, "replay request rejected");
    }
}
