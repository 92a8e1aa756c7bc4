use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use postpulse_analytics::{RunRequest, RunSummary, SnapshotQuery, SnapshotStatus, SnapshotView};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_analytics_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Optional JSON body for a regeneration request. An empty body means
/// "default window, real run".
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RegenerateBody {
    pub window_days: Option<u32>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub status: Option<String>,
    /// Parsed in the handler so a bad value gets the JSON error envelope.
    pub limit: Option<String>,
}

fn parse_body(request_id: &str, body: &Bytes) -> Result<RegenerateBody, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RegenerateBody::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("invalid request body: {e}"),
        )
    })
}

/// POST /api/v1/users/{user_id}/snapshots/regenerate
pub(super) async fn regenerate_snapshots(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<RunSummary>>, ApiError> {
    let rid = &req_id.0;
    let body = parse_body(rid, &body)?;

    let user_id = user_id.trim().to_owned();
    if user_id.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "user_id is required"));
    }

    let request = RunRequest {
        user_id,
        window_days: body.window_days,
        dry_run: body.dry_run,
    };
    tracing::info!(
        user_id = %request.user_id,
        window_days = ?request.window_days,
        dry_run = request.dry_run,
        request_id = %rid,
        "snapshot regeneration requested"
    );

    let summary = state
        .snapshots
        .regenerate(&request, Utc::now())
        .await
        .map_err(|e| map_analytics_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: summary,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/users/{user_id}/snapshots
pub(super) async fn list_snapshots(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<SnapshotView>>>, ApiError> {
    let rid = &req_id.0;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<SnapshotStatus>)
        .transpose()
        .map_err(|e| map_analytics_error(rid.clone(), &e))?;

    let limit = query
        .limit
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<i64>)
        .transpose()
        .map_err(|_| ApiError::new(rid, "validation_error", "limit must be an integer"))?;

    let views = state
        .snapshots
        .list(&user_id, &SnapshotQuery { status, limit })
        .await
        .map_err(|e| map_analytics_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: views,
        meta: ResponseMeta::new(req_id.0),
    }))
}
