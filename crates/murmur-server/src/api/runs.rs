use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::enqueue::is_known_topic;
use super::{
    map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ErrorCode, ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct HarvestRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct HarvestRunItem {
    harvest_run_id: Uuid,
    platform: String,
    trigger_source: String,
    status: String,
    tag: Option<String>,
    outcome: Option<String>,
    items_emitted: i32,
    items_dropped: i32,
    error_message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<murmur_db::HarvestRunRow> for HarvestRunItem {
    fn from(row: murmur_db::HarvestRunRow) -> Self {
        Self {
            harvest_run_id: row.public_id,
            platform: row.platform,
            trigger_source: row.trigger_source,
            status: row.status,
            tag: row.tag,
            outcome: row.outcome,
            items_emitted: row.items_emitted,
            items_dropped: row.items_dropped,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn list_harvest_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<HarvestRunsQuery>,
) -> Result<Json<ApiResponse<Vec<HarvestRunItem>>>, ApiError> {
    let rows = murmur_db::list_harvest_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(HarvestRunItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct QueueDepthItem {
    topic: String,
    depth: i64,
}

pub(super) async fn queue_depth(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(topic): Path<String>,
) -> Result<Json<ApiResponse<QueueDepthItem>>, ApiError> {
    if !is_known_topic(&topic) {
        return Err(ApiError::new(
            req_id.0,
            ErrorCode::NotFound,
            format!("unknown topic {topic:?}"),
        ));
    }

    let depth = murmur_db::queue_depth(&state.pool, &topic)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: QueueDepthItem { topic, depth },
        meta: ResponseMeta::new(req_id.0),
    }))
}
