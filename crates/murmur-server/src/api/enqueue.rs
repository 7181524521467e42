use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use murmur_core::{MessageQueue, Platform, ELASTIC_TOPIC};
use serde::Serialize;
use serde_json::Value;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ErrorCode, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct EnqueuedItem {
    topic: String,
    bytes: usize,
}

pub(super) fn is_known_topic(topic: &str) -> bool {
    topic == ELASTIC_TOPIC || Platform::ALL.iter().any(|p| p.slug() == topic)
}

/// Push the request body, re-serialized, onto `topic`.
pub(super) async fn enqueue(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(topic): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<EnqueuedItem>>), ApiError> {
    if !is_known_topic(&topic) {
        return Err(ApiError::new(
            req_id.0,
            ErrorCode::NotFound,
            format!("unknown topic {topic:?}"),
        ));
    }

    let payload = serde_json::to_vec(&body).map_err(|e| {
        ApiError::new(
            req_id.0.clone(),
            ErrorCode::BadRequest,
            format!("unserializable body: {e}"),
        )
    })?;

    state
        .queue
        .push(&topic, &payload)
        .await
        .map_err(|e| super::map_db_error(req_id.0.clone(), &e))?;

    tracing::debug!(topic = %topic, bytes = payload.len(), "message enqueued");
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: EnqueuedItem {
                topic,
                bytes: payload.len(),
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
