use axum::{extract::State, Extension, Json};
use murmur_index::{FilterRequest, FilterResponse, IndexError};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, AppState, ErrorCode, ResponseMeta};

/// `{total, data, meta}`.
#[derive(Debug, Serialize)]
pub(super) struct FilterBody {
    #[serde(flatten)]
    result: FilterResponse,
    meta: ResponseMeta,
}

pub(super) async fn filter(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<FilterRequest>,
) -> Result<Json<FilterBody>, ApiError> {
    let Some(client) = state.elastic.as_ref() else {
        return Err(ApiError::new(
            req_id.0,
            ErrorCode::IndexUnavailable,
            "search index is not configured",
        ));
    };

    let result = murmur_index::run_filter(client, &request)
        .await
        .map_err(|e| map_index_error(req_id.0.clone(), &e))?;

    Ok(Json(FilterBody {
        result,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn map_index_error(request_id: String, error: &IndexError) -> ApiError {
    tracing::error!(error = %error, "filter query failed");
    let code = if error.is_transient() {
        ErrorCode::IndexUnavailable
    } else {
        ErrorCode::UpstreamError
    };
    ApiError::new(request_id, code, "search index query failed")
}
