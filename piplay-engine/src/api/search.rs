//! Search endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use piplay_common::SongRecord;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::Requester;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub search_id: Uuid,
    pub query: String,
    pub songs: Vec<SongRecord>,
    /// Set when the catalog could not be searched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /api/search
///
/// Catalog failures are reported as an empty result with a message, the same
/// as "nothing found", so clients can simply render the list.
pub async fn search(
    State(state): State<AppState>,
    Requester(requester): Requester,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    info!(requester = %requester, query = %request.query, "Search request");

    let (set, failure) = state
        .engine
        .resolve_search_lenient(&request.query, &requester)
        .await?;

    let message = failure.map(|e| {
        warn!(requester = %requester, error = %e, "Search degraded to empty result");
        e.to_string()
    });

    Ok(Json(SearchResponse {
        search_id: set.search_id,
        query: set.query.clone(),
        songs: set.songs.clone(),
        message,
    }))
}

/// DELETE /api/search
///
/// Drops the requester's results when its session ends.
pub async fn forget_results(
    State(state): State<AppState>,
    Requester(requester): Requester,
) -> StatusCode {
    if state.engine.forget_search(&requester).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectParams {
    pub search_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub index: usize,
    /// `None` for index 0
    pub song: Option<SongRecord>,
}

/// GET /api/search/select/:index
pub async fn select(
    State(state): State<AppState>,
    Requester(requester): Requester,
    Path(index): Path<String>,
    Query(params): Query<SelectParams>,
) -> ApiResult<Json<SelectResponse>> {
    let index = parse_index(&index)?;
    let song = state
        .engine
        .select_from_search(&requester, index, params.search_id)
        .await?;

    Ok(Json(SelectResponse { index, song }))
}

/// Selections are non-negative integers; anything else is a bad request
fn parse_index(raw: &str) -> Result<usize, ApiError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ApiError::BadRequest(format!("invalid result index: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("0").unwrap(), 0);
        assert_eq!(parse_index("12").unwrap(), 12);
        assert!(matches!(parse_index("-1"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_index("two"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_index(""), Err(ApiError::BadRequest(_))));
    }
}
