//! Requester identification
//!
//! Every search-related request names the session it belongs to in the
//! `X-Requester-Id` header, so result indices from one user never resolve
//! against another user's search.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::search::RequesterId;

pub const REQUESTER_HEADER: &str = "x-requester-id";

/// Extractor for the calling requester
#[derive(Debug, Clone)]
pub struct Requester(pub RequesterId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(REQUESTER_HEADER)
            .ok_or_else(|| ApiError::BadRequest("missing X-Requester-Id header".to_string()))?;

        let id = value
            .to_str()
            .map_err(|_| ApiError::BadRequest("X-Requester-Id is not valid text".to_string()))?
            .trim();

        if id.is_empty() {
            return Err(ApiError::BadRequest("X-Requester-Id is empty".to_string()));
        }

        Ok(Requester(RequesterId::new(id)))
    }
}
