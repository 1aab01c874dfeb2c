//! Handler for the merge endpoint.

use axum::{Json, extract::State, http::HeaderMap};
use tether_core::{
  merge::{MergeRequest, MergeResult},
  store::CrmStore,
};

use crate::{AppState, error::ApiError, request_context};

/// `POST /merge` — body: [`MergeRequest`].
///
/// Folds the named duplicates into the primary in one transaction and
/// returns the refreshed primary with the deletion and transfer counts.
pub async fn handler<S: CrmStore>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<MergeRequest>,
) -> Result<Json<MergeResult>, ApiError> {
  let ctx = request_context(&headers);
  let result = state.merge.merge(&ctx, &body).await?;
  Ok(Json(result))
}
