//! Handler for the related-entities endpoint.

use axum::{
  Json,
  extract::{Path, State},
};
use tether_core::{entity::EntityType, related::RelatedView, store::CrmStore};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `GET /related/:kind/:id`
///
/// Returns the full aggregate for the source entity: one list per kind the
/// strategy declares, empty lists included.
pub async fn handler<S: CrmStore>(
  State(state): State<AppState<S>>,
  Path((kind, id)): Path<(EntityType, Uuid)>,
) -> Result<Json<RelatedView>, ApiError> {
  let view = state.related.related(&state.store, kind, id).await?;
  Ok(Json(view))
}
