//! Handlers for entity endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/entities/:kind` | Body: `{"label":"..."}`; 201 + stub |
//! | `GET`  | `/entities/:kind/:id` | 404 if not found |
//! | `DELETE` | `/entities/:kind/:id` | Cascades touching links |
//! | `GET`  | `/entity/:source_type/:id` | Canonical detail view |
//! | `GET`  | `/search?q=...[&kind=...]` | Substring search |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tether_core::{
  Error,
  entity::{EntityStub, EntityType, NewEntity},
  link::LinkEndpoint,
  lookup::{EntityDetail, EntitySourceType},
  store::CrmStore,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /entities/:kind` — body: `{"label":"..."}`
pub async fn create<S: CrmStore>(
  State(state): State<AppState<S>>,
  Path(kind): Path<EntityType>,
  Json(body): Json<NewEntity>,
) -> Result<impl IntoResponse, ApiError> {
  let stub = state.store.create_entity(kind, body).await?;
  Ok((StatusCode::CREATED, Json(stub)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /entities/:kind/:id`
pub async fn get_one<S: CrmStore>(
  State(state): State<AppState<S>>,
  Path((kind, id)): Path<(EntityType, Uuid)>,
) -> Result<Json<EntityStub>, ApiError> {
  let stub = state
    .store
    .entity_stub(kind, id)
    .await?
    .ok_or(Error::SourceNotFound(LinkEndpoint::new(kind, id)))?;
  Ok(Json(stub))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /entities/:kind/:id` — deleting an entity cascades every link
/// that touches it.
pub async fn delete_one<S: CrmStore>(
  State(state): State<AppState<S>>,
  Path((kind, id)): Path<(EntityType, Uuid)>,
) -> Result<StatusCode, ApiError> {
  if state.store.delete_entity(kind, id).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError(Error::SourceNotFound(LinkEndpoint::new(kind, id))))
  }
}

// ─── Lookup ───────────────────────────────────────────────────────────────────

/// `GET /entity/:source_type/:id`
pub async fn lookup<S: CrmStore>(
  State(state): State<AppState<S>>,
  Path((source, id)): Path<(EntitySourceType, Uuid)>,
) -> Result<Json<EntityDetail>, ApiError> {
  let detail = state.lookup.entity(&state.store, source, id).await?;
  Ok(Json(detail))
}

// ─── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub q:    String,
  pub kind: Option<EntityType>,
}

/// `GET /search?q=<text>[&kind=<kind>]`
pub async fn search<S: CrmStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<EntityStub>>, ApiError> {
  let stubs = state.store.search_entities(&params.q, params.kind).await?;
  Ok(Json(stubs))
}
