//! Handlers for link endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/links` | Body: [`LinkBody`]; 201 + stored link |
//! | `DELETE` | `/links` | Body: [`LinkBody`]; direction-insensitive |
//! | `GET`  | `/links/:kind/:id` | All links touching the endpoint |
//! | `GET`  | `/neighbors/:kind/:id` | Far-endpoint ids; `?target_kind=` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tether_core::{
  entity::EntityType,
  link::{LinkEndpoint, LinkRelation},
  store::CrmStore,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, request_context};

/// JSON body naming both endpoints of a link.
#[derive(Debug, Deserialize)]
pub struct LinkBody {
  pub source: LinkEndpoint,
  pub target: LinkEndpoint,
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /links` — body: `{"source":{"kind":"job","id":...},"target":...}`
pub async fn create<S: CrmStore>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<LinkBody>,
) -> Result<impl IntoResponse, ApiError> {
  let ctx = request_context(&headers);
  let link = state.links.create_link(&ctx, body.source, body.target).await?;
  Ok((StatusCode::CREATED, Json(link)))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
  pub deleted: bool,
}

/// `DELETE /links` — same body as create; either orientation matches.
pub async fn delete<S: CrmStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<LinkBody>,
) -> Result<Json<DeleteResponse>, ApiError> {
  let deleted = state.links.delete_link(body.source, body.target).await?;
  Ok(Json(DeleteResponse { deleted }))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /links/:kind/:id`
pub async fn list<S: CrmStore>(
  State(state): State<AppState<S>>,
  Path((kind, id)): Path<(EntityType, Uuid)>,
) -> Result<Json<Vec<LinkRelation>>, ApiError> {
  let links = state.links.links_for(LinkEndpoint::new(kind, id)).await?;
  Ok(Json(links))
}

// ─── Neighbors ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NeighborParams {
  pub target_kind: Option<EntityType>,
}

/// `GET /neighbors/:kind/:id[?target_kind=<kind>]`
pub async fn neighbors<S: CrmStore>(
  State(state): State<AppState<S>>,
  Path((kind, id)): Path<(EntityType, Uuid)>,
  Query(params): Query<NeighborParams>,
) -> Result<Json<Vec<Uuid>>, ApiError> {
  let ids = state
    .links
    .neighbors(LinkEndpoint::new(kind, id), params.target_kind)
    .await?;
  Ok(Json(ids))
}
