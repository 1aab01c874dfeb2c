//! JSON REST API for Tether.
//!
//! Exposes an axum [`Router`] backed by any [`tether_core::store::CrmStore`].
//! This is a thin translation layer: JSON in, JSON out, every decision made
//! by the core. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tether_api::router(state.clone()))
//! ```

pub mod entities;
pub mod error;
pub mod links;
pub mod merge;
pub mod related;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  http::HeaderMap,
  routing::{get, post},
};
use serde::Deserialize;
use tether_core::{
  Result,
  context::RequestContext,
  lookup::LookupRegistry,
  merge::MergeCoordinator,
  related::RelatedRegistry,
  service::LinkService,
  store::CrmStore,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// `TETHER_*` environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers. The registries and the
/// merge coordinator are built once and never mutated afterwards.
#[derive(Clone)]
pub struct AppState<S: CrmStore> {
  pub store:   S,
  pub links:   LinkService<S>,
  pub related: Arc<RelatedRegistry>,
  pub lookup:  Arc<LookupRegistry>,
  pub merge:   Arc<MergeCoordinator<S>>,
}

impl<S: CrmStore + Clone> AppState<S> {
  /// Wire the default registries and coordinator around `store`.
  ///
  /// Fails if a merge configuration does not cover every FK column the
  /// store declares for its kind.
  pub fn new(store: S) -> Result<Self> {
    Ok(Self {
      links:   LinkService::new(store.clone()),
      related: Arc::new(RelatedRegistry::with_default_strategies()),
      lookup:  Arc::new(LookupRegistry::with_default_strategies()),
      merge:   Arc::new(MergeCoordinator::with_default_configs(store.clone())?),
      store,
    })
  }
}

// ─── Request context ──────────────────────────────────────────────────────────

/// The acting user, taken from the `x-actor-id` header. Requests without
/// one act as the system user; authentication itself lives upstream.
pub fn request_context(headers: &HeaderMap) -> RequestContext {
  headers
    .get("x-actor-id")
    .and_then(|value| value.to_str().ok())
    .and_then(|value| Uuid::parse_str(value).ok())
    .map(RequestContext::new)
    .unwrap_or(RequestContext::system())
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router<()>
where
  S: CrmStore + Clone + 'static,
{
  Router::new()
    // Entities (the minimal surface the link layer consumes)
    .route("/entities/{kind}", post(entities::create::<S>))
    .route(
      "/entities/{kind}/{id}",
      get(entities::get_one::<S>).delete(entities::delete_one::<S>),
    )
    .route("/search", get(entities::search::<S>))
    // Entity lookup (canonical detail views)
    .route("/entity/{source_type}/{id}", get(entities::lookup::<S>))
    // Links
    .route(
      "/links",
      post(links::create::<S>).delete(links::delete::<S>),
    )
    .route("/links/{kind}/{id}", get(links::list::<S>))
    .route("/neighbors/{kind}/{id}", get(links::neighbors::<S>))
    // Related entities
    .route("/related/{kind}/{id}", get(related::handler::<S>))
    // Merge
    .route("/merge", post(merge::handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
