//! Duplicate-entity merge — fold duplicates into a surviving primary.
//!
//! The coordinator owns a closed set of per-kind configurations. Each one
//! declares which fields a caller may pick between records and which
//! tables carry a direct FK column pointing at the kind. The declared FK
//! list is cross-checked against the backend's catalogue at construction,
//! so an omitted table is a startup error rather than silent data loss.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  context::RequestContext,
  entity::{EntityStub, EntityType},
  error::{Error, Result},
  store::CrmStore,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// A table/column pair carrying a direct FK to some kind's id column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FkColumn {
  pub table:  &'static str,
  pub column: &'static str,
}

/// Per-kind merge configuration. Adding a table to `fk_rewrites` is an
/// intentional code change, never discovery at runtime.
#[derive(Debug, Clone, Copy)]
pub struct MergeConfig {
  pub kind:             EntityType,
  pub mergeable_fields: &'static [&'static str],
  pub fk_rewrites:      &'static [FkColumn],
}

/// The configurations shipped by default. Merging is currently offered
/// for jobs only.
pub const MERGE_CONFIGS: &[MergeConfig] = &[MergeConfig {
  kind:             EntityType::Job,
  mergeable_fields: &["label", "status"],
  fk_rewrites:      &[
    FkColumn { table: "pre_opportunities", column: "job_id" },
    FkColumn { table: "quotes", column: "job_id" },
    FkColumn { table: "orders", column: "job_id" },
  ],
}];

// ─── Request / result ────────────────────────────────────────────────────────

/// Picks which record is authoritative for one mergeable field. Selections
/// naming unknown fields or unknown sources are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSelection {
  pub field:     String,
  pub source_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
  pub kind:       EntityType,
  pub primary:    Uuid,
  pub duplicates: Vec<Uuid>,
  #[serde(default)]
  pub field_selections: Vec<FieldSelection>,
}

/// `transferred` counts redirected link edges plus direct-FK rewrites.
#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
  pub primary:     EntityStub,
  pub deleted:     u64,
  pub transferred: u64,
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// Process-wide, immutable after construction.
#[derive(Debug, Clone)]
pub struct MergeCoordinator<S> {
  store:   S,
  configs: BTreeMap<EntityType, &'static MergeConfig>,
}

impl<S: CrmStore> MergeCoordinator<S> {
  pub fn with_default_configs(store: S) -> Result<Self> {
    Self::new(store, MERGE_CONFIGS)
  }

  /// Build the coordinator, validating every config against the FK
  /// catalogue the store declares for its kind.
  pub fn new(store: S, configs: &'static [MergeConfig]) -> Result<Self> {
    for config in configs {
      for fk in store.fk_columns_referencing(config.kind) {
        if !config.fk_rewrites.contains(&fk) {
          return Err(Error::MergeConfigIncomplete {
            kind:   config.kind,
            table:  fk.table,
            column: fk.column,
          });
        }
      }
    }

    Ok(Self {
      store,
      configs: configs.iter().map(|config| (config.kind, config)).collect(),
    })
  }

  /// Merge the request's duplicates into its primary.
  ///
  /// Steps 1–6 run inside one store transaction. The post-commit
  /// search-index rebuild for the primary is best-effort: a failure there
  /// is logged as a warning and the merge stands.
  pub async fn merge(
    &self,
    ctx: &RequestContext,
    request: &MergeRequest,
  ) -> Result<MergeResult> {
    let config = self
      .configs
      .get(&request.kind)
      .ok_or_else(|| Error::StrategyMissing { tag: request.kind.to_string() })?;

    if request.duplicates.contains(&request.primary) {
      return Err(Error::MergeConflict);
    }

    let result = self.store.merge(config, request, ctx).await?;

    if let Err(err) = self.store.reindex_entity(request.kind, request.primary).await
    {
      tracing::warn!(
        kind = %request.kind,
        primary = %request.primary,
        error = %err,
        "post-merge reindex failed; merge is committed",
      );
    }

    Ok(result)
  }
}
