//! Error taxonomy for the linking core.
//!
//! Every fallible operation returns one of these kinds explicitly; no
//! condition is signalled through panics or sentinel values. The only
//! locally-recovered conditions are `LinkDuplicate` and `LinkSelfEdge`
//! inside the merge's link-redirection step.

use thiserror::Error;
use uuid::Uuid;

use crate::{entity::EntityType, link::LinkEndpoint, lookup::EntitySourceType};

#[derive(Debug, Error)]
pub enum Error {
  /// A persisted kind code not present in the registry — store/schema
  /// drift. Fatal to the request; the registry never silently upgrades.
  #[error("unknown entity kind code {0}")]
  KindUnknown(i64),

  #[error("link endpoints are identical: {0}")]
  LinkSelfEdge(LinkEndpoint),

  /// An adjacency between the pair already exists, in either direction.
  #[error("link already exists between {a} and {b}")]
  LinkDuplicate { a: LinkEndpoint, b: LinkEndpoint },

  /// A claimed `(kind, id)` endpoint does not resolve to a live row.
  #[error("entity not found: {0}")]
  SourceNotFound(LinkEndpoint),

  /// An entity-lookup strategy could not find the requested id.
  #[error("no {source_type} entity with id {id}")]
  EntityNotFound {
    source_type: EntitySourceType,
    id:          Uuid,
  },

  /// No strategy registered for the requested tag. Programming error.
  #[error("no strategy registered for {tag:?}")]
  StrategyMissing { tag: String },

  /// A merge id (primary or duplicate) does not resolve; the whole merge
  /// aborts before any write.
  #[error("merge references a missing entity: {0}")]
  MergeUnknownEntity(LinkEndpoint),

  /// Merge preconditions were violated or invalidated by a concurrent
  /// commit; the transaction aborted and the caller may retry.
  #[error("merge preconditions were invalidated")]
  MergeConflict,

  /// A merge configuration omits a declared FK column for its kind.
  /// Raised at coordinator construction, before any request is served.
  #[error("merge config for {kind} omits FK column {table}.{column}")]
  MergeConfigIncomplete {
    kind:   EntityType,
    table:  &'static str,
    column: &'static str,
  },

  #[error("storage backend error: {0}")]
  Backend(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
