//! Link types — the rows of the polymorphic link table.
//!
//! A link stores a source and a target, but the direction is historical
//! only: every query, the uniqueness rule, and all service semantics treat
//! the endpoint pair as unordered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityType;

// ─── Endpoints ───────────────────────────────────────────────────────────────

/// One side of a link: a `(kind, id)` pair naming a row in a domain table.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LinkEndpoint {
  pub kind: EntityType,
  pub id:   Uuid,
}

impl LinkEndpoint {
  pub const fn new(kind: EntityType, id: Uuid) -> Self { Self { kind, id } }

  /// Canonical sort key for direction-insensitive pair ordering. Must match
  /// the expression used by the store's unique pair index.
  pub fn canonical_key(&self) -> String {
    format!("{}|{}", self.kind.code(), self.id)
  }
}

impl std::fmt::Display for LinkEndpoint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.kind, self.id)
  }
}

/// Order a pair canonically so `{a, b}` and `{b, a}` compare equal.
pub fn canonical_pair(
  a: LinkEndpoint,
  b: LinkEndpoint,
) -> (LinkEndpoint, LinkEndpoint) {
  if a.canonical_key() <= b.canonical_key() { (a, b) } else { (b, a) }
}

// ─── LinkRelation ────────────────────────────────────────────────────────────

/// A persisted link row. `created_at` is assigned by the store;
/// `created_by` comes from the request context of the creating call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRelation {
  pub link_id:    Uuid,
  pub source:     LinkEndpoint,
  pub target:     LinkEndpoint,
  pub created_at: DateTime<Utc>,
  pub created_by: Uuid,
}

impl LinkRelation {
  /// Does either side equal `endpoint`?
  pub fn touches(&self, endpoint: LinkEndpoint) -> bool {
    self.source == endpoint || self.target == endpoint
  }

  /// The far side of the link relative to `endpoint`, if the link touches
  /// it. Callers never need to know which side was stored as source.
  pub fn other_endpoint(&self, endpoint: LinkEndpoint) -> Option<LinkEndpoint> {
    if self.source == endpoint {
      Some(self.target)
    } else if self.target == endpoint {
      Some(self.source)
    } else {
      None
    }
  }

  /// Direction-insensitive pair equality with `{a, b}`.
  pub fn is_between(&self, a: LinkEndpoint, b: LinkEndpoint) -> bool {
    canonical_pair(self.source, self.target) == canonical_pair(a, b)
  }
}

// ─── NewLink ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::CrmStore::insert_link`].
/// The link id and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewLink {
  pub source:     LinkEndpoint,
  pub target:     LinkEndpoint,
  pub created_by: Uuid,
}
