//! Explicit request context.
//!
//! "Who is acting" is passed as a value into every mutating core operation
//! rather than being read from process-wide state. Audit columns
//! (`created_by`) are stamped from it.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
  pub actor_id: Uuid,
}

impl RequestContext {
  pub const fn new(actor_id: Uuid) -> Self { Self { actor_id } }

  /// Context for internal callers with no authenticated actor.
  pub const fn system() -> Self { Self { actor_id: Uuid::nil() } }
}
