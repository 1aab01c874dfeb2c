//! The `CrmStore` trait — the persistence abstraction of the linking core.
//!
//! Implemented by storage backends (e.g. `tether-store-sqlite`). The
//! services in this crate ([`crate::service`], [`crate::related`],
//! [`crate::lookup`], [`crate::merge`]) depend on this abstraction, not on
//! any concrete backend.
//!
//! Every method is a suspension point; each call is atomic at the store.
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  context::RequestContext,
  entity::{EntityStub, EntityType, NewEntity},
  error::Result,
  link::{LinkEndpoint, LinkRelation, NewLink},
  lookup::{Check, Invoice, Order, PreOpportunity, Quote},
  merge::{FkColumn, MergeConfig, MergeRequest, MergeResult},
};

pub trait CrmStore: Send + Sync {
  // ── Entities ──────────────────────────────────────────────────────────

  /// Persist a new entity row of `kind` and index it for search.
  fn create_entity(
    &self,
    kind: EntityType,
    input: NewEntity,
  ) -> impl Future<Output = Result<EntityStub>> + Send + '_;

  /// Fetch the uniform projection of an entity row, or `None`.
  fn entity_stub(
    &self,
    kind: EntityType,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<EntityStub>>> + Send + '_;

  /// Does `(kind, id)` resolve to a live row?
  fn entity_exists(
    &self,
    kind: EntityType,
    id: Uuid,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  /// Delete an entity row, cascading every link that touches it and its
  /// search-index entry in the same transaction. Returns whether a row was
  /// deleted.
  fn delete_entity(
    &self,
    kind: EntityType,
    id: Uuid,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  // ── Links ─────────────────────────────────────────────────────────────

  /// Persist a new link. Fails with [`crate::Error::LinkDuplicate`] if a
  /// direction-insensitive duplicate exists; the uniqueness invariant is
  /// enforced at commit, so of two racing inserts exactly one succeeds.
  fn insert_link(
    &self,
    link: NewLink,
  ) -> impl Future<Output = Result<LinkRelation>> + Send + '_;

  /// Remove exactly one row by id. Returns whether a row was removed.
  fn delete_link_by_id(
    &self,
    link_id: Uuid,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  fn find_link(
    &self,
    link_id: Uuid,
  ) -> impl Future<Output = Result<Option<LinkRelation>>> + Send + '_;

  /// Every row whose source or target equals `endpoint`.
  fn links_touching(
    &self,
    endpoint: LinkEndpoint,
  ) -> impl Future<Output = Result<Vec<LinkRelation>>> + Send + '_;

  /// Rows where `endpoint` is specifically the stored source.
  fn links_from(
    &self,
    endpoint: LinkEndpoint,
  ) -> impl Future<Output = Result<Vec<LinkRelation>>> + Send + '_;

  /// Rows where `endpoint` is specifically the stored target.
  fn links_to(
    &self,
    endpoint: LinkEndpoint,
  ) -> impl Future<Output = Result<Vec<LinkRelation>>> + Send + '_;

  /// Direction-insensitive adjacency test.
  fn exists_between(
    &self,
    a: LinkEndpoint,
    b: LinkEndpoint,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  /// Delete the one row matching `{a, b}` under direction-insensitive
  /// equality. Returns whether a row was removed.
  fn delete_link_between(
    &self,
    a: LinkEndpoint,
    b: LinkEndpoint,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  // ── Polymorphic adjacency query ───────────────────────────────────────

  /// All rows of the `kind` table adjacent to `to`, regardless of link
  /// direction. One round trip; a row reachable through more than one link
  /// is returned once.
  fn adjacent_stubs(
    &self,
    kind: EntityType,
    to: LinkEndpoint,
  ) -> impl Future<Output = Result<Vec<EntityStub>>> + Send + '_;

  // ── Commission-chain detail loads ─────────────────────────────────────

  fn pre_opportunity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<PreOpportunity>>> + Send + '_;

  fn quote(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Quote>>> + Send + '_;

  fn order(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Order>>> + Send + '_;

  fn invoice(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Invoice>>> + Send + '_;

  fn check(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Check>>> + Send + '_;

  // ── Merge ─────────────────────────────────────────────────────────────

  /// Execute a merge under a single transaction: validate every id,
  /// apply field selections, redirect links touching the duplicates
  /// (dropping would-be self-edges and duplicate adjacencies), rewrite the
  /// declared direct FKs, scrub duplicate index entries, and delete the
  /// duplicate rows. Either all of it commits or none of it does.
  fn merge<'a>(
    &'a self,
    config: &'a MergeConfig,
    request: &'a MergeRequest,
    ctx: &'a RequestContext,
  ) -> impl Future<Output = Result<MergeResult>> + Send + 'a;

  /// The FK columns the backend declares as referencing `kind`'s id table.
  /// Pure registry information; does not suspend.
  fn fk_columns_referencing(&self, kind: EntityType) -> Vec<FkColumn>;

  /// Rebuild the search-index entry for one entity. Called best-effort
  /// after a committed merge; not covered by the merge transaction.
  fn reindex_entity(
    &self,
    kind: EntityType,
    id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Search ────────────────────────────────────────────────────────────

  /// Substring search over indexed entities, optionally restricted to one
  /// kind.
  fn search_entities<'a>(
    &'a self,
    text: &'a str,
    kind: Option<EntityType>,
  ) -> impl Future<Output = Result<Vec<EntityStub>>> + Send + 'a;
}
