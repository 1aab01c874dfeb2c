//! The link service — symmetric create/delete/enumerate over any backend.
//!
//! Nothing above this layer reasons about which side of a link is the
//! stored source; both orientations are collapsed here.

use uuid::Uuid;

use crate::{
  context::RequestContext,
  entity::EntityType,
  error::{Error, Result},
  link::{LinkEndpoint, LinkRelation, NewLink},
  store::CrmStore,
};

#[derive(Debug, Clone)]
pub struct LinkService<S> {
  store: S,
}

impl<S: CrmStore> LinkService<S> {
  pub fn new(store: S) -> Self { Self { store } }

  /// Create a link between two endpoints.
  ///
  /// The store carries no per-kind foreign keys for link endpoints, so
  /// referential soundness is enforced here: both endpoints must resolve
  /// to live rows. Self-edges and direction-insensitive duplicates are
  /// rejected. `created_by` is stamped from `ctx`.
  pub async fn create_link(
    &self,
    ctx: &RequestContext,
    source: LinkEndpoint,
    target: LinkEndpoint,
  ) -> Result<LinkRelation> {
    if source == target {
      return Err(Error::LinkSelfEdge(source));
    }

    for endpoint in [source, target] {
      if !self.store.entity_exists(endpoint.kind, endpoint.id).await? {
        return Err(Error::SourceNotFound(endpoint));
      }
    }

    if self.store.exists_between(source, target).await? {
      return Err(Error::LinkDuplicate { a: source, b: target });
    }

    // The store's unique pair index still backstops a racing insert.
    self
      .store
      .insert_link(NewLink { source, target, created_by: ctx.actor_id })
      .await
  }

  /// Delete the link matching `{a, b}` in either orientation.
  /// Returns `false` if none matches.
  pub async fn delete_link(
    &self,
    a: LinkEndpoint,
    b: LinkEndpoint,
  ) -> Result<bool> {
    self.store.delete_link_between(a, b).await
  }

  /// Every link touching `endpoint`, both directions mixed.
  pub async fn links_for(
    &self,
    endpoint: LinkEndpoint,
  ) -> Result<Vec<LinkRelation>> {
    self.store.links_touching(endpoint).await
  }

  /// Ids of the far endpoint of every link touching `endpoint`, optionally
  /// filtered to a target kind.
  pub async fn neighbors(
    &self,
    endpoint: LinkEndpoint,
    target_kind: Option<EntityType>,
  ) -> Result<Vec<Uuid>> {
    let links = self.store.links_touching(endpoint).await?;

    Ok(
      links
        .iter()
        .filter_map(|link| link.other_endpoint(endpoint))
        .filter(|other| target_kind.is_none_or(|k| other.kind == k))
        .map(|other| other.id)
        .collect(),
    )
  }
}
