//! Integration tests for `SqliteStore` against an in-memory database.
//!
//! The core services (link service, registries, merge coordinator) are
//! exercised here too, since this crate provides the only real backend.

use std::collections::BTreeSet;

use tether_core::{
  Error,
  context::RequestContext,
  entity::{EntityStub, EntityType, NewEntity},
  link::LinkEndpoint,
  lookup::{EntityDetail, EntitySourceType, LookupRegistry},
  merge::{FieldSelection, FkColumn, MergeConfig, MergeCoordinator, MergeRequest},
  related::RelatedRegistry,
  service::LinkService,
  store::CrmStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn ctx() -> RequestContext { RequestContext::new(Uuid::new_v4()) }

async fn entity(s: &SqliteStore, kind: EntityType, label: &str) -> EntityStub {
  s.create_entity(kind, NewEntity { label: label.into() })
    .await
    .unwrap()
}

fn ep(stub: &EntityStub) -> LinkEndpoint { LinkEndpoint::new(stub.kind, stub.id) }

// ─── Entities ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_entity() {
  let s = store().await;

  let job = entity(&s, EntityType::Job, "Airport terminal").await;
  let fetched = s.entity_stub(EntityType::Job, job.id).await.unwrap();

  assert_eq!(fetched, Some(job.clone()));
  assert!(s.entity_exists(EntityType::Job, job.id).await.unwrap());
}

#[tokio::test]
async fn missing_entity_returns_none() {
  let s = store().await;

  let fetched = s.entity_stub(EntityType::Job, Uuid::new_v4()).await.unwrap();
  assert!(fetched.is_none());
  assert!(!s.entity_exists(EntityType::Job, Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn delete_entity_cascades_touching_links() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Stadium retrofit").await;
  let company = entity(&s, EntityType::Company, "Acme Mechanical").await;
  links.create_link(&ctx(), ep(&job), ep(&company)).await.unwrap();

  assert!(s.delete_entity(EntityType::Company, company.id).await.unwrap());

  // The company's side owned the cascade; nothing dangles from the job.
  assert!(links.links_for(ep(&job)).await.unwrap().is_empty());

  // Second delete is a no-op.
  assert!(!s.delete_entity(EntityType::Company, company.id).await.unwrap());
}

// ─── Entity kind codes ───────────────────────────────────────────────────────

#[tokio::test]
async fn kind_codes_are_stable_and_total() {
  for kind in EntityType::all() {
    assert_eq!(EntityType::from_code(kind.code()).unwrap(), kind);
  }
  // Spot-check a few codes that must never drift.
  assert_eq!(EntityType::Job.code(), 1);
  assert_eq!(EntityType::Check.code(), 10);
  assert_eq!(EntityType::OrderAcknowledgement.code(), 20);
}

#[tokio::test]
async fn unknown_kind_code_is_rejected() {
  let err = EntityType::from_code(99).unwrap_err();
  assert!(matches!(err, Error::KindUnknown(99)));
}

#[tokio::test]
async fn unknown_kind_code_in_store_is_fatal_on_read() {
  let s = store().await;
  let job = entity(&s, EntityType::Job, "Warehouse expansion").await;

  // Simulate schema drift: a link row written with an unregistered code.
  let job_id = job.id.hyphenated().to_string();
  s.conn
    .call(move |conn| {
      conn.execute(
        "INSERT INTO link_relations (
           link_id, source_entity_type, source_entity_id,
           target_entity_type, target_entity_id, created_at, created_by_id
         ) VALUES (?1, 1, ?2, 99, ?3, ?4, ?5)",
        rusqlite::params![
          Uuid::new_v4().hyphenated().to_string(),
          job_id,
          Uuid::new_v4().hyphenated().to_string(),
          "2024-01-01T00:00:00+00:00",
          Uuid::nil().hyphenated().to_string(),
        ],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.links_touching(ep(&job)).await.unwrap_err();
  assert!(matches!(err, Error::KindUnknown(99)));
}

// ─── Links ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_link_is_symmetric() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Hospital wing").await;
  let company = entity(&s, EntityType::Company, "Borealis HVAC").await;

  links.create_link(&ctx(), ep(&job), ep(&company)).await.unwrap();

  let from_job = links
    .neighbors(ep(&job), Some(EntityType::Company))
    .await
    .unwrap();
  let from_company = links
    .neighbors(ep(&company), Some(EntityType::Job))
    .await
    .unwrap();

  assert_eq!(from_job, vec![company.id]);
  assert_eq!(from_company, vec![job.id]);
}

#[tokio::test]
async fn reversed_duplicate_is_rejected() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Hospital wing").await;
  let company = entity(&s, EntityType::Company, "Borealis HVAC").await;

  links.create_link(&ctx(), ep(&job), ep(&company)).await.unwrap();
  let err = links
    .create_link(&ctx(), ep(&company), ep(&job))
    .await
    .unwrap_err();

  assert!(matches!(err, Error::LinkDuplicate { .. }));
  assert_eq!(links.links_for(ep(&job)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn same_direction_duplicate_is_rejected() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Data center").await;
  let contact = entity(&s, EntityType::Contact, "Rowan Ellis").await;

  links.create_link(&ctx(), ep(&job), ep(&contact)).await.unwrap();
  let err = links
    .create_link(&ctx(), ep(&job), ep(&contact))
    .await
    .unwrap_err();

  assert!(matches!(err, Error::LinkDuplicate { .. }));
}

#[tokio::test]
async fn self_edge_is_rejected() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Data center").await;
  let err = links.create_link(&ctx(), ep(&job), ep(&job)).await.unwrap_err();

  assert!(matches!(err, Error::LinkSelfEdge(_)));
}

#[tokio::test]
async fn create_link_requires_live_endpoints() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Data center").await;
  let ghost = LinkEndpoint::new(EntityType::Company, Uuid::new_v4());

  let err = links.create_link(&ctx(), ep(&job), ghost).await.unwrap_err();
  assert!(matches!(err, Error::SourceNotFound(endpoint) if endpoint == ghost));
}

#[tokio::test]
async fn create_link_stamps_actor() {
  let s = store().await;
  let links = LinkService::new(s.clone());
  let actor = RequestContext::new(Uuid::new_v4());

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  let note = entity(&s, EntityType::Note, "Walkthrough notes").await;

  let link = links.create_link(&actor, ep(&job), ep(&note)).await.unwrap();
  assert_eq!(link.created_by, actor.actor_id);

  let found = s.find_link(link.link_id).await.unwrap().unwrap();
  assert_eq!(found, link);
}

#[tokio::test]
async fn delete_link_works_in_either_direction_exactly_once() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  let company = entity(&s, EntityType::Company, "Keystone Controls").await;

  links.create_link(&ctx(), ep(&job), ep(&company)).await.unwrap();

  // Reversed orientation deletes the same row; the second call is a miss.
  assert!(links.delete_link(ep(&company), ep(&job)).await.unwrap());
  assert!(!links.delete_link(ep(&job), ep(&company)).await.unwrap());
  assert!(links.links_for(ep(&job)).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_link_by_id_round_trip() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  let task = entity(&s, EntityType::Task, "Submit drawings").await;

  let link = links.create_link(&ctx(), ep(&job), ep(&task)).await.unwrap();

  assert!(s.delete_link_by_id(link.link_id).await.unwrap());
  assert!(s.find_link(link.link_id).await.unwrap().is_none());
  assert!(!s.delete_link_by_id(link.link_id).await.unwrap());
}

#[tokio::test]
async fn links_from_and_links_to_split_on_stored_direction() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  let company = entity(&s, EntityType::Company, "Keystone Controls").await;

  links.create_link(&ctx(), ep(&job), ep(&company)).await.unwrap();

  assert_eq!(s.links_from(ep(&job)).await.unwrap().len(), 1);
  assert!(s.links_to(ep(&job)).await.unwrap().is_empty());
  assert_eq!(s.links_to(ep(&company)).await.unwrap().len(), 1);
  assert!(s.links_from(ep(&company)).await.unwrap().is_empty());
}

#[tokio::test]
async fn exists_between_is_direction_insensitive() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  let factory = entity(&s, EntityType::Factory, "Meridian Pumps").await;

  links.create_link(&ctx(), ep(&job), ep(&factory)).await.unwrap();

  assert!(s.exists_between(ep(&job), ep(&factory)).await.unwrap());
  assert!(s.exists_between(ep(&factory), ep(&job)).await.unwrap());
  assert!(!s.exists_between(ep(&job), ep(&job)).await.unwrap());
}

#[tokio::test]
async fn neighbors_unfiltered_returns_all_far_endpoints() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  let company = entity(&s, EntityType::Company, "Keystone Controls").await;
  let contact = entity(&s, EntityType::Contact, "Priya Shah").await;

  links.create_link(&ctx(), ep(&job), ep(&company)).await.unwrap();
  links.create_link(&ctx(), ep(&contact), ep(&job)).await.unwrap();

  let all: BTreeSet<Uuid> =
    links.neighbors(ep(&job), None).await.unwrap().into_iter().collect();
  assert_eq!(all, BTreeSet::from([company.id, contact.id]));
}

#[tokio::test]
async fn unique_pair_index_backstops_racing_inserts() {
  let s = store().await;

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  let company = entity(&s, EntityType::Company, "Keystone Controls").await;

  // Straight to the store, bypassing the service's existence pre-check —
  // this is what two racing create_link calls reduce to.
  s.insert_link(tether_core::link::NewLink {
    source:     ep(&job),
    target:     ep(&company),
    created_by: Uuid::nil(),
  })
  .await
  .unwrap();

  let err = s
    .insert_link(tether_core::link::NewLink {
      source:     ep(&company),
      target:     ep(&job),
      created_by: Uuid::nil(),
    })
    .await
    .unwrap_err();

  assert!(matches!(err, Error::LinkDuplicate { .. }));
}

// ─── Polymorphic adjacency query ─────────────────────────────────────────────

#[tokio::test]
async fn adjacent_stubs_sees_both_stored_directions() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  let toward = entity(&s, EntityType::Company, "Keystone Controls").await;
  let backward = entity(&s, EntityType::Company, "Borealis HVAC").await;

  // One link stored with the job as source, one with the job as target.
  links.create_link(&ctx(), ep(&job), ep(&toward)).await.unwrap();
  links.create_link(&ctx(), ep(&backward), ep(&job)).await.unwrap();

  let found: BTreeSet<Uuid> = s
    .adjacent_stubs(EntityType::Company, ep(&job))
    .await
    .unwrap()
    .into_iter()
    .map(|stub| stub.id)
    .collect();

  assert_eq!(found, BTreeSet::from([toward.id, backward.id]));
}

#[tokio::test]
async fn adjacent_stubs_agrees_with_exists_between() {
  let s = store().await;
  let links = LinkService::new(s.clone());

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  let companies = [
    entity(&s, EntityType::Company, "Keystone Controls").await,
    entity(&s, EntityType::Company, "Borealis HVAC").await,
    entity(&s, EntityType::Company, "Meridian Pumps").await,
  ];
  links.create_link(&ctx(), ep(&job), ep(&companies[0])).await.unwrap();
  links.create_link(&ctx(), ep(&companies[2]), ep(&job)).await.unwrap();

  let found: BTreeSet<Uuid> = s
    .adjacent_stubs(EntityType::Company, ep(&job))
    .await
    .unwrap()
    .into_iter()
    .map(|stub| stub.id)
    .collect();

  for company in &companies {
    let adjacent = s.exists_between(ep(company), ep(&job)).await.unwrap();
    assert_eq!(found.contains(&company.id), adjacent);
  }
}

// ─── Related entities ────────────────────────────────────────────────────────

#[tokio::test]
async fn related_entities_gathers_every_declared_kind() {
  let s = store().await;
  let links = LinkService::new(s.clone());
  let registry = RelatedRegistry::with_default_strategies();

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  let company = entity(&s, EntityType::Company, "Keystone Controls").await;
  let contact = entity(&s, EntityType::Contact, "Priya Shah").await;
  let note = entity(&s, EntityType::Note, "Kickoff summary").await;

  links.create_link(&ctx(), ep(&job), ep(&company)).await.unwrap();
  links.create_link(&ctx(), ep(&job), ep(&contact)).await.unwrap();
  links.create_link(&ctx(), ep(&note), ep(&job)).await.unwrap();

  let view = registry.related(&s, EntityType::Job, job.id).await.unwrap();

  let reachable = registry.reachable(EntityType::Job).unwrap();
  assert_eq!(view.related.len(), reachable.len());

  for kind in reachable {
    // Every declared kind is present — empty, not absent.
    let stubs = view.related.get(kind).unwrap();
    match kind {
      EntityType::Company => assert_eq!(stubs, &[company.clone()]),
      EntityType::Contact => assert_eq!(stubs, &[contact.clone()]),
      EntityType::Note => assert_eq!(stubs, &[note.clone()]),
      _ => assert!(stubs.is_empty(), "expected no {kind} entries"),
    }
  }
}

#[tokio::test]
async fn related_entities_missing_source_fails() {
  let s = store().await;
  let registry = RelatedRegistry::with_default_strategies();

  let err = registry
    .related(&s, EntityType::Job, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SourceNotFound(_)));
}

#[tokio::test]
async fn related_entities_unregistered_kind_fails() {
  let s = store().await;
  let registry = RelatedRegistry::with_default_strategies();

  let file = entity(&s, EntityType::File, "site-plan.pdf").await;
  let err = registry
    .related(&s, EntityType::File, file.id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::StrategyMissing { .. }));
}

// ─── Entity lookup ───────────────────────────────────────────────────────────

#[tokio::test]
async fn entity_lookup_returns_tagged_detail() {
  let s = store().await;
  let registry = LookupRegistry::with_default_strategies();

  let quote = entity(&s, EntityType::Quote, "Rooftop units").await;
  let detail = registry
    .entity(&s, EntitySourceType::Quotes, quote.id)
    .await
    .unwrap();

  match detail {
    EntityDetail::Quote(q) => {
      assert_eq!(q.quote_id, quote.id);
      assert_eq!(q.label, "Rooftop units");
      assert_eq!(q.amount_cents, 0);
      assert!(q.job_id.is_none());
    }
    other => panic!("expected a quote detail, got {other:?}"),
  }
}

#[tokio::test]
async fn entity_lookup_missing_id_fails() {
  let s = store().await;
  let registry = LookupRegistry::with_default_strategies();

  let err = registry
    .entity(&s, EntitySourceType::Invoices, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::EntityNotFound { source_type: EntitySourceType::Invoices, .. }
  ));
}

#[tokio::test]
async fn entity_lookup_unregistered_tag_fails() {
  let s = store().await;
  let registry = LookupRegistry::with_default_strategies();

  let err = registry
    .entity(&s, EntitySourceType::Adjustments, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::StrategyMissing { .. }));
}

// ─── Merge ───────────────────────────────────────────────────────────────────

async fn set_quote_job(s: &SqliteStore, quote_id: Uuid, job_id: Uuid) {
  let quote_str = quote_id.hyphenated().to_string();
  let job_str = job_id.hyphenated().to_string();
  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE quotes SET job_id = ?1 WHERE quote_id = ?2",
        rusqlite::params![job_str, quote_str],
      )?;
      Ok(())
    })
    .await
    .unwrap();
}

fn merge_request(primary: Uuid, duplicates: Vec<Uuid>) -> MergeRequest {
  MergeRequest {
    kind: EntityType::Job,
    primary,
    duplicates,
    field_selections: Vec::new(),
  }
}

#[tokio::test]
async fn merge_redirects_links_and_rewrites_fks() {
  let s = store().await;
  let links = LinkService::new(s.clone());
  let coordinator = MergeCoordinator::with_default_configs(s.clone()).unwrap();

  let primary = entity(&s, EntityType::Job, "Transit hub").await;
  let duplicate = entity(&s, EntityType::Job, "Transit hub (dupe)").await;
  let shared = entity(&s, EntityType::Company, "Keystone Controls").await;
  let only_dup = entity(&s, EntityType::Company, "Borealis HVAC").await;

  links.create_link(&ctx(), ep(&primary), ep(&shared)).await.unwrap();
  links.create_link(&ctx(), ep(&duplicate), ep(&shared)).await.unwrap();
  links.create_link(&ctx(), ep(&duplicate), ep(&only_dup)).await.unwrap();

  let quote = entity(&s, EntityType::Quote, "Rooftop units").await;
  set_quote_job(&s, quote.id, duplicate.id).await;

  let result = coordinator
    .merge(&ctx(), &merge_request(primary.id, vec![duplicate.id]))
    .await
    .unwrap();

  assert_eq!(result.deleted, 1);
  // One redirected edge (the shared-company edge is dropped as a
  // duplicate) plus one FK rewrite.
  assert_eq!(result.transferred, 2);
  assert_eq!(result.primary.id, primary.id);

  assert!(!s.entity_exists(EntityType::Job, duplicate.id).await.unwrap());

  let neighbors: BTreeSet<Uuid> = links
    .neighbors(ep(&primary), Some(EntityType::Company))
    .await
    .unwrap()
    .into_iter()
    .collect();
  assert_eq!(neighbors, BTreeSet::from([shared.id, only_dup.id]));
  assert_eq!(links.links_for(ep(&primary)).await.unwrap().len(), 2);

  let quote_detail = s.quote(quote.id).await.unwrap().unwrap();
  assert_eq!(quote_detail.job_id, Some(primary.id));
}

#[tokio::test]
async fn merge_unknown_entity_aborts_without_writes() {
  let s = store().await;
  let links = LinkService::new(s.clone());
  let coordinator = MergeCoordinator::with_default_configs(s.clone()).unwrap();

  let primary = entity(&s, EntityType::Job, "Transit hub").await;
  let company = entity(&s, EntityType::Company, "Keystone Controls").await;
  links.create_link(&ctx(), ep(&primary), ep(&company)).await.unwrap();

  let ghost = Uuid::new_v4();
  let err = coordinator
    .merge(&ctx(), &merge_request(primary.id, vec![ghost]))
    .await
    .unwrap_err();

  assert!(matches!(err, Error::MergeUnknownEntity(endpoint)
    if endpoint == LinkEndpoint::new(EntityType::Job, ghost)));

  // Store unchanged.
  assert!(s.entity_exists(EntityType::Job, primary.id).await.unwrap());
  assert_eq!(links.links_for(ep(&primary)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn merge_with_no_duplicates_is_a_noop() {
  let s = store().await;
  let coordinator = MergeCoordinator::with_default_configs(s.clone()).unwrap();

  let primary = entity(&s, EntityType::Job, "Transit hub").await;
  let result = coordinator
    .merge(&ctx(), &merge_request(primary.id, Vec::new()))
    .await
    .unwrap();

  assert_eq!(result.deleted, 0);
  assert_eq!(result.transferred, 0);
  assert_eq!(result.primary, primary);
}

#[tokio::test]
async fn merge_applies_known_field_selections_only() {
  let s = store().await;
  let coordinator = MergeCoordinator::with_default_configs(s.clone()).unwrap();

  let primary = entity(&s, EntityType::Job, "Transit hub").await;
  let duplicate = entity(&s, EntityType::Job, "Transit hub (corrected)").await;

  let request = MergeRequest {
    kind: EntityType::Job,
    primary: primary.id,
    duplicates: vec![duplicate.id],
    field_selections: vec![
      // Applied: `label` is mergeable and the source is a duplicate.
      FieldSelection { field: "label".into(), source_id: duplicate.id },
      // Ignored: not in the mergeable set.
      FieldSelection { field: "created_at".into(), source_id: duplicate.id },
      // Ignored: source is neither the primary nor a duplicate.
      FieldSelection { field: "status".into(), source_id: Uuid::new_v4() },
    ],
  };

  let result = coordinator.merge(&ctx(), &request).await.unwrap();
  assert_eq!(result.primary.label, "Transit hub (corrected)");
  assert_eq!(result.primary.created_at, primary.created_at);
}

#[tokio::test]
async fn merge_collapses_links_between_duplicates() {
  let s = store().await;
  let links = LinkService::new(s.clone());
  let coordinator = MergeCoordinator::with_default_configs(s.clone()).unwrap();

  let primary = entity(&s, EntityType::Job, "Transit hub").await;
  let dup_a = entity(&s, EntityType::Job, "Transit hub (a)").await;
  let dup_b = entity(&s, EntityType::Job, "Transit hub (b)").await;

  // Job↔job links between the records being folded together.
  links.create_link(&ctx(), ep(&dup_a), ep(&dup_b)).await.unwrap();
  links.create_link(&ctx(), ep(&primary), ep(&dup_a)).await.unwrap();

  let result = coordinator
    .merge(&ctx(), &merge_request(primary.id, vec![dup_a.id, dup_b.id]))
    .await
    .unwrap();

  // Both edges collapse to self-edges and are dropped, not transferred.
  assert_eq!(result.deleted, 2);
  assert_eq!(result.transferred, 0);
  assert!(links.links_for(ep(&primary)).await.unwrap().is_empty());
}

#[tokio::test]
async fn merge_preserves_outside_adjacency() {
  let s = store().await;
  let links = LinkService::new(s.clone());
  let coordinator = MergeCoordinator::with_default_configs(s.clone()).unwrap();

  let primary = entity(&s, EntityType::Job, "Transit hub").await;
  let duplicate = entity(&s, EntityType::Job, "Transit hub (dupe)").await;
  let contact = entity(&s, EntityType::Contact, "Priya Shah").await;

  links.create_link(&ctx(), ep(&contact), ep(&duplicate)).await.unwrap();
  assert!(!s.exists_between(ep(&contact), ep(&primary)).await.unwrap());

  coordinator
    .merge(&ctx(), &merge_request(primary.id, vec![duplicate.id]))
    .await
    .unwrap();

  assert!(s.exists_between(ep(&contact), ep(&primary)).await.unwrap());
}

#[tokio::test]
async fn merge_rejects_primary_listed_as_duplicate() {
  let s = store().await;
  let coordinator = MergeCoordinator::with_default_configs(s.clone()).unwrap();

  let primary = entity(&s, EntityType::Job, "Transit hub").await;
  let err = coordinator
    .merge(&ctx(), &merge_request(primary.id, vec![primary.id]))
    .await
    .unwrap_err();

  assert!(matches!(err, Error::MergeConflict));
}

#[tokio::test]
async fn merge_without_config_for_kind_fails() {
  let s = store().await;
  let coordinator = MergeCoordinator::with_default_configs(s.clone()).unwrap();

  let contact = entity(&s, EntityType::Contact, "Priya Shah").await;
  let request = MergeRequest {
    kind: EntityType::Contact,
    primary: contact.id,
    duplicates: Vec::new(),
    field_selections: Vec::new(),
  };

  let err = coordinator.merge(&ctx(), &request).await.unwrap_err();
  assert!(matches!(err, Error::StrategyMissing { .. }));
}

#[tokio::test]
async fn merge_coordinator_rejects_incomplete_fk_config() {
  // Omits orders.job_id, which the store declares for jobs.
  static INCOMPLETE: &[MergeConfig] = &[MergeConfig {
    kind:             EntityType::Job,
    mergeable_fields: &["label"],
    fk_rewrites:      &[
      FkColumn { table: "pre_opportunities", column: "job_id" },
      FkColumn { table: "quotes", column: "job_id" },
    ],
  }];

  let s = store().await;
  let err = MergeCoordinator::new(s, INCOMPLETE).unwrap_err();

  assert!(matches!(
    err,
    Error::MergeConfigIncomplete { kind: EntityType::Job, table: "orders", column: "job_id" }
  ));
}

// ─── Search index ────────────────────────────────────────────────────────────

async fn index_rows_for(s: &SqliteStore, kind: EntityType, id: Uuid) -> i64 {
  let id_str = id.hyphenated().to_string();
  let code = kind.code();
  s.conn
    .call(move |conn| {
      Ok(conn.query_row(
        "SELECT COUNT(*) FROM search_index WHERE entity_type = ?1 AND entity_id = ?2",
        rusqlite::params![code, id_str],
        |row| row.get(0),
      )?)
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn search_finds_entities_by_substring() {
  let s = store().await;

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  entity(&s, EntityType::Company, "Transit Controls Ltd").await;

  let all = s.search_entities("transit", None).await.unwrap();
  assert_eq!(all.len(), 2);

  let jobs_only = s.search_entities("transit", Some(EntityType::Job)).await.unwrap();
  assert_eq!(jobs_only.len(), 1);
  assert_eq!(jobs_only[0].id, job.id);
}

#[tokio::test]
async fn deleted_entities_drop_out_of_search() {
  let s = store().await;

  let job = entity(&s, EntityType::Job, "Transit hub").await;
  s.delete_entity(EntityType::Job, job.id).await.unwrap();

  assert!(s.search_entities("transit", None).await.unwrap().is_empty());
  assert_eq!(index_rows_for(&s, EntityType::Job, job.id).await, 0);
}

#[tokio::test]
async fn merge_scrubs_duplicate_index_and_rebuilds_primary() {
  let s = store().await;
  let coordinator = MergeCoordinator::with_default_configs(s.clone()).unwrap();

  let primary = entity(&s, EntityType::Job, "Transit hub").await;
  let duplicate = entity(&s, EntityType::Job, "Transit hub (corrected)").await;

  let request = MergeRequest {
    kind: EntityType::Job,
    primary: primary.id,
    duplicates: vec![duplicate.id],
    field_selections: vec![FieldSelection {
      field:     "label".into(),
      source_id: duplicate.id,
    }],
  };
  coordinator.merge(&ctx(), &request).await.unwrap();

  assert_eq!(index_rows_for(&s, EntityType::Job, duplicate.id).await, 0);

  // The primary's index entry reflects the merged label.
  let hits = s.search_entities("corrected", Some(EntityType::Job)).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].id, primary.id);
}
