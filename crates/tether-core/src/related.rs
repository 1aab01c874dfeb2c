//! Related-entities strategies — the "landing page" aggregate.
//!
//! For each supported source kind there is one strategy row declaring
//! which kinds it gathers. The registry is a closed map built at process
//! start; dispatch is a single lookup and unknown kinds are a typed error.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  entity::{EntityStub, EntityType},
  error::{Error, Result},
  link::LinkEndpoint,
  store::CrmStore,
};

// ─── Strategy table ──────────────────────────────────────────────────────────

/// One strategy: a source kind and the kinds it promises to enumerate.
#[derive(Debug, Clone, Copy)]
pub struct RelatedStrategy {
  pub source:    EntityType,
  pub reachable: &'static [EntityType],
}

use EntityType::*;

/// The closed strategy set. Every list is the full set of kinds the
/// source's detail view shows; the response always carries every entry,
/// empty or not.
pub const RELATED_STRATEGIES: &[RelatedStrategy] = &[
  RelatedStrategy {
    source:    Job,
    reachable: &[
      Contact, Company, PreOpportunity, Quote, Order, Invoice, Check, Factory,
      Product, Customer, Note, Task,
    ],
  },
  RelatedStrategy {
    source:    Contact,
    reachable: &[
      Company, Job, Note, Task, PreOpportunity, Quote, Order, Invoice, Check,
      Factory, Product, Customer,
    ],
  },
  RelatedStrategy {
    source:    Company,
    reachable: &[Contact, Job, Note, Task, Quote, Order, Invoice],
  },
  RelatedStrategy {
    source:    Note,
    reachable: &[
      Job, Contact, Company, Note, Task, PreOpportunity, Quote, Order, Invoice,
      Check, Factory, Product, Customer,
    ],
  },
  RelatedStrategy {
    source:    Task,
    reachable: &[
      Job, Contact, Company, Note, Task, PreOpportunity, Quote, Order, Invoice,
      Check, Factory, Product, Customer,
    ],
  },
  RelatedStrategy {
    source:    PreOpportunity,
    reachable: &[
      Note, Task, Contact, Company, Job, Quote, Order, Invoice, Check, Factory,
      Product, Customer,
    ],
  },
  RelatedStrategy {
    source:    Quote,
    reachable: &[
      Note, Task, Contact, Company, Job, PreOpportunity, Order, Invoice, Check,
      Factory, Product, Customer,
    ],
  },
  RelatedStrategy {
    source:    Order,
    reachable: &[
      Note, Task, Contact, Company, Job, PreOpportunity, Quote, Invoice, Check,
      Factory, Product, Customer,
    ],
  },
  RelatedStrategy {
    source:    Invoice,
    reachable: &[
      Note, Task, Contact, Company, Job, PreOpportunity, Quote, Order, Check,
      Factory, Product, Customer,
    ],
  },
  RelatedStrategy {
    source:    Check,
    reachable: &[
      Note, Task, Contact, Company, Job, PreOpportunity, Quote, Order, Invoice,
      Factory, Product, Customer,
    ],
  },
  RelatedStrategy {
    source:    Factory,
    reachable: &[Note, Task, Contact, Order, Invoice, Check, Product],
  },
  RelatedStrategy {
    source:    Customer,
    reachable: &[Note, Task, Contact, Company, Job, Quote, Order, Invoice, Check],
  },
  RelatedStrategy {
    source:    Product,
    reachable: &[Note, Task, Job, Quote, Order, Invoice, Factory],
  },
];

// ─── View ────────────────────────────────────────────────────────────────────

/// The read-through aggregate returned by a strategy. Never persisted.
///
/// `related` holds one entry per declared reachable kind — an empty list
/// is present, not absent.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedView {
  pub source:  LinkEndpoint,
  pub related: BTreeMap<EntityType, Vec<EntityStub>>,
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Process-wide, immutable after construction.
#[derive(Debug, Clone)]
pub struct RelatedRegistry {
  strategies: BTreeMap<EntityType, &'static RelatedStrategy>,
}

impl RelatedRegistry {
  pub fn with_default_strategies() -> Self {
    Self::from_strategies(RELATED_STRATEGIES)
  }

  pub fn from_strategies(strategies: &'static [RelatedStrategy]) -> Self {
    Self {
      strategies: strategies.iter().map(|s| (s.source, s)).collect(),
    }
  }

  /// The kinds the strategy for `source` promises, if one is registered.
  pub fn reachable(&self, source: EntityType) -> Option<&'static [EntityType]> {
    self.strategies.get(&source).map(|s| s.reachable)
  }

  /// Dispatch to the strategy for `kind` and gather the aggregate.
  ///
  /// The source entity must exist; a missing source yields
  /// [`Error::SourceNotFound`] and no partial view. Per-kind query
  /// failures propagate unchanged — no kind is silently dropped.
  pub async fn related<S: CrmStore>(
    &self,
    store: &S,
    kind: EntityType,
    id: Uuid,
  ) -> Result<RelatedView> {
    let strategy = self
      .strategies
      .get(&kind)
      .ok_or_else(|| Error::StrategyMissing { tag: kind.to_string() })?;

    let source = LinkEndpoint::new(kind, id);
    if !store.entity_exists(kind, id).await? {
      return Err(Error::SourceNotFound(source));
    }

    let mut related = BTreeMap::new();
    for &reachable_kind in strategy.reachable {
      let stubs = store.adjacent_stubs(reachable_kind, source).await?;
      related.insert(reachable_kind, stubs);
    }

    Ok(RelatedView { source, related })
  }
}
