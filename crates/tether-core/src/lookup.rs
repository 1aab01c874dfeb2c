//! Entity-lookup strategies — the canonical detail view per source type.
//!
//! Landing pages identify records by an [`EntitySourceType`] tag. The tag
//! enumeration is wider than the set of registered strategies: dispatching
//! a tag with no strategy is a typed error, not a fallback.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  store::CrmStore,
};

// ─── Source tags ─────────────────────────────────────────────────────────────

/// User-facing source tags accepted by the entity-lookup endpoint.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntitySourceType {
  PreOpportunities,
  Quotes,
  Orders,
  Invoices,
  Checks,
  Credits,
  Adjustments,
  Deductions,
  Statements,
  OrderAcknowledgements,
}

impl EntitySourceType {
  pub const fn name(self) -> &'static str {
    match self {
      Self::PreOpportunities => "pre_opportunities",
      Self::Quotes => "quotes",
      Self::Orders => "orders",
      Self::Invoices => "invoices",
      Self::Checks => "checks",
      Self::Credits => "credits",
      Self::Adjustments => "adjustments",
      Self::Deductions => "deductions",
      Self::Statements => "statements",
      Self::OrderAcknowledgements => "order_acknowledgements",
    }
  }
}

impl std::fmt::Display for EntitySourceType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

// ─── Detail shapes ───────────────────────────────────────────────────────────

/// Monetary amounts are carried as integer cents; the store keeps them in
/// an INTEGER column.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreOpportunity {
  pub pre_opportunity_id: Uuid,
  pub label:              String,
  pub job_id:             Option<Uuid>,
  pub created_at:         DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
  pub quote_id:     Uuid,
  pub quote_number: String,
  pub label:        String,
  pub amount_cents: i64,
  pub job_id:       Option<Uuid>,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub order_id:     Uuid,
  pub order_number: String,
  pub label:        String,
  pub amount_cents: i64,
  pub job_id:       Option<Uuid>,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
  pub invoice_id:     Uuid,
  pub invoice_number: String,
  pub label:          String,
  pub amount_cents:   i64,
  pub order_id:       Option<Uuid>,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
  pub check_id:     Uuid,
  pub check_number: String,
  pub label:        String,
  pub amount_cents: i64,
  pub created_at:   DateTime<Utc>,
}

/// The canonical detail response — a tagged union over the shapes the
/// registered strategies can return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EntityDetail {
  PreOpportunity(PreOpportunity),
  Quote(Quote),
  Order(Order),
  Invoice(Invoice),
  Check(Check),
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Process-wide, immutable after construction.
#[derive(Debug, Clone)]
pub struct LookupRegistry {
  registered: BTreeSet<EntitySourceType>,
}

impl LookupRegistry {
  /// The commission-chain strategies shipped by default.
  pub fn with_default_strategies() -> Self {
    Self {
      registered: BTreeSet::from([
        EntitySourceType::PreOpportunities,
        EntitySourceType::Quotes,
        EntitySourceType::Orders,
        EntitySourceType::Invoices,
        EntitySourceType::Checks,
      ]),
    }
  }

  pub fn is_registered(&self, source: EntitySourceType) -> bool {
    self.registered.contains(&source)
  }

  /// Dispatch to the strategy for `source` and return the detail view.
  pub async fn entity<S: CrmStore>(
    &self,
    store: &S,
    source: EntitySourceType,
    id: Uuid,
  ) -> Result<EntityDetail> {
    if !self.is_registered(source) {
      return Err(Error::StrategyMissing { tag: source.to_string() });
    }

    let detail = match source {
      EntitySourceType::PreOpportunities => {
        store.pre_opportunity(id).await?.map(EntityDetail::PreOpportunity)
      }
      EntitySourceType::Quotes => store.quote(id).await?.map(EntityDetail::Quote),
      EntitySourceType::Orders => store.order(id).await?.map(EntityDetail::Order),
      EntitySourceType::Invoices => {
        store.invoice(id).await?.map(EntityDetail::Invoice)
      }
      EntitySourceType::Checks => store.check(id).await?.map(EntityDetail::Check),
      // Unreachable while `registered` only names the arms above; kept as a
      // typed error so a future registration cannot fall through silently.
      other => return Err(Error::StrategyMissing { tag: other.to_string() }),
    };

    detail.ok_or(Error::EntityNotFound { source_type: source, id })
  }
}
