//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated
//! lowercase strings, and entity kinds as their stable integer codes.

use chrono::{DateTime, Utc};
use tether_core::{
  Error, Result,
  entity::{EntityStub, EntityType},
  link::{LinkEndpoint, LinkRelation},
  lookup::{Check, Invoice, Order, PreOpportunity, Quote},
};
use uuid::Uuid;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(|e| Error::Backend(format!("bad uuid {s:?}: {e}")))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Backend(format!("bad timestamp {s:?}: {e}")))
}

/// Decode a persisted kind code. Unknown codes surface as
/// [`Error::KindUnknown`] — store/schema drift, fatal to the request.
pub fn decode_kind(code: i64) -> Result<EntityType> { EntityType::from_code(code) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `link_relations` row.
pub struct RawLink {
  pub link_id:     String,
  pub source_type: i64,
  pub source_id:   String,
  pub target_type: i64,
  pub target_id:   String,
  pub created_at:  String,
  pub created_by:  String,
}

impl RawLink {
  pub fn into_link(self) -> Result<LinkRelation> {
    Ok(LinkRelation {
      link_id:    decode_uuid(&self.link_id)?,
      source:     LinkEndpoint::new(
        decode_kind(self.source_type)?,
        decode_uuid(&self.source_id)?,
      ),
      target:     LinkEndpoint::new(
        decode_kind(self.target_type)?,
        decode_uuid(&self.target_id)?,
      ),
      created_at: decode_dt(&self.created_at)?,
      created_by: decode_uuid(&self.created_by)?,
    })
  }
}

/// Raw strings of the uniform projection read from any domain table.
pub struct RawStub {
  pub id:         String,
  pub label:      String,
  pub created_at: String,
}

impl RawStub {
  pub fn into_stub(self, kind: EntityType) -> Result<EntityStub> {
    Ok(EntityStub {
      id: decode_uuid(&self.id)?,
      kind,
      label: self.label,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Commission-chain rows ───────────────────────────────────────────────────

pub struct RawPreOpportunity {
  pub id:         String,
  pub label:      String,
  pub job_id:     Option<String>,
  pub created_at: String,
}

impl RawPreOpportunity {
  pub fn into_detail(self) -> Result<PreOpportunity> {
    Ok(PreOpportunity {
      pre_opportunity_id: decode_uuid(&self.id)?,
      label:              self.label,
      job_id:             self.job_id.as_deref().map(decode_uuid).transpose()?,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawQuote {
  pub id:           String,
  pub quote_number: String,
  pub label:        String,
  pub amount_cents: i64,
  pub job_id:       Option<String>,
  pub created_at:   String,
}

impl RawQuote {
  pub fn into_detail(self) -> Result<Quote> {
    Ok(Quote {
      quote_id:     decode_uuid(&self.id)?,
      quote_number: self.quote_number,
      label:        self.label,
      amount_cents: self.amount_cents,
      job_id:       self.job_id.as_deref().map(decode_uuid).transpose()?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawOrder {
  pub id:           String,
  pub order_number: String,
  pub label:        String,
  pub amount_cents: i64,
  pub job_id:       Option<String>,
  pub created_at:   String,
}

impl RawOrder {
  pub fn into_detail(self) -> Result<Order> {
    Ok(Order {
      order_id:     decode_uuid(&self.id)?,
      order_number: self.order_number,
      label:        self.label,
      amount_cents: self.amount_cents,
      job_id:       self.job_id.as_deref().map(decode_uuid).transpose()?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawInvoice {
  pub id:             String,
  pub invoice_number: String,
  pub label:          String,
  pub amount_cents:   i64,
  pub order_id:       Option<String>,
  pub created_at:     String,
}

impl RawInvoice {
  pub fn into_detail(self) -> Result<Invoice> {
    Ok(Invoice {
      invoice_id:     decode_uuid(&self.id)?,
      invoice_number: self.invoice_number,
      label:          self.label,
      amount_cents:   self.amount_cents,
      order_id:       self.order_id.as_deref().map(decode_uuid).transpose()?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCheck {
  pub id:           String,
  pub check_number: String,
  pub label:        String,
  pub amount_cents: i64,
  pub created_at:   String,
}

impl RawCheck {
  pub fn into_detail(self) -> Result<Check> {
    Ok(Check {
      check_id:     decode_uuid(&self.id)?,
      check_number: self.check_number,
      label:        self.label,
      amount_cents: self.amount_cents,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
