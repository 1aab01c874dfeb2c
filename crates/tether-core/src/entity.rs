//! Entity kinds and the uniform entity projection.
//!
//! Every domain table is identified by a member of the closed [`EntityType`]
//! enumeration. The integer code is the polymorphic discriminator stored in
//! link rows; the snake_case variant name is the wire form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator as _};
use uuid::Uuid;

use crate::error::{Error, Result};

// ─── EntityType ──────────────────────────────────────────────────────────────

/// The closed set of linkable entity kinds.
///
/// Codes are stable across releases — they appear in persisted rows. Adding
/// a kind is append-only; removing or renumbering one is forbidden.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
  Job,
  Task,
  Contact,
  Company,
  Note,
  PreOpportunity,
  Quote,
  Order,
  Invoice,
  Check,
  Customer,
  Factory,
  Product,
  File,
  Folder,
  Credit,
  Adjustment,
  Deduction,
  Statement,
  OrderAcknowledgement,
}

impl EntityType {
  /// The stable integer code persisted in link rows.
  pub const fn code(self) -> i64 {
    match self {
      Self::Job => 1,
      Self::Task => 2,
      Self::Contact => 3,
      Self::Company => 4,
      Self::Note => 5,
      Self::PreOpportunity => 6,
      Self::Quote => 7,
      Self::Order => 8,
      Self::Invoice => 9,
      Self::Check => 10,
      Self::Customer => 11,
      Self::Factory => 12,
      Self::Product => 13,
      Self::File => 14,
      Self::Folder => 15,
      Self::Credit => 16,
      Self::Adjustment => 17,
      Self::Deduction => 18,
      Self::Statement => 19,
      Self::OrderAcknowledgement => 20,
    }
  }

  /// Resolve a persisted code back to its kind.
  ///
  /// An unknown code means a row was written by a newer (or corrupted)
  /// schema; it is surfaced as [`Error::KindUnknown`] and is fatal to the
  /// request, never silently upgraded.
  pub fn from_code(code: i64) -> Result<Self> {
    Self::iter()
      .find(|k| k.code() == code)
      .ok_or(Error::KindUnknown(code))
  }

  /// Every registered kind, in code order.
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }

  /// The wire name — matches the serde snake_case form.
  pub const fn name(self) -> &'static str {
    match self {
      Self::Job => "job",
      Self::Task => "task",
      Self::Contact => "contact",
      Self::Company => "company",
      Self::Note => "note",
      Self::PreOpportunity => "pre_opportunity",
      Self::Quote => "quote",
      Self::Order => "order",
      Self::Invoice => "invoice",
      Self::Check => "check",
      Self::Customer => "customer",
      Self::Factory => "factory",
      Self::Product => "product",
      Self::File => "file",
      Self::Folder => "folder",
      Self::Credit => "credit",
      Self::Adjustment => "adjustment",
      Self::Deduction => "deduction",
      Self::Statement => "statement",
      Self::OrderAcknowledgement => "order_acknowledgement",
    }
  }
}

impl std::fmt::Display for EntityType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

// ─── EntityStub ──────────────────────────────────────────────────────────────

/// The uniform projection of a domain row that the link layer consumes.
///
/// Every per-kind table yields stubs; richer shapes exist only for the
/// commission-chain kinds (see [`crate::lookup`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStub {
  pub id:         Uuid,
  pub kind:       EntityType,
  pub label:      String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::CrmStore::create_entity`].
/// The id and `created_at` are assigned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEntity {
  pub label: String,
}
