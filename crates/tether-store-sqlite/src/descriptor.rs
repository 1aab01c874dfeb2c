//! Per-kind table descriptors.
//!
//! Every piece of SQL in this crate that touches a domain table is built
//! from these lookups, so the polymorphic adjacency query and the merge
//! are generic over kinds rather than hand-coded per pairing.

use tether_core::{entity::EntityType, merge::FkColumn};

/// The domain table backing `kind`.
pub const fn table_name(kind: EntityType) -> &'static str {
  match kind {
    EntityType::Job => "jobs",
    EntityType::Task => "tasks",
    EntityType::Contact => "contacts",
    EntityType::Company => "companies",
    EntityType::Note => "notes",
    EntityType::PreOpportunity => "pre_opportunities",
    EntityType::Quote => "quotes",
    EntityType::Order => "orders",
    EntityType::Invoice => "invoices",
    EntityType::Check => "checks",
    EntityType::Customer => "customers",
    EntityType::Factory => "factories",
    EntityType::Product => "products",
    EntityType::File => "files",
    EntityType::Folder => "folders",
    EntityType::Credit => "credits",
    EntityType::Adjustment => "adjustments",
    EntityType::Deduction => "deductions",
    EntityType::Statement => "statements",
    EntityType::OrderAcknowledgement => "order_acknowledgements",
  }
}

/// The primary-key column of `kind`'s table.
pub const fn id_column(kind: EntityType) -> &'static str {
  match kind {
    EntityType::Job => "job_id",
    EntityType::Task => "task_id",
    EntityType::Contact => "contact_id",
    EntityType::Company => "company_id",
    EntityType::Note => "note_id",
    EntityType::PreOpportunity => "pre_opportunity_id",
    EntityType::Quote => "quote_id",
    EntityType::Order => "order_id",
    EntityType::Invoice => "invoice_id",
    EntityType::Check => "check_id",
    EntityType::Customer => "customer_id",
    EntityType::Factory => "factory_id",
    EntityType::Product => "product_id",
    EntityType::File => "file_id",
    EntityType::Folder => "folder_id",
    EntityType::Credit => "credit_id",
    EntityType::Adjustment => "adjustment_id",
    EntityType::Deduction => "deduction_id",
    EntityType::Statement => "statement_id",
    EntityType::OrderAcknowledgement => "order_acknowledgement_id",
  }
}

/// Every direct FK column in the schema, paired with the kind it points
/// at. The merge coordinator cross-checks its per-kind configuration
/// against this catalogue at startup.
pub const FK_COLUMNS: &[(EntityType, FkColumn)] = &[
  (
    EntityType::Job,
    FkColumn { table: "pre_opportunities", column: "job_id" },
  ),
  (EntityType::Job, FkColumn { table: "quotes", column: "job_id" }),
  (EntityType::Job, FkColumn { table: "orders", column: "job_id" }),
  (EntityType::Order, FkColumn { table: "invoices", column: "order_id" }),
];

/// The FK columns referencing `kind`'s id table.
pub fn fk_columns_referencing(kind: EntityType) -> Vec<FkColumn> {
  FK_COLUMNS
    .iter()
    .filter(|(k, _)| *k == kind)
    .map(|(_, fk)| *fk)
    .collect()
}
