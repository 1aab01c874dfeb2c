//! SQLite backend for the Tether linking core.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. All SQL is built from the
//! per-kind table descriptors in [`descriptor`]; no entity-kind pairing is
//! hand-coded anywhere.

mod descriptor;
mod encode;
mod merge;
mod schema;
mod store;

pub use descriptor::{FK_COLUMNS, id_column, table_name};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
