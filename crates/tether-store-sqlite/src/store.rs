//! [`SqliteStore`] — the SQLite implementation of [`CrmStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tether_core::{
  Error, Result,
  context::RequestContext,
  entity::{EntityStub, EntityType, NewEntity},
  link::{LinkEndpoint, LinkRelation, NewLink},
  lookup::{Check, Invoice, Order, PreOpportunity, Quote},
  merge::{FkColumn, MergeConfig, MergeRequest, MergeResult},
  store::CrmStore,
};
use uuid::Uuid;

use crate::{
  descriptor::{fk_columns_referencing, id_column, table_name},
  encode::{RawLink, RawStub, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Error mapping ───────────────────────────────────────────────────────────

pub(crate) fn db_err(err: tokio_rusqlite::Error) -> Error {
  Error::Backend(err.to_string())
}

fn is_unique_violation(err: &tokio_rusqlite::Error) -> bool {
  matches!(
    err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
      if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

fn is_busy(err: &tokio_rusqlite::Error) -> bool {
  matches!(
    err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
      if matches!(
        e.code,
        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
      )
  )
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

pub(crate) const LINK_COLUMNS: &str = "link_id, source_entity_type, \
   source_entity_id, target_entity_type, target_entity_id, created_at, \
   created_by_id";

pub(crate) fn raw_link_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLink> {
  Ok(RawLink {
    link_id:     row.get(0)?,
    source_type: row.get(1)?,
    source_id:   row.get(2)?,
    target_type: row.get(3)?,
    target_id:   row.get(4)?,
    created_at:  row.get(5)?,
    created_by:  row.get(6)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tether store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone, Debug)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await.map_err(db_err)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(db_err)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(db_err)
  }

  /// Every link row whose source or target equals `endpoint`.
  async fn raw_links_touching(&self, endpoint: LinkEndpoint) -> Result<Vec<RawLink>> {
    let code = endpoint.kind.code();
    let id_str = encode_uuid(endpoint.id);

    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LINK_COLUMNS} FROM link_relations
           WHERE (source_entity_type = ?1 AND source_entity_id = ?2)
              OR (target_entity_type = ?1 AND target_entity_id = ?2)"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![code, id_str], raw_link_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_err)
  }

  /// Link rows where `endpoint` sits on one specific side.
  async fn raw_links_on_side(
    &self,
    endpoint: LinkEndpoint,
    side: &'static str,
  ) -> Result<Vec<RawLink>> {
    let code = endpoint.kind.code();
    let id_str = encode_uuid(endpoint.id);

    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LINK_COLUMNS} FROM link_relations
           WHERE {side}_entity_type = ?1 AND {side}_entity_id = ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![code, id_str], raw_link_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_err)
  }
}

// ─── CrmStore impl ───────────────────────────────────────────────────────────

impl CrmStore for SqliteStore {
  // ── Entities ──────────────────────────────────────────────────────────────

  async fn create_entity(&self, kind: EntityType, input: NewEntity) -> Result<EntityStub> {
    let stub = EntityStub {
      id: Uuid::new_v4(),
      kind,
      label: input.label,
      created_at: Utc::now(),
    };

    let table = table_name(kind);
    let id_col = id_column(kind);
    let id_str = encode_uuid(stub.id);
    let label = stub.label.clone();
    let at_str = encode_dt(stub.created_at);
    let code = kind.code();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          &format!(
            "INSERT INTO {table} ({id_col}, label, created_at) VALUES (?1, ?2, ?3)"
          ),
          rusqlite::params![id_str, label, at_str],
        )?;
        tx.execute(
          "INSERT INTO search_index (entity_type, entity_id, content)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![code, id_str, label],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(db_err)?;

    Ok(stub)
  }

  async fn entity_stub(&self, kind: EntityType, id: Uuid) -> Result<Option<EntityStub>> {
    let table = table_name(kind);
    let id_col = id_column(kind);
    let id_str = encode_uuid(id);

    let raw: Option<RawStub> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {id_col}, label, created_at FROM {table} WHERE {id_col} = ?1"
              ),
              rusqlite::params![id_str],
              |row| {
                Ok(RawStub {
                  id:         row.get(0)?,
                  label:      row.get(1)?,
                  created_at: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_err)?;

    raw.map(|r| r.into_stub(kind)).transpose()
  }

  async fn entity_exists(&self, kind: EntityType, id: Uuid) -> Result<bool> {
    let table = table_name(kind);
    let id_col = id_column(kind);
    let id_str = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        let found: Option<bool> = conn
          .query_row(
            &format!("SELECT 1 FROM {table} WHERE {id_col} = ?1"),
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?;
        Ok(found.unwrap_or(false))
      })
      .await
      .map_err(db_err)
  }

  async fn delete_entity(&self, kind: EntityType, id: Uuid) -> Result<bool> {
    let table = table_name(kind);
    let id_col = id_column(kind);
    let id_str = encode_uuid(id);
    let code = kind.code();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let deleted = tx.execute(
          &format!("DELETE FROM {table} WHERE {id_col} = ?1"),
          rusqlite::params![id_str],
        )?;
        if deleted == 0 {
          return Ok(false);
        }
        // Deleting an entity owns the cascade of its touching links.
        tx.execute(
          "DELETE FROM link_relations
           WHERE (source_entity_type = ?1 AND source_entity_id = ?2)
              OR (target_entity_type = ?1 AND target_entity_id = ?2)",
          rusqlite::params![code, id_str],
        )?;
        tx.execute(
          "DELETE FROM search_index WHERE entity_type = ?1 AND entity_id = ?2",
          rusqlite::params![code, id_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await
      .map_err(db_err)
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn insert_link(&self, link: NewLink) -> Result<LinkRelation> {
    let relation = LinkRelation {
      link_id:    Uuid::new_v4(),
      source:     link.source,
      target:     link.target,
      created_at: Utc::now(),
      created_by: link.created_by,
    };

    let link_id_str = encode_uuid(relation.link_id);
    let source_code = relation.source.kind.code();
    let source_id_str = encode_uuid(relation.source.id);
    let target_code = relation.target.kind.code();
    let target_id_str = encode_uuid(relation.target.id);
    let at_str = encode_dt(relation.created_at);
    let by_str = encode_uuid(relation.created_by);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO link_relations (
             link_id, source_entity_type, source_entity_id,
             target_entity_type, target_entity_id, created_at, created_by_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            link_id_str,
            source_code,
            source_id_str,
            target_code,
            target_id_str,
            at_str,
            by_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|err| {
        if is_unique_violation(&err) {
          Error::LinkDuplicate { a: link.source, b: link.target }
        } else {
          db_err(err)
        }
      })?;

    Ok(relation)
  }

  async fn delete_link_by_id(&self, link_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(link_id);

    self
      .conn
      .call(move |conn| {
        let deleted = conn.execute(
          "DELETE FROM link_relations WHERE link_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(deleted > 0)
      })
      .await
      .map_err(db_err)
  }

  async fn find_link(&self, link_id: Uuid) -> Result<Option<LinkRelation>> {
    let id_str = encode_uuid(link_id);

    let raw: Option<RawLink> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {LINK_COLUMNS} FROM link_relations WHERE link_id = ?1"),
              rusqlite::params![id_str],
              raw_link_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_err)?;

    raw.map(RawLink::into_link).transpose()
  }

  async fn links_touching(&self, endpoint: LinkEndpoint) -> Result<Vec<LinkRelation>> {
    let raws = self.raw_links_touching(endpoint).await?;
    raws.into_iter().map(RawLink::into_link).collect()
  }

  async fn links_from(&self, endpoint: LinkEndpoint) -> Result<Vec<LinkRelation>> {
    let raws = self.raw_links_on_side(endpoint, "source").await?;
    raws.into_iter().map(RawLink::into_link).collect()
  }

  async fn links_to(&self, endpoint: LinkEndpoint) -> Result<Vec<LinkRelation>> {
    let raws = self.raw_links_on_side(endpoint, "target").await?;
    raws.into_iter().map(RawLink::into_link).collect()
  }

  async fn exists_between(&self, a: LinkEndpoint, b: LinkEndpoint) -> Result<bool> {
    let a_code = a.kind.code();
    let a_id = encode_uuid(a.id);
    let b_code = b.kind.code();
    let b_id = encode_uuid(b.id);

    self
      .conn
      .call(move |conn| {
        let found: Option<bool> = conn
          .query_row(
            "SELECT 1 FROM link_relations
             WHERE (source_entity_type = ?1 AND source_entity_id = ?2
                    AND target_entity_type = ?3 AND target_entity_id = ?4)
                OR (source_entity_type = ?3 AND source_entity_id = ?4
                    AND target_entity_type = ?1 AND target_entity_id = ?2)
             LIMIT 1",
            rusqlite::params![a_code, a_id, b_code, b_id],
            |_| Ok(true),
          )
          .optional()?;
        Ok(found.unwrap_or(false))
      })
      .await
      .map_err(db_err)
  }

  async fn delete_link_between(&self, a: LinkEndpoint, b: LinkEndpoint) -> Result<bool> {
    let a_code = a.kind.code();
    let a_id = encode_uuid(a.id);
    let b_code = b.kind.code();
    let b_id = encode_uuid(b.id);

    self
      .conn
      .call(move |conn| {
        let deleted = conn.execute(
          "DELETE FROM link_relations
           WHERE (source_entity_type = ?1 AND source_entity_id = ?2
                  AND target_entity_type = ?3 AND target_entity_id = ?4)
              OR (source_entity_type = ?3 AND source_entity_id = ?4
                  AND target_entity_type = ?1 AND target_entity_id = ?2)",
          rusqlite::params![a_code, a_id, b_code, b_id],
        )?;
        Ok(deleted > 0)
      })
      .await
      .map_err(db_err)
  }

  // ── Polymorphic adjacency query ───────────────────────────────────────────

  async fn adjacent_stubs(&self, kind: EntityType, to: LinkEndpoint) -> Result<Vec<EntityStub>> {
    let table = table_name(kind);
    let id_col = id_column(kind);
    let kind_code = kind.code();
    let to_code = to.kind.code();
    let to_id = encode_uuid(to.id);

    let raws: Vec<RawStub> = self
      .conn
      .call(move |conn| {
        // Both directions in one join predicate; one round trip per kind.
        let mut stmt = conn.prepare(&format!(
          "SELECT DISTINCT e.{id_col}, e.label, e.created_at
           FROM {table} e
           JOIN link_relations l
             ON (l.source_entity_type = ?1 AND l.source_entity_id = e.{id_col}
                 AND l.target_entity_type = ?2 AND l.target_entity_id = ?3)
             OR (l.target_entity_type = ?1 AND l.target_entity_id = e.{id_col}
                 AND l.source_entity_type = ?2 AND l.source_entity_id = ?3)"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![kind_code, to_code, to_id], |row| {
            Ok(RawStub {
              id:         row.get(0)?,
              label:      row.get(1)?,
              created_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_err)?;

    raws.into_iter().map(|r| r.into_stub(kind)).collect()
  }

  // ── Commission-chain detail loads ─────────────────────────────────────────

  async fn pre_opportunity(&self, id: Uuid) -> Result<Option<PreOpportunity>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT pre_opportunity_id, label, job_id, created_at
               FROM pre_opportunities WHERE pre_opportunity_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(crate::encode::RawPreOpportunity {
                  id:         row.get(0)?,
                  label:      row.get(1)?,
                  job_id:     row.get(2)?,
                  created_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_err)?;

    raw.map(crate::encode::RawPreOpportunity::into_detail).transpose()
  }

  async fn quote(&self, id: Uuid) -> Result<Option<Quote>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT quote_id, quote_number, label, amount_cents, job_id, created_at
               FROM quotes WHERE quote_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(crate::encode::RawQuote {
                  id:           row.get(0)?,
                  quote_number: row.get(1)?,
                  label:        row.get(2)?,
                  amount_cents: row.get(3)?,
                  job_id:       row.get(4)?,
                  created_at:   row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_err)?;

    raw.map(crate::encode::RawQuote::into_detail).transpose()
  }

  async fn order(&self, id: Uuid) -> Result<Option<Order>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT order_id, order_number, label, amount_cents, job_id, created_at
               FROM orders WHERE order_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(crate::encode::RawOrder {
                  id:           row.get(0)?,
                  order_number: row.get(1)?,
                  label:        row.get(2)?,
                  amount_cents: row.get(3)?,
                  job_id:       row.get(4)?,
                  created_at:   row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_err)?;

    raw.map(crate::encode::RawOrder::into_detail).transpose()
  }

  async fn invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT invoice_id, invoice_number, label, amount_cents, order_id, created_at
               FROM invoices WHERE invoice_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(crate::encode::RawInvoice {
                  id:             row.get(0)?,
                  invoice_number: row.get(1)?,
                  label:          row.get(2)?,
                  amount_cents:   row.get(3)?,
                  order_id:       row.get(4)?,
                  created_at:     row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_err)?;

    raw.map(crate::encode::RawInvoice::into_detail).transpose()
  }

  async fn check(&self, id: Uuid) -> Result<Option<Check>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT check_id, check_number, label, amount_cents, created_at
               FROM checks WHERE check_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(crate::encode::RawCheck {
                  id:           row.get(0)?,
                  check_number: row.get(1)?,
                  label:        row.get(2)?,
                  amount_cents: row.get(3)?,
                  created_at:   row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_err)?;

    raw.map(crate::encode::RawCheck::into_detail).transpose()
  }

  // ── Merge ─────────────────────────────────────────────────────────────────

  async fn merge(
    &self,
    config: &MergeConfig,
    request: &MergeRequest,
    ctx: &RequestContext,
  ) -> Result<MergeResult> {
    let config = *config;
    let request = request.clone();
    let ctx = *ctx;

    self
      .conn
      .call(move |conn| Ok(crate::merge::execute(conn, &config, &request, &ctx)?))
      .await
      .map_err(|err| {
        if is_busy(&err) { Error::MergeConflict } else { db_err(err) }
      })?
  }

  fn fk_columns_referencing(&self, kind: EntityType) -> Vec<FkColumn> {
    fk_columns_referencing(kind)
  }

  async fn reindex_entity(&self, kind: EntityType, id: Uuid) -> Result<()> {
    let table = table_name(kind);
    let id_col = id_column(kind);
    let id_str = encode_uuid(id);
    let code = kind.code();

    self
      .conn
      .call(move |conn| {
        let label: Option<String> = conn
          .query_row(
            &format!("SELECT label FROM {table} WHERE {id_col} = ?1"),
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;

        match label {
          Some(content) => {
            conn.execute(
              "INSERT OR REPLACE INTO search_index (entity_type, entity_id, content)
               VALUES (?1, ?2, ?3)",
              rusqlite::params![code, id_str, content],
            )?;
          }
          None => {
            conn.execute(
              "DELETE FROM search_index WHERE entity_type = ?1 AND entity_id = ?2",
              rusqlite::params![code, id_str],
            )?;
          }
        }
        Ok(())
      })
      .await
      .map_err(db_err)
  }

  // ── Search ────────────────────────────────────────────────────────────────

  async fn search_entities(&self, text: &str, kind: Option<EntityType>) -> Result<Vec<EntityStub>> {
    let pattern = format!("%{text}%");
    let kind_code = kind.map(EntityType::code);

    let raws: Vec<(EntityType, RawStub)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entity_type, entity_id, content FROM search_index
           WHERE content LIKE ?1 AND (?2 IS NULL OR entity_type = ?2)
           ORDER BY content LIMIT 50",
        )?;
        let hits: Vec<(i64, String, String)> = stmt
          .query_map(rusqlite::params![pattern, kind_code], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        // Resolve each hit against its domain table for the full stub.
        let mut rows = Vec::with_capacity(hits.len());
        for (code, id_str, label) in hits {
          let Ok(hit_kind) = EntityType::from_code(code) else {
            // Index rows are derived artifacts; drift surfaces on the link
            // and entity read paths, not here.
            continue;
          };
          let created_at: Option<String> = conn
            .query_row(
              &format!(
                "SELECT created_at FROM {} WHERE {} = ?1",
                table_name(hit_kind),
                id_column(hit_kind)
              ),
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?;
          if let Some(created_at) = created_at {
            rows.push((hit_kind, RawStub { id: id_str, label, created_at }));
          }
        }
        Ok(rows)
      })
      .await
      .map_err(db_err)?;

    raws
      .into_iter()
      .map(|(kind, raw)| raw.into_stub(kind))
      .collect()
  }
}
