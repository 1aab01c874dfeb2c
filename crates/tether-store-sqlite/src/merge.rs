//! The merge transaction: fold duplicate entities into a primary.
//!
//! Runs entirely inside one [`rusqlite::Transaction`]. Any domain failure
//! (missing id) is returned in the inner `Result`, which drops the
//! transaction and rolls everything back. Link redirection recovers
//! locally from would-be self-edges and duplicate adjacencies by dropping
//! the redundant edge; those conditions never surface from a merge.

use rusqlite::OptionalExtension as _;
use tether_core::{
  Error, Result,
  context::RequestContext,
  link::LinkEndpoint,
  merge::{MergeConfig, MergeRequest, MergeResult},
};
use uuid::Uuid;

use crate::{
  descriptor::{id_column, table_name},
  encode::{RawStub, encode_dt, encode_uuid},
};

/// `?start, ?start+1, …` — positional placeholders for an IN list.
fn placeholders(start: usize, count: usize) -> String {
  (start..start + count)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

/// A link row in its raw persisted form. Redirection works on the encoded
/// values directly; nothing here needs the kind registry.
struct LinkRow {
  link_id:     String,
  source_type: i64,
  source_id:   String,
  target_type: i64,
  target_id:   String,
}

pub(crate) fn execute(
  conn: &mut rusqlite::Connection,
  config: &MergeConfig,
  request: &MergeRequest,
  ctx: &RequestContext,
) -> rusqlite::Result<Result<MergeResult>> {
  let table = table_name(config.kind);
  let id_col = id_column(config.kind);
  let kind_code = config.kind.code();
  let primary_str = encode_uuid(request.primary);

  // Duplicate ids, deduped and in request order. The coordinator has
  // already rejected a primary listed among the duplicates.
  let mut duplicates: Vec<Uuid> = Vec::new();
  for id in &request.duplicates {
    if !duplicates.contains(id) {
      duplicates.push(*id);
    }
  }
  let dup_strs: Vec<String> = duplicates.iter().copied().map(encode_uuid).collect();

  let tx = conn.transaction()?;

  // 1. Every id must resolve before any write happens.
  for id in std::iter::once(request.primary).chain(duplicates.iter().copied()) {
    let found: Option<bool> = tx
      .query_row(
        &format!("SELECT 1 FROM {table} WHERE {id_col} = ?1"),
        rusqlite::params![encode_uuid(id)],
        |_| Ok(true),
      )
      .optional()?;
    if found.is_none() {
      return Ok(Err(Error::MergeUnknownEntity(LinkEndpoint::new(
        config.kind,
        id,
      ))));
    }
  }

  // 2. Field selections, in request order. Selections naming unknown
  // fields or unknown sources are ignored.
  for selection in &request.field_selections {
    if !config.mergeable_fields.contains(&selection.field.as_str()) {
      continue;
    }
    let known_source = selection.source_id == request.primary
      || duplicates.contains(&selection.source_id);
    if !known_source {
      continue;
    }
    tx.execute(
      &format!(
        "UPDATE {table} SET {field} =
           (SELECT {field} FROM {table} WHERE {id_col} = ?1)
         WHERE {id_col} = ?2",
        field = selection.field
      ),
      rusqlite::params![encode_uuid(selection.source_id), primary_str],
    )?;
  }

  let mut transferred = 0u64;
  let mut deleted = 0u64;

  if !duplicates.is_empty() {
    // 3. Redirect every link touching a duplicate. A link between two
    // duplicates, or between a duplicate and the primary, collapses to a
    // self-edge and is dropped; a redirect that duplicates an existing
    // adjacency is dropped rather than doubled.
    let mut rows: Vec<LinkRow> = Vec::new();
    for dup_str in &dup_strs {
      let mut stmt = tx.prepare(
        "SELECT link_id, source_entity_type, source_entity_id,
                target_entity_type, target_entity_id
         FROM link_relations
         WHERE (source_entity_type = ?1 AND source_entity_id = ?2)
            OR (target_entity_type = ?1 AND target_entity_id = ?2)",
      )?;
      let touching = stmt
        .query_map(rusqlite::params![kind_code, dup_str], |row| {
          Ok(LinkRow {
            link_id:     row.get(0)?,
            source_type: row.get(1)?,
            source_id:   row.get(2)?,
            target_type: row.get(3)?,
            target_id:   row.get(4)?,
          })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      // A link between two duplicates is returned for both; keep it once.
      for row in touching {
        if !rows.iter().any(|r| r.link_id == row.link_id) {
          rows.push(row);
        }
      }
    }

    for row in rows {
      let redirect = |kind: i64, id: &str| -> (i64, String) {
        if kind == kind_code && dup_strs.iter().any(|d| d == id) {
          (kind_code, primary_str.clone())
        } else {
          (kind, id.to_owned())
        }
      };
      let (new_source_type, new_source_id) =
        redirect(row.source_type, &row.source_id);
      let (new_target_type, new_target_id) =
        redirect(row.target_type, &row.target_id);

      tx.execute(
        "DELETE FROM link_relations WHERE link_id = ?1",
        rusqlite::params![row.link_id],
      )?;

      if new_source_type == new_target_type && new_source_id == new_target_id {
        continue;
      }

      let already_adjacent: Option<bool> = tx
        .query_row(
          "SELECT 1 FROM link_relations
           WHERE (source_entity_type = ?1 AND source_entity_id = ?2
                  AND target_entity_type = ?3 AND target_entity_id = ?4)
              OR (source_entity_type = ?3 AND source_entity_id = ?4
                  AND target_entity_type = ?1 AND target_entity_id = ?2)
           LIMIT 1",
          rusqlite::params![
            new_source_type,
            new_source_id,
            new_target_type,
            new_target_id
          ],
          |_| Ok(true),
        )
        .optional()?;
      if already_adjacent.is_some() {
        continue;
      }

      tx.execute(
        "INSERT INTO link_relations (
           link_id, source_entity_type, source_entity_id,
           target_entity_type, target_entity_id, created_at, created_by_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
          encode_uuid(Uuid::new_v4()),
          new_source_type,
          new_source_id,
          new_target_type,
          new_target_id,
          encode_dt(chrono::Utc::now()),
          encode_uuid(ctx.actor_id),
        ],
      )?;
      transferred += 1;
    }

    // 4. Rewrite the declared direct FKs.
    for fk in config.fk_rewrites {
      let sql = format!(
        "UPDATE {} SET {} = ?1 WHERE {} IN ({})",
        fk.table,
        fk.column,
        fk.column,
        placeholders(2, dup_strs.len())
      );
      let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&primary_str];
      for dup_str in &dup_strs {
        params.push(dup_str);
      }
      transferred += tx.execute(&sql, &params[..])? as u64;
    }

    // 5. Duplicate-owned derived artifacts. The primary's index entry is
    // rebuilt after commit, outside this transaction.
    let scrub_sql = format!(
      "DELETE FROM search_index WHERE entity_type = ?1 AND entity_id IN ({})",
      placeholders(2, dup_strs.len())
    );
    let mut scrub_params: Vec<&dyn rusqlite::types::ToSql> = vec![&kind_code];
    for dup_str in &dup_strs {
      scrub_params.push(dup_str);
    }
    tx.execute(&scrub_sql, &scrub_params[..])?;

    // 6. Delete the duplicate rows.
    let delete_sql = format!(
      "DELETE FROM {table} WHERE {id_col} IN ({})",
      placeholders(1, dup_strs.len())
    );
    deleted =
      tx.execute(&delete_sql, rusqlite::params_from_iter(dup_strs.iter()))? as u64;
  }

  // 7. The refreshed primary.
  let raw = tx.query_row(
    &format!("SELECT {id_col}, label, created_at FROM {table} WHERE {id_col} = ?1"),
    rusqlite::params![primary_str],
    |row| {
      Ok(RawStub {
        id:         row.get(0)?,
        label:      row.get(1)?,
        created_at: row.get(2)?,
      })
    },
  )?;

  tx.commit()?;

  Ok(
    raw
      .into_stub(config.kind)
      .map(|primary| MergeResult { primary, deleted, transferred }),
  )
}
