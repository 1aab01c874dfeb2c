//! SQL schema for the Tether SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.
//!
//! The link table is kind-polymorphic: endpoints are `(type code, id)`
//! pairs with no per-kind foreign keys, so referential soundness is the
//! service layer's job. Uniqueness of the unordered endpoint pair is
//! enforced by an expression index over the canonicalised pair, which
//! makes the store the linearisation point for racing inserts.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Domain tables ───────────────────────────────────────────────────────
-- One table per entity kind. Most carry only the uniform projection; the
-- commission-chain tables add their numbers, amounts (integer cents), and
-- direct FK columns.

CREATE TABLE IF NOT EXISTS jobs (
    job_id      TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'open',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    task_id     TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contacts (
    contact_id  TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS companies (
    company_id  TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notes (
    note_id     TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pre_opportunities (
    pre_opportunity_id TEXT PRIMARY KEY,
    label              TEXT NOT NULL,
    job_id             TEXT,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS quotes (
    quote_id     TEXT PRIMARY KEY,
    quote_number TEXT NOT NULL DEFAULT '',
    label        TEXT NOT NULL,
    amount_cents INTEGER NOT NULL DEFAULT 0,
    job_id       TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    order_id     TEXT PRIMARY KEY,
    order_number TEXT NOT NULL DEFAULT '',
    label        TEXT NOT NULL,
    amount_cents INTEGER NOT NULL DEFAULT 0,
    job_id       TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS invoices (
    invoice_id     TEXT PRIMARY KEY,
    invoice_number TEXT NOT NULL DEFAULT '',
    label          TEXT NOT NULL,
    amount_cents   INTEGER NOT NULL DEFAULT 0,
    order_id       TEXT,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS checks (
    check_id     TEXT PRIMARY KEY,
    check_number TEXT NOT NULL DEFAULT '',
    label        TEXT NOT NULL,
    amount_cents INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS customers (
    customer_id TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS factories (
    factory_id  TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    product_id  TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS files (
    file_id     TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS folders (
    folder_id   TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS credits (
    credit_id   TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS adjustments (
    adjustment_id TEXT PRIMARY KEY,
    label         TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS deductions (
    deduction_id TEXT PRIMARY KEY,
    label        TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS statements (
    statement_id TEXT PRIMARY KEY,
    label        TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS order_acknowledgements (
    order_acknowledgement_id TEXT PRIMARY KEY,
    label                    TEXT NOT NULL,
    created_at               TEXT NOT NULL
);

-- ── Link table ──────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS link_relations (
    link_id            TEXT PRIMARY KEY,
    source_entity_type INTEGER NOT NULL,  -- EntityType code
    source_entity_id   TEXT NOT NULL,
    target_entity_type INTEGER NOT NULL,
    target_entity_id   TEXT NOT NULL,
    created_at         TEXT NOT NULL,     -- ISO 8601 UTC; server-assigned
    created_by_id      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS link_relations_source_idx
    ON link_relations(source_entity_type, source_entity_id);
CREATE INDEX IF NOT EXISTS link_relations_target_idx
    ON link_relations(target_entity_type, target_entity_id);

-- Direction-insensitive uniqueness: the unordered endpoint pair is unique,
-- expressed as a unique index over the canonically-ordered pair.
CREATE UNIQUE INDEX IF NOT EXISTS link_relations_pair_idx
    ON link_relations(
        min(printf('%d|%s', source_entity_type, source_entity_id),
            printf('%d|%s', target_entity_type, target_entity_id)),
        max(printf('%d|%s', source_entity_type, source_entity_id),
            printf('%d|%s', target_entity_type, target_entity_id))
    );

-- ── Search index ────────────────────────────────────────────────────────
-- One row per entity; maintained on create/delete and rebuilt for the
-- primary after a merge. Phase-1 search uses SQL LIKE over `content`.

CREATE TABLE IF NOT EXISTS search_index (
    entity_type INTEGER NOT NULL,
    entity_id   TEXT NOT NULL,
    content     TEXT NOT NULL,
    PRIMARY KEY (entity_type, entity_id)
);

PRAGMA user_version = 1;
";
