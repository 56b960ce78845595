//! SQL schema for the Folio SQLite store.
//!
//! Executed at every connection startup; idempotent thanks to
//! `IF NOT EXISTS`. Future migrations will be gated on `PRAGMA user_version`.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- At most one row per url: the newest version.
-- AUTOINCREMENT keeps ids unique for the life of the database, so an id
-- survives the move into archive_versions unchanged.
CREATE TABLE IF NOT EXISTS current_versions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    url           TEXT    NOT NULL UNIQUE,
    version       INTEGER NOT NULL CHECK (version >= 1),
    ancestor_id   INTEGER,
    download_date TEXT    NOT NULL,   -- RFC 3339 UTC
    modified_date TEXT,
    publish_date  TEXT,
    source_domain TEXT,
    title         TEXT,
    page_title    TEXT,
    rss_title     TEXT,
    description   TEXT,
    text          TEXT,
    authors       TEXT    NOT NULL DEFAULT '[]',   -- JSON array
    image_url     TEXT,
    language      TEXT,
    local_path    TEXT,
    filename      TEXT
);

-- Superseded versions. Rows are immutable once written.
CREATE TABLE IF NOT EXISTS archive_versions (
    id            INTEGER PRIMARY KEY,
    url           TEXT    NOT NULL,
    version       INTEGER NOT NULL CHECK (version >= 1),
    ancestor_id   INTEGER,
    descendant_id INTEGER NOT NULL,
    download_date TEXT    NOT NULL,
    modified_date TEXT,
    publish_date  TEXT,
    source_domain TEXT,
    title         TEXT,
    page_title    TEXT,
    rss_title     TEXT,
    description   TEXT,
    text          TEXT,
    authors       TEXT    NOT NULL DEFAULT '[]',
    image_url     TEXT,
    language      TEXT,
    local_path    TEXT,
    filename      TEXT,
    UNIQUE (url, version)
);

CREATE TRIGGER IF NOT EXISTS archive_versions_no_update
BEFORE UPDATE ON archive_versions
BEGIN
    SELECT RAISE(ABORT, 'archive_versions is append-only');
END;

CREATE TRIGGER IF NOT EXISTS archive_versions_no_delete
BEFORE DELETE ON archive_versions
BEGIN
    SELECT RAISE(ABORT, 'archive_versions is append-only');
END;

PRAGMA user_version = 1;
";
