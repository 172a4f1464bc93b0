//! SQL migration definitions for the Incidesk database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: reports, sync_jobs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Incident reports, keyed by title. No deletions: stale titles persist.
CREATE TABLE IF NOT EXISTS reports (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    title        TEXT NOT NULL UNIQUE,
    content      TEXT NOT NULL,
    last_updated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reports_last_updated ON reports(last_updated);

-- Sync run history
CREATE TABLE IF NOT EXISTS sync_jobs (
    id           TEXT PRIMARY KEY,
    root_page_id TEXT NOT NULL,
    started_at   TEXT NOT NULL,
    finished_at  TEXT,
    stats_json   TEXT
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
