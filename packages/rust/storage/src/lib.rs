//! libSQL storage layer for incident reports.
//!
//! The [`Storage`] struct wraps an embedded libSQL database holding the
//! `reports` table (keyed by title) and the sync-run history. Reconciliation
//! is upsert-on-conflict: re-syncing an existing title overwrites its content
//! and refreshes `last_updated`.

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use uuid::Uuid;

use incidesk_shared::{IncideskError, Report, ReportRecord, Result};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path`, applying pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IncideskError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| IncideskError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| IncideskError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    IncideskError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Report operations
    // -----------------------------------------------------------------------

    /// Upsert a single report: insert if the title is absent, otherwise
    /// overwrite content and refresh `last_updated`.
    pub async fn upsert_report(&self, report: &Report) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO reports (title, content, last_updated)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(title) DO UPDATE SET
                   content = excluded.content,
                   last_updated = excluded.last_updated",
                params![report.title.as_str(), report.content.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| IncideskError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Upsert a batch of reports one by one.
    ///
    /// At-least-once semantics: a mid-batch failure leaves the upserts
    /// already applied committed. Returns the number applied.
    pub async fn upsert_reports(&self, reports: &[Report]) -> Result<usize> {
        let mut applied = 0usize;
        for report in reports {
            self.upsert_report(report).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Get a report by its title.
    pub async fn get_report(&self, title: &str) -> Result<Option<ReportRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT title, content, last_updated FROM reports WHERE title = ?1",
                params![title],
            )
            .await
            .map_err(|e| IncideskError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(IncideskError::Storage(e.to_string())),
        }
    }

    /// List all reports, ordered by title.
    pub async fn list_reports(&self) -> Result<Vec<ReportRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT title, content, last_updated FROM reports ORDER BY title",
                params![],
            )
            .await
            .map_err(|e| IncideskError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_record(&row)?);
        }
        Ok(results)
    }

    /// Count stored reports.
    pub async fn count_reports(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM reports", params![])
            .await
            .map_err(|e| IncideskError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let n: i64 = row
                    .get(0)
                    .map_err(|e| IncideskError::Storage(e.to_string()))?;
                Ok(n as u64)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(IncideskError::Storage(e.to_string())),
        }
    }

    /// Case-insensitive substring search over title and content.
    pub async fn search(&self, keyword: &str) -> Result<Vec<ReportRecord>> {
        let pattern = format!("%{}%", keyword.to_lowercase());
        let mut rows = self
            .conn
            .query(
                "SELECT title, content, last_updated FROM reports
                 WHERE lower(title) LIKE ?1 OR lower(content) LIKE ?1
                 ORDER BY title",
                params![pattern.as_str()],
            )
            .await
            .map_err(|e| IncideskError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_record(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Sync job operations
    // -----------------------------------------------------------------------

    /// Insert a new sync job. Returns the generated job ID.
    pub async fn insert_sync_job(&self, root_page_id: &str) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO sync_jobs (id, root_page_id, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), root_page_id, now.as_str()],
            )
            .await
            .map_err(|e| IncideskError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Mark a sync job finished with its stats.
    pub async fn finish_sync_job(&self, job_id: &str, stats_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE sync_jobs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, job_id],
            )
            .await
            .map_err(|e| IncideskError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Convert a database row to a [`ReportRecord`].
fn row_to_record(row: &libsql::Row) -> Result<ReportRecord> {
    Ok(ReportRecord {
        title: row
            .get::<String>(0)
            .map_err(|e| IncideskError::Storage(e.to_string()))?,
        content: row
            .get::<String>(1)
            .map_err(|e| IncideskError::Storage(e.to_string()))?,
        last_updated: {
            let s: String = row
                .get(2)
                .map_err(|e| IncideskError::Storage(e.to_string()))?;
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| IncideskError::Storage(format!("invalid date: {e}")))?
        },
    })
}
