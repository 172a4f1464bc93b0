//! End-to-end sync pipeline: crawl the page tree, reconcile into storage.

use std::time::Instant;

use tracing::{info, instrument};

use incidesk_confluence::{ConfluenceClient, collect_reports};
use incidesk_shared::Result;
use incidesk_storage::Storage;

/// Configuration for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Root page id to descend from.
    pub root_page_id: String,
    /// Title prefixes that mark a page as a report.
    pub report_prefixes: Vec<String>,
}

/// Result of a completed sync run.
#[derive(Debug)]
pub struct SyncResult {
    /// Sync job id recorded in storage.
    pub job_id: String,
    /// Reports found in the hierarchy.
    pub reports_found: usize,
    /// Reports upserted into the table.
    pub reports_synced: usize,
    /// Pages whose child listings were fetched.
    pub pages_visited: usize,
    /// Fetch errors encountered (degraded, not fatal).
    pub errors: Vec<(String, String)>,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting sync status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after the traversal with the number of reports found.
    fn reports_collected(&self, count: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn reports_collected(&self, _count: usize) {}
}

/// Run a full sync: traverse the hierarchy under the configured root and
/// upsert every collected report.
///
/// Reconciliation is at-least-once: upserts already applied stay committed
/// even if a later one fails.
#[instrument(skip_all, fields(root_id = %config.root_page_id))]
pub async fn sync_reports(
    client: &ConfluenceClient,
    storage: &Storage,
    config: &SyncConfig,
    progress: &dyn ProgressReporter,
) -> Result<SyncResult> {
    let start = Instant::now();

    let job_id = storage.insert_sync_job(&config.root_page_id).await?;

    progress.phase("Recorriendo jerarquía de páginas");
    let outcome = collect_reports(client, &config.root_page_id, &config.report_prefixes).await?;
    progress.reports_collected(outcome.reports.len());

    progress.phase("Sincronizando con la base de datos");
    let reports_synced = storage.upsert_reports(&outcome.reports).await?;

    let elapsed = start.elapsed();

    let stats = serde_json::json!({
        "reports_found": outcome.reports.len(),
        "reports_synced": reports_synced,
        "pages_visited": outcome.pages_visited,
        "errors": outcome.errors.len(),
    });
    storage.finish_sync_job(&job_id, &stats.to_string()).await?;

    info!(
        reports_found = outcome.reports.len(),
        reports_synced,
        pages_visited = outcome.pages_visited,
        errors = outcome.errors.len(),
        elapsed_ms = elapsed.as_millis(),
        "sync complete"
    );

    Ok(SyncResult {
        job_id,
        reports_found: outcome.reports.len(),
        reports_synced,
        pages_visited: outcome.pages_visited,
        errors: outcome.errors,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use incidesk_confluence::ClientOptions;
    use url::Url;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("incidesk_sync_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    async fn mount_children(server: &MockServer, id: &str, entries: &[(&str, &str)]) {
        let results: Vec<_> = entries
            .iter()
            .map(|(id, title)| serde_json::json!({"id": id, "title": title}))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/content/{id}/child/page")))
            .and(query_param("start", "0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "results": results })),
            )
            .mount(server)
            .await;
    }

    async fn mount_page(server: &MockServer, id: &str, markup: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/content/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "body": { "storage": { "value": markup } } }),
            ))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn sync_crawls_and_upserts() {
        let server = MockServer::start().await;
        mount_children(&server, "root", &[("1", "INC-001"), ("2", "Folder")]).await;
        mount_children(&server, "1", &[]).await;
        mount_children(&server, "2", &[("3", "RIC-002")]).await;
        mount_children(&server, "3", &[]).await;
        mount_page(&server, "1", "<p>disk full</p>").await;
        mount_page(&server, "3", "<p>review</p>").await;

        let client = ConfluenceClient::new(ClientOptions {
            base_url: Url::parse(&server.uri()).unwrap(),
            email: "ops@acme.example".into(),
            api_token: "token".into(),
            page_limit: 500,
        })
        .unwrap();
        let storage = test_storage().await;

        let config = SyncConfig {
            root_page_id: "root".into(),
            report_prefixes: vec!["INC-".into(), "RIC-".into()],
        };

        let result = sync_reports(&client, &storage, &config, &SilentProgress)
            .await
            .expect("sync");

        assert_eq!(result.reports_found, 2);
        assert_eq!(result.reports_synced, 2);
        assert!(result.errors.is_empty());

        let stored = storage.get_report("INC-001").await.unwrap().unwrap();
        assert_eq!(stored.content, "<p>disk full</p>");

        // Second run over identical data: still one row per title.
        let again = sync_reports(&client, &storage, &config, &SilentProgress)
            .await
            .expect("re-sync");
        assert_eq!(again.reports_synced, 2);
        assert_eq!(storage.count_reports().await.unwrap(), 2);
    }
}
