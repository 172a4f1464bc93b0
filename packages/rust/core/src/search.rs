//! Keyword search over the local reports table, with markup cleanup.

use tracing::{debug, warn};

use incidesk_shared::CleanReport;
use incidesk_storage::Storage;
use incidesk_text::extract_text;

/// Search stored reports by keyword, returning hits with content reduced to
/// plain text.
///
/// A storage failure is logged and degrades to an empty result set; the
/// caller never sees the error. Keyword validation (rejecting the empty
/// string) lives in the HTTP boundary, not here.
pub async fn search_reports(storage: &Storage, keyword: &str) -> Vec<CleanReport> {
    let records = match storage.search(keyword).await {
        Ok(records) => records,
        Err(e) => {
            warn!(keyword, error = %e, "search failed, returning empty result set");
            return Vec::new();
        }
    };

    debug!(keyword, hits = records.len(), "search complete");

    records
        .into_iter()
        .map(|r| CleanReport {
            title: r.title,
            content: extract_text(&r.content),
        })
        .collect()
}
