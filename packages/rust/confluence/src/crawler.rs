//! Worklist traversal of the page hierarchy.
//!
//! Descends from a root page through every child listing, collecting the
//! pages whose titles carry one of the configured report prefixes. An
//! explicit stack plus a visited set replaces recursive descent, so hierarchy
//! depth cannot overflow the call stack and a cyclic parent/child link
//! terminates instead of looping.

use std::collections::HashSet;

use tracing::{info, instrument, warn};

use incidesk_shared::{Report, Result};

use crate::client::ConfluenceClient;

/// Summary of a completed traversal.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Reports collected, in source-API order per level.
    pub reports: Vec<Report>,
    /// Number of pages whose child listings were fetched.
    pub pages_visited: usize,
    /// Errors encountered (page title or id, error message).
    pub errors: Vec<(String, String)>,
}

/// Check whether a title marks a report page.
fn is_report_title(title: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| title.starts_with(p.as_str()))
}

/// Collect every prefix-matching report under `root_id`.
///
/// Pages that don't match the prefix filter are organizational folders: they
/// contribute no report themselves but their subtrees are still descended
/// into. A failed content fetch logs a warning, lands in
/// [`CrawlOutcome::errors`], and traversal continues with whatever else the
/// hierarchy holds.
#[instrument(skip_all, fields(root_id))]
pub async fn collect_reports(
    client: &ConfluenceClient,
    root_id: &str,
    prefixes: &[String],
) -> Result<CrawlOutcome> {
    let mut reports = Vec::new();
    let mut errors: Vec<(String, String)> = Vec::new();
    let mut pages_visited = 0usize;

    let mut visited: HashSet<String> = HashSet::new();
    let mut worklist: Vec<String> = vec![root_id.to_string()];
    visited.insert(root_id.to_string());

    while let Some(page_id) = worklist.pop() {
        pages_visited += 1;

        let children = match client.fetch_children(&page_id).await {
            Ok(children) => children,
            Err(e) => {
                warn!(page_id, error = %e, "child listing failed, skipping subtree");
                errors.push((page_id.clone(), e.to_string()));
                continue;
            }
        };

        for child in children {
            if is_report_title(&child.title, prefixes) {
                match client.fetch_page_body(&child.id).await {
                    Ok(content) => {
                        info!(title = %child.title, "fetched report");
                        reports.push(Report {
                            title: child.title.clone(),
                            content,
                        });
                    }
                    Err(e) => {
                        warn!(title = %child.title, error = %e, "content fetch failed, skipping report");
                        errors.push((child.title.clone(), e.to_string()));
                    }
                }
            }

            // Match or not, the child's own subtree is still visited.
            if visited.insert(child.id.clone()) {
                worklist.push(child.id);
            }
        }
    }

    info!(
        reports = reports.len(),
        pages_visited,
        errors = errors.len(),
        "traversal complete"
    );

    Ok(CrawlOutcome {
        reports,
        pages_visited,
        errors,
    })
}
