//! Core domain types for incident reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A report collected from the document hierarchy: one incident record.
///
/// The title is the natural key; content is the raw storage-format markup
/// exactly as the source API returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Page title, e.g. `INC-0042 Disco lleno en produccion`.
    pub title: String,
    /// Raw storage-format markup body.
    pub content: String,
}

// ---------------------------------------------------------------------------
// ReportRecord
// ---------------------------------------------------------------------------

/// A report row as persisted in the `reports` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Unique natural key.
    pub title: String,
    /// Raw markup content.
    pub content: String,
    /// Refreshed on every upsert, including no-op content overwrites.
    pub last_updated: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// PageRef
// ---------------------------------------------------------------------------

/// A child-page reference returned by the document API's listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    /// Opaque page identifier.
    pub id: String,
    /// Display title, used by the prefix filter.
    pub title: String,
}

// ---------------------------------------------------------------------------
// CleanReport
// ---------------------------------------------------------------------------

/// A search hit with its content reduced to plain text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanReport {
    pub title: String,
    /// Content with markup stripped to the concatenation of its text nodes.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serialization_roundtrip() {
        let report = Report {
            title: "INC-001".into(),
            content: "<p>disk full</p>".into(),
        };
        let json = serde_json::to_string(&report).expect("serialize");
        let parsed: Report = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, report);
    }

    #[test]
    fn record_carries_timestamp() {
        let record = ReportRecord {
            title: "RIC-100".into(),
            content: "body".into(),
            last_updated: Utc::now(),
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("last_updated"));
    }
}
