//! Document-source client and report-tree crawler.
//!
//! This crate provides:
//! - [`ConfluenceClient`] — authenticated page-body fetch and paginated
//!   child listing against the Confluence REST API
//! - [`crawler`] — worklist traversal of the page hierarchy that collects
//!   prefix-matching reports

pub mod client;
pub mod crawler;

pub use client::{ClientOptions, ConfluenceClient};
pub use crawler::{CrawlOutcome, collect_reports};
