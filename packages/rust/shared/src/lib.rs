//! Shared types, error model, and configuration for Incidesk.
//!
//! This crate is the foundation depended on by all other Incidesk crates.
//! It provides:
//! - [`IncideskError`] — the unified error type
//! - Domain types ([`Report`], [`ReportRecord`], [`PageRef`], [`CleanReport`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConfluenceConfig, DatabaseConfig, OpenAiConfig, ServerConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from,
    resolve_api_token, resolve_openai_key,
};
pub use error::{IncideskError, Result};
pub use types::{CleanReport, PageRef, Report, ReportRecord};
