//! Application configuration for Incidesk.
//!
//! User config lives at `~/.incidesk/incidesk.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are referenced by environment-variable *name* and never stored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IncideskError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "incidesk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".incidesk";

// ---------------------------------------------------------------------------
// Config structs (matching incidesk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Document API settings.
    #[serde(default)]
    pub confluence: ConfluenceConfig,

    /// Language-model API settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Local database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[confluence]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceConfig {
    /// REST API base URL, e.g. `https://acme.atlassian.net/wiki/rest/api`.
    #[serde(default)]
    pub base_url: String,

    /// Account email for basic auth.
    #[serde(default)]
    pub email: String,

    /// Name of the env var holding the API token (never the token itself).
    #[serde(default = "default_api_token_env")]
    pub api_token_env: String,

    /// Default root page id for `sync`.
    #[serde(default)]
    pub root_page_id: String,

    /// Title prefixes that mark a page as a report.
    #[serde(default = "default_report_prefixes")]
    pub report_prefixes: Vec<String>,

    /// Child-listing page size.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            email: String::new(),
            api_token_env: default_api_token_env(),
            root_page_id: String::new(),
            report_prefixes: default_report_prefixes(),
            page_limit: default_page_limit(),
        }
    }
}

fn default_api_token_env() -> String {
    "CONFLUENCE_API_TOKEN".into()
}
fn default_report_prefixes() -> Vec<String> {
    vec!["INC-".into(), "RIC-".into()]
}
fn default_page_limit() -> u32 {
    500
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Chat-completion model id.
    #[serde(default = "default_model")]
    pub model: String,

    /// Completion token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the embedded database file. `~` expands to the home dir.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.incidesk/incidesk.db".into()
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.incidesk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| IncideskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.incidesk/incidesk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| IncideskError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| IncideskError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| IncideskError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| IncideskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| IncideskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the document-API token from the configured env var.
pub fn resolve_api_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.confluence.api_token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(IncideskError::config(format!(
            "Confluence API token not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Read the language-model API key from the configured env var.
pub fn resolve_openai_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openai.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(IncideskError::config(format!(
            "OpenAI API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Expand a leading `~/` in a configured path against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("CONFLUENCE_API_TOKEN"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.confluence.page_limit, 500);
        assert_eq!(parsed.confluence.report_prefixes, vec!["INC-", "RIC-"]);
        assert_eq!(parsed.openai.max_tokens, 1000);
        assert_eq!(parsed.server.port, 8000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[confluence]
base_url = "https://acme.atlassian.net/wiki/rest/api"
email = "ops@acme.example"
root_page_id = "9251782674"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.confluence.email, "ops@acme.example");
        assert_eq!(config.confluence.page_limit, 500);
        assert_eq!(config.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn api_token_resolution_fails_when_unset() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.confluence.api_token_env = "INCIDESK_TEST_NONEXISTENT_TOKEN_12345".into();
        let result = resolve_api_token(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("token not found"));
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/tmp/x.db"), PathBuf::from("/tmp/x.db"));
    }
}
