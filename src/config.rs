use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub export_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            upload_dir: PathBuf::from("uploads"),
            export_dir: PathBuf::from("exports"),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Connection settings for the external document-analysis service.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Upper bound on each HTTP call; the analysis itself can take seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_max_polls() -> u32 {
    60
}

impl ExtractorConfig {
    /// Key from the config file, or from EXTRACTOR_API_KEY when the file
    /// leaves it out.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("EXTRACTOR_API_KEY").ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub sqlite_path: PathBuf,
    pub mysql_url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            sqlite_path: PathBuf::from("invoices.db"),
            mysql_url: None,
        }
    }
}

/// Which persistence backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Mysql,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
