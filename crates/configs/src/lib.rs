use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub apis: Vec<ApiSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout(), user_agent: default_user_agent() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    #[serde(default = "default_document_path")]
    pub path: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self { path: default_document_path() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_name")]
    pub name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { name: default_cache_name() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

/// One API the refresh tool keeps registered in the cache.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiSpec {
    pub name: String,
    pub url: String,
}

fn default_timeout() -> u64 { 30 }
fn default_user_agent() -> String { format!("node-datastore/{}", env!("CARGO_PKG_VERSION")) }
fn default_document_path() -> String { "data/document.json".to_string() }
fn default_cache_name() -> String { "api_cache".to_string() }
fn default_log_format() -> String { "compact".to_string() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.http.validate()?;
        if self.document.path.trim().is_empty() {
            self.document.path = default_document_path();
        }
        if self.cache.name.trim().is_empty() {
            self.cache.name = default_cache_name();
        }
        self.logging.format = self.logging.format.trim().to_ascii_lowercase();
        if !matches!(self.logging.format.as_str(), "compact" | "json") {
            return Err(anyhow!("logging.format must be \"compact\" or \"json\""));
        }
        for api in &self.apis {
            api.validate()?;
        }
        Ok(())
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("http.timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

impl ApiSpec {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("apis: name must not be empty"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("apis.{}: url must start with http:// or https://", self.name));
        }
        Ok(())
    }
}
