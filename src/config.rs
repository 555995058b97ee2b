// src/config.rs
//! Load-once configuration. Everything downstream (fetcher, classifier,
//! digest builder) borrows the same `AppConfig`; nothing re-reads the file.
//!
//! Configuration problems are the only hard failures in the system: a
//! missing file, bad TOML, empty keyword tables or an unresolvable API key
//! abort the run with context before any processing starts.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path};

pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";
const ENV_ZHIPU_API_KEY: &str = "ZHIPU_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub companies: Vec<CompanyProfile>,
    pub industry: IndustryConfig,
    pub hr_categories: Vec<CategoryRule>,
    /// Flat relevance keyword list scored against title and summary.
    pub hr_keywords: Vec<String>,
    /// Generic technology terms used by the false-positive override.
    pub tech_keywords: Vec<String>,
    pub sources: Vec<FeedSource>,
    pub crawler: CrawlerConfig,
    pub ai: AiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// A tracked company: display name plus the alias keywords used for
/// attribution. Static per run.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Fallback attribution when no tracked company matches but the article is
/// still about the industry.
#[derive(Debug, Clone, Deserialize)]
pub struct IndustryConfig {
    pub label: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// One RSS feed endpoint. Read-only at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_items")]
    pub max_items_per_source: usize,
    #[serde(default = "default_request_delay")]
    pub request_delay_secs: u64,
    /// Entries older than this are dropped at normalization time.
    /// 0 disables the window.
    #[serde(default = "default_days_to_fetch")]
    pub days_to_fetch: i64,
    /// Store retention cap, most-recent by capture time.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "zhipu" is the only wired provider.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from ZHIPU_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_news_path")]
    pub news_path: String,
    #[serde(default = "default_users_path")]
    pub users_path: String,
    #[serde(default = "default_log_path")]
    pub access_log_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            news_path: default_news_path(),
            users_path: default_users_path(),
            access_log_path: default_log_path(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.ai.provider = cfg.ai.provider.to_lowercase();
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&mut self) -> Result<()> {
        if !self.companies.iter().any(|c| c.enabled) {
            bail!("config has no enabled companies");
        }
        if self.hr_categories.is_empty() {
            bail!("config has no HR categories");
        }
        if self.hr_keywords.is_empty() {
            bail!("config has no HR relevance keywords");
        }
        // Resolve the API key up front so a missing credential fails the
        // batch before any fetching starts.
        if self.ai.enabled {
            if self.ai.provider != "zhipu" {
                bail!("unsupported AI provider in config: {}", self.ai.provider);
            }
            if self.ai.api_key.trim().eq_ignore_ascii_case("env") {
                self.ai.api_key = env::var(ENV_ZHIPU_API_KEY)
                    .with_context(|| format!("missing {ENV_ZHIPU_API_KEY} env var"))?;
            }
            if self.ai.api_key.trim().is_empty() {
                bail!("AI is enabled but the API key is empty");
            }
        }
        Ok(())
    }

    /// Companies considered for attribution, in configured order.
    pub fn enabled_companies(&self) -> impl Iterator<Item = &CompanyProfile> {
        self.companies.iter().filter(|c| c.enabled)
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &FeedSource> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_items() -> usize {
    20
}
fn default_request_delay() -> u64 {
    1
}
fn default_days_to_fetch() -> i64 {
    7
}
fn default_max_records() -> usize {
    500
}
fn default_provider() -> String {
    "zhipu".to_string()
}
fn default_model() -> String {
    "glm-4-flash".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_ai_timeout() -> u64 {
    10
}
fn default_news_path() -> String {
    "data/news.json".to_string()
}
fn default_users_path() -> String {
    "data/users.json".to_string()
}
fn default_log_path() -> String {
    "data/access_log.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        hr_keywords = ["招聘"]
        tech_keywords = ["ai"]

        [[companies]]
        name = "小米汽车"
        keywords = ["小米汽车"]

        [industry]
        label = "汽车行业"
        keywords = ["汽车"]

        [[hr_categories]]
        name = "招聘与人才"
        keywords = ["招聘"]

        [[sources]]
        name = "36氪"
        url = "https://36kr.com/feed"

        [crawler]

        [ai]
        enabled = false
    "#;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let cfg: AppConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.crawler.max_records, 500);
        assert_eq!(cfg.crawler.request_delay_secs, 1);
        assert_eq!(cfg.ai.model, "glm-4-flash");
        assert_eq!(cfg.storage.news_path, "data/news.json");
        assert!(cfg.sources[0].enabled);
    }

    #[test]
    fn empty_company_table_is_rejected() {
        let mut cfg: AppConfig = toml::from_str(MINIMAL).unwrap();
        cfg.companies[0].enabled = false;
        assert!(cfg.validate().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn enabled_ai_without_key_fails_validation() {
        std::env::remove_var(ENV_ZHIPU_API_KEY);
        let mut cfg: AppConfig = toml::from_str(MINIMAL).unwrap();
        cfg.ai.enabled = true;
        assert!(cfg.validate().is_err());

        std::env::set_var(ENV_ZHIPU_API_KEY, "test-key");
        let mut cfg: AppConfig = toml::from_str(MINIMAL).unwrap();
        cfg.ai.enabled = true;
        cfg.validate().unwrap();
        assert_eq!(cfg.ai.api_key, "test-key");
        std::env::remove_var(ENV_ZHIPU_API_KEY);
    }
}
