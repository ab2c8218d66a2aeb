use crate::adapters::http::DEFAULT_USER_AGENT;
use crate::config::catalog::{RevisionCatalog, RevisionEntry};
use crate::core::emit::OutputFormat;
use crate::domain::model::CrawlDepth;
use crate::utils::error::{Result, ScrapeError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://icd.who.int";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_TIMEOUT_SECONDS: u64 = 600;

/// File configuration. Every section is optional; CLI flags are applied on
/// top of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub crawl: CrawlConfig,
    pub monitoring: MonitoringConfig,
    /// Extra or replacement catalog entries.
    pub revisions: Vec<RevisionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub header: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub enabled: bool,
    pub depth: CrawlDepth,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl ScrapeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ScrapeError::ConfigValidation {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value; unknown variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env pattern is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds)
    }

    /// The built-in catalog with this file's `[[revisions]]` applied.
    pub fn catalog(&self) -> RevisionCatalog {
        let mut catalog = RevisionCatalog::default();
        for entry in &self.revisions {
            catalog.insert(entry.clone());
        }
        catalog
    }
}

impl Validate for ScrapeConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("source.base_url", &self.source.base_url)?;
        validation::validate_range(
            "source.timeout_seconds",
            self.source.timeout_seconds,
            1,
            MAX_TIMEOUT_SECONDS,
        )?;
        validation::validate_non_empty_string("source.user_agent", &self.source.user_agent)?;

        for entry in &self.revisions {
            validation::validate_non_empty_string("revisions.system", &entry.system)?;
            validation::validate_non_empty_string("revisions.version", &entry.version)?;
            if !entry.path.starts_with('/') {
                return Err(ScrapeError::InvalidConfigValue {
                    field: "revisions.path".to_string(),
                    value: entry.path.clone(),
                    reason: "path must start with '/'".to_string(),
                });
            }
        }

        Ok(())
    }
}
