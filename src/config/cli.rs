use crate::config::toml_config::ScrapeConfig;
use crate::core::emit::OutputFormat;
use crate::domain::model::{CodeRevision, CrawlDepth};
use crate::utils::error::{Result, ScrapeError};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "icd-scrape", version)]
#[command(about = "Download ICD-10 classification codes into a line-oriented file")]
pub struct CliConfig {
    /// Revision to download: a version such as 2019, or SYSTEM:VERSION
    #[arg(required_unless_present = "list_revisions")]
    pub revision: Option<String>,

    /// Output file, one record per line
    #[arg(required_unless_present = "list_revisions")]
    pub output: Option<String>,

    /// Coding system of the revision
    #[arg(long, default_value = "ICD10")]
    pub system: String,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override source.base_url")]
    pub base_url: Option<String>,

    #[arg(long, help = "Per-request timeout in seconds")]
    pub timeout_seconds: Option<u64>,

    #[arg(long, help = "Output format: tsv, csv or jsonl")]
    pub format: Option<OutputFormat>,

    #[arg(long, help = "Write a header line")]
    pub header: bool,

    #[arg(long, help = "Walk chapters, blocks and categories instead of reading one page")]
    pub crawl: bool,

    #[arg(long, help = "Crawl depth: chapters, blocks, categories or subcategories")]
    pub depth: Option<CrawlDepth>,

    #[arg(long, help = "Log CPU and memory usage per stage")]
    pub monitor: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, default_value = "text", help = "Log format: text or json")]
    pub log_format: LogFormat,

    #[arg(long, help = "Print the supported revisions and exit")]
    pub list_revisions: bool,
}

impl CliConfig {
    pub fn code_revision(&self) -> Result<CodeRevision> {
        let raw = self
            .revision
            .as_deref()
            .ok_or_else(|| ScrapeError::MissingConfig {
                field: "revision".to_string(),
            })?;

        if raw.contains(':') {
            raw.parse().map_err(|reason| ScrapeError::InvalidConfigValue {
                field: "revision".to_string(),
                value: raw.to_string(),
                reason,
            })
        } else {
            Ok(CodeRevision::new(&self.system, raw))
        }
    }

    pub fn output_path(&self) -> Result<&str> {
        let output = self.output.as_deref().ok_or_else(|| ScrapeError::MissingConfig {
            field: "output".to_string(),
        })?;
        validate_path("output", output)?;
        Ok(output)
    }

    /// The config file (or defaults) with command line overrides applied,
    /// validated.
    pub fn load_config(&self) -> Result<ScrapeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                ScrapeConfig::from_file(path)?
            }
            None => ScrapeConfig::default(),
        };

        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut ScrapeConfig) {
        if let Some(base_url) = &self.base_url {
            config.source.base_url = base_url.clone();
        }
        if let Some(timeout) = self.timeout_seconds {
            config.source.timeout_seconds = timeout;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.header {
            config.output.header = true;
        }
        if self.crawl {
            config.crawl.enabled = true;
        }
        if let Some(depth) = self.depth {
            config.crawl.depth = depth;
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_revision_and_output() {
        let cli = CliConfig::try_parse_from(["icd-scrape", "2019", "out.tsv"]).unwrap();
        assert_eq!(cli.code_revision().unwrap(), CodeRevision::icd10("2019"));
        assert_eq!(cli.output_path().unwrap(), "out.tsv");
    }

    #[test]
    fn test_system_prefixed_revision() {
        let cli = CliConfig::try_parse_from(["icd-scrape", "ICD-10:2016", "out.tsv"]).unwrap();
        let revision = cli.code_revision().unwrap();
        assert_eq!(revision.system(), "ICD-10");
        assert_eq!(revision.version(), "2016");
    }

    #[test]
    fn test_revision_required_unless_listing() {
        assert!(CliConfig::try_parse_from(["icd-scrape"]).is_err());
        let cli = CliConfig::try_parse_from(["icd-scrape", "--list-revisions"]).unwrap();
        assert!(cli.list_revisions);
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let cli = CliConfig::try_parse_from([
            "icd-scrape",
            "2019",
            "out.csv",
            "--base-url",
            "http://127.0.0.1:1234",
            "--timeout-seconds",
            "5",
            "--format",
            "csv",
            "--header",
            "--crawl",
            "--depth",
            "chapters",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.source.base_url, "http://127.0.0.1:1234");
        assert_eq!(config.source.timeout_seconds, 5);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert!(config.output.header);
        assert!(config.crawl.enabled);
        assert_eq!(config.crawl.depth, CrawlDepth::Chapters);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let cli = CliConfig::try_parse_from(["icd-scrape", "2019", "out.tsv", "--timeout-seconds", "0"])
            .unwrap();
        assert!(matches!(
            cli.load_config(),
            Err(ScrapeError::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_unknown_format_rejected_by_parser() {
        assert!(CliConfig::try_parse_from(["icd-scrape", "2019", "out", "--format", "xml"]).is_err());
    }
}
