use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Unsupported revision {system}:{version} (supported: {supported})")]
    UnsupportedRevision {
        system: String,
        version: String,
        supported: String,
    },

    #[error("Fetch of {url} failed{}: {message}", status_suffix(.status))]
    Fetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Output encoding failed: {0}")]
    Encode(#[from] csv::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with HTTP {}", s)).unwrap_or_default()
}

/// The pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Revision,
    Fetch,
    Parse,
    Write,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Revision => "revision",
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Write => "write",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ScrapeError {
    pub fn fetch(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        ScrapeError::Fetch {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        ScrapeError::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ScrapeError::UnsupportedRevision { .. } => Stage::Revision,
            ScrapeError::Fetch { .. } => Stage::Fetch,
            ScrapeError::Parse { .. } => Stage::Parse,
            ScrapeError::Write { .. } | ScrapeError::Encode(_) | ScrapeError::Json(_) => {
                Stage::Write
            }
            ScrapeError::Io(_)
            | ScrapeError::ConfigValidation { .. }
            | ScrapeError::InvalidConfigValue { .. }
            | ScrapeError::MissingConfig { .. } => Stage::Config,
        }
    }

    /// Process exit code for the CLI. Always non-zero.
    pub fn exit_code(&self) -> i32 {
        match self.stage() {
            Stage::Config => 2,
            Stage::Revision => 3,
            Stage::Fetch => 4,
            Stage::Parse => 5,
            Stage::Write => 6,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ScrapeError::UnsupportedRevision {
                system, version, ..
            } => format!("{}:{} is not a supported revision", system, version),
            ScrapeError::Fetch {
                url,
                status: Some(status),
                ..
            } => format!("The server answered HTTP {} for {}", status, url),
            ScrapeError::Fetch { url, message, .. } => {
                format!("Could not download {}: {}", url, message)
            }
            ScrapeError::Parse { context, message } => {
                format!("The page at {} has an unexpected structure: {}", context, message)
            }
            _ => format!("{} failed: {}", self.stage(), self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.stage() {
            Stage::Config => "Check the command line flags and the TOML configuration file",
            Stage::Revision => "Run with --list-revisions to see the supported revisions",
            Stage::Fetch => "Check network access and the base URL, or raise --timeout-seconds",
            Stage::Parse => "The remote markup may have changed; try pinning a layout for this revision",
            Stage::Write => "Make sure the output directory exists and is writable",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
