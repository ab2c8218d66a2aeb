use crate::domain::model::{normalize_system, CodeRevision};
use crate::parser::Layout;
use crate::utils::error::{Result, ScrapeError};
use serde::{Deserialize, Serialize};
use url::Url;

/// Years published on the WHO ICD-10 browser.
pub const ICD10_VERSIONS: [&str; 6] = ["2019", "2016", "2015", "2014", "2010", "2008"];

pub const ICD10_PATH_TEMPLATE: &str = "/browse10/{version}/en";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionEntry {
    pub system: String,
    pub version: String,
    /// Path below the base URL; `{version}` is replaced by the version.
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub layout: Layout,
}

fn default_path() -> String {
    ICD10_PATH_TEMPLATE.to_string()
}

impl RevisionEntry {
    pub fn revision(&self) -> CodeRevision {
        CodeRevision::new(&self.system, &self.version)
    }

    pub fn path(&self) -> String {
        self.path.replace("{version}", &self.version)
    }
}

/// A revision known to the catalog, ready to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRevision {
    pub revision: CodeRevision,
    pub url: Url,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionCatalog {
    entries: Vec<RevisionEntry>,
}

impl Default for RevisionCatalog {
    fn default() -> Self {
        let entries = ICD10_VERSIONS
            .iter()
            .map(|version| RevisionEntry {
                system: "ICD10".to_string(),
                version: version.to_string(),
                path: default_path(),
                layout: Layout::Auto,
            })
            .collect();
        Self { entries }
    }
}

impl RevisionCatalog {
    /// Add an entry, replacing any entry for the same revision in place.
    pub fn insert(&mut self, entry: RevisionEntry) {
        let revision = entry.revision();
        match self.entries.iter_mut().find(|e| e.revision().matches(&revision)) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn entries(&self) -> &[RevisionEntry] {
        &self.entries
    }

    pub fn get(&self, revision: &CodeRevision) -> Option<&RevisionEntry> {
        self.entries.iter().find(|e| e.revision().matches(revision))
    }

    pub fn supported(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}:{}", normalize_system(&e.system), e.version))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Look up `revision` and build its URL below `base_url`. Touches no
    /// network.
    pub fn resolve(&self, base_url: &str, revision: &CodeRevision) -> Result<ResolvedRevision> {
        let entry = self
            .get(revision)
            .ok_or_else(|| ScrapeError::UnsupportedRevision {
                system: revision.system().to_string(),
                version: revision.version().to_string(),
                supported: self.supported(),
            })?;

        let base = Url::parse(base_url).map_err(|e| ScrapeError::InvalidConfigValue {
            field: "source.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let url = join_path(&base, &entry.path()).map_err(|e| ScrapeError::InvalidConfigValue {
            field: "revisions.path".to_string(),
            value: entry.path.clone(),
            reason: e.to_string(),
        })?;

        Ok(ResolvedRevision {
            revision: revision.clone(),
            url,
            layout: entry.layout,
        })
    }
}

/// Append `path` to `base`, keeping any path prefix the base already has
/// (`http://host/mirror` + `/browse10/2019/en`).
pub(crate) fn join_path(base: &Url, path: &str) -> std::result::Result<Url, url::ParseError> {
    let mut prefix = base.as_str().trim_end_matches('/').to_string();
    prefix.push('/');
    Url::parse(&prefix)?.join(path.trim_start_matches('/'))
}
