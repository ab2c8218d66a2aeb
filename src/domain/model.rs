use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A dated release of a coding system, e.g. `ICD10:2019`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeRevision {
    system: String,
    version: String,
}

impl CodeRevision {
    pub fn new(system: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            system: system.into().trim().to_string(),
            version: version.into().trim().to_string(),
        }
    }

    pub fn icd10(version: impl Into<String>) -> Self {
        Self::new("ICD10", version)
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `ICD-10`, `icd10` and `Icd 10` all name the same system.
    pub fn system_key(&self) -> String {
        normalize_system(&self.system)
    }

    pub fn matches(&self, other: &CodeRevision) -> bool {
        self.system_key() == other.system_key() && self.version == other.version
    }
}

pub(crate) fn normalize_system(system: &str) -> String {
    system
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

impl fmt::Display for CodeRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system, self.version)
    }
}

impl FromStr for CodeRevision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((system, version)) if !system.trim().is_empty() && !version.trim().is_empty() => {
                Ok(Self::new(system, version))
            }
            _ => Err(format!("expected SYSTEM:VERSION, got '{}'", s)),
        }
    }
}

/// One entry of a classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRecord {
    code: String,
    description: String,
    parent_code: Option<String>,
}

impl CodeRecord {
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        parent_code: Option<String>,
    ) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            parent_code: parent_code.filter(|p| !p.is_empty()),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parent_code(&self) -> Option<&str> {
        self.parent_code.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeSetError {
    DuplicateCode(String),
    UnknownParent { code: String, parent: String },
}

impl fmt::Display for CodeSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeSetError::DuplicateCode(code) => write!(f, "duplicate code {}", code),
            CodeSetError::UnknownParent { code, parent } => {
                write!(f, "code {} refers to unknown parent {}", code, parent)
            }
        }
    }
}

/// Ordered records of one revision. Codes are unique and every parent
/// precedes its children.
#[derive(Debug, Clone)]
pub struct CodeSet {
    revision: CodeRevision,
    records: Vec<CodeRecord>,
    index: HashMap<String, usize>,
}

impl CodeSet {
    pub fn new(revision: CodeRevision) -> Self {
        Self {
            revision,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn revision(&self) -> &CodeRevision {
        &self.revision
    }

    pub fn push(&mut self, record: CodeRecord) -> Result<(), CodeSetError> {
        if self.contains(record.code()) {
            return Err(CodeSetError::DuplicateCode(record.code().to_string()));
        }
        if let Some(parent) = record.parent_code() {
            if !self.contains(parent) {
                return Err(CodeSetError::UnknownParent {
                    code: record.code().to_string(),
                    parent: parent.to_string(),
                });
            }
        }
        self.index.insert(record.code().to_string(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&CodeRecord> {
        self.index.get(code).map(|&i| &self.records[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn records(&self) -> &[CodeRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CodeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn children_of<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a CodeRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.parent_code() == Some(code))
    }
}

impl<'a> IntoIterator for &'a CodeSet {
    type Item = &'a CodeRecord;
    type IntoIter = std::slice::Iter<'a, CodeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// How far down the ICD-10 hierarchy a crawl goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlDepth {
    Chapters,
    Blocks,
    #[default]
    Categories,
    Subcategories,
}

impl FromStr for CrawlDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chapters" => Ok(CrawlDepth::Chapters),
            "blocks" => Ok(CrawlDepth::Blocks),
            "categories" => Ok(CrawlDepth::Categories),
            "subcategories" => Ok(CrawlDepth::Subcategories),
            other => Err(format!(
                "unknown crawl depth '{}' (expected chapters, blocks, categories or subcategories)",
                other
            )),
        }
    }
}

impl fmt::Display for CrawlDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CrawlDepth::Chapters => "chapters",
            CrawlDepth::Blocks => "blocks",
            CrawlDepth::Categories => "categories",
            CrawlDepth::Subcategories => "subcategories",
        })
    }
}
