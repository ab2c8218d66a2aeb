//! Markup parsers turning fetched pages into [`CodeSet`]s.
//!
//! Every function here is pure: a body goes in, records or a
//! [`ScrapeError::Parse`] come out. Nothing is fetched or written.

pub mod table;
pub mod tree;
pub mod who;

use crate::domain::model::{CodeRecord, CodeRevision, CodeSet, CodeSetError};
use crate::utils::error::{Result, ScrapeError};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// How the code hierarchy is laid out in a revision's page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Auto,
    Table,
    Tree,
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Layout::Auto),
            "table" => Ok(Layout::Table),
            "tree" => Ok(Layout::Tree),
            other => Err(format!("unknown layout '{}' (expected auto, table or tree)", other)),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Layout::Auto => "auto",
            Layout::Table => "table",
            Layout::Tree => "tree",
        })
    }
}

/// Parse a full listing page into a code set.
///
/// `source` names the page (usually its URL) in error messages.
pub fn parse_classification(
    html: &str,
    layout: Layout,
    revision: &CodeRevision,
    source: &str,
) -> Result<CodeSet> {
    let document = Html::parse_document(html);
    let mut builder = CodeSetBuilder::new(revision.clone(), source);

    let layout = match layout {
        Layout::Auto => detect_layout(&document).ok_or_else(|| {
            ScrapeError::parse(source, "no classification table or tree found")
        })?,
        pinned => pinned,
    };
    tracing::debug!("Parsing {} with {} layout", source, layout);

    match layout {
        Layout::Tree => tree::parse_tree(&document, &mut builder)?,
        Layout::Table | Layout::Auto => table::parse_table(&document, &mut builder)?,
    }

    builder.finish()
}

fn detect_layout(document: &Html) -> Option<Layout> {
    if document.select(&selector(".ygtvitem")).next().is_some() {
        Some(Layout::Tree)
    } else if document.select(&selector("table")).next().is_some() {
        Some(Layout::Table)
    } else {
        None
    }
}

/// Accumulates records, turning invariant violations into parse errors
/// tagged with the page they came from.
pub(crate) struct CodeSetBuilder {
    set: CodeSet,
    source: String,
}

impl CodeSetBuilder {
    pub(crate) fn new(revision: CodeRevision, source: impl Into<String>) -> Self {
        Self {
            set: CodeSet::new(revision),
            source: source.into(),
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ScrapeError {
        ScrapeError::parse(&self.source, message)
    }

    pub(crate) fn push(&mut self, code: &str, description: &str, parent: Option<&str>) -> Result<()> {
        validate_code(code).map_err(|m| self.error(m))?;
        if description.is_empty() {
            return Err(self.error(format!("code {} has no description", code)));
        }

        self.set
            .push(CodeRecord::new(code, description, parent.map(str::to_string)))
            .map_err(|e: CodeSetError| self.error(e.to_string()))
    }

    pub(crate) fn get(&self, code: &str) -> Option<&CodeRecord> {
        self.set.get(code)
    }

    pub(crate) fn finish(self) -> Result<CodeSet> {
        if self.set.is_empty() {
            return Err(ScrapeError::parse(self.source, "page contained no codes"));
        }
        Ok(self.set)
    }
}

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.\-]*[†*]?$").expect("code pattern is valid")
    })
}

pub(crate) fn validate_code(code: &str) -> std::result::Result<(), String> {
    if code.is_empty() {
        return Err("empty code".to_string());
    }
    if !code_pattern().is_match(code) {
        return Err(format!("'{}' is not a valid code", code));
    }
    Ok(())
}

/// Collapse whitespace runs (including CR/LF and non-breaking spaces) to
/// single spaces and trim.
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Description left after removing a leading code from a label.
pub(crate) fn strip_code_prefix(label: &str, code: &str) -> String {
    label
        .strip_prefix(code)
        .unwrap_or(label)
        .trim()
        .to_string()
}

pub(crate) fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

pub(crate) fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Parsers only use literal selectors, so a failure here is a bug.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {}: {:?}", css, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Cholera\r\n   due to\u{a0}Vibrio "), "Cholera due to Vibrio");
        assert_eq!(clean_text("\n\t"), "");
    }

    #[test]
    fn test_validate_code() {
        for code in ["I", "XXII", "A00-A09", "A00", "A00.0", "U07.1", "A17.0†", "G01*"] {
            assert!(validate_code(code).is_ok(), "{} should be valid", code);
        }
        for code in ["", "A 00", "-A00", "A00\t"] {
            assert!(validate_code(code).is_err(), "{:?} should be invalid", code);
        }
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("TREE".parse::<Layout>().unwrap(), Layout::Tree);
        assert_eq!("auto".parse::<Layout>().unwrap(), Layout::Auto);
        assert!("list".parse::<Layout>().is_err());
    }

    #[test]
    fn test_auto_layout_without_markup_fails() {
        let err = parse_classification(
            "<html><body><p>Maintenance</p></body></html>",
            Layout::Auto,
            &CodeRevision::icd10("2019"),
            "page",
        )
        .unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }

    #[test]
    fn test_auto_layout_prefers_tree_markup() {
        let html = r#"
            <div id="ygtvc1">
              <div class="ygtvitem">
                <table class="ygtvtable"><tr><td>
                  <a class="ygtvlabel"><span class="icode">I</span> Certain infectious and parasitic diseases</a>
                </td></tr></table>
              </div>
            </div>"#;
        let set = parse_classification(html, Layout::Auto, &CodeRevision::icd10("2019"), "page")
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.records()[0].code(), "I");
    }
}
