//! Fragments served by the WHO browser's drill-down endpoints.

use super::{element_text, selector, strip_code_prefix, validate_code};
use crate::utils::error::{Result, ScrapeError};
use scraper::Html;
use serde::Deserialize;

/// One element of the `JsonGetChildrenConcepts` array.
#[derive(Debug, Deserialize)]
struct ChildConcept {
    #[serde(rename = "ID")]
    id: String,
    html: String,
}

/// Blocks of a chapter from a `GetConcept` page: `li.Blocklist1` entries
/// with an `a.code` and a `span.label`.
pub fn parse_block_list(html: &str, source: &str) -> Result<Vec<(String, String)>> {
    let document = Html::parse_document(html);
    let code_selector = selector("a.code");
    let label_selector = selector("span.label");

    let mut blocks = Vec::new();
    for (i, item) in document.select(&selector("li.Blocklist1")).enumerate() {
        let code = item
            .select(&code_selector)
            .next()
            .map(element_text)
            .ok_or_else(|| ScrapeError::parse(source, format!("block {} has no code link", i + 1)))?;
        let label = item
            .select(&label_selector)
            .next()
            .map(element_text)
            .ok_or_else(|| ScrapeError::parse(source, format!("block {} has no label", code)))?;
        validate_code(&code).map_err(|m| ScrapeError::parse(source, m))?;
        blocks.push((code, label));
    }

    if blocks.is_empty() {
        return Err(ScrapeError::parse(source, "no blocks listed"));
    }
    Ok(blocks)
}

/// Children of a concept from the `JsonGetChildrenConcepts` endpoint. The
/// description is the `a.ygtvlabel` text with the leading code removed.
pub fn parse_child_concepts(json: &str, source: &str) -> Result<Vec<(String, String)>> {
    let concepts: Vec<ChildConcept> = serde_json::from_str(json)
        .map_err(|e| ScrapeError::parse(source, format!("invalid children JSON: {}", e)))?;

    let label_selector = selector("a.ygtvlabel");
    concepts
        .into_iter()
        .map(|concept| {
            let code = concept.id.trim().to_string();
            validate_code(&code).map_err(|m| ScrapeError::parse(source, m))?;

            let fragment = Html::parse_fragment(&concept.html);
            let label = fragment
                .select(&label_selector)
                .next()
                .map(element_text)
                .ok_or_else(|| {
                    ScrapeError::parse(source, format!("concept {} has no label", code))
                })?;
            let description = strip_code_prefix(&label, &code);
            Ok((code, description))
        })
        .collect()
}
