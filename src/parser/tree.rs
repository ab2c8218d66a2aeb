//! The WHO browser tree: `.ygtvitem` nodes whose label (`.ygtvlabel`)
//! starts with an `.icode` span, children under a sibling `.ygtvchildren`.

use super::{child_elements, element_text, has_class, selector, strip_code_prefix, CodeSetBuilder};
use crate::utils::error::{Result, ScrapeError};
use scraper::{ElementRef, Html};

pub(crate) fn parse_tree(document: &Html, builder: &mut CodeSetBuilder) -> Result<()> {
    let root = tree_root(document).ok_or_else(|| builder.error("no classification tree found"))?;
    walk(root, None, builder)
}

/// Top-level labels of a browse page as `(code, description)` pairs,
/// without descending. The crawler uses these as chapters.
///
/// Only server-rendered markup is read. The live WHO browser fills
/// `#ygtvc1` from script, so a plain GET of it may carry no tree; point
/// `source.base_url` at a mirror that serves the rendered page.
pub fn parse_chapters(html: &str, source: &str) -> Result<Vec<(String, String)>> {
    let document = Html::parse_document(html);
    let root = tree_root(&document).ok_or_else(|| {
        ScrapeError::parse(
            source,
            "no chapter tree in the page (it may be rendered client-side)",
        )
    })?;

    let chapters = child_elements(root)
        .filter(|e| has_class(*e, "ygtvitem"))
        .map(|item| {
            node_label(item).ok_or_else(|| ScrapeError::parse(source, "tree node without a code"))
        })
        .collect::<Result<Vec<_>>>()?;

    if chapters.is_empty() {
        return Err(ScrapeError::parse(source, "browse page lists no chapters"));
    }
    Ok(chapters)
}

/// `#ygtvc1` holds the chapter list on the WHO pages; fall back to the
/// first children container.
fn tree_root(document: &Html) -> Option<ElementRef<'_>> {
    document
        .select(&selector("#ygtvc1"))
        .next()
        .or_else(|| document.select(&selector(".ygtvchildren")).next())
}

fn walk(container: ElementRef<'_>, parent: Option<&str>, builder: &mut CodeSetBuilder) -> Result<()> {
    for item in child_elements(container).filter(|e| has_class(*e, "ygtvitem")) {
        let (code, description) = node_label(item).ok_or_else(|| {
            builder.error(format!(
                "tree node{} without a code",
                parent.map(|p| format!(" under {}", p)).unwrap_or_default()
            ))
        })?;
        builder.push(&code, &description, parent)?;

        if let Some(children) = child_elements(item).find(|e| has_class(*e, "ygtvchildren")) {
            walk(children, Some(code.as_str()), builder)?;
        }
    }
    Ok(())
}

/// The node's own label, ignoring labels of its descendants.
fn node_label(item: ElementRef<'_>) -> Option<(String, String)> {
    let label_selector = selector(".ygtvlabel");
    let code_selector = selector(".icode");

    let label = child_elements(item)
        .filter(|e| !has_class(*e, "ygtvchildren"))
        .find_map(|e| {
            if has_class(e, "ygtvlabel") {
                Some(e)
            } else {
                e.select(&label_selector).next()
            }
        })?;

    let code = label.select(&code_selector).next().map(element_text)?;
    if code.is_empty() {
        return None;
    }
    let description = strip_code_prefix(&element_text(label), &code);
    Some((code, description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CodeRevision;
    use crate::parser::{parse_classification, Layout};

    const BROWSER_TREE: &str = r##"
        <html><body>
        <div id="ygtv0" class="ygtvchildren">
          <div id="ygtvc1" class="ygtvchildren">
            <div class="ygtvitem" id="ygtv2">
              <table class="ygtvtable ygtvdepth0"><tr>
                <td class="ygtvcell ygtvtp"><a class="ygtvspacer">&nbsp;</a></td>
                <td class="ygtvcell ygtvcontent">
                  <a class="ygtvlabel  " href="#"><span class="icode ">I</span>
                    Certain infectious and parasitic diseases</a>
                </td>
              </tr></table>
              <div class="ygtvchildren" id="ygtvc2">
                <div class="ygtvitem">
                  <table class="ygtvtable"><tr><td class="ygtvcell ygtvcontent">
                    <a class="ygtvlabel"><span class="icode">A00-A09</span> Intestinal infectious diseases</a>
                  </td></tr></table>
                  <div class="ygtvchildren">
                    <div class="ygtvitem">
                      <table class="ygtvtable"><tr><td>
                        <a class="ygtvlabel"><span class="icode">A00</span> Cholera</a>
                      </td></tr></table>
                    </div>
                  </div>
                </div>
              </div>
            </div>
            <div class="ygtvitem" id="ygtv3">
              <table class="ygtvtable"><tr><td>
                <a class="ygtvlabel"><span class="icode">II</span> Neoplasms</a>
              </td></tr></table>
            </div>
          </div>
        </div>
        </body></html>"##;

    #[test]
    fn test_parse_browser_tree() {
        let set = parse_classification(
            BROWSER_TREE,
            Layout::Tree,
            &CodeRevision::icd10("2019"),
            "fixture",
        )
        .unwrap();

        let records: Vec<(&str, &str, Option<&str>)> = set
            .iter()
            .map(|r| (r.code(), r.description(), r.parent_code()))
            .collect();
        assert_eq!(
            records,
            vec![
                ("I", "Certain infectious and parasitic diseases", None),
                ("A00-A09", "Intestinal infectious diseases", Some("I")),
                ("A00", "Cholera", Some("A00-A09")),
                ("II", "Neoplasms", None),
            ]
        );
    }

    #[test]
    fn test_chapters_are_top_level_nodes_only() {
        let chapters = parse_chapters(BROWSER_TREE, "fixture").unwrap();
        assert_eq!(
            chapters,
            vec![
                ("I".to_string(), "Certain infectious and parasitic diseases".to_string()),
                ("II".to_string(), "Neoplasms".to_string()),
            ]
        );
    }

    #[test]
    fn test_node_without_code_is_rejected() {
        let html = r#"
            <div id="ygtvc1">
              <div class="ygtvitem"><a class="ygtvlabel">Loading...</a></div>
            </div>"#;
        let err = parse_classification(html, Layout::Tree, &CodeRevision::icd10("2019"), "fixture")
            .unwrap_err();
        assert!(err.to_string().contains("without a code"));
    }

    #[test]
    fn test_unrendered_browse_page_has_no_chapters() {
        let shell = r#"<html><body><div id="ygtv0"></div><script src="tree.js"></script></body></html>"#;
        let err = parse_chapters(shell, "browse page").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
        assert!(err.to_string().contains("rendered client-side"), "{}", err);
    }
}
