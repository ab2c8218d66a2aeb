use super::OutputOptions;
use crate::config::catalog::{join_path, ResolvedRevision};
use crate::core::{CodeSet, Fetcher, Pipeline, Storage};
use crate::domain::model::CrawlDepth;
use crate::parser::{tree, who, CodeSetBuilder};
use crate::utils::error::{Result, ScrapeError};
use std::collections::HashSet;
use url::Url;

/// A concept found while walking the browser, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlNode {
    pub code: String,
    pub description: String,
    pub parent: Option<String>,
    pub level: CrawlDepth,
}

/// Drill-down crawl of the WHO browser: chapters from the browse page,
/// blocks per chapter, then categories and subcategories per block from
/// the children endpoint. Requests go out one at a time.
pub struct CrawlPipeline<S: Storage, F: Fetcher> {
    storage: S,
    fetcher: F,
    target: ResolvedRevision,
    depth: CrawlDepth,
    output: OutputOptions,
}

impl<S: Storage, F: Fetcher> CrawlPipeline<S, F> {
    pub fn new(
        storage: S,
        fetcher: F,
        target: ResolvedRevision,
        depth: CrawlDepth,
        output: OutputOptions,
    ) -> Self {
        Self {
            storage,
            fetcher,
            target,
            depth,
            output,
        }
    }

    /// `<revision page>/<endpoint>?<query>`
    fn endpoint_url(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = join_path(&self.target.url, endpoint).map_err(|e| {
            ScrapeError::InvalidConfigValue {
                field: "source.base_url".to_string(),
                value: self.target.url.to_string(),
                reason: e.to_string(),
            }
        })?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn blocks_of(&self, chapter: &str) -> Result<Vec<(String, String)>> {
        let url = self.endpoint_url("GetConcept", &[("ConceptId", chapter)])?;
        let body = self.fetcher.get_text(url.as_str()).await?;
        who::parse_block_list(&body, url.as_str())
    }

    async fn children_of(&self, concept: &str) -> Result<Vec<(String, String)>> {
        let url = self.endpoint_url(
            "JsonGetChildrenConcepts",
            &[
                ("ConceptId", concept),
                ("useHtml", "true"),
                ("showAdoptedChildren", "true"),
            ],
        )?;
        let body = self.fetcher.get_text(url.as_str()).await?;
        who::parse_child_concepts(&body, url.as_str())
    }
}

fn node(code: String, description: String, parent: Option<&str>, level: CrawlDepth) -> CrawlNode {
    CrawlNode {
        code,
        description,
        parent: parent.map(str::to_string),
        level,
    }
}

#[async_trait::async_trait]
impl<S: Storage, F: Fetcher> Pipeline for CrawlPipeline<S, F> {
    type Raw = Vec<CrawlNode>;

    async fn fetch(&self) -> Result<Vec<CrawlNode>> {
        tracing::info!(
            "Crawling {} from {} down to {}",
            self.target.revision,
            self.target.url,
            self.depth
        );

        let root_url = self.target.url.as_str();
        let body = self.fetcher.get_text(root_url).await?;
        let chapters = tree::parse_chapters(&body, root_url)?;
        tracing::info!("Found {} chapters", chapters.len());

        let mut nodes = Vec::new();
        // Adopted children show up under several blocks; expand each once.
        let mut expanded: HashSet<String> = HashSet::new();
        for (chapter, description) in chapters {
            nodes.push(node(chapter.clone(), description, None, CrawlDepth::Chapters));
            if self.depth < CrawlDepth::Blocks {
                continue;
            }

            let blocks = self.blocks_of(&chapter).await?;
            tracing::debug!("Chapter {}: {} blocks", chapter, blocks.len());
            for (block, description) in blocks {
                nodes.push(node(block.clone(), description, Some(&chapter), CrawlDepth::Blocks));
                if self.depth < CrawlDepth::Categories || !expanded.insert(block.clone()) {
                    continue;
                }

                for (category, description) in self.children_of(&block).await? {
                    nodes.push(node(
                        category.clone(),
                        description,
                        Some(&block),
                        CrawlDepth::Categories,
                    ));
                    if self.depth < CrawlDepth::Subcategories
                        || !expanded.insert(category.clone())
                    {
                        continue;
                    }

                    for (sub, description) in self.children_of(&category).await? {
                        nodes.push(node(sub, description, Some(&category), CrawlDepth::Subcategories));
                    }
                }
            }
        }

        tracing::info!("Crawl discovered {} concepts", nodes.len());
        Ok(nodes)
    }

    /// A concept listed again under another parent (an adopted child) is
    /// kept once, under its first parent. The same code with a different
    /// description means the pages disagree and is an error.
    async fn parse(&self, raw: Vec<CrawlNode>) -> Result<CodeSet> {
        let mut builder =
            CodeSetBuilder::new(self.target.revision.clone(), self.target.url.as_str());

        for n in raw {
            if let Some(existing) = builder.get(&n.code) {
                if existing.description() != n.description {
                    return Err(builder.error(format!(
                        "code {} listed as '{}' and '{}'",
                        n.code,
                        existing.description(),
                        n.description
                    )));
                }
                tracing::debug!("Skipping repeated {} {}", n.level, n.code);
                continue;
            }

            builder.push(&n.code, &n.description, n.parent.as_deref())?;
        }

        builder.finish()
    }

    async fn emit(&self, code_set: &CodeSet) -> Result<String> {
        self.output.write(&self.storage, code_set).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RevisionCatalog;
    use crate::core::CodeRevision;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves bodies by exact URL and records every request.
    struct MapFetcher {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScrapeError::fetch(url, Some(404), "Not Found"))
        }
    }

    struct NullStorage;

    impl Storage for NullStorage {
        async fn write_file(&self, path: &str, _data: &[u8]) -> Result<String> {
            Ok(path.to_string())
        }
    }

    const BASE: &str = "https://icd.who.int/browse10/2019/en";

    fn pipeline(pages: &[(&str, &str)], depth: CrawlDepth) -> CrawlPipeline<NullStorage, MapFetcher> {
        let target = RevisionCatalog::default()
            .resolve("https://icd.who.int", &CodeRevision::icd10("2019"))
            .unwrap();
        let fetcher = MapFetcher {
            pages: pages
                .iter()
                .map(|(u, b)| (u.to_string(), b.to_string()))
                .collect(),
            requested: Mutex::new(Vec::new()),
        };
        CrawlPipeline::new(NullStorage, fetcher, target, depth, OutputOptions::new("out.tsv"))
    }

    const BROWSE: &str = r#"
        <div id="ygtvc1">
          <div class="ygtvitem"><a class="ygtvlabel"><span class="icode">I</span> Certain infectious and parasitic diseases</a></div>
        </div>"#;

    const CHAPTER_I: &str = r#"
        <ul><li class="Blocklist1"><a class="code">A00-A09</a><span class="label">Intestinal infectious diseases</span></li></ul>"#;

    #[tokio::test]
    async fn test_chapters_only_makes_one_request() {
        let crawl = pipeline(&[(BASE, BROWSE)], CrawlDepth::Chapters);

        let nodes = crawl.fetch().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(crawl.fetcher.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_crawl_to_categories() {
        let children_url = format!(
            "{}/JsonGetChildrenConcepts?ConceptId=A00-A09&useHtml=true&showAdoptedChildren=true",
            BASE
        );
        let children = r#"[
            {"ID": "A00", "html": "<a class=\"ygtvlabel\">A00 Cholera</a>"},
            {"ID": "A01", "html": "<a class=\"ygtvlabel\">A01 Typhoid and paratyphoid fevers</a>"}
        ]"#;
        let chapter_url = format!("{}/GetConcept?ConceptId=I", BASE);
        let crawl = pipeline(
            &[
                (BASE, BROWSE),
                (chapter_url.as_str(), CHAPTER_I),
                (children_url.as_str(), children),
            ],
            CrawlDepth::Categories,
        );

        let nodes = crawl.fetch().await.unwrap();
        let set = crawl.parse(nodes).await.unwrap();

        let records: Vec<(&str, Option<&str>)> =
            set.iter().map(|r| (r.code(), r.parent_code())).collect();
        assert_eq!(
            records,
            vec![
                ("I", None),
                ("A00-A09", Some("I")),
                ("A00", Some("A00-A09")),
                ("A01", Some("A00-A09")),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_block_page_aborts_crawl() {
        let crawl = pipeline(&[(BASE, BROWSE)], CrawlDepth::Blocks);
        let err = crawl.fetch().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch { status: Some(404), .. }));
    }

    #[tokio::test]
    async fn test_adopted_children_are_kept_once() {
        let crawl = pipeline(&[], CrawlDepth::Categories);
        let nodes = vec![
            node("I".into(), "Infectious".into(), None, CrawlDepth::Chapters),
            node("A00-A09".into(), "Intestinal".into(), Some("I"), CrawlDepth::Blocks),
            node("A15-A19".into(), "Tuberculosis".into(), Some("I"), CrawlDepth::Blocks),
            node("A00".into(), "Cholera".into(), Some("A00-A09"), CrawlDepth::Categories),
            node("A00".into(), "Cholera".into(), Some("A15-A19"), CrawlDepth::Categories),
        ];

        let set = crawl.parse(nodes).await.unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.get("A00").unwrap().parent_code(), Some("A00-A09"));
    }

    #[tokio::test]
    async fn test_conflicting_duplicate_is_parse_error() {
        let crawl = pipeline(&[], CrawlDepth::Categories);
        let nodes = vec![
            node("A00".into(), "Cholera".into(), None, CrawlDepth::Chapters),
            node("A00".into(), "Typhoid".into(), None, CrawlDepth::Chapters),
        ];

        let err = crawl.parse(nodes).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_adopted_category_is_expanded_once() {
        let chapter_url = format!("{}/GetConcept?ConceptId=I", BASE);
        let two_blocks = r##"
            <ul>
              <li class="Blocklist1"><a class="code">A00-A09</a><span class="label">Intestinal</span></li>
              <li class="Blocklist1"><a class="code">A15-A19</a><span class="label">Tuberculosis</span></li>
            </ul>"##;
        let children_url = |concept: &str| {
            format!(
                "{}/JsonGetChildrenConcepts?ConceptId={}&useHtml=true&showAdoptedChildren=true",
                BASE, concept
            )
        };
        let cholera = r#"[{"ID": "A00", "html": "<a class=\"ygtvlabel\">A00 Cholera</a>"}]"#;
        let vibrio = r#"[{"ID": "A00.0", "html": "<a class=\"ygtvlabel\">A00.0 Vibrio cholerae</a>"}]"#;
        let (intestinal, tuberculosis, a00) =
            (children_url("A00-A09"), children_url("A15-A19"), children_url("A00"));
        let crawl = pipeline(
            &[
                (BASE, BROWSE),
                (chapter_url.as_str(), two_blocks),
                (intestinal.as_str(), cholera),
                (tuberculosis.as_str(), cholera),
                (a00.as_str(), vibrio),
            ],
            CrawlDepth::Subcategories,
        );

        let nodes = crawl.fetch().await.unwrap();

        let requested = crawl.fetcher.requested.lock().unwrap().clone();
        assert_eq!(requested.iter().filter(|u| **u == a00).count(), 1);
        assert_eq!(requested.len(), 5);

        let set = crawl.parse(nodes).await.unwrap();
        let codes: Vec<&str> = set.iter().map(|r| r.code()).collect();
        assert_eq!(codes, vec!["I", "A00-A09", "A00", "A00.0", "A15-A19"]);
        assert_eq!(set.get("A00.0").unwrap().parent_code(), Some("A00"));
    }

    #[tokio::test]
    async fn test_concept_without_description_is_parse_error() {
        let crawl = pipeline(&[], CrawlDepth::Categories);
        let nodes = vec![
            node("A00".into(), "Cholera".into(), None, CrawlDepth::Chapters),
            node("A00.0".into(), String::new(), Some("A00"), CrawlDepth::Categories),
        ];

        let err = crawl.parse(nodes).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
        assert!(err.to_string().contains("A00.0 has no description"), "{}", err);
    }

    #[tokio::test]
    async fn test_invalid_chapter_code_is_parse_error() {
        let crawl = pipeline(&[], CrawlDepth::Chapters);
        let nodes = vec![node("Chapter I".into(), "Infectious".into(), None, CrawlDepth::Chapters)];

        let err = crawl.parse(nodes).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }
}
