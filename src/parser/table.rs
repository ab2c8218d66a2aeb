//! `<table>` listings: one `code | description` row per code.
//!
//! Hierarchy comes from two sources that may be mixed:
//! - a table nested inside a row's cell holds the children of that row (or
//!   of the previous code row when the row itself carries no code);
//! - a row indentation level, from `data-level="N"` or a `level-N` class.

use super::{child_elements, clean_text, has_class, selector, CodeSetBuilder};
use crate::utils::error::Result;
use scraper::{ElementRef, Html};

pub(crate) fn parse_table(document: &Html, builder: &mut CodeSetBuilder) -> Result<()> {
    let table = find_classification_table(document)
        .ok_or_else(|| builder.error("no classification table found"))?;

    let mut walker = TableWalker {
        builder,
        stack: Vec::new(),
    };
    walker.walk(table, 0)
}

/// A `table.classification` wins; otherwise the first table not nested in
/// another one.
fn find_classification_table(document: &Html) -> Option<ElementRef<'_>> {
    let top_level: Vec<ElementRef<'_>> = document
        .select(&selector("table"))
        .filter(|t| enclosing_table(*t).is_none())
        .collect();

    top_level
        .iter()
        .copied()
        .find(|t| has_class(*t, "classification"))
        .or_else(|| top_level.first().copied())
}

struct TableWalker<'b> {
    builder: &'b mut CodeSetBuilder,
    /// Open ancestors of the next row: (depth, code).
    stack: Vec<(usize, String)>,
}

impl TableWalker<'_> {
    fn walk(&mut self, table: ElementRef<'_>, base_depth: usize) -> Result<()> {
        // Depth of the last code row seen directly in this table.
        let mut last_depth: Option<usize> = None;

        for (row_number, row) in direct_rows(table).into_iter().enumerate() {
            let cells: Vec<ElementRef<'_>> = child_elements(row)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .collect();
            if cells.is_empty() || cells.iter().all(|c| c.value().name() == "th") {
                continue;
            }

            let code = own_text(cells[0]);
            let description = cells.get(1).map(|c| own_text(*c)).unwrap_or_default();
            let nested = nested_tables(table, &cells);

            if !code.is_empty() {
                if cells.len() < 2 {
                    return Err(self.builder.error(format!(
                        "row {} ({}) has fewer than two cells",
                        row_number + 1,
                        code
                    )));
                }
                let depth = base_depth + self.row_level(row)?;
                self.emit(&code, &description, depth)?;
                last_depth = Some(depth);
            } else if !description.is_empty() {
                return Err(self.builder.error(format!(
                    "row {} has a description but no code",
                    row_number + 1
                )));
            }

            if nested.is_empty() {
                continue;
            }
            let parent_depth = last_depth.ok_or_else(|| {
                self.builder.error(format!(
                    "nested table in row {} has no parent row",
                    row_number + 1
                ))
            })?;
            for inner in nested {
                self.walk(inner, parent_depth + 1)?;
            }
        }

        Ok(())
    }

    fn emit(&mut self, code: &str, description: &str, depth: usize) -> Result<()> {
        while self.stack.last().is_some_and(|(d, _)| *d >= depth) {
            self.stack.pop();
        }

        let parent = match self.stack.last() {
            None if depth == 0 => None,
            None => {
                return Err(self
                    .builder
                    .error(format!("{} is indented but has no parent row", code)))
            }
            Some((parent_depth, _)) if *parent_depth + 1 != depth => {
                return Err(self.builder.error(format!(
                    "{} skips from level {} to level {}",
                    code, parent_depth, depth
                )))
            }
            Some((_, parent_code)) => Some(parent_code.clone()),
        };

        self.builder.push(code, description, parent.as_deref())?;
        self.stack.push((depth, code.to_string()));
        Ok(())
    }

    fn row_level(&self, row: ElementRef<'_>) -> Result<usize> {
        if let Some(level) = row.value().attr("data-level") {
            return level.trim().parse::<usize>().map_err(|_| {
                self.builder
                    .error(format!("invalid data-level '{}'", level))
            });
        }

        let level = row
            .value()
            .classes()
            .find_map(|class| class.strip_prefix("level-"))
            .and_then(|n| n.parse::<usize>().ok());
        Ok(level.unwrap_or(0))
    }
}

fn direct_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child).filter(|r| r.value().name() == "tr"))
            }
            _ => {}
        }
    }
    rows
}

/// Tables inside `cells` whose closest enclosing table is `table`.
fn nested_tables<'a>(table: ElementRef<'a>, cells: &[ElementRef<'a>]) -> Vec<ElementRef<'a>> {
    let table_selector = selector("table");
    cells
        .iter()
        .flat_map(|cell| cell.select(&table_selector).collect::<Vec<_>>())
        .filter(|inner| enclosing_table(*inner) == Some(table))
        .collect()
}

fn enclosing_table(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
}

/// Text of a cell without the text of any table nested in it.
fn own_text(cell: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in cell.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let inside_nested_table = node
            .ancestors()
            .take_while(|a| a.id() != cell.id())
            .any(|a| a.value().as_element().is_some_and(|e| e.name() == "table"));
        if !inside_nested_table {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    clean_text(&text)
}
