use crate::domain::model::CodeSet;
use crate::utils::error::{Result, ScrapeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Tsv,
    Csv,
    Jsonl,
}

impl OutputFormat {
    pub const ALL: [&'static str; 3] = ["tsv", "csv", "jsonl"];
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tsv" => Ok(OutputFormat::Tsv),
            "csv" => Ok(OutputFormat::Csv),
            "jsonl" => Ok(OutputFormat::Jsonl),
            other => Err(format!(
                "unknown output format '{}' (expected {})",
                other,
                Self::ALL.join(", ")
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Tsv => "tsv",
            OutputFormat::Csv => "csv",
            OutputFormat::Jsonl => "jsonl",
        })
    }
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    code: &'a str,
    description: &'a str,
    #[serde(rename = "parentCode")]
    parent_code: &'a str,
}

/// Serialize a code set, one record per line. Top-level codes get an empty
/// `parentCode`. The output depends only on the records, so the same set
/// always encodes to the same bytes.
pub fn encode(code_set: &CodeSet, format: OutputFormat, header: bool) -> Result<Vec<u8>> {
    let rows = code_set.iter().map(|r| OutputRow {
        code: r.code(),
        description: r.description(),
        parent_code: r.parent_code().unwrap_or(""),
    });

    match format {
        // Parsed descriptions carry no tabs or line breaks; TSV stays unquoted.
        OutputFormat::Tsv => encode_delimited(rows, b'\t', csv::QuoteStyle::Never, header),
        OutputFormat::Csv => encode_delimited(rows, b',', csv::QuoteStyle::Necessary, header),
        OutputFormat::Jsonl => {
            let mut out = Vec::new();
            for row in rows {
                serde_json::to_writer(&mut out, &row)?;
                out.push(b'\n');
            }
            Ok(out)
        }
    }
}

fn encode_delimited<'a>(
    rows: impl Iterator<Item = OutputRow<'a>>,
    delimiter: u8,
    quote_style: csv::QuoteStyle,
    header: bool,
) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(quote_style)
        .has_headers(header)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| ScrapeError::Encode(e.into_error().into()))
}
