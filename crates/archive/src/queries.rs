//! Search query generation from case seeds
//!
//! A seed describes a matter: the people involved, keywords to include or
//! exclude, and a date range. Each seed yields three Gmail queries of
//! decreasing precision, meant to be run in that order so the most precise
//! query claims a thread first.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

use crate::acquisition::csv_escape;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+").expect("valid email regex"));

static TERM_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;,]").expect("valid separator regex"));

/// Emails used by the intermediate query
const INTERMEDIATE_EMAIL_LIMIT: usize = 2;

/// One case seed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseSeed {
    #[serde(alias = "Seed_ID")]
    pub seed_id: String,
    /// Free text naming the people involved; email addresses are extracted
    #[serde(alias = "Primary_Characters")]
    pub primary_characters: String,
    /// Terms separated by `;` or `,`
    #[serde(alias = "Keywords_Include")]
    pub keywords_include: String,
    /// Terms separated by `;` or `,`
    #[serde(alias = "Keywords_Exclude")]
    pub keywords_exclude: String,
    /// `YYYY-MM-DD` (or any Gmail date form, passed through)
    #[serde(alias = "Date_Range_Start")]
    pub date_range_start: String,
    #[serde(alias = "Date_Range_End")]
    pub date_range_end: String,
}

/// The three queries generated for one seed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySet {
    pub seed_id: String,
    /// All known emails, keywords, dates and exclusions
    pub precise: String,
    /// The first two emails only
    pub intermediate: String,
    /// No email filter
    pub broad: String,
}

impl QuerySet {
    /// Queries in the order they should run
    pub fn ordered(&self) -> [&str; 3] {
        [&self.precise, &self.intermediate, &self.broad]
    }
}

/// Load seeds from a `.csv` sheet or a JSON array file
pub fn load_seeds(path: &Path) -> Result<Vec<CaseSeed>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seeds from {:?}", path))?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        return seeds_from_csv(&content).with_context(|| format!("Failed to parse seeds in {:?}", path));
    }
    serde_json::from_str(&content).with_context(|| format!("Failed to parse seeds in {:?}", path))
}

/// Parse seeds from CSV text with a header row
///
/// Columns are matched by header name (`Seed_ID`, `Primary_Characters`, ...);
/// unknown columns are ignored and missing cells read as empty. Rows with no
/// content at all are dropped.
pub fn seeds_from_csv(content: &str) -> Result<Vec<CaseSeed>> {
    let mut records = csv_records(content).into_iter();
    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    records
        .filter(|record| record.iter().any(|cell| !cell.trim().is_empty()))
        .enumerate()
        .map(|(n, record)| {
            let row: serde_json::Map<String, serde_json::Value> = header
                .iter()
                .zip(record)
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, cell)| (name.clone(), serde_json::Value::String(cell)))
                .collect();
            serde_json::from_value(serde_json::Value::Object(row))
                .with_context(|| format!("Invalid seed on data row {}", n + 1))
        })
        .collect()
}

/// Split CSV text into records of fields
///
/// Handles quoted fields with embedded delimiters, doubled quotes and line
/// breaks. Accepts both `\n` and `\r\n` line endings.
fn csv_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

/// Build the precise, intermediate and broad queries for a seed
pub fn build_queries(seed: &CaseSeed) -> QuerySet {
    let emails = parse_emails(&seed.primary_characters);
    let keywords = keyword_clause(&split_terms(&seed.keywords_include));
    let excludes = exclude_clause(&split_terms(&seed.keywords_exclude));
    let dates = date_clause(&seed.date_range_start, &seed.date_range_end);

    let assemble = |email_limit: Option<usize>| {
        let mut parts = Vec::new();
        if let Some(limit) = email_limit {
            let clause = email_clause(&emails, limit);
            if !clause.is_empty() {
                parts.push(format!("({clause})"));
            }
        }
        if !keywords.is_empty() {
            parts.push(format!("({keywords})"));
        }
        if !dates.is_empty() {
            parts.push(dates.clone());
        }
        if !excludes.is_empty() {
            parts.push(excludes.clone());
        }
        parts.join(" ")
    };

    QuerySet {
        seed_id: seed.seed_id.trim().to_string(),
        precise: assemble(Some(usize::MAX)),
        intermediate: assemble(Some(INTERMEDIATE_EMAIL_LIMIT)),
        broad: assemble(None),
    }
}

/// Email addresses appearing anywhere in the text, in order
pub fn parse_emails(text: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Split on `;` or `,`, trim, drop empties and repeats (first wins)
pub fn split_terms(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for term in TERM_SEPARATOR_RE.split(text).map(str::trim) {
        if !term.is_empty() && !out.iter().any(|t| t == term) {
            out.push(term.to_string());
        }
    }
    out
}

/// `YYYY-MM-DD` becomes `YYYY/MM/DD`; anything else is passed through trimmed
pub fn to_gmail_date(date: &str) -> String {
    let date = date.trim();
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d.format("%Y/%m/%d").to_string(),
        Err(_) => date.to_string(),
    }
}

/// Phrases are quoted; single words stay bare so Gmail can match variants
fn keyword_clause(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| {
            if t.contains(char::is_whitespace) {
                format!("\"{t}\"")
            } else {
                t.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn exclude_clause(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| format!("-{t}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn email_clause(emails: &[String], limit: usize) -> String {
    emails
        .iter()
        .take(limit)
        .map(|e| format!("from:{e} OR to:{e}"))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn date_clause(start: &str, end: &str) -> String {
    let mut parts = Vec::new();
    let start = to_gmail_date(start);
    if !start.is_empty() {
        parts.push(format!("after:{start}"));
    }
    let end = to_gmail_date(end);
    if !end.is_empty() {
        parts.push(format!("before:{end}"));
    }
    parts.join(" ")
}

/// Header of the query CSV export
pub const QUERY_CSV_HEADER: &str = "Seed_ID,Precise Query,Intermediate Query,Broad Query";

/// Serialize query sets as CSV, one seed per line
pub fn queries_to_csv(sets: &[QuerySet]) -> String {
    let mut lines = vec![QUERY_CSV_HEADER.to_string()];
    for set in sets {
        lines.push(
            [&set.seed_id, &set.precise, &set.intermediate, &set.broad]
                .iter()
                .map(|f| csv_escape(f))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}
