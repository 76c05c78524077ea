//! CSV encoding of the bookmark collection.
//!
//! Export quotes every value; import accepts quoted or bare fields and
//! ignores columns it does not know.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ShelfError, ShelfResult};
use crate::model::Bookmark;

pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

static FIELD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:[^"]|"")*"|[^",]+"#).expect("field pattern compiles"));

/// Records recovered from a CSV document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBatch {
    pub records: Vec<Bookmark>,
    /// Non-empty categories in first-seen order.
    pub categories: Vec<String>,
    /// Rows discarded because their id was missing, zero or not a number.
    pub dropped: usize,
}

pub fn export(bookmarks: &[Bookmark]) -> ShelfResult<Vec<u8>> {
    if bookmarks.is_empty() {
        return Err(ShelfError::EmptyExport);
    }
    let mut rows = Vec::with_capacity(bookmarks.len() + 1);
    rows.push(Bookmark::FIELD_NAMES.join(","));
    for bookmark in bookmarks {
        let row = bookmark
            .field_values()
            .iter()
            .map(|value| quote(value))
            .collect::<Vec<_>>()
            .join(",");
        rows.push(row);
    }
    let body = rows.join("\n");

    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + body.len());
    bytes.extend_from_slice(&UTF8_BOM);
    bytes.extend_from_slice(body.as_bytes());
    Ok(bytes)
}

pub fn parse(bytes: &[u8]) -> ShelfResult<ImportBatch> {
    let text = std::str::from_utf8(bytes)
        .map_err(|err| ShelfError::ImportParse(format!("input is not valid UTF-8: {err}")))?;
    parse_text(text)
}

pub fn parse_text(text: &str) -> ShelfResult<ImportBatch> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text).trim();
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    // A header without an `id` column is not an error: every row then lacks
    // an id and is dropped, so the import yields nothing.
    let header = lines.next().unwrap_or_default();
    let columns: Vec<String> = header.split(',').map(|cell| cell.replace('"', "")).collect();

    let mut batch = ImportBatch::default();
    let mut categories = IndexSet::new();
    for (offset, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let values = tokenize(line);
        if values.is_empty() {
            return Err(ShelfError::ImportParse(format!(
                "line {} has no readable fields",
                offset + 2
            )));
        }
        match build_record(&columns, values) {
            Some(record) => {
                if !record.category.is_empty() {
                    categories.insert(record.category.clone());
                }
                batch.records.push(record);
            }
            None => batch.dropped += 1,
        }
    }
    if batch.dropped > 0 {
        tracing::warn!(dropped = batch.dropped, "skipped CSV rows without a usable id");
    }
    batch.categories = categories.into_iter().collect();
    Ok(batch)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn tokenize(line: &str) -> Vec<String> {
    FIELD_PATTERN
        .find_iter(line)
        .map(|token| unquote(token.as_str()))
        .collect()
}

fn unquote(token: &str) -> String {
    let inner = token.strip_prefix('"').unwrap_or(token);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    inner.replace("\"\"", "\"")
}

fn build_record(columns: &[String], values: Vec<String>) -> Option<Bookmark> {
    let mut id = None;
    let mut record = Bookmark {
        id: 0,
        title: String::new(),
        url: String::new(),
        category: String::new(),
        memo: String::new(),
        date: String::new(),
    };
    for (column, value) in columns.iter().zip(values) {
        match column.as_str() {
            "id" => id = coerce_id(&value),
            "title" => record.title = value,
            "url" => record.url = value,
            "category" => record.category = value,
            "memo" => record.memo = value,
            "date" => record.date = value,
            _ => {}
        }
    }
    record.id = id?;
    Some(record)
}

/// Numeric coercion for the id column. Zero counts as missing.
fn coerce_id(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let id = match trimmed.parse::<i64>() {
        Ok(id) => id,
        Err(_) => {
            let float = trimmed.parse::<f64>().ok()?;
            if !float.is_finite() || float.fract() != 0.0 || float.abs() > i64::MAX as f64 {
                return None;
            }
            float as i64
        }
    };
    (id != 0).then_some(id)
}
