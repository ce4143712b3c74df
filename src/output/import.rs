//! Manual record import
//!
//! Operators can hand-curate records (for example for a category page that
//! never loads) in a CSV file with the same columns as the record output.

use crate::state::Record;
use std::path::Path;
use thiserror::Error;

/// Columns every import file must carry
pub const REQUIRED_IMPORT_COLUMNS: [&str; 5] =
    ["year", "category", "title", "detail_url", "source_url"];

/// Errors that can occur while reading a manual-records file
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Manual records file is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid row at line {line}: {message}")]
    InvalidRow { line: u64, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads records from a manual-records CSV file
///
/// `poster` and `description` columns are optional and default to empty.
///
/// # Arguments
///
/// * `path` - Path to the CSV file
///
/// # Returns
///
/// * `Ok(Vec<Record>)` - Records in file order
/// * `Err(ImportError::MissingColumns)` - The header lacks required columns
///   (all of them are named)
/// * `Err(ImportError::InvalidRow)` - A row could not be interpreted
pub fn read_manual_records(path: &Path) -> Result<Vec<Record>, ImportError> {
    let reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_path(path)?;
    parse_manual_records(reader)
}

fn parse_manual_records<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Record>, ImportError> {
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = REQUIRED_IMPORT_COLUMNS
        .iter()
        .copied()
        .filter(|name| column(name).is_none())
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    // Presence checked above
    let year_idx = column("year").unwrap_or_default();
    let category_idx = column("category").unwrap_or_default();
    let title_idx = column("title").unwrap_or_default();
    let detail_idx = column("detail_url").unwrap_or_default();
    let source_idx = column("source_url").unwrap_or_default();
    let poster_idx = column("poster");
    let description_idx = column("description");

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let field = |idx: usize| row.get(idx).unwrap_or("").to_string();
        let optional = |idx: Option<usize>| idx.map(|i| field(i)).unwrap_or_default();

        let year_text = field(year_idx);
        let year = year_text.trim().parse::<i32>().map_err(|_| ImportError::InvalidRow {
            line,
            message: format!("year '{}' is not a number", year_text),
        })?;

        let title = field(title_idx);
        if title.trim().is_empty() {
            return Err(ImportError::InvalidRow {
                line,
                message: "title is empty".to_string(),
            });
        }

        records.push(Record {
            year,
            category: field(category_idx),
            title,
            detail_url: field(detail_idx),
            poster: optional(poster_idx),
            description: optional(description_idx),
            source_url: field(source_idx),
        });
    }

    Ok(records)
}
