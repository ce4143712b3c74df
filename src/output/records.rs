//! Record and failed-task report writers

use crate::config::OutputFormat;
use crate::state::{sort_records, Record};
use crate::HarvestError;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column order of the record file (and of the manual-records import)
pub const RECORD_COLUMNS: [&str; 7] = [
    "year",
    "category",
    "title",
    "detail_url",
    "poster",
    "description",
    "source_url",
];

/// Column order of the failed-task report
pub const FAILED_REPORT_COLUMNS: [&str; 2] = ["task_key", "error_message"];

fn create_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Writes records in their deterministic output order
///
/// The input slice is left untouched; a sorted copy is written.
///
/// # Arguments
///
/// * `path` - Destination file
/// * `records` - Records in any order
/// * `format` - CSV (with header) or a pretty-printed JSON array
pub fn write_records(path: &Path, records: &[Record], format: OutputFormat) -> Result<(), HarvestError> {
    let mut sorted = records.to_vec();
    sort_records(&mut sorted);
    create_parent_dir(path)?;

    match format {
        OutputFormat::Csv => {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(path)?;
            writer.write_record(RECORD_COLUMNS)?;
            for record in &sorted {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &sorted)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
    }

    tracing::debug!("Wrote {} records to {}", sorted.len(), path.display());
    Ok(())
}

/// Writes the failed-task report, sorted by task key
///
/// The header is written even when nothing failed, so a stale report from an
/// earlier run never survives a clean one.
pub fn write_failed_report(path: &Path, failed: &BTreeMap<String, String>) -> Result<(), HarvestError> {
    create_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(FAILED_REPORT_COLUMNS)?;
    for (key, error) in failed {
        writer.write_record([key.as_str(), error.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}
