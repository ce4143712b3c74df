//! Output module for run artifacts and reports
//!
//! This module handles:
//! - Writing the record file (CSV or JSON)
//! - Writing the failed-task report
//! - Importing hand-curated records
//! - Summarizing a checkpoint for display

mod import;
mod records;
pub mod stats;

pub use import::{read_manual_records, ImportError, REQUIRED_IMPORT_COLUMNS};
pub use records::{write_failed_report, write_records, FAILED_REPORT_COLUMNS, RECORD_COLUMNS};
pub use stats::{print_statistics, CheckpointStatistics};
