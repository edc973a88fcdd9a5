//! Output module for reports and statistics
//!
//! This module handles:
//! - Writing the CSV availability report
//! - Printing accumulation store statistics

pub mod report;
pub mod stats;

pub use report::{write_report, write_rows, REPORT_HEADER};
pub use stats::{load_statistics, print_statistics, StoreStatistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
