//! CSV report generation
//!
//! One row per stored item, sorted by name. List columns are comma-joined
//! inside a single quoted field.

use crate::item::BookRecord;
use crate::output::OutputResult;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Report column headers, in order
pub const REPORT_HEADER: [&str; 9] = [
    "Book Name",
    "URL",
    "Editions URL",
    "ISBNs",
    "Bookchor ISBNs",
    "Bookish Santa",
    "SHBI",
    "Author",
    "Series",
];

/// Writes the report to `output_path`
///
/// Writes to a sibling temporary file, then renames it into place.
pub fn write_report<'a, I>(records: I, output_path: &Path) -> OutputResult<usize>
where
    I: IntoIterator<Item = &'a BookRecord>,
{
    let tmp_path = output_path.with_extension("csv.tmp");

    let file = fs::File::create(&tmp_path)?;
    let rows = write_rows(records, file)?;
    fs::rename(&tmp_path, output_path)?;

    tracing::info!("Wrote {} rows to {}", rows, output_path.display());
    Ok(rows)
}

/// Writes header and rows to any writer, returning the row count
pub fn write_rows<'a, I, W>(records: I, writer: W) -> OutputResult<usize>
where
    I: IntoIterator<Item = &'a BookRecord>,
    W: Write,
{
    let mut records: Vec<&BookRecord> = records.into_iter().collect();
    records.sort_by(|a, b| a.name.cmp(&b.name));

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(REPORT_HEADER)?;

    for record in &records {
        let identifiers: Vec<&str> = record.identifiers.iter().map(String::as_str).collect();
        let identifiers = identifiers.join(",");
        let bookchor = record.availability.bookchor.join(",");
        wtr.write_record([
            record.name.as_str(),
            record.url.as_str(),
            record.editions_url.as_deref().unwrap_or(""),
            identifiers.as_str(),
            bookchor.as_str(),
            bool_cell(record.availability.bookish_santa),
            bool_cell(record.availability.shbi),
            record.author.as_deref().unwrap_or(""),
            record.series.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(records.len())
}

fn bool_cell(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
