//! Statistics generation from the accumulation store
//!
//! This module provides functionality for extracting and displaying
//! store statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::ScoutError;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of stored items
    pub total_items: u64,

    /// Items whose page had an editions link
    pub with_editions: u64,

    pub bookchor_items: u64,
    pub bookish_santa_items: u64,
    pub shbi_items: u64,

    /// Items in stock at one source or more
    pub available_anywhere: u64,

    /// Number of recorded runs
    pub runs: u64,

    pub last_run: Option<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<StoreStatistics, ScoutError> {
    let (bookchor_items, bookish_santa_items, shbi_items) = storage.count_available_by_source()?;

    Ok(StoreStatistics {
        total_items: storage.count_items()?,
        with_editions: storage.count_items_with_editions()?,
        bookchor_items,
        bookish_santa_items,
        shbi_items,
        available_anywhere: storage.count_available_anywhere()?,
        runs: storage.count_runs()?,
        last_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Items stored: {}", stats.total_items);
    println!(
        "  With editions page: {} ({:.1}%)",
        stats.with_editions,
        percentage(stats.with_editions, stats.total_items)
    );
    println!("  Runs recorded: {}", stats.runs);
    println!();

    println!("Availability:");
    for (source, count) in [
        ("Bookchor", stats.bookchor_items),
        ("Bookish Santa", stats.bookish_santa_items),
        ("SHBI", stats.shbi_items),
    ] {
        println!(
            "  {}: {} ({:.1}%)",
            source,
            count,
            percentage(count, stats.total_items)
        );
    }
    println!(
        "  Any source: {} ({:.1}%)",
        stats.available_anywhere,
        percentage(stats.available_anywhere, stats.total_items)
    );
    println!();

    if let Some(run) = &stats.last_run {
        println!("Last Run:");
        println!("  ID: {}", run.id);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Status: {}", run.status.to_db_string());
        println!("  Resolved: {}, dropped: {}", run.resolved, run.dropped);
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
