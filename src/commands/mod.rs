//! Command handlers for chatshelf
//!
//! Handlers take a built [`SessionLibrary`](crate::library::SessionLibrary),
//! run one operation, and print either a table or JSON. Batch handlers
//! return `false` when any item failed so the binary can exit non-zero.

use crate::batch::BatchReport;
use crate::error::Result;
use colored::Colorize;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

pub mod sessions;
pub mod trash;

/// Widest title shown in tables
const TABLE_TITLE_CHARS: usize = 48;

/// Prints a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shortens text for a table cell
pub(crate) fn table_cell(text: &str) -> String {
    if text.graphemes(true).count() > TABLE_TITLE_CHARS {
        let head: String = text.graphemes(true).take(TABLE_TITLE_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Prints a batch report and returns whether every item succeeded
///
/// `describe` renders one successful result for the human-readable form.
pub fn print_batch_report<T, F>(
    verb: &str,
    report: &BatchReport<T>,
    json: bool,
    describe: F,
) -> Result<bool>
where
    T: Serialize,
    F: Fn(&T) -> String,
{
    if json {
        print_json(report)?;
        return Ok(report.all_succeeded());
    }

    for success in &report.succeeded {
        println!("{} {} {}", "✓".green(), success.id.cyan(), describe(&success.result));
    }
    for failure in &report.failed {
        println!("{} {} {}", "✗".red(), failure.id.cyan(), failure.reason.red());
    }

    let summary = format!(
        "{} {} of {} requested, {} failed",
        verb, report.succeeded_count, report.requested, report.failed_count
    );
    if report.all_succeeded() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
    }
    Ok(report.all_succeeded())
}
