use super::{print_batch_report, print_json, table_cell};
use crate::error::Result;
use crate::library::SessionLibrary;
use colored::Colorize;
use prettytable::{format, Table};

/// List trashed sessions
pub async fn list_trash(library: &SessionLibrary, json: bool) -> Result<()> {
    library.auto_cleanup().await;
    let items = library.list_trash().await?;

    if json {
        return print_json(&items);
    }

    if items.is_empty() {
        println!("{}", "Trash is empty.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "Trash ID".bold(),
        "Provider".bold(),
        "Title".bold(),
        "Deleted".bold(),
        "Expires".bold(),
        "Status".bold()
    ]);

    for item in &items {
        let status = if !item.payload_exists {
            "payload missing".red()
        } else if item.expired {
            "expired".yellow()
        } else {
            "restorable".green()
        };
        table.add_row(prettytable::row![
            item.meta.trash_id.cyan(),
            item.meta.provider,
            table_cell(&item.meta.title),
            item.meta.deleted_at.format("%Y-%m-%d %H:%M"),
            item.meta.expires_at.format("%Y-%m-%d %H:%M"),
            status
        ]);
    }

    table.printstd();
    println!("{} trashed session(s)", items.len());
    Ok(())
}

/// Restore trashed sessions; returns false if any failed
pub async fn restore(library: &SessionLibrary, ids: &[String], json: bool) -> Result<bool> {
    library.auto_cleanup().await;
    let report = library.restore(ids).await?;
    print_batch_report("Restored", &report, json, |outcome| {
        format!("-> {} {}", outcome.provider, outcome.restored_to)
    })
}

/// Purge trashed sessions; returns false if any failed
pub async fn purge(library: &SessionLibrary, ids: &[String], json: bool) -> Result<bool> {
    let report = library.purge(ids).await?;
    print_batch_report("Purged", &report, json, |_| String::new())
}

/// Purge expired trash; returns false if any expired slot could not be removed
pub async fn cleanup(library: &SessionLibrary, json: bool) -> Result<bool> {
    let report = library.cleanup().await?;

    if json {
        print_json(&report)?;
        return Ok(report.failed.is_empty());
    }

    if report.expired_candidates == 0 {
        println!("{}", "Nothing to clean up.".yellow());
        return Ok(true);
    }

    for failure in &report.failed {
        println!("{} {} {}", "✗".red(), failure.id.cyan(), failure.reason.red());
    }
    println!(
        "{}",
        format!(
            "Purged {} of {} expired trash item(s)",
            report.succeeded.len(),
            report.expired_candidates
        )
        .green()
    );
    Ok(report.failed.is_empty())
}
