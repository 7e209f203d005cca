use super::{print_batch_report, print_json, table_cell};
use crate::error::Result;
use crate::library::SessionLibrary;
use crate::providers::{Provider, SessionState};
use colored::Colorize;
use prettytable::{format, Table};

/// List sessions of one state (or both), optionally for one provider
///
/// Counts always cover both states so the archived total stays visible.
pub async fn list_sessions(
    library: &SessionLibrary,
    provider: Option<Provider>,
    state: Option<SessionState>,
    json: bool,
) -> Result<()> {
    let mut listing = match provider {
        Some(provider) => library.list_provider(provider).await?,
        None => library.list_all().await?,
    };
    if let Some(state) = state {
        listing.items.retain(|item| item.state == state);
    }

    if json {
        return print_json(&listing);
    }

    if listing.items.is_empty() {
        println!("{}", "No sessions found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "ID".bold(),
        "Provider".bold(),
        "State".bold(),
        "Title".bold(),
        "Updated".bold()
    ]);

    for item in &listing.items {
        let state = match item.state {
            SessionState::Active => item.state.to_string().green(),
            SessionState::Archived => item.state.to_string().blue(),
        };
        table.add_row(prettytable::row![
            item.item_id.cyan(),
            item.provider,
            state,
            table_cell(&item.title),
            item.updated_at.format("%Y-%m-%d %H:%M")
        ]);
    }

    table.printstd();
    println!(
        "{} active, {} archived, {} total",
        listing.counts.active, listing.counts.archived, listing.counts.total
    );
    Ok(())
}

/// Archive sessions; returns false if any failed
pub async fn archive(library: &SessionLibrary, ids: &[String], json: bool) -> Result<bool> {
    let report = library.archive(ids).await?;
    print_batch_report("Archived", &report, json, |outcome| {
        format!("-> {}", outcome.item_id)
    })
}

/// Unarchive sessions; returns false if any failed
pub async fn unarchive(library: &SessionLibrary, ids: &[String], json: bool) -> Result<bool> {
    let report = library.unarchive(ids).await?;
    print_batch_report("Unarchived", &report, json, |outcome| {
        format!("-> {}", outcome.item_id)
    })
}

/// Move sessions to the trash; returns false if any failed
pub async fn trash(library: &SessionLibrary, ids: &[String], json: bool) -> Result<bool> {
    library.auto_cleanup().await;
    let report = library.trash(ids).await?;
    print_batch_report("Trashed", &report, json, |item| {
        format!(
            "-> trash {} (expires {})",
            item.meta.trash_id,
            item.meta.expires_at.format("%Y-%m-%d")
        )
    })
}
