use crate::commands::session;
use crate::commands::ui::{self, PendingSpinner};
use crate::output::Output;
use cinelist_config::DisplayConfig;
use cinelist_models::WatchlistEntry;
use cinelist_store::StoreError;
use comfy_table::{Cell, Table};
use color_eyre::eyre::eyre;
use color_eyre::Result;

pub async fn run_list(output: &Output) -> Result<()> {
    let session = session::open()?;

    let spinner = PendingSpinner::start(output, "Loading watchlist...");
    let result = session.controller.load_watchlist().await;
    spinner.finish();

    let entries = result.map_err(|e| match e {
        StoreError::AuthMissing | StoreError::Unauthorized => {
            eyre!("{} Run `cinelist config token`.", e.user_message())
        }
        e => eyre!("Failed to load watchlist: {}", e.user_message()),
    })?;

    if !output.is_human() {
        output.data(&entries);
        return Ok(());
    }
    if entries.is_empty() {
        output.info("Your watchlist is empty");
        return Ok(());
    }
    if !output.is_quiet() {
        println!("{}", entries_table(&entries, &session.config.display));
    }
    output.info(format!("{} movie(s) in your watchlist", entries.len()));
    Ok(())
}

fn entries_table(entries: &[WatchlistEntry], display: &DisplayConfig) -> Table {
    let mut columns = vec!["ID", "Title"];
    if display.show_imdb_ids {
        columns.push("IMDb");
    }
    if display.show_added_date {
        columns.push("Added");
    }

    let mut table = ui::list_table(&columns);
    for entry in entries {
        let mut row = vec![Cell::new(entry.id), Cell::new(&entry.title)];
        if display.show_imdb_ids {
            row.push(Cell::new(entry.imdb_id.as_deref().unwrap_or("-")));
        }
        if display.show_added_date {
            let added = entry
                .added_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string());
            row.push(Cell::new(added));
        }
        table.add_row(row);
    }
    table
}
