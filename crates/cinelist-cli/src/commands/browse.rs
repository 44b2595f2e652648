use crate::commands::membership;
use crate::commands::session;
use crate::commands::ui::{self, PendingSpinner};
use crate::output::Output;
use cinelist_core::{NoticeKind, StateChange};
use cinelist_models::{MovieId, MovieRef};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use dialoguer::Select;
use std::collections::HashMap;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info};

enum MenuChoice {
    Toggle(usize),
    Refresh,
    Quit,
}

fn choice_for(selection: Option<usize>, item_count: usize) -> MenuChoice {
    match selection {
        Some(i) if i < item_count => MenuChoice::Toggle(i),
        Some(i) if i == item_count => MenuChoice::Refresh,
        _ => MenuChoice::Quit,
    }
}

/// Print what changed since the last render. Notices are surfaced; plain
/// transitions only go to the log.
fn drain_changes(changes: &mut broadcast::Receiver<StateChange>, output: &Output) {
    loop {
        match changes.try_recv() {
            Ok(change) => {
                debug!(movie_id = %change.movie_id, from = ?change.from, to = ?change.to, "Item changed");
                if let Some(notice) = &change.notice {
                    if notice.kind == NoticeKind::SignedOut && change.from != change.to {
                        output.warn(format!("{}: {}", change.title, notice.message));
                    }
                }
            }
            Err(TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "State change feed lagged");
            }
            Err(_) => break,
        }
    }
}

pub async fn run_browse(ids: Vec<MovieId>, output: &Output) -> Result<()> {
    if !ui::is_interactive() {
        return Err(eyre!("browse needs an interactive terminal; use `check` and `toggle` instead"));
    }
    let session = session::open()?;
    let controller = &session.controller;
    let mut changes = controller.subscribe();

    // Known titles make the menu readable; a failed listing only costs that
    let mut titles: HashMap<MovieId, String> = HashMap::new();
    if controller.is_signed_in().await {
        let spinner = PendingSpinner::start(output, "Loading watchlist...");
        let listing = controller.load_watchlist().await;
        spinner.finish();
        match listing {
            Ok(entries) => titles.extend(entries.into_iter().map(|e| (e.id, e.title))),
            Err(e) => output.warn(e.user_message()),
        }
    } else {
        output.warn("Not signed in; run `cinelist config token` to manage your watchlist");
    }

    let movies: Vec<MovieRef> = ids
        .into_iter()
        .map(|id| match titles.remove(&id) {
            Some(title) => MovieRef::new(id, title),
            None => MovieRef::untitled(id),
        })
        .collect();

    let spinner = PendingSpinner::start(output, format!("Checking {} movie(s)...", movies.len()));
    controller.mount_all(movies).await;
    spinner.finish();

    loop {
        drain_changes(&mut changes, output);
        let snapshots = controller.snapshots().await;

        let mut labels: Vec<String> = snapshots.iter().map(ui::menu_label).collect();
        labels.push("Refresh".to_string());
        labels.push("Quit".to_string());

        let selection = Select::new()
            .with_prompt("Select a movie to add or remove")
            .items(&labels)
            .default(0)
            .interact_opt()
            .map_err(|e| eyre!("Failed to read selection: {}", e))?;

        match choice_for(selection, snapshots.len()) {
            MenuChoice::Quit => break,
            MenuChoice::Refresh => {
                let spinner = PendingSpinner::start(output, "Refreshing...");
                for snapshot in &snapshots {
                    controller.refresh(snapshot.movie_id).await;
                }
                spinner.finish();
            }
            MenuChoice::Toggle(index) => {
                let snapshot = &snapshots[index];
                if !snapshot.can_toggle {
                    let reason = snapshot
                        .notice
                        .as_ref()
                        .map(|n| n.message.clone())
                        .unwrap_or_else(|| format!("{} is busy", snapshot.title));
                    output.warn(reason);
                    continue;
                }
                if let Err(e) = membership::apply_toggle(controller, snapshot, output).await {
                    output.error(e.to_string());
                }
            }
        }
    }

    info!("Browse session ended");
    Ok(())
}
