use crate::commands::session::{self, Session};
use crate::commands::ui::{self, PendingSpinner};
use crate::output::Output;
use cinelist_core::{ItemSnapshot, MembershipState, NoticeKind, SyncController, ToggleRefused};
use cinelist_models::{Membership, MovieId, MovieRef};
use cinelist_store::WatchlistStore;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing::debug;

const SIGN_IN_HINT: &str = "run `cinelist config token` to sign in";

fn movie_ref(id: MovieId, title: Option<String>) -> MovieRef {
    match title {
        Some(title) if !title.trim().is_empty() => MovieRef::new(id, title.trim()),
        _ => MovieRef::untitled(id),
    }
}

async fn warn_if_signed_out(session: &Session, output: &Output) {
    if !session.controller.is_signed_in().await {
        output.warn(format!("Not signed in; {}", SIGN_IN_HINT));
    }
}

/// Mount one movie and wait for its initial check
pub async fn mount_one<S: WatchlistStore>(
    controller: &SyncController<S>,
    movie: MovieRef,
    output: &Output,
) -> Result<ItemSnapshot> {
    let movie_id = movie.movie_id;
    let spinner = PendingSpinner::start(output, format!("Checking {}...", movie.title));
    let snapshot = controller.mount(movie).await;
    spinner.finish();
    snapshot.ok_or_else(|| eyre!("Movie {} was dropped before its check completed", movie_id))
}

fn refusal_message(snapshot: &ItemSnapshot, refused: ToggleRefused) -> String {
    match refused {
        ToggleRefused::SignedOut => format!("{}: {}; {}", snapshot.title, refused, SIGN_IN_HINT),
        _ => format!("{}: {}", snapshot.title, refused),
    }
}

/// Toggle a mounted, settled item and report how it settled. An error is
/// returned when the store rejected the change.
pub async fn apply_toggle<S: WatchlistStore>(
    controller: &SyncController<S>,
    before: &ItemSnapshot,
    output: &Output,
) -> Result<ItemSnapshot> {
    let action = match before.state {
        MembershipState::Present => "Removing",
        _ => "Adding",
    };
    let spinner = PendingSpinner::start(output, format!("{} {}...", action, before.title));
    let result = controller.toggle(before.movie_id).await;
    spinner.finish();

    let after = result.map_err(|refused| eyre!(refusal_message(before, refused)))?;
    debug!(movie_id = %after.movie_id, from = ?before.state, to = ?after.state, "Toggle settled");

    if let Some(notice) = &after.notice {
        return Err(eyre!("{}: {}", after.title, notice.message));
    }
    match after.state {
        MembershipState::Present => output.success(format!("{} added to your watchlist", after.title)),
        MembershipState::Absent => output.success(format!("{} removed from your watchlist", after.title)),
        state => output.info(format!("{}: {}", after.title, state)),
    }
    output.data(&after);
    Ok(after)
}

pub async fn run_check(ids: Vec<MovieId>, output: &Output) -> Result<()> {
    let session = session::open()?;
    warn_if_signed_out(&session, output).await;

    let spinner = PendingSpinner::start(output, format!("Checking {} movie(s)...", ids.len()));
    let snapshots = session
        .controller
        .mount_all(ids.into_iter().map(MovieRef::untitled).collect())
        .await;
    spinner.finish();

    ui::render_snapshots(output, &snapshots);
    Ok(())
}

pub async fn run_toggle(id: MovieId, title: Option<String>, output: &Output) -> Result<()> {
    let session = session::open()?;
    let before = mount_one(&session.controller, movie_ref(id, title), output).await?;
    apply_toggle(&session.controller, &before, output).await?;
    Ok(())
}

/// `add` and `remove`: toggle only when the movie is not already where the
/// user wants it
pub async fn run_set(id: MovieId, title: Option<String>, target: Membership, output: &Output) -> Result<()> {
    let session = session::open()?;
    set_membership(&session.controller, movie_ref(id, title), target, output).await?;
    Ok(())
}

pub async fn set_membership<S: WatchlistStore>(
    controller: &SyncController<S>,
    movie: MovieRef,
    target: Membership,
    output: &Output,
) -> Result<ItemSnapshot> {
    let before = mount_one(controller, movie, output).await?;

    if before.state.is_terminal() {
        let reason = before
            .notice
            .as_ref()
            .map(|n| n.message.clone())
            .unwrap_or_else(|| ToggleRefused::CatalogMiss.to_string());
        return Err(eyre!("{}: {}", before.title, reason));
    }
    if !before.can_toggle {
        return Err(eyre!(refusal_message(&before, ToggleRefused::SignedOut)));
    }
    // A failed check settles on Absent, which says nothing about the store
    if let Some(notice) = before.notice.as_ref().filter(|n| n.kind == NoticeKind::Transient) {
        return Err(eyre!("{}: {}", before.title, notice.message));
    }

    if before.membership == target {
        match target {
            Membership::Present => output.info(format!("{} is already in your watchlist", before.title)),
            _ => output.info(format!("{} is not in your watchlist", before.title)),
        }
        output.data(&before);
        return Ok(before);
    }

    apply_toggle(controller, &before, output).await
}
