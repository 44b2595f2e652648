//! Synchronization controller
//!
//! Owns every mounted item plus the session credential, talks to the store and
//! feeds store answers back through each item's state machine. The item lock
//! is never held across a store call.

use cinelist_models::{MovieId, MovieRef, SessionCredential, WatchlistEntry};
use cinelist_store::{AddOutcome, RemoveOutcome, StoreError, WatchlistStore};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use crate::item::{Change, ItemMachine, ItemSnapshot, Notice, Request, Resolution, Ticket, ToggleRefused};
use crate::state::MembershipState;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Published whenever an item changes state or gains a notice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateChange {
    pub movie_id: MovieId,
    pub title: String,
    pub from: MembershipState,
    pub to: MembershipState,
    pub notice: Option<Notice>,
}

struct Inner {
    credential: Option<SessionCredential>,
    items: HashMap<MovieId, ItemMachine>,
}

impl Inner {
    fn signed_in(&self) -> bool {
        self.credential.is_some()
    }
}

/// Work decided under the lock and carried out after it is released
struct Dispatch {
    movie: MovieRef,
    ticket: Ticket,
    credential: SessionCredential,
}

pub struct SyncController<S: WatchlistStore> {
    store: Arc<S>,
    inner: Mutex<Inner>,
    next_seq: AtomicU64,
    changes: broadcast::Sender<StateChange>,
}

impl<S: WatchlistStore> SyncController<S> {
    pub fn new(store: Arc<S>, credential: Option<SessionCredential>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            store,
            inner: Mutex::new(Inner {
                credential,
                items: HashMap::new(),
            }),
            next_seq: AtomicU64::new(1),
            changes,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    fn seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    fn publish(&self, item: &ItemMachine, change: Change, notice_before: Option<&Notice>) {
        if change.from == change.to && item.notice() == notice_before {
            return;
        }
        debug!(
            movie_id = %item.movie().movie_id,
            from = ?change.from,
            to = ?change.to,
            "Membership state changed"
        );
        // No subscribers is fine
        let _ = self.changes.send(StateChange {
            movie_id: item.movie().movie_id,
            title: item.movie().title.clone(),
            from: change.from,
            to: change.to,
            notice: item.notice().cloned(),
        });
    }

    pub async fn is_signed_in(&self) -> bool {
        self.inner.lock().await.signed_in()
    }

    pub async fn snapshot(&self, movie_id: MovieId) -> Option<ItemSnapshot> {
        let inner = self.inner.lock().await;
        let signed_in = inner.signed_in();
        inner.items.get(&movie_id).map(|item| item.snapshot(signed_in))
    }

    /// Snapshots of every mounted item, ordered by movie id
    pub async fn snapshots(&self) -> Vec<ItemSnapshot> {
        let inner = self.inner.lock().await;
        let signed_in = inner.signed_in();
        let mut snapshots: Vec<ItemSnapshot> = inner
            .items
            .values()
            .map(|item| item.snapshot(signed_in))
            .collect();
        snapshots.sort_by_key(|s| s.movie_id);
        snapshots
    }

    /// Render a movie: create its state and run the initial check.
    /// `None` if the item was unmounted before the check came back.
    pub async fn mount(&self, movie: MovieRef) -> Option<ItemSnapshot> {
        let movie_id = movie.movie_id;
        let dispatch = {
            let mut inner = self.inner.lock().await;
            let signed_in = inner.signed_in();
            let credential = inner.credential.clone();
            let seq = self.seq();
            let item = inner
                .items
                .entry(movie_id)
                .or_insert_with(|| ItemMachine::new(movie));
            let from = item.state();
            let ticket = item.mount(signed_in, seq);
            self.publish(item, Change { from, to: item.state() }, None);

            match (ticket, credential) {
                (Some(ticket), Some(credential)) => Some(Dispatch {
                    movie: item.movie().clone(),
                    ticket,
                    credential,
                }),
                _ => None,
            }
        };

        if let Some(dispatch) = dispatch {
            self.execute(dispatch).await;
        }
        self.snapshot(movie_id).await
    }

    /// Mount several movies; their checks run concurrently. Repeated ids
    /// are mounted once, first occurrence first.
    pub async fn mount_all(&self, mut movies: Vec<MovieRef>) -> Vec<ItemSnapshot> {
        let mut seen = HashSet::new();
        movies.retain(|movie| seen.insert(movie.movie_id));
        join_all(movies.into_iter().map(|movie| self.mount(movie)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Drop an item that left the rendered set; late responses for it are discarded
    pub async fn unmount(&self, movie_id: MovieId) -> bool {
        self.inner.lock().await.items.remove(&movie_id).is_some()
    }

    /// User toggle: remove if present, add if absent. Refused (without any
    /// request) while another request for the item is in flight.
    pub async fn toggle(&self, movie_id: MovieId) -> Result<ItemSnapshot, ToggleRefused> {
        let dispatch = {
            let mut inner = self.inner.lock().await;
            let credential = inner.credential.clone();
            let seq = self.seq();
            let item = inner.items.get_mut(&movie_id).ok_or(ToggleRefused::NotMounted)?;
            let from = item.state();
            let notice_before = item.notice().cloned();

            let ticket = match item.toggle(credential.is_some(), seq) {
                Ok(ticket) => ticket,
                Err(refused) => {
                    debug!(%movie_id, state = ?from, reason = %refused, "Toggle refused");
                    return Err(refused);
                }
            };
            self.publish(item, Change { from, to: item.state() }, notice_before.as_ref());

            Dispatch {
                movie: item.movie().clone(),
                ticket,
                credential: credential.ok_or(ToggleRefused::SignedOut)?,
            }
        };

        info!(%movie_id, request = ?dispatch.ticket.request, seq = dispatch.ticket.seq, "Toggling watchlist membership");
        self.execute(dispatch).await;
        self.snapshot(movie_id).await.ok_or(ToggleRefused::NotMounted)
    }

    /// Revalidate a settled item in the background of the user's view.
    /// Returns `None` when nothing was issued.
    pub async fn refresh(&self, movie_id: MovieId) -> Option<ItemSnapshot> {
        let dispatch = {
            let mut inner = self.inner.lock().await;
            let credential = inner.credential.clone()?;
            let seq = self.seq();
            let item = inner.items.get_mut(&movie_id)?;
            let ticket = item.refresh(true, seq)?;
            Dispatch {
                movie: item.movie().clone(),
                ticket,
                credential,
            }
        };
        self.execute(dispatch).await;
        self.snapshot(movie_id).await
    }

    /// Replace the process-wide credential
    ///
    /// Removing or swapping it downgrades every item to `Absent` and
    /// invalidates every outstanding request. A new credential then triggers
    /// a silent refresh of all settled items.
    pub async fn set_credential(&self, credential: Option<SessionCredential>) {
        match credential {
            None => {
                let mut inner = self.inner.lock().await;
                self.revoke_session(&mut inner);
            }
            Some(credential) => {
                let dispatches: Vec<Dispatch> = {
                    let mut inner = self.inner.lock().await;
                    // Requests issued under a different credential must not land
                    if inner.credential.as_ref().is_some_and(|current| *current != credential) {
                        self.revoke_session(&mut inner);
                    }
                    inner.credential = Some(credential.clone());
                    info!(items = inner.items.len(), "Credential updated; refreshing mounted items");
                    let mut dispatches = Vec::new();
                    for item in inner.items.values_mut() {
                        if let Some(ticket) = item.refresh(true, self.seq()) {
                            dispatches.push(Dispatch {
                                movie: item.movie().clone(),
                                ticket,
                                credential: credential.clone(),
                            });
                        }
                    }
                    dispatches
                };
                join_all(dispatches.into_iter().map(|d| self.execute(d))).await;
            }
        }
    }

    /// Fetch the whole watchlist and reconcile settled items with it
    pub async fn load_watchlist(&self) -> Result<Vec<WatchlistEntry>, StoreError> {
        let (credential, as_of) = {
            let inner = self.inner.lock().await;
            let credential = inner.credential.clone().ok_or(StoreError::AuthMissing)?;
            (credential, self.seq())
        };

        let entries = match self.store.list_watchlist(&credential).await {
            Ok(entries) => entries,
            Err(StoreError::Unauthorized) => {
                let mut inner = self.inner.lock().await;
                if inner.credential.as_ref() == Some(&credential) {
                    self.revoke_session(&mut inner);
                }
                return Err(StoreError::Unauthorized);
            }
            Err(e) => {
                warn!(error = %e, "Failed to load watchlist");
                return Err(e);
            }
        };

        let members: HashSet<MovieId> = entries.iter().map(|e| e.id).collect();
        let mut inner = self.inner.lock().await;
        if inner.credential.as_ref() != Some(&credential) {
            debug!("Credential changed while listing; skipping reconciliation");
            return Ok(entries);
        }
        for item in inner.items.values_mut() {
            let notice_before = item.notice().cloned();
            let is_member = members.contains(&item.movie().movie_id);
            if let Some(change) = item.reconcile(is_member, as_of) {
                self.publish(item, change, notice_before.as_ref());
            }
        }
        Ok(entries)
    }

    fn revoke_session(&self, inner: &mut Inner) {
        if inner.credential.take().is_some() {
            warn!(items = inner.items.len(), "Session credential revoked; watchlist controls disabled");
        }
        for item in inner.items.values_mut() {
            let notice_before = item.notice().cloned();
            if let Some(change) = item.revoke() {
                self.publish(item, change, notice_before.as_ref());
            }
        }
    }

    /// Run one store request and apply its response
    async fn execute(&self, dispatch: Dispatch) {
        let Dispatch { movie, ticket, credential } = dispatch;
        let movie_id = movie.movie_id;

        enum Answer {
            Check(Result<bool, StoreError>),
            Add(Result<AddOutcome, StoreError>),
            Remove(Result<RemoveOutcome, StoreError>),
        }

        let answer = match ticket.request {
            Request::Check | Request::Refresh => {
                Answer::Check(self.store.check_membership(&credential, movie_id).await)
            }
            Request::Add => {
                Answer::Add(self.store.add_membership(&credential, movie_id, &movie.title).await)
            }
            Request::Remove => {
                Answer::Remove(self.store.remove_membership(&credential, movie_id).await)
            }
        };

        let mut inner = self.inner.lock().await;
        let Some(item) = inner.items.get_mut(&movie_id) else {
            debug!(%movie_id, seq = ticket.seq, "Discarding response for unmounted item");
            return;
        };

        let notice_before = item.notice().cloned();
        let resolution = match answer {
            Answer::Check(result) => item.resolve_check(ticket, result),
            Answer::Add(result) => item.resolve_add(ticket, result),
            Answer::Remove(result) => item.resolve_remove(ticket, result),
        };

        match resolution {
            Resolution::Stale => {}
            Resolution::Applied(change) => self.publish(item, change, notice_before.as_ref()),
            Resolution::SessionExpired => {
                warn!(%movie_id, "Store rejected the session credential");
                self.revoke_session(&mut inner);
            }
        }
    }
}

#[cfg(test)]
mod tests;
