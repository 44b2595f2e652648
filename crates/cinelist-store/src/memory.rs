//! In-process watchlist store
//!
//! Behaves like the HTTP store (catalog misses, 409-style duplicates, token
//! rejection) and additionally records every call and lets a caller inject
//! failures or hold a response until released. Holding is what makes request
//! ordering reproducible in tests: the result is computed when the call
//! arrives and only delivered once the gate opens.

use async_trait::async_trait;
use chrono::Utc;
use cinelist_models::{MovieId, MovieRef, SessionCredential, WatchlistEntry};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tokio::sync::{oneshot, Mutex};
use tracing::debug;
use crate::error::StoreError;
use crate::traits::{AddOutcome, RemoveOutcome, StoreOp, WatchlistStore};

/// One request as the store received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub movie_id: Option<MovieId>,
}

#[derive(Default)]
struct MemoryState {
    catalog: HashMap<MovieId, String>,
    members: BTreeMap<MovieId, WatchlistEntry>,
    /// `None` accepts any credential
    accepted_tokens: Option<HashSet<String>>,
    calls: Vec<StoreCall>,
    failures: HashMap<StoreOp, VecDeque<StoreError>>,
    gates: HashMap<StoreOp, VecDeque<oneshot::Receiver<()>>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn with_catalog(movies: impl IntoIterator<Item = MovieRef>) -> Self {
        let catalog = movies
            .into_iter()
            .map(|m| (m.movie_id, m.title))
            .collect();
        Self {
            state: Mutex::new(MemoryState {
                catalog,
                ..MemoryState::default()
            }),
        }
    }

    /// Put a catalog movie on the watchlist without going through a request
    pub async fn seed_member(&self, movie_id: MovieId) {
        let mut state = self.state.lock().await;
        let title = state
            .catalog
            .get(&movie_id)
            .cloned()
            .unwrap_or_else(|| format!("#{}", movie_id));
        state.members.insert(movie_id, entry(movie_id, title));
    }

    /// Only this token is accepted from now on; others get `Unauthorized`
    pub async fn accept_only(&self, token: &str) {
        let mut state = self.state.lock().await;
        state.accepted_tokens = Some(HashSet::from([token.to_string()]));
    }

    /// Reject every credential, as if all sessions expired
    pub async fn revoke_all_tokens(&self) {
        self.state.lock().await.accepted_tokens = Some(HashSet::new());
    }

    /// The next request of `op` fails with `error` instead of being served
    pub async fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.state
            .lock()
            .await
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Hold the response of the next request of `op` until the returned
    /// sender fires (or is dropped)
    pub async fn hold_next(&self, op: StoreOp) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().await.gates.entry(op).or_default().push_back(rx);
        tx
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, op: StoreOp) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    pub async fn is_member(&self, movie_id: MovieId) -> bool {
        self.state.lock().await.members.contains_key(&movie_id)
    }

    async fn serve<T>(
        &self,
        op: StoreOp,
        movie_id: Option<MovieId>,
        credential: &SessionCredential,
        handler: impl FnOnce(&mut MemoryState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let (result, gate) = {
            let mut state = self.state.lock().await;
            state.calls.push(StoreCall { op, movie_id });

            let authorized = state
                .accepted_tokens
                .as_ref()
                .map(|tokens| tokens.contains(credential.bearer_token()))
                .unwrap_or(true);

            let injected = state.failures.get_mut(&op).and_then(|q| q.pop_front());
            let result = if !authorized {
                Err(StoreError::Unauthorized)
            } else if let Some(error) = injected {
                Err(error)
            } else {
                handler(&mut state)
            };

            let gate = state.gates.get_mut(&op).and_then(|q| q.pop_front());
            (result, gate)
        };

        if let Some(gate) = gate {
            debug!(?op, ?movie_id, "Holding store response");
            // A dropped sender releases the response too
            let _ = gate.await;
        }
        result
    }
}

fn entry(movie_id: MovieId, title: String) -> WatchlistEntry {
    WatchlistEntry {
        id: movie_id,
        title,
        imdb_id: None,
        added_date: Some(Utc::now().naive_utc()),
    }
}

#[async_trait]
impl WatchlistStore for InMemoryStore {
    fn store_name(&self) -> &str {
        "memory"
    }

    async fn check_membership(
        &self,
        credential: &SessionCredential,
        movie_id: MovieId,
    ) -> Result<bool, StoreError> {
        self.serve(StoreOp::Check, Some(movie_id), credential, |state| {
            if !state.catalog.contains_key(&movie_id) {
                return Err(StoreError::NotFound);
            }
            Ok(state.members.contains_key(&movie_id))
        })
        .await
    }

    async fn add_membership(
        &self,
        credential: &SessionCredential,
        movie_id: MovieId,
        movie_title: &str,
    ) -> Result<AddOutcome, StoreError> {
        self.serve(StoreOp::Add, Some(movie_id), credential, |state| {
            let title = match state.catalog.get(&movie_id) {
                Some(title) => title.clone(),
                None => return Err(StoreError::NotFound),
            };
            if state.members.contains_key(&movie_id) {
                return Ok(AddOutcome::AlreadyPresent);
            }
            let title = if title.is_empty() { movie_title.to_string() } else { title };
            state.members.insert(movie_id, entry(movie_id, title));
            Ok(AddOutcome::Added)
        })
        .await
    }

    async fn remove_membership(
        &self,
        credential: &SessionCredential,
        movie_id: MovieId,
    ) -> Result<RemoveOutcome, StoreError> {
        self.serve(StoreOp::Remove, Some(movie_id), credential, |state| {
            match state.members.remove(&movie_id) {
                Some(_) => Ok(RemoveOutcome::Removed),
                None => Ok(RemoveOutcome::AlreadyAbsent),
            }
        })
        .await
    }

    async fn list_watchlist(
        &self,
        credential: &SessionCredential,
    ) -> Result<Vec<WatchlistEntry>, StoreError> {
        self.serve(StoreOp::List, None, credential, |state| {
            Ok(state.members.values().cloned().collect())
        })
        .await
    }
}
