use async_trait::async_trait;
use cinelist_models::{MovieId, SessionCredential, WatchlistEntry};
use serde::Serialize;
use crate::error::StoreError;

/// Successful result of an add
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The store already had it; the caller sees the same end state
    AlreadyPresent,
}

/// Successful result of a remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Nothing to remove; a no-op success
    AlreadyAbsent,
}

/// The request kinds a store serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StoreOp {
    Check,
    Add,
    Remove,
    List,
}

/// Remote watchlist store, keyed by (credential, movie)
///
/// The store is the authority on membership. Implementations must not dedupe
/// or cache on the client side.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    fn store_name(&self) -> &str;

    async fn check_membership(
        &self,
        credential: &SessionCredential,
        movie_id: MovieId,
    ) -> Result<bool, StoreError>;

    async fn add_membership(
        &self,
        credential: &SessionCredential,
        movie_id: MovieId,
        movie_title: &str,
    ) -> Result<AddOutcome, StoreError>;

    async fn remove_membership(
        &self,
        credential: &SessionCredential,
        movie_id: MovieId,
    ) -> Result<RemoveOutcome, StoreError>;

    async fn list_watchlist(
        &self,
        credential: &SessionCredential,
    ) -> Result<Vec<WatchlistEntry>, StoreError>;
}
