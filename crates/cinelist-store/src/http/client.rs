use async_trait::async_trait;
use cinelist_config::ApiConfig;
use cinelist_models::{MovieId, SessionCredential, WatchlistEntry};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use crate::error::StoreError;
use crate::http::api;
use crate::traits::{AddOutcome, RemoveOutcome, WatchlistStore};

/// Create a reqwest Client with the configured timeout and user agent
pub fn create_http_client(config: &ApiConfig) -> anyhow::Result<Client> {
    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Watchlist store reached over the recommender API
#[derive(Clone)]
pub struct HttpWatchlistStore {
    client: Arc<Client>,
    base_url: String,
}

impl HttpWatchlistStore {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let client = create_http_client(config)?;
        info!(base_url = %config.base_url, timeout_secs = config.timeout_secs, "Using watchlist API");
        Ok(Self::new(client, config.base_url.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WatchlistStore for HttpWatchlistStore {
    fn store_name(&self) -> &str {
        "http"
    }

    async fn check_membership(
        &self,
        credential: &SessionCredential,
        movie_id: MovieId,
    ) -> Result<bool, StoreError> {
        api::check_membership(&self.client, &self.base_url, credential, movie_id).await
    }

    async fn add_membership(
        &self,
        credential: &SessionCredential,
        movie_id: MovieId,
        movie_title: &str,
    ) -> Result<AddOutcome, StoreError> {
        api::add_to_watchlist(&self.client, &self.base_url, credential, movie_id, movie_title).await
    }

    async fn remove_membership(
        &self,
        credential: &SessionCredential,
        movie_id: MovieId,
    ) -> Result<RemoveOutcome, StoreError> {
        api::remove_from_watchlist(&self.client, &self.base_url, credential, movie_id).await
    }

    async fn list_watchlist(
        &self,
        credential: &SessionCredential,
    ) -> Result<Vec<WatchlistEntry>, StoreError> {
        api::get_watchlist(&self.client, &self.base_url, credential).await
    }
}
