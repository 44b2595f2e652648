use cinelist_config::{Config, CredentialStore, PathManager};
use cinelist_core::SyncController;
use cinelist_store::HttpWatchlistStore;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::sync::Arc;
use tracing::info;

/// Everything a watchlist command needs: resolved config plus a controller
/// wired to the HTTP store and the saved (or environment) credential.
pub struct Session {
    pub config: Config,
    pub controller: SyncController<HttpWatchlistStore>,
}

/// Config file merged with environment overrides, validated
pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    let mut config = Config::load_or_default(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    config.apply_env_overrides();
    config
        .validate()
        .map_err(|e| eyre!("Invalid configuration in {}: {}", config_file.display(), e))?;
    Ok(config)
}

pub fn load_credentials(paths: &PathManager) -> Result<CredentialStore> {
    let mut credentials = CredentialStore::new(paths.credentials_file());
    credentials
        .load()
        .map_err(|e| eyre!("Failed to load credentials: {}", e))?;
    Ok(credentials)
}

pub fn paths() -> Result<PathManager> {
    PathManager::new().map_err(|e| eyre!("Failed to resolve config paths: {}", e))
}

pub fn open() -> Result<Session> {
    let paths = paths()?;
    let config = load_config(&paths)?;
    let credential = load_credentials(&paths)?.session_credential();

    let store = HttpWatchlistStore::from_config(&config.api)
        .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    info!(
        base_url = store.base_url(),
        signed_in = credential.is_some(),
        "Opened watchlist session"
    );

    Ok(Session {
        config,
        controller: SyncController::new(Arc::new(store), credential),
    })
}
