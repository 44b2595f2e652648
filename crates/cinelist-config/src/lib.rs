pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{ApiConfig, Config, DisplayConfig, API_URL_ENV, DEFAULT_API_URL};
pub use credentials::{CredentialStore, TOKEN_ENV};
pub use paths::PathManager;
