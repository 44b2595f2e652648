use anyhow::Result;
use chrono::{DateTime, Utc};
use cinelist_models::SessionCredential;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variable that supplies the bearer token, ahead of the file
pub const TOKEN_ENV: &str = "CINELIST_TOKEN";

const API_TOKEN_KEY: &str = "api_token";
const API_TOKEN_SAVED_KEY: &str = "api_token_saved_at";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_api_token(&self) -> Option<&String> {
        self.get(API_TOKEN_KEY)
    }

    pub fn set_api_token(&mut self, token: String) {
        self.set(API_TOKEN_KEY.to_string(), token);
        self.set(API_TOKEN_SAVED_KEY.to_string(), Utc::now().to_rfc3339());
    }

    pub fn remove_api_token(&mut self) {
        self.remove(API_TOKEN_KEY);
        self.remove(API_TOKEN_SAVED_KEY);
    }

    pub fn get_api_token_saved_at(&self) -> Option<DateTime<Utc>> {
        self.get(API_TOKEN_SAVED_KEY)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Credential to hand to the controller: `CINELIST_TOKEN` wins over the file
    pub fn session_credential(&self) -> Option<SessionCredential> {
        std::env::var(TOKEN_ENV)
            .ok()
            .and_then(SessionCredential::new)
            .or_else(|| self.get_api_token().cloned().and_then(SessionCredential::new))
    }
}
