use anyhow::Result;
use std::path::PathBuf;

/// Overrides the platform config directory as the base for every file
const BASE_PATH_ENV: &str = "CINELIST_BASE_PATH";

pub struct PathManager {
    config_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    /// `CINELIST_BASE_PATH` if set, otherwise `<platform config dir>/cinelist`
    pub fn new() -> Result<Self> {
        let explicit = std::env::var(BASE_PATH_ENV).ok().filter(|p| !p.trim().is_empty());
        Ok(Self::with_base(resolve_base(explicit)?))
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self {
            log_dir: base.join("logs"),
            config_dir: base,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    /// Used when `--log-file` is given without a path
    pub fn default_log_file(&self) -> PathBuf {
        self.log_dir.join("cinelist.log")
    }
}

fn resolve_base(explicit: Option<String>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("cinelist")),
    }
}
