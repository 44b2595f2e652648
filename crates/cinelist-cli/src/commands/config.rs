use crate::commands::prompts::{prompt_number, prompt_password, prompt_string, prompt_yes_no};
use crate::commands::session::{self, load_config, load_credentials};
use crate::commands::ui::{self, mask_secret};
use crate::output::Output;
use crate::ConfigCommands;
use cinelist_config::{Config, PathManager, API_URL_ENV, TOKEN_ENV};
use cinelist_core::SyncController;
use cinelist_models::SessionCredential;
use cinelist_store::{HttpWatchlistStore, StoreError};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color};
use owo_colors::OwoColorize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    let paths = session::paths()?;
    match cmd {
        ConfigCommands::Show { full } => show(&paths, full, output),
        ConfigCommands::Api { url, timeout } => configure_api(&paths, url, timeout, output),
        ConfigCommands::Token { token } => configure_token(&paths, token, output).await,
        ConfigCommands::Logout => logout(&paths, output),
    }
}

/// The file as written, without environment overrides, so saving does not
/// persist a value that came from the environment
fn load_file_config(paths: &PathManager) -> Result<Config> {
    Config::load_or_default(&paths.config_file())
        .map_err(|e| eyre!("Failed to load config: {}", e))
}

fn show(paths: &PathManager, full: bool, output: &Output) -> Result<()> {
    let config = load_config(paths)?;
    let credentials = load_credentials(paths)?;

    let env_token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty());
    let (token, token_source) = match (&env_token, credentials.get_api_token()) {
        (Some(token), _) => (Some(token.clone()), Some(TOKEN_ENV.to_string())),
        (None, Some(token)) => (Some(token.clone()), Some("credentials file".to_string())),
        (None, None) => (None, None),
    };
    let token_display = match &token {
        Some(token) if full => token.clone(),
        Some(token) => mask_secret(token),
        None => "<not set>".to_string(),
    };
    let saved_at = credentials.get_api_token_saved_at();
    let url_overridden = std::env::var(API_URL_ENV).is_ok_and(|u| !u.trim().is_empty());

    if !output.is_human() {
        output.data(&json!({
            "config_file": paths.config_file().display().to_string(),
            "credentials_file": paths.credentials_file().display().to_string(),
            "log_file": paths.default_log_file().display().to_string(),
            "api": {
                "base_url": config.api.base_url,
                "base_url_from_env": url_overridden,
                "timeout_secs": config.api.timeout_secs,
                "user_agent": config.api.user_agent,
            },
            "display": {
                "show_imdb_ids": config.display.show_imdb_ids,
                "show_added_date": config.display.show_added_date,
            },
            "session": {
                "signed_in": token.is_some(),
                "token": token_display,
                "source": token_source,
                "saved_at": saved_at.map(|t| t.to_rfc3339()),
            },
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    let mut files = ui::list_table(&["File", "Path"]);
    files.add_row(vec![Cell::new("Config"), Cell::new(paths.config_file().display())]);
    files.add_row(vec![Cell::new("Credentials"), Cell::new(paths.credentials_file().display())]);
    files.add_row(vec![Cell::new("Log (--log-file)"), Cell::new(paths.default_log_file().display())]);
    println!("{}", files);
    println!();

    let mut api = ui::list_table(&["API", ""]);
    let base_url = if url_overridden {
        format!("{} (from {})", config.api.base_url, API_URL_ENV)
    } else {
        config.api.base_url.clone()
    };
    api.add_row(vec![Cell::new("Base URL"), Cell::new(base_url)]);
    api.add_row(vec![Cell::new("Timeout"), Cell::new(format!("{}s", config.api.timeout_secs))]);
    api.add_row(vec![Cell::new("User Agent"), Cell::new(&config.api.user_agent)]);
    println!("{}", api);
    println!();

    let mut display = ui::list_table(&["Display", ""]);
    display.add_row(vec![Cell::new("Show IMDb IDs"), flag_cell(config.display.show_imdb_ids)]);
    display.add_row(vec![Cell::new("Show added date"), flag_cell(config.display.show_added_date)]);
    println!("{}", display);
    println!();

    match token_source {
        Some(source) => {
            let mut session = ui::list_table(&["Session", ""]);
            session.add_row(vec![Cell::new("Token"), Cell::new(token_display)]);
            session.add_row(vec![Cell::new("Source"), Cell::new(source)]);
            if let Some(saved_at) = saved_at {
                session.add_row(vec![
                    Cell::new("Saved"),
                    Cell::new(saved_at.format("%Y-%m-%d %H:%M UTC")),
                ]);
            }
            println!("{}", session);
        }
        None => println!("{}", "Session: not signed in".bright_black()),
    }
    Ok(())
}

fn flag_cell(enabled: bool) -> Cell {
    if enabled {
        Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        Cell::new("✗").fg(Color::Red)
    }
}

fn configure_api(paths: &PathManager, url: Option<String>, timeout: Option<u64>, output: &Output) -> Result<()> {
    let mut config = load_file_config(paths)?;

    let (url, timeout) = if url.is_none() && timeout.is_none() {
        if !ui::is_interactive() {
            return Err(eyre!("Nothing to change; pass --url and/or --timeout"));
        }
        let url = prompt_string("Watchlist API URL", Some(&config.api.base_url))?;
        let timeout = prompt_number("Request timeout (seconds)", config.api.timeout_secs)?;
        (Some(url), Some(timeout))
    } else {
        (url, timeout)
    };

    if let Some(url) = url {
        config.api.base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(timeout) = timeout {
        config.api.timeout_secs = timeout;
    }
    config.validate().map_err(|e| eyre!("{}", e))?;

    let config_file = paths.config_file();
    config
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    info!(base_url = %config.api.base_url, timeout_secs = config.api.timeout_secs, "API settings saved");

    output.success(format!(
        "API set to {} (timeout {}s)",
        config.api.base_url, config.api.timeout_secs
    ));
    if std::env::var(API_URL_ENV).is_ok() {
        output.warn(format!("{} is set and overrides the saved URL", API_URL_ENV));
    }
    Ok(())
}

async fn configure_token(paths: &PathManager, token: Option<String>, output: &Output) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => {
            if !ui::is_interactive() {
                return Err(eyre!("No terminal to prompt on; pass --token"));
            }
            prompt_password("API token")?
        }
    };
    let credential = SessionCredential::new(token).ok_or_else(|| eyre!("Token must not be empty"))?;

    let mut credentials = load_credentials(paths)?;
    credentials.set_api_token(credential.bearer_token().to_string());
    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;
    output.success("API token saved");

    if std::env::var(TOKEN_ENV).is_ok() {
        output.warn(format!("{} is set and takes precedence over the saved token", TOKEN_ENV));
    }

    verify_token(paths, credential, output).await;
    Ok(())
}

/// Probe the store with the new token; problems are reported, not fatal
async fn verify_token(paths: &PathManager, credential: SessionCredential, output: &Output) {
    let store = match load_config(paths).and_then(|config| {
        HttpWatchlistStore::from_config(&config.api).map_err(|e| eyre!("{}", e))
    }) {
        Ok(store) => store,
        Err(e) => {
            output.warn(format!("Could not verify token: {}", e));
            return;
        }
    };

    let controller = SyncController::new(Arc::new(store), Some(credential));
    match controller.load_watchlist().await {
        Ok(entries) => output.info(format!("Signed in; {} movie(s) in your watchlist", entries.len())),
        Err(StoreError::Unauthorized) => output.warn("The watchlist service rejected this token"),
        Err(e) => output.warn(format!("Could not verify token: {}", e.user_message())),
    }
}

fn logout(paths: &PathManager, output: &Output) -> Result<()> {
    let mut credentials = load_credentials(paths)?;
    if credentials.get_api_token().is_none() {
        output.info("No saved API token");
        return Ok(());
    }
    if ui::is_interactive() && output.is_human() && !prompt_yes_no("Remove the saved API token?", true)? {
        output.info("Cancelled");
        return Ok(());
    }

    credentials.remove_api_token();
    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;
    output.success("Signed out");
    if std::env::var(TOKEN_ENV).is_ok() {
        output.warn(format!("{} is still set in the environment", TOKEN_ENV));
    }
    Ok(())
}
