use clap::{ArgAction, Parser, Subcommand};
use cinelist_models::{Membership, MovieId};
use commands::{browse, config, list, membership};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "cinelist")]
#[command(about = "cinelist - keep track of the movies you want to watch")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Write logs to a daily rotated file instead of stderr (`--log-file=PATH`;
    /// the default path under the config directory when PATH is omitted)
    #[arg(long, global = true, value_name = "PATH", num_args = 0..=1, require_equals = true)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether movies are in your watchlist
    Check {
        /// Movie IDs
        #[arg(required = true, value_name = "ID")]
        ids: Vec<MovieId>,
    },
    /// Add a movie if it is missing, remove it if it is there
    Toggle {
        #[arg(value_name = "ID")]
        id: MovieId,

        /// Title to display and to store with the entry
        #[arg(long)]
        title: Option<String>,
    },
    /// Add a movie to your watchlist
    Add {
        #[arg(value_name = "ID")]
        id: MovieId,

        /// Title to store with the entry
        #[arg(long)]
        title: Option<String>,
    },
    /// Remove a movie from your watchlist
    Remove {
        #[arg(value_name = "ID")]
        id: MovieId,
    },
    /// List your whole watchlist
    List,
    /// Interactively toggle several movies
    #[command(long_about = "Check the given movies, then pick movies from a menu to add or remove them. The menu is redrawn after every change; choose Refresh to re-check all of them.")]
    Browse {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<MovieId>,
    },
    /// View or change settings and the saved API token
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks the token)
    Show {
        /// Show the token unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Set the watchlist API address and timeout (prompts when no flag is given)
    Api {
        #[arg(long)]
        url: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Save the API token (prompts with masked input if not provided)
    Token {
        #[arg(long)]
        token: Option<String>,
    },

    /// Forget the saved API token
    Logout,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_file = match cli.log_file {
        Some(Some(path)) => Some(path),
        Some(None) => Some(commands::session::paths()?.default_log_file()),
        None => None,
    };
    logging::init_logging(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Check { ids } => membership::run_check(ids, &output).await,
        Commands::Toggle { id, title } => membership::run_toggle(id, title, &output).await,
        Commands::Add { id, title } => membership::run_set(id, title, Membership::Present, &output).await,
        Commands::Remove { id } => membership::run_set(id, None, Membership::Absent, &output).await,
        Commands::List => list::run_list(&output).await,
        Commands::Browse { ids } => browse::run_browse(ids, &output).await,
        Commands::Config { cmd } => {
            let cmd = cmd.unwrap_or(ConfigCommands::Show { full: false });
            config::run_config(cmd, &output).await
        }
    }
}
