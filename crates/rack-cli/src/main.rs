mod books;
mod settings;

use clap::{Parser, Subcommand};
use rack_core::{JsonFileStore, Scope};
use tracing_subscriber::EnvFilter;

use crate::settings::ConfigCommands;

#[derive(Debug, Parser)]
#[command(name = "rack-cli")]
#[command(about = "Look up books in the stall spreadsheet")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Substring search over the mapped book list
    Search {
        /// Text to look for; empty lists nothing unless --show-all is given
        #[arg(default_value = "")]
        query: String,
        /// Field to match against: auto, identifier, name or location
        #[arg(long, default_value = "auto")]
        scope: Scope,
        /// List every book when the query is empty
        #[arg(long)]
        show_all: bool,
        /// Maximum number of books to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Exact book number lookup
    Lookup { identifier: String },
    /// Type-ahead suggestions for a partial query
    Suggest {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the column headers of the configured sheet
    Columns,
    /// Print the first rows of the sheet as fetched
    Raw {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Map the sheet with the stored mapping and print the first rows
    Preview {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Inspect or edit the stored sheet source and column mapping
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = rack_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("rack-cli ready; run with --help to list commands");
        return Ok(());
    };

    let store = JsonFileStore::new(&config.config_path);
    match command {
        Commands::Search {
            query,
            scope,
            show_all,
            limit,
        } => books::run_search(&config, &store, &query, scope, show_all, limit).await?,
        Commands::Lookup { identifier } => books::run_lookup(&config, &store, &identifier).await?,
        Commands::Suggest { query, limit } => {
            books::run_suggest(&config, &store, &query, limit).await?;
        }
        Commands::Columns => books::run_columns(&config, &store).await?,
        Commands::Raw { limit } => books::run_raw(&config, &store, limit).await?,
        Commands::Preview { limit } => books::run_preview(&config, &store, limit).await?,
        Commands::Config { command } => settings::run(&config, &store, command).await?,
    }

    Ok(())
}
