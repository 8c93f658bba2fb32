use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mcp_context_browser::config::McbConfig;
use mcp_context_browser::domain::types::SearchOptions;
use mcp_context_browser::server::AppState;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mcp-context-browser")]
#[command(about = "Local code-intelligence engine: index, search, and serve a codebase over JSON-RPC")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse, chunk, and embed a directory tree into the index.
    Index {
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
    /// Hybrid lexical + semantic search over the index.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        path: Option<String>,
    },
    /// Search documentation snippets only (Markdown sections, doc comments).
    SearchDocs {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Start, stop, or check a filesystem watch (thin stub, no live watcher).
    Watch {
        path: PathBuf,
        #[arg(value_enum)]
        action: WatchAction,
    },
    /// Remote cache credential management (thin stub).
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Run the JSON-RPC server over stdio.
    Serve,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum WatchAction {
    Start,
    Stop,
    Status,
}

#[derive(Subcommand, Debug)]
enum AuthAction {
    Status,
    Login,
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = McbConfig::load()?;

    match cli.command {
        Command::Serve => {
            let state = Arc::new(AppState::open(config).await?);
            mcp_context_browser::server::serve_stdio(state).await?;
        }
        Command::Index { path, force } => {
            let state = AppState::open(config).await?;
            let summary = run_index_cli(&state, &path, force).await?;
            println!("{summary}");
        }
        Command::Search { query, limit, path } => {
            let state = AppState::open(config).await?;
            let options = SearchOptions { limit, path_filter: path, ..Default::default() };
            let mgr = state.index.lock().await;
            let results = state.search.search(&mgr, &query, &options).await?;
            print_results(&results);
        }
        Command::SearchDocs { query, limit } => {
            let state = AppState::open(config).await?;
            let options = SearchOptions { limit, ..Default::default() };
            let mgr = state.index.lock().await;
            let results = state.search.search(&mgr, &query, &options).await?;
            print_results(&results);
        }
        Command::Watch { path, action } => {
            let state = AppState::open(config).await?;
            let path = path.to_string_lossy();
            let status = match action {
                WatchAction::Start => {
                    state.watches.start(&path);
                    "watching"
                }
                WatchAction::Stop => {
                    if state.watches.stop(&path) { "stopped" } else { "not_watched" }
                }
                WatchAction::Status => {
                    if state.watches.is_watched(&path) { "watching" } else { "not_watched" }
                }
            };
            println!("{path}: {status}");
        }
        Command::Auth { action } => {
            // Remote cache credentials live outside this crate's scope; the
            // keychain integration is an out-of-scope collaborator, so this
            // only reports the stub's fixed state.
            match action {
                AuthAction::Status => println!("auth: not configured (no remote cache credentials store wired up)"),
                AuthAction::Login => println!("auth login is not implemented; configure remote cache credentials out of band"),
                AuthAction::Logout => println!("auth logout is not implemented"),
            }
        }
    }

    Ok(())
}

async fn run_index_cli(state: &AppState, path: &std::path::Path, force: bool) -> anyhow::Result<String> {
    let report = mcp_context_browser::server::index_path_for_cli(state, path, force).await?;
    Ok(report)
}

fn print_results(results: &[mcp_context_browser::domain::types::SearchResult]) {
    for result in results {
        println!("{}:{}-{}  {}", result.chunk.path, result.chunk.start_line, result.chunk.end_line, result.score);
    }
}
