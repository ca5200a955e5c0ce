use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use coderpg::app::marks::MarkService;
use coderpg::app::repo::RepoBrowser;
use coderpg::infra::config::Config;
use coderpg::infra::github::GithubClient;
use coderpg::infra::http::{self, AppState};
use coderpg::infra::kv::MemoryStore;

#[derive(Parser)]
#[command(author, version, about = "Track which lines of a repository you have understood", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the mark API over HTTP
    Serve {
        /// Bind address, overriding configuration
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    coderpg::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { bind } => serve(bind).await,
    }
}

async fn serve(bind: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());

    let host = GithubClient::new(config.github.api_base.clone(), config.github.token.clone())?;
    let state = Arc::new(AppState {
        marks: MarkService::new(Arc::new(MemoryStore::new())),
        repos: RepoBrowser::new(Arc::new(host)),
    });

    http::serve(state, &bind).await
}
