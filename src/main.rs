mod app;
mod catalog;
mod commands;
mod config;
mod error;
mod feed;
mod filter;
mod logger;
mod models;
mod providers;
mod render;
mod sequence;
mod session;
mod summarizer;
mod utils;

use anyhow::Result;
use clap::Parser;

use crate::app::RunOptions;
use crate::providers::NewsProvider;

#[derive(Parser)]
#[command(name = "newsdesk")]
#[command(about = "Filterable news feed with AI summaries")]
struct Cli {
    /// News provider to use (overrides the config file)
    #[arg(long, value_enum)]
    provider: Option<NewsProvider>,

    /// Skip sign-in and browse as a guest
    #[arg(long)]
    no_auth: bool,

    /// Disable article summaries
    #[arg(long)]
    no_ai: bool,

    /// Show debug logs on the console
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    app::run(RunOptions {
        provider: cli.provider,
        no_auth: cli.no_auth,
        no_ai: cli.no_ai,
        verbose: cli.verbose,
    })
    .await
}
