mod api;
mod badge;
mod cli;
mod expiry;
mod leave;
mod model;
mod notifications;
mod orchestrator;
mod scanner;
mod session;
mod text_summary;
mod workflow;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "travel_docs=debug"
    } else {
        "travel_docs=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.verbose);

    match cli::run(args).await {
        // Watch mode leaves the ctrl-c listener behind; exit explicitly.
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            Err(e)
        }
    }
}
