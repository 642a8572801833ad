//! Proctor CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use proctor::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => proctor::cli::commands::init::execute(args, cli.json).await,
        Commands::Scope(args) => proctor::cli::commands::scope::execute(args, cli.json).await,
        Commands::Conflicts(args) => proctor::cli::commands::conflict::execute(args, cli.json).await,
        Commands::Clusters(args) => proctor::cli::commands::cluster::execute(args, cli.json).await,
        Commands::Health(args) => proctor::cli::commands::health::execute(args, cli.json).await,
        Commands::RootCause(args) => {
            proctor::cli::commands::root_cause::execute(args, cli.json).await
        }
    };

    if let Err(err) = result {
        proctor::cli::handle_error(err, cli.json);
    }
}
