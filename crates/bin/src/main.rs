use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod model;
mod output;

use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("treebind=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = model::registry(cli.strategy.into());
    let format = cli.format.into();
    tracing::debug!(strategy = %registry.strategy(), "Starting treebind");

    match &cli.command {
        Commands::Demo(args) => commands::demo::run(args, registry, format),
        Commands::Project(args) => commands::project::run(args, registry, format),
    }
}
