//! Hatchery CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hatchery::cli::{commands, Cli, Commands, OwnerCommands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init => commands::init(cli.json).await,
        Commands::Daemon => commands::daemon(config_path).await,
        Commands::Owner { command } => match command {
            OwnerCommands::Add { name } => commands::owner_add(config_path, name, cli.json).await,
            OwnerCommands::List => commands::owner_list(config_path, cli.json).await,
        },
        Commands::Generate {
            owner,
            requirement,
            model,
            wait,
        } => commands::generate(config_path, owner, requirement, model, wait, cli.json).await,
        Commands::Status { task_id } => commands::status(config_path, task_id, cli.json).await,
        Commands::Deploy { artifact_id } => {
            commands::deploy(config_path, artifact_id, cli.json).await
        }
        Commands::List { status } => commands::list(config_path, status, cli.json).await,
        Commands::Report {
            artifact_id,
            window,
        } => commands::report(config_path, artifact_id, window, cli.json).await,
    };

    if let Err(err) = result {
        hatchery::cli::handle_error(err, cli.json);
    }
}
