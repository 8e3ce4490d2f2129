use clap::{Parser, Subcommand};
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::change_requests::ChangeRequestCommands;
use cli::proposals::ProposalCommands;
use cli::public::PublicCommands;
use proposekit_cli::AppContext;
use proposekit_config::Settings;

#[derive(Parser)]
#[command(name = "proposekit")]
#[command(about = "ProposeKit CLI - commercial proposals from draft to kickoff")]
#[command(version)]
struct Cli {
    /// User id acting as the proposal owner
    #[arg(long, global = true, default_value = "local")]
    owner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    Migrate,
    /// Manage proposals as their owner
    #[command(subcommand)]
    Proposals(ProposalCommands),
    /// Act on a public proposal link as the client
    #[command(subcommand)]
    Public(PublicCommands),
    /// Manage change requests
    #[command(subcommand)]
    Cr(ChangeRequestCommands),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    let ctx = AppContext::from_settings(settings).await?;

    match cli.command {
        Commands::Migrate => {
            println!(
                "{} Database ready at {}",
                "✓".green(),
                ctx.settings.database_path.display()
            );
            Ok(())
        }
        Commands::Proposals(cmd) => cli::proposals::handle(&ctx, &cli.owner, cmd).await,
        Commands::Public(cmd) => cli::public::handle(&ctx, cmd).await,
        Commands::Cr(cmd) => cli::change_requests::handle(&ctx, &cli.owner, cmd).await,
    }
}
