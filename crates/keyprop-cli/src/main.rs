use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::{
    config::{handle_config_command, ConfigCommands},
    signing::{handle_signing_command, SigningCommands},
};

#[derive(Parser)]
#[command(name = "keyprop")]
#[command(about = "Resolve Android release signing from key.properties", long_about = None)]
#[command(version = keyprop_core::VERSION)]
struct Cli {
    /// Configuration profile to use
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Flutter project root (overrides profile)
    #[arg(long, global = true)]
    project: Option<String>,

    /// Properties file (defaults to <project>/android/key.properties)
    #[arg(long, global = true)]
    properties: Option<String>,

    /// Missing keystore handling: require, warn or ignore
    #[arg(long, global = true)]
    policy: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Signing(SigningCommands),

    /// Manage CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (doesn't override existing env vars)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyprop_cli=info,keyprop_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Config commands don't need a resolved project, handle separately
    let cmd = match cli.command {
        Commands::Config(cmd) => return handle_config_command(cmd),
        Commands::Signing(cmd) => cmd,
    };

    let file_config = config::load_config().unwrap_or_else(|e| {
        output::print_warning(&format!("Failed to load config file: {:#}", e));
        None
    });

    let resolved = config::resolve_config(
        cli.profile.as_deref(),
        cli.project.as_deref(),
        cli.properties.as_deref(),
        cli.policy.as_deref(),
        file_config,
    )?;

    tracing::debug!(
        "Using project {} with properties {}",
        resolved.project.root().display(),
        resolved.properties.display()
    );

    handle_signing_command(&resolved, cmd).await
}
