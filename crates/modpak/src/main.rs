//! modpak CLI - game plugin packaging tool

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use modpak::commands;

/// modpak - package game plugins as relocatable mods
#[derive(Debug, Parser)]
#[command(name = "modpak")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (includes the cooker's log)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Cook, stage, archive and optionally deploy a plugin
    Package(commands::package::PackageArgs),

    /// Remove leftover stage directories
    Clean(commands::clean::CleanArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Log lines are printed above the progress bars
    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .with(filter)
        .init();

    match cli.command {
        Commands::Package(args) => commands::package::run(args),
        Commands::Clean(args) => commands::clean::run(args),
    }
}
