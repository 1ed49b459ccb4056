mod commands;
mod render;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "jinja-universal",
    version,
    about = "Maintain the jinja-universal Zed extension: generate language folders and sync with Zed"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate per-language folders and refresh README and manifest
    Generate(commands::generate::GenerateArgs),
    /// Reconcile languages.toml against Zed's supported languages
    Sync(commands::sync::SyncArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("JINJA_UNIVERSAL_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Generate(args) => commands::generate::run(args),
        Command::Sync(args) => commands::sync::run(args),
    };

    if let Err(err) = result {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
