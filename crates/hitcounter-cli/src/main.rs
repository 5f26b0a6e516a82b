use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hitcounter_cli::commands::{ls::handle_ls, synth::handle_synth, StackArgs};
use hitcounter_lib::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hit counter stack utilities")]
struct Cli {
    /// Application configuration file (JSON). Falls back to HITCOUNTER_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize the stack and print its template, or write the assembly.
    Synth {
        /// Write templates and manifest.json into this directory.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        #[command(flatten)]
        stack: StackArgs,
    },
    /// List every resource with its construct path and logical id.
    Ls {
        #[command(flatten)]
        stack: StackArgs,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())
        .context("failed to load application configuration")?;

    match cli.command {
        Command::Synth { output, stack } => handle_synth(&config, &stack, output.as_deref()),
        Command::Ls { stack } => handle_ls(&config, &stack),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
