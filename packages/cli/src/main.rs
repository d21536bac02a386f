mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{inject, replay, InjectArgs, ReplayArgs};
use tracing_subscriber::EnvFilter;

/// Livepage CLI - make any HTML page editable in the browser
#[derive(Parser, Debug)]
#[command(name = "livepage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inject the editing overlay into an HTML page
    Inject(InjectArgs),

    /// Bake stored edits into a page without the overlay
    Replay(ReplayArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Inject(args) => inject(args, &cwd),
        Command::Replay(args) => replay(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
