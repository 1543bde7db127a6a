//! rb CLI - Template directive preprocessor.
//!
//! Provides commands for:
//! - `compile`: Preprocess a single template
//! - `build`: Preprocess every template of a source directory
//! - `check`: Report directive errors without writing output

mod commands;
mod error;
mod output;
mod templates;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, CheckArgs, CompileArgs};
use output::Output;

/// rb - Template directive preprocessor.
#[derive(Parser)]
#[command(name = "rb", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preprocess a single template.
    Compile(CompileArgs),
    /// Preprocess all templates into the output directory.
    Build(BuildArgs),
    /// Check templates for directive errors without writing output.
    Check(CheckArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Compile(args) => args.verbose,
            Self::Build(args) => args.verbose,
            Self::Check(args) => args.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Compile(args) => args.execute(),
        Commands::Build(args) => args.execute(),
        Commands::Check(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
