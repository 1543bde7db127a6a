//! `rb check` command implementation.

use std::path::PathBuf;

use clap::Args;
use rb_config::{CliSettings, Config};

use super::build::{compile_templates, find_templates, report_failures};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Path to configuration file (default: auto-discover rb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Namespace for unqualified directives (overrides config).
    #[arg(long, env = "RB_DEFAULT_NAMESPACE")]
    default_namespace: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CheckArgs {
    /// Execute the check command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            default_namespace: self.default_namespace,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        output.info(&format!(
            "Source: {}",
            config.templates_resolved.source_dir.display()
        ));

        let found = find_templates(&config)?;
        let batch = compile_templates(&config, &found);
        report_failures(&output, &batch)?;

        output.success(&format!("{} templates OK", batch.compiled.len()));
        Ok(())
    }
}
