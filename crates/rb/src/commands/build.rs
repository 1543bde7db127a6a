//! `rb build` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use glob::Pattern;
use rb_config::{CliSettings, Config};

use super::compile::write_file;
use crate::error::CliError;
use crate::output::Output;
use crate::templates::{self, BatchResult, TemplateRef};

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover rb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory for compiled templates (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Namespace for unqualified directives (overrides config).
    #[arg(long, env = "RB_DEFAULT_NAMESPACE")]
    default_namespace: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// Execute the build command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            default_namespace: self.default_namespace,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let source_dir = &config.templates_resolved.source_dir;
        let output_dir = &config.templates_resolved.output_dir;

        output.info(&format!("Source: {}", source_dir.display()));
        output.info(&format!("Output: {}", output_dir.display()));

        let found = find_templates(&config)?;
        let batch = compile_templates(&config, &found);
        report_failures(&output, &batch)?;

        for compiled in &batch.compiled {
            write_file(
                &output_dir.join(&compiled.template.relative),
                &compiled.output,
            )?;
        }

        output.success(&format!(
            "Compiled {} templates to {}",
            batch.compiled.len(),
            output_dir.display()
        ));
        Ok(())
    }
}

/// Discover the templates selected by the configuration.
pub(crate) fn find_templates(config: &Config) -> Result<Vec<TemplateRef>, CliError> {
    let source_dir = &config.templates_resolved.source_dir;
    require_dir(source_dir)?;
    let pattern = Pattern::new(&config.templates_resolved.pattern)?;
    Ok(templates::discover(source_dir, &pattern))
}

/// Compile every template with the compiler described by the configuration.
pub(crate) fn compile_templates(config: &Config, found: &[TemplateRef]) -> BatchResult {
    let compiler = super::template_compiler(config);
    tracing::info!(count = found.len(), "Compiling templates");
    templates::compile_all(&compiler, found)
}

/// Print each failure and fail when there is any.
pub(crate) fn report_failures(output: &Output, batch: &BatchResult) -> Result<(), CliError> {
    if batch.failures.is_empty() {
        return Ok(());
    }

    for failure in &batch.failures {
        output.warning(&format!(
            "{}: {}",
            failure.template.relative.display(),
            failure.error
        ));
    }
    let total = batch.compiled.len() + batch.failures.len();
    Err(CliError::Build(format!(
        "{} of {total} templates failed to compile",
        batch.failures.len()
    )))
}

fn require_dir(dir: &Path) -> Result<(), CliError> {
    if !dir.is_dir() {
        return Err(CliError::Build(format!(
            "Source directory not found: {}",
            dir.display()
        )));
    }
    Ok(())
}
