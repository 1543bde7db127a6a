//! `rb compile` command implementation.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use rb_config::{CliSettings, Config};

use crate::error::CliError;

/// Input path meaning standard input.
const STDIN: &str = "-";

/// Arguments for the compile command.
#[derive(Args)]
pub(crate) struct CompileArgs {
    /// Template to compile (`-` reads from standard input).
    input: PathBuf,

    /// Write the compiled template to this file (default: standard output).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover rb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Namespace for unqualified directives (overrides config).
    #[arg(long, env = "RB_DEFAULT_NAMESPACE")]
    default_namespace: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CompileArgs {
    /// Execute the compile command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            default_namespace: self.default_namespace,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let compiler = super::template_compiler(&config);

        let (label, source) = read_input(&self.input)?;
        tracing::info!(input = %label, "Compiling template");
        let compiled = compiler
            .compile(&source)
            .map_err(|source| CliError::Template {
                path: label,
                source,
            })?;

        match self.output {
            Some(path) => write_file(&path, &compiled)?,
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(compiled.as_bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

/// Read the template source, returning a label for diagnostics and its text.
fn read_input(input: &Path) -> Result<(String, String), CliError> {
    if input.as_os_str() == STDIN {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        return Ok(("<stdin>".to_owned(), source));
    }
    let source = std::fs::read_to_string(input)?;
    Ok((input.display().to_string(), source))
}

/// Write `content` to `path`, creating parent directories.
pub(crate) fn write_file(path: &Path, content: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
