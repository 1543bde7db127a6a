//! CLI error types.

use rb_config::ConfigError;
use rb_directive::PreprocessError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{path}: {source}")]
    Template {
        path: String,
        #[source]
        source: PreprocessError,
    },

    #[error("{0}")]
    Build(String),
}
