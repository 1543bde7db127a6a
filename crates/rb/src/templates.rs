//! Template discovery and batch compilation.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use rayon::prelude::*;
use rb_directive::{PreprocessError, TemplateCompiler};

/// A template found under the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TemplateRef {
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// Path relative to the source directory.
    pub relative: PathBuf,
}

/// A successfully compiled template.
#[derive(Debug)]
pub(crate) struct CompiledTemplate {
    pub template: TemplateRef,
    pub output: String,
}

/// A template that failed to compile.
#[derive(Debug)]
pub(crate) struct TemplateFailure {
    pub template: TemplateRef,
    pub error: TemplateError,
}

/// Why a template failed.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TemplateError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Preprocess(#[from] PreprocessError),
}

/// Result of compiling a batch of templates.
#[derive(Debug, Default)]
pub(crate) struct BatchResult {
    pub compiled: Vec<CompiledTemplate>,
    pub failures: Vec<TemplateFailure>,
}

/// Find templates under `source_dir` whose relative path matches `pattern`.
///
/// Hidden files and directories are skipped. Results are sorted by path.
pub(crate) fn discover(source_dir: &Path, pattern: &Pattern) -> Vec<TemplateRef> {
    let mut refs = Vec::new();
    scan_directory(source_dir, Path::new(""), pattern, &mut refs);
    refs.sort_by(|a, b| a.relative.cmp(&b.relative));
    refs
}

fn scan_directory(dir: &Path, prefix: &Path, pattern: &Pattern, refs: &mut Vec<TemplateRef>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        let relative = prefix.join(&name);
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            scan_directory(&path, &relative, pattern, refs);
        } else if pattern.matches_path(&relative) {
            refs.push(TemplateRef { path, relative });
        }
    }
}

/// Compile templates in parallel.
///
/// Every template is attempted; failures are collected rather than
/// aborting the batch.
pub(crate) fn compile_all(compiler: &TemplateCompiler, templates: &[TemplateRef]) -> BatchResult {
    let results: Vec<_> = templates
        .par_iter()
        .map(|template| compile_one(compiler, template))
        .collect();

    partition_results(results)
}

fn compile_one(
    compiler: &TemplateCompiler,
    template: &TemplateRef,
) -> Result<CompiledTemplate, TemplateFailure> {
    let compiled = fs::read_to_string(&template.path)
        .map_err(TemplateError::from)
        .and_then(|source| compiler.compile(&source).map_err(TemplateError::from));

    match compiled {
        Ok(output) => {
            tracing::debug!(path = %template.relative.display(), "Compiled template");
            Ok(CompiledTemplate {
                template: template.clone(),
                output,
            })
        }
        Err(error) => {
            tracing::warn!(
                path = %template.relative.display(),
                error = %error,
                "Failed to compile template"
            );
            Err(TemplateFailure {
                template: template.clone(),
                error,
            })
        }
    }
}

/// Partition results into successes and failures.
fn partition_results(results: Vec<Result<CompiledTemplate, TemplateFailure>>) -> BatchResult {
    let mut batch = BatchResult {
        compiled: Vec::with_capacity(results.len()),
        failures: Vec::new(),
    };

    for result in results {
        match result {
            Ok(item) => batch.compiled.push(item),
            Err(failure) => batch.failures.push(failure),
        }
    }

    batch
}
