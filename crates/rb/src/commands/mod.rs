//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod check;
pub(crate) mod compile;

pub(crate) use build::BuildArgs;
pub(crate) use check::CheckArgs;
pub(crate) use compile::CompileArgs;

use rb_config::Config;
use rb_directive::{HandlerRegistry, PreprocessorConfig, TemplateCompiler, register_builtins};

/// Build the template compiler described by `config`.
///
/// Built-in handlers are registered into the default namespace.
pub(crate) fn template_compiler(config: &Config) -> TemplateCompiler {
    let namespace = &config.directives.default_namespace;

    let mut registry = HandlerRegistry::new();
    register_builtins(&mut registry, namespace);

    let preprocessor = PreprocessorConfig::new()
        .with_default_namespace(namespace.as_str())
        .with_max_depth(config.directives.max_depth);
    TemplateCompiler::new(preprocessor, registry)
}
