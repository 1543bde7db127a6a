//! Template compiler: the ordered pipeline of rewrite passes.

use std::sync::Arc;

use crate::rules::{BlockRule, BoolAttrRule, Extension, NativePass, ShortCallRule};
use crate::{HandlerRegistry, HostSyntax, PhpSyntax, Position, PreprocessError};

/// Namespace used for directives written without one.
pub const DEFAULT_NAMESPACE: &str = "Directives";

/// Default maximum block nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Configuration for the template compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessorConfig {
    /// Namespace for unqualified directives.
    ///
    /// Default: `Directives`
    pub default_namespace: String,
    /// Maximum nesting depth of block bodies.
    ///
    /// Default: 16
    pub max_depth: usize,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PreprocessorConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_owned(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the namespace for unqualified directives.
    #[must_use]
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    /// Set the maximum block nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Compiles templates by running every registered pass in order.
///
/// The directive rules (boolean attributes, short calls, blocks) always run
/// first; host-native passes added with [`with_extension`](Self::with_extension)
/// or [`with_native`](Self::with_native) run after them. The compiler is
/// immutable once built, so one instance can serve concurrent compilations.
///
/// # Example
///
/// ```
/// use rb_directive::{HandlerRegistry, PreprocessorConfig, TemplateCompiler};
///
/// let registry = HandlerRegistry::new()
///     .with_compiler("Directives", "token", |_| Ok("<input name=\"_token\">".to_owned()));
/// let compiler = TemplateCompiler::new(PreprocessorConfig::default(), registry);
///
/// let output = compiler.compile("<form>@@token @@errors('email')</form>").unwrap();
/// assert_eq!(
///     output,
///     "<form><input name=\"_token\"> <?php echo Directives::errors('email') ?></form>"
/// );
/// ```
pub struct TemplateCompiler {
    config: PreprocessorConfig,
    registry: Arc<HandlerRegistry>,
    syntax: Box<dyn HostSyntax>,
    extensions: Vec<Box<dyn Extension>>,
}

impl TemplateCompiler {
    /// Create a compiler emitting PHP host code.
    #[must_use]
    pub fn new(config: PreprocessorConfig, registry: impl Into<Arc<HandlerRegistry>>) -> Self {
        Self {
            config,
            registry: registry.into(),
            syntax: Box::new(PhpSyntax),
            extensions: vec![
                Box::new(BoolAttrRule),
                Box::new(ShortCallRule),
                Box::new(BlockRule),
            ],
        }
    }

    /// Replace the host syntax used for generated calls.
    #[must_use]
    pub fn with_syntax<S: HostSyntax + 'static>(mut self, syntax: S) -> Self {
        self.syntax = Box::new(syntax);
        self
    }

    /// Register a pass to run after the already registered ones.
    #[must_use]
    pub fn with_extension<E: Extension + 'static>(mut self, extension: E) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Register a plain text transform to run after the already registered passes.
    #[must_use]
    pub fn with_native<F>(self, name: impl Into<String>, pass: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.with_extension(NativePass::new(name, pass))
    }

    /// Compiler configuration.
    #[must_use]
    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Handler registry shared by all compilations.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Names of the registered passes, in execution order.
    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(|e| e.name())
    }

    /// Compile a template.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; no partial output is produced.
    pub fn compile(&self, source: &str) -> Result<String, PreprocessError> {
        self.context().compile(source)
    }

    /// Context for a top-level template.
    #[must_use]
    pub fn context(&self) -> CompileContext<'_> {
        CompileContext {
            compiler: self,
            depth: 0,
            origin: Position::START,
        }
    }
}

/// State of one compilation, passed to every pass.
///
/// Nested block bodies get their own context with an increased depth and
/// the position where the body begins in the enclosing template.
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    compiler: &'a TemplateCompiler,
    depth: usize,
    origin: Position,
}

impl<'a> CompileContext<'a> {
    /// Nesting depth: 0 for the template itself.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Namespace for unqualified directives.
    #[must_use]
    pub fn default_namespace(&self) -> &'a str {
        &self.compiler.config.default_namespace
    }

    /// Handler registry.
    #[must_use]
    pub fn registry(&self) -> &'a HandlerRegistry {
        &self.compiler.registry
    }

    /// Host syntax for generated calls.
    #[must_use]
    pub fn syntax(&self) -> &'a dyn HostSyntax {
        self.compiler.syntax.as_ref()
    }

    /// Position of `offset` in `text`, relative to the top-level template.
    #[must_use]
    pub fn position(&self, text: &str, offset: usize) -> Position {
        Position::locate(text, offset, self.origin)
    }

    /// Run every pass over `source`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a pass.
    pub fn compile(&self, source: &str) -> Result<String, PreprocessError> {
        tracing::debug!(len = source.len(), depth = self.depth, "Compiling template");

        let mut text = source.to_owned();
        for extension in &self.compiler.extensions {
            text = extension.apply(&text, self)?;
        }
        Ok(text)
    }

    /// Compile a block body one level deeper.
    ///
    /// `origin` is where the body begins in the template and `position` the
    /// position of the block that owns it.
    ///
    /// # Errors
    ///
    /// Returns [`PreprocessError::NestingTooDeep`] past the configured depth,
    /// or any error raised while compiling the body.
    pub fn compile_nested(
        &self,
        body: &str,
        origin: Position,
        position: Position,
    ) -> Result<String, PreprocessError> {
        let max_depth = self.compiler.config.max_depth;
        if self.depth >= max_depth {
            return Err(PreprocessError::NestingTooDeep {
                max_depth,
                position,
            });
        }

        Self {
            depth: self.depth + 1,
            origin,
            ..*self
        }
        .compile(body)
    }
}
