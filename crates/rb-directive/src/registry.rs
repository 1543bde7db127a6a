//! Handler registry.
//!
//! Maps `(namespace, method)` to a two-slot entry: an optional compile-time
//! handler, run during preprocessing with its output spliced into the
//! template, and an optional runtime handler, run by the host when the
//! generated call executes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{DirectiveArgs, HandlerError, HandlerRef};

/// Input passed to a compile-time handler.
#[derive(Debug, Clone, Copy)]
pub struct CompileInput<'a> {
    /// Handler being invoked.
    pub handler: &'a HandlerRef,
    /// Indentation of the block's start line (block form only).
    pub indent: Option<&'a str>,
    /// Block body, already expanded (block form only).
    pub body: Option<&'a str>,
    /// Raw argument text.
    pub args: DirectiveArgs<'a>,
}

/// Input passed to a runtime handler by the host.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    /// Indentation of the block's start line (block form only).
    pub indent: Option<&'a str>,
    /// Rendered block body (block form only).
    pub body: Option<&'a str>,
    /// Evaluated positional arguments.
    pub args: &'a [String],
}

/// Compile-time handler callable.
pub type CompileFn = dyn Fn(&CompileInput<'_>) -> Result<String, HandlerError> + Send + Sync;

/// Runtime handler callable.
pub type RenderFn = dyn Fn(&RenderInput<'_>) -> Result<String, HandlerError> + Send + Sync;

/// Registry entry: the compile-time and runtime variants of one handler.
#[derive(Default, Clone)]
pub struct HandlerEntry {
    compile_time: Option<Arc<CompileFn>>,
    runtime: Option<Arc<RenderFn>>,
}

impl HandlerEntry {
    /// Whether the entry has a compile-time variant.
    #[must_use]
    pub fn has_compile_time(&self) -> bool {
        self.compile_time.is_some()
    }

    /// Whether the entry has a runtime variant.
    #[must_use]
    pub fn has_runtime(&self) -> bool {
        self.runtime.is_some()
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("compile_time", &self.has_compile_time())
            .field("runtime", &self.has_runtime())
            .finish()
    }
}

/// Registry of directive handlers, grouped by namespace.
///
/// Populated once at startup and read-only while templates are compiled,
/// so one registry can be shared by concurrent compilations.
///
/// # Example
///
/// ```
/// use rb_directive::{HandlerRef, HandlerRegistry, RenderInput};
///
/// let registry = HandlerRegistry::new()
///     .with_compiler("Directives", "token", |_| Ok("<input name=\"_token\">".to_owned()))
///     .with_runtime("Directives", "greet", |input: &RenderInput<'_>| {
///         Ok(format!("Hello, {}!", input.args.join(" ")))
///     });
///
/// assert!(registry.has_compiler_variant(&HandlerRef::new("Directives", "token")));
///
/// let args = vec!["Ada".to_owned()];
/// let input = RenderInput { indent: None, body: None, args: &args };
/// let greeting = registry.render(&HandlerRef::new("Directives", "greet"), &input);
/// assert_eq!(greeting.unwrap(), "Hello, Ada!");
/// ```
#[derive(Debug, Default, Clone)]
pub struct HandlerRegistry {
    namespaces: HashMap<String, HashMap<String, HandlerEntry>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compile-time handler (builder style).
    #[must_use]
    pub fn with_compiler<F>(mut self, namespace: &str, method: &str, handler: F) -> Self
    where
        F: Fn(&CompileInput<'_>) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.register_compiler(namespace, method, handler);
        self
    }

    /// Register a runtime handler (builder style).
    #[must_use]
    pub fn with_runtime<F>(mut self, namespace: &str, method: &str, handler: F) -> Self
    where
        F: Fn(&RenderInput<'_>) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.register_runtime(namespace, method, handler);
        self
    }

    /// Register the compile-time variant of `namespace::method`.
    ///
    /// This is the `method_compiler` counterpart: when present, directives
    /// naming `method` are expanded during preprocessing.
    pub fn register_compiler<F>(&mut self, namespace: &str, method: &str, handler: F)
    where
        F: Fn(&CompileInput<'_>) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.entry_mut(namespace, method).compile_time = Some(Arc::new(handler));
    }

    /// Register the runtime variant of `namespace::method`.
    pub fn register_runtime<F>(&mut self, namespace: &str, method: &str, handler: F)
    where
        F: Fn(&RenderInput<'_>) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.entry_mut(namespace, method).runtime = Some(Arc::new(handler));
    }

    /// Look up the entry for a handler.
    #[must_use]
    pub fn get(&self, handler: &HandlerRef) -> Option<&HandlerEntry> {
        self.namespaces
            .get(handler.namespace())?
            .get(handler.method())
    }

    /// Look up the compile-time variant of a handler.
    #[must_use]
    pub fn compiler(&self, handler: &HandlerRef) -> Option<&CompileFn> {
        self.get(handler)?.compile_time.as_deref()
    }

    /// Whether `handler` has a compile-time variant.
    #[must_use]
    pub fn has_compiler_variant(&self, handler: &HandlerRef) -> bool {
        self.compiler(handler).is_some()
    }

    /// Invoke the runtime variant of a handler.
    ///
    /// Hosts call this when a generated call executes. A missing handler is a
    /// render-time error.
    pub fn render(
        &self,
        handler: &HandlerRef,
        input: &RenderInput<'_>,
    ) -> Result<String, HandlerError> {
        let runtime = self
            .get(handler)
            .and_then(|entry| entry.runtime.as_deref())
            .ok_or_else(|| HandlerError::UnknownHandler(handler.to_string()))?;
        runtime(input)
    }

    /// Namespaces with at least one registered handler.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// Total number of registered handler names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.values().map(HashMap::len).sum()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry_mut(&mut self, namespace: &str, method: &str) -> &mut HandlerEntry {
        self.namespaces
            .entry(namespace.to_owned())
            .or_default()
            .entry(method.to_owned())
            .or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_compiler(_: &CompileInput<'_>) -> Result<String, HandlerError> {
        Ok("compiled".to_owned())
    }

    #[test]
    fn test_empty_registry() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.has_compiler_variant(&HandlerRef::new("A", "b")));
    }

    #[test]
    fn test_compiler_lookup_is_namespaced() {
        let registry = HandlerRegistry::new().with_compiler("A", "token", ok_compiler);
        assert!(registry.has_compiler_variant(&HandlerRef::new("A", "token")));
        assert!(!registry.has_compiler_variant(&HandlerRef::new("B", "token")));
        assert!(!registry.has_compiler_variant(&HandlerRef::new("A", "other")));
    }

    #[test]
    fn test_both_slots_share_one_entry() {
        let registry = HandlerRegistry::new()
            .with_compiler("A", "field", ok_compiler)
            .with_runtime("A", "field", |_: &RenderInput<'_>| Ok(String::new()));
        let entry = registry.get(&HandlerRef::new("A", "field")).unwrap();
        assert!(entry.has_compile_time());
        assert!(entry.has_runtime());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_runtime_only_has_no_compiler_variant() {
        let registry = HandlerRegistry::new()
            .with_runtime("A", "flash", |_: &RenderInput<'_>| Ok(String::new()));
        assert!(!registry.has_compiler_variant(&HandlerRef::new("A", "flash")));
    }

    #[test]
    fn test_render_passes_indent_body_and_args() {
        let registry =
            HandlerRegistry::new().with_runtime("A", "wrap", |input: &RenderInput<'_>| {
                Ok(format!(
                    "{}[{}|{}]",
                    input.indent.unwrap_or_default(),
                    input.body.unwrap_or_default(),
                    input.args.join(",")
                ))
            });
        let args = vec!["x".to_owned(), "y".to_owned()];
        let input = RenderInput {
            indent: Some("  "),
            body: Some("<b>"),
            args: &args,
        };
        let out = registry.render(&HandlerRef::new("A", "wrap"), &input).unwrap();
        assert_eq!(out, "  [<b>|x,y]");
    }

    #[test]
    fn test_render_unknown_handler() {
        let registry = HandlerRegistry::new().with_compiler("A", "token", ok_compiler);
        let input = RenderInput {
            indent: None,
            body: None,
            args: &[],
        };
        let err = registry
            .render(&HandlerRef::new("A", "token"), &input)
            .unwrap_err();
        assert_eq!(err, HandlerError::UnknownHandler("A::token".to_owned()));
    }

    #[test]
    fn test_namespaces() {
        let registry = HandlerRegistry::new()
            .with_compiler("A", "x", ok_compiler)
            .with_compiler("B", "y", ok_compiler);
        let mut namespaces: Vec<_> = registry.namespaces().collect();
        namespaces.sort_unstable();
        assert_eq!(namespaces, vec!["A", "B"]);
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HandlerRegistry>();
    }
}
