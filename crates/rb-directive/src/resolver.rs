//! Handler resolution for directive names.

use std::fmt;

use crate::scanner::DirectiveName;

/// Suffix naming the compile-time variant of a handler.
pub const COMPILER_SUFFIX: &str = "_compiler";

/// Fully resolved handler reference: `namespace::method`.
///
/// Directives written without a namespace (`@@token`) resolve to the
/// configured default namespace; qualified ones (`@@Forms::token`) keep
/// the namespace they were written with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    namespace: String,
    method: String,
}

impl HandlerRef {
    /// Create a reference from its parts.
    #[must_use]
    pub fn new(namespace: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            method: method.into(),
        }
    }

    /// Resolve a directive name written as `method` or `namespace::method`.
    ///
    /// # Example
    ///
    /// ```
    /// use rb_directive::HandlerRef;
    ///
    /// let handler = HandlerRef::parse("flashMessage", "Directives");
    /// assert_eq!(handler.to_string(), "Directives::flashMessage");
    ///
    /// let handler = HandlerRef::parse("Other::flashMessage", "Directives");
    /// assert_eq!(handler.namespace(), "Other");
    /// ```
    #[must_use]
    pub fn parse(name: &str, default_namespace: &str) -> Self {
        match name.rsplit_once("::") {
            Some((namespace, method)) if !namespace.is_empty() => Self::new(namespace, method),
            _ => Self::new(default_namespace, name.trim_start_matches("::")),
        }
    }

    pub(crate) fn resolve(name: &DirectiveName<'_>, default_namespace: &str) -> Self {
        Self::new(name.namespace.unwrap_or(default_namespace), name.method)
    }

    /// Namespace the handler lives in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Handler method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Conventional name of the compile-time variant (`method_compiler`).
    #[must_use]
    pub fn compiler_name(&self) -> String {
        format!("{}{COMPILER_SUFFIX}", self.method)
    }

    /// Qualified name of the compile-time variant, for diagnostics.
    #[must_use]
    pub fn qualified_compiler_name(&self) -> String {
        format!("{}::{}", self.namespace, self.compiler_name())
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.namespace, self.method)
    }
}
