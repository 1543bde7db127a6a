//! Host-engine code generation.

use crate::{DirectiveArgs, HandlerRef};

/// Generates host-engine source for directives without a compile-time variant.
///
/// The preprocessor never evaluates this code; it only splices it into the
/// template for the host engine to compile and execute later.
pub trait HostSyntax: Send + Sync {
    /// Code that calls `handler(args)` at render time and prints the result.
    fn echo_call(&self, handler: &HandlerRef, args: DirectiveArgs<'_>) -> String;

    /// Code that renders `body` into a buffer, then calls
    /// `handler(indent, buffer, args...)` and prints the result.
    ///
    /// Handlers rely on this parameter order: indent, body, then the
    /// positional arguments.
    fn capture_call(
        &self,
        handler: &HandlerRef,
        indent: &str,
        body: &str,
        args: DirectiveArgs<'_>,
    ) -> String;

    /// Code that prints `text` when `condition` is truthy, and nothing otherwise.
    fn conditional_text(&self, condition: &str, text: &str) -> String;
}
