//! Compile-time dispatch.
//!
//! Decides, per resolved directive, between splicing the output of its
//! compile-time handler and emitting host code that calls the runtime handler.

use crate::scanner::DirectiveOccurrence;
use crate::{CompileContext, CompileInput, DirectiveArgs, HandlerRef, Position, PreprocessError};

/// Expand a short call. The returned text replaces the whole occurrence span.
pub(crate) fn inline(
    cx: &CompileContext<'_>,
    occurrence: &DirectiveOccurrence<'_>,
    position: Position,
) -> Result<String, PreprocessError> {
    let handler = HandlerRef::resolve(&occurrence.name, cx.default_namespace());
    let args = DirectiveArgs::new(occurrence.args_text());

    let code = match invoke_compiler(cx, &handler, None, None, args, position)? {
        Some(spliced) => spliced,
        None => cx.syntax().echo_call(&handler, args),
    };
    Ok(format!("{}{code}", occurrence.preceding_whitespace))
}

/// Expand a block whose body has already been compiled.
pub(crate) fn block(
    cx: &CompileContext<'_>,
    occurrence: &DirectiveOccurrence<'_>,
    body: &str,
    position: Position,
) -> Result<String, PreprocessError> {
    let handler = HandlerRef::resolve(&occurrence.name, cx.default_namespace());
    let args = DirectiveArgs::new(occurrence.args_text());
    let indent = occurrence.indent.unwrap_or_default();

    let code = match invoke_compiler(cx, &handler, Some(indent), Some(body), args, position)? {
        Some(spliced) => spliced,
        None => cx.syntax().capture_call(&handler, indent, body, args),
    };
    Ok(format!("{}{indent}{code}", occurrence.preceding_whitespace))
}

/// Run the compile-time variant of `handler`, if one is registered.
fn invoke_compiler(
    cx: &CompileContext<'_>,
    handler: &HandlerRef,
    indent: Option<&str>,
    body: Option<&str>,
    args: DirectiveArgs<'_>,
    position: Position,
) -> Result<Option<String>, PreprocessError> {
    let Some(compiler) = cx.registry().compiler(handler) else {
        return Ok(None);
    };

    tracing::debug!(
        handler = %handler,
        args = args.raw(),
        %position,
        "Invoking compile-time handler"
    );
    let input = CompileInput {
        handler,
        indent,
        body,
        args,
    };
    compiler(&input)
        .map(Some)
        .map_err(|source| PreprocessError::CompileTimeHandlerFailure {
            handler: handler.qualified_compiler_name(),
            args: args.raw().to_owned(),
            position,
            source,
        })
}
