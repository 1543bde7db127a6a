//! PHP host syntax and built-in compile-time handlers.
//!
//! Output is plain PHP, so it can be fed to Blade or any engine that passes
//! `<?php ?>` tags through.

use crate::{CompileInput, DirectiveArgs, HandlerError, HandlerRef, HandlerRegistry, HostSyntax};

/// Hidden form field carrying the CSRF token.
pub const TOKEN_FIELD: &str = r#"<input type="hidden" name="_token" value="<?=csrf_token()?>">"#;

/// [`HostSyntax`] emitting PHP.
///
/// - inline: `<?php echo NS::method(args) ?>`
/// - block: `<?php ob_start() ?>BODY<?php echo NS::method('INDENT',ob_get_clean(),args) ?>`
/// - boolean attribute: `<?php echo EXPR ? 'TEXT' : '' ?>`
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpSyntax;

impl HostSyntax for PhpSyntax {
    fn echo_call(&self, handler: &HandlerRef, args: DirectiveArgs<'_>) -> String {
        format!("<?php echo {handler}({}) ?>", args.raw())
    }

    fn capture_call(
        &self,
        handler: &HandlerRef,
        indent: &str,
        body: &str,
        args: DirectiveArgs<'_>,
    ) -> String {
        let extra = if args.is_empty() {
            String::new()
        } else {
            format!(",{}", args.raw())
        };
        format!(
            "<?php ob_start() ?>{body}<?php echo {handler}('{}',ob_get_clean(){extra}) ?>",
            single_quoted(indent)
        )
    }

    fn conditional_text(&self, condition: &str, text: &str) -> String {
        format!("<?php echo {condition} ? '{}' : '' ?>", single_quoted(text))
    }
}

/// Escape text for a PHP single-quoted string literal.
fn single_quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Register the built-in compile-time handlers into `namespace`.
///
/// - `php` (block): emits the body as a raw PHP code block, so host code can
///   be written inside templates without `<?php ?>` tags.
/// - `token` (inline): emits [`TOKEN_FIELD`].
pub fn register_builtins(registry: &mut HandlerRegistry, namespace: &str) {
    registry.register_compiler(namespace, "php", php_block);
    registry.register_compiler(namespace, "token", |_| Ok(TOKEN_FIELD.to_owned()));
}

fn php_block(input: &CompileInput<'_>) -> Result<String, HandlerError> {
    let body = input
        .body
        .ok_or_else(|| HandlerError::failed("@@php must be used as a block"))?;
    Ok(format!(
        "<?php\n{}{body}?>",
        input.indent.unwrap_or_default()
    ))
}
