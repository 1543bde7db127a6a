//! Rewrite passes.
//!
//! A template goes through every registered [`Extension`] in order. The
//! three directive rules are always registered first:
//! [`BoolAttrRule`], [`ShortCallRule`], then [`BlockRule`].
//!
//! The inline rules leave the bodies of well-formed blocks alone. A body is
//! compiled once, by [`BlockRule`], through a nested pipeline.

use std::ops::Range;

use crate::block::{self, Extracted};
use crate::scanner;
use crate::{CompileContext, PreprocessError, Rewrites, dispatch};

/// A full-document pass over the template source.
///
/// Implementations must be pure with respect to the source: the same input
/// and context always produce the same output.
pub trait Extension: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Transform the whole template.
    ///
    /// # Errors
    ///
    /// Returns an error when the template cannot be compiled. The error
    /// aborts the compilation of the whole template.
    fn apply(&self, source: &str, cx: &CompileContext<'_>) -> Result<String, PreprocessError>;
}

/// Rewrites `name="@boolAttr(expr)"` into conditional host code.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolAttrRule;

impl Extension for BoolAttrRule {
    fn name(&self) -> &str {
        "bool-attr"
    }

    fn apply(&self, source: &str, cx: &CompileContext<'_>) -> Result<String, PreprocessError> {
        let bodies = block_bodies(source);
        let mut rewrites = Rewrites::new();
        let mut cursor = 0;

        while let Some(found) = scanner::find_inline_attribute(source, cursor) {
            let name_start = found.span.start + found.preceding_whitespace.len();
            if let Some(end) = body_end(&bodies, name_start) {
                cursor = end;
                continue;
            }
            let text = format!("{}{}", found.preceding_whitespace, found.attribute);
            let code = cx.syntax().conditional_text(found.expression.trim(), &text);
            cursor = found.span.end;
            rewrites.add(found.span, code);
        }

        tracing::trace!(rule = self.name(), rewrites = rewrites.len(), "Applied rule");
        Ok(rewrites.apply(source))
    }
}

/// Rewrites `@@[ns::]method[(args)]` into a handler call.
///
/// A call directly followed by `:` is left to [`BlockRule`] when it can open
/// a block: it starts its line and an end marker for its name follows.
/// Otherwise the template is rejected, so that `@@x:` never silently becomes
/// a zero-argument call followed by a stray colon.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortCallRule;

impl Extension for ShortCallRule {
    fn name(&self) -> &str {
        "short-call"
    }

    fn apply(&self, source: &str, cx: &CompileContext<'_>) -> Result<String, PreprocessError> {
        let bodies = block_bodies(source);
        let mut rewrites = Rewrites::new();
        let mut cursor = 0;

        while let Some(call) = scanner::find_short_call(source, cursor) {
            let occurrence = call.occurrence;
            let marker = occurrence.marker_offset();
            if let Some(end) = body_end(&bodies, marker) {
                cursor = end;
                continue;
            }
            cursor = occurrence.span.end;

            if call.followed_by_colon {
                if opens_block(source, marker) {
                    continue;
                }
                return Err(PreprocessError::AmbiguousShortCallColon {
                    directive: occurrence.name.full.to_owned(),
                    position: cx.position(source, marker),
                });
            }

            let code = dispatch::inline(cx, &occurrence, cx.position(source, marker))?;
            rewrites.add(occurrence.span, code);
        }

        tracing::trace!(rule = self.name(), rewrites = rewrites.len(), "Applied rule");
        Ok(rewrites.apply(source))
    }
}

/// Whether the `@@` marker at `marker` starts a block that has an end marker.
fn opens_block(source: &str, marker: usize) -> bool {
    scanner::block_start_at(source, 0, marker).is_some_and(|start| {
        scanner::find_terminator(source, start.span.end, start.name.full).is_some()
    })
}

/// Byte ranges of the bodies of well-formed top-level blocks.
fn block_bodies(source: &str) -> Vec<Range<usize>> {
    let mut bodies = Vec::new();
    let mut cursor = 0;

    while let Some(start) = scanner::find_block(source, cursor) {
        let start_end = start.span.end;
        match block::extract(source, start) {
            Extracted::Matched(block) => {
                let len = block.occurrence.body.map_or(0, str::len);
                bodies.push(block.body_offset..block.body_offset + len);
                cursor = block.occurrence.span.end;
            }
            Extracted::Malformed { .. } | Extracted::Unterminated(_) => cursor = start_end,
        }
    }
    bodies
}

/// End of the body that contains `offset`, if any.
fn body_end(bodies: &[Range<usize>], offset: usize) -> Option<usize> {
    bodies
        .iter()
        .find(|body| body.contains(&offset))
        .map(|body| body.end)
}

/// Expands `@@name:` ... `@@endname` blocks.
///
/// Each body is compiled through the whole pipeline before its handler sees
/// it, so blocks nest.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRule;

impl Extension for BlockRule {
    fn name(&self) -> &str {
        "block"
    }

    fn apply(&self, source: &str, cx: &CompileContext<'_>) -> Result<String, PreprocessError> {
        let mut rewrites = Rewrites::new();
        let mut cursor = 0;

        while let Some(start) = scanner::find_block(source, cursor) {
            match block::extract(source, start) {
                Extracted::Matched(block) => {
                    let occurrence = block.occurrence;
                    let position = cx.position(source, occurrence.marker_offset());
                    let origin = cx.position(source, block.body_offset);
                    let body =
                        cx.compile_nested(occurrence.body.unwrap_or_default(), origin, position)?;
                    let code = dispatch::block(cx, &occurrence, &body, position)?;
                    cursor = occurrence.span.end;
                    rewrites.add(occurrence.span, code);
                }
                Extracted::Malformed { start, terminator } => {
                    return Err(PreprocessError::MalformedBlockTerminator {
                        directive: start.name.full.to_owned(),
                        args: start.args.unwrap_or_default().to_owned(),
                        position: cx.position(source, terminator.span.start),
                    });
                }
                Extracted::Unterminated(start) => {
                    let marker = start.span.start
                        + start.preceding_whitespace.len()
                        + start.indent.len();
                    return Err(PreprocessError::UnterminatedBlock {
                        directive: start.name.full.to_owned(),
                        position: cx.position(source, marker),
                    });
                }
            }
        }

        tracing::trace!(rule = self.name(), rewrites = rewrites.len(), "Applied rule");
        Ok(rewrites.apply(source))
    }
}

/// Host-native pass registered after the directive rules.
pub struct NativePass<F> {
    name: String,
    pass: F,
}

impl<F> NativePass<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    /// Wrap a plain text transform.
    pub fn new(name: impl Into<String>, pass: F) -> Self {
        Self {
            name: name.into(),
            pass,
        }
    }
}

impl<F> Extension for NativePass<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, source: &str, _cx: &CompileContext<'_>) -> Result<String, PreprocessError> {
        Ok((self.pass)(source))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        CompileInput, HandlerError, HandlerRegistry, PreprocessorConfig, TemplateCompiler,
    };

    fn compiler(registry: HandlerRegistry) -> TemplateCompiler {
        TemplateCompiler::new(PreprocessorConfig::default(), Arc::new(registry))
    }

    fn run(rule: &dyn Extension, compiler: &TemplateCompiler, source: &str) -> String {
        rule.apply(source, &compiler.context()).unwrap()
    }

    #[test]
    fn test_rules_are_identity_without_directives() {
        let compiler = compiler(HandlerRegistry::new());
        let source = "<p class=\"a\">user@example.com costs $5: yes</p>\n  indented: text\n";
        for rule in [&BoolAttrRule as &dyn Extension, &ShortCallRule, &BlockRule] {
            assert_eq!(run(rule, &compiler, source), source);
        }
    }

    #[test]
    fn test_bool_attr_rule() {
        let compiler = compiler(HandlerRegistry::new());
        let out = run(
            &BoolAttrRule,
            &compiler,
            r#"<option value="1" selected="@boolAttr($a == 1)">"#,
        );
        assert_eq!(
            out,
            r#"<option value="1"<?php echo $a == 1 ? ' selected' : '' ?>>"#
        );
    }

    #[test]
    fn test_bool_attr_rule_multiple() {
        let compiler = compiler(HandlerRegistry::new());
        let out = run(
            &BoolAttrRule,
            &compiler,
            "<input checked='@boolAttr($c)' disabled='@boolAttr($d)'>",
        );
        assert_eq!(
            out,
            "<input<?php echo $c ? ' checked' : '' ?><?php echo $d ? ' disabled' : '' ?>>"
        );
    }

    #[test]
    fn test_short_call_rule_runtime() {
        let compiler = compiler(HandlerRegistry::new());
        let out = run(&ShortCallRule, &compiler, "<div class=\"@@groupClass('email')\">");
        assert_eq!(
            out,
            "<div class=\"<?php echo Directives::groupClass('email') ?>\">"
        );
    }

    #[test]
    fn test_short_call_rule_keeps_preceding_whitespace() {
        let compiler = compiler(HandlerRegistry::new());
        let out = run(&ShortCallRule, &compiler, "<p>\n  @@flash\n</p>");
        assert_eq!(out, "<p>\n  <?php echo Directives::flash() ?>\n</p>");
    }

    #[test]
    fn test_short_call_rule_compile_time() {
        let registry = HandlerRegistry::new().with_compiler("Directives", "token", |_| {
            Ok("<input name=\"_token\">".to_owned())
        });
        let compiler = compiler(registry);
        let out = run(&ShortCallRule, &compiler, "<form> @@token</form>");
        assert_eq!(out, "<form> <input name=\"_token\"></form>");
    }

    #[test]
    fn test_short_call_rule_defers_block_start() {
        let compiler = compiler(HandlerRegistry::new());
        let source = "@@field('a'):\n  <input>\n@@endfield\n";
        assert_eq!(run(&ShortCallRule, &compiler, source), source);
    }

    #[test]
    fn test_short_call_rule_rejects_colon_without_block() {
        let compiler = compiler(HandlerRegistry::new());
        let err = ShortCallRule
            .apply("<p>@@x: text</p>", &compiler.context())
            .unwrap_err();
        let PreprocessError::AmbiguousShortCallColon {
            directive,
            position,
        } = &err
        else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(directive, "x");
        assert_eq!(position.column, 4);
    }

    #[test]
    fn test_short_call_rule_rejects_colon_without_terminator() {
        let compiler = compiler(HandlerRegistry::new());
        let err = ShortCallRule
            .apply("@@x:\nbody", &compiler.context())
            .unwrap_err();
        assert!(matches!(
            err,
            PreprocessError::AmbiguousShortCallColon { .. }
        ));
    }

    #[test]
    fn test_short_call_rule_handler_failure() {
        let registry = HandlerRegistry::new().with_compiler("Directives", "broken", |_| {
            Err(HandlerError::failed("no session"))
        });
        let compiler = compiler(registry);
        let err = ShortCallRule
            .apply("a\n@@broken('x', 2)", &compiler.context())
            .unwrap_err();
        let PreprocessError::CompileTimeHandlerFailure {
            handler,
            args,
            position,
            source,
        } = &err
        else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(handler, "Directives::broken_compiler");
        assert_eq!(args, "'x', 2");
        assert_eq!(position.line, 2);
        assert_eq!(source, &HandlerError::failed("no session"));
    }

    #[test]
    fn test_short_call_rule_leaves_block_bodies() {
        let compiler = compiler(HandlerRegistry::new());
        let out = run(
            &ShortCallRule,
            &compiler,
            "@@wrap:\n  @@flash('@@x')\n@@endwrap\n@@flash",
        );
        assert_eq!(
            out,
            "@@wrap:\n  @@flash('@@x')\n@@endwrap\n<?php echo Directives::flash() ?>"
        );
    }

    #[test]
    fn test_bool_attr_rule_leaves_block_bodies() {
        let compiler = compiler(HandlerRegistry::new());
        let source = "@@wrap:\n  <a x=\"@boolAttr($a)\">\n@@endwrap\n<b y=\"@boolAttr($b)\">";
        let out = run(&BoolAttrRule, &compiler, source);
        assert_eq!(
            out,
            "@@wrap:\n  <a x=\"@boolAttr($a)\">\n@@endwrap\n<b<?php echo $b ? ' y' : '' ?>>"
        );
    }

    #[test]
    fn test_block_rule_runtime() {
        let compiler = compiler(HandlerRegistry::new());
        let out = run(
            &BlockRule,
            &compiler,
            "<form>\n  @@field('name'):\n    <input>\n  @@endfield\n</form>",
        );
        assert_eq!(
            out,
            "<form>\n  <?php ob_start() ?><input>\n  \
             <?php echo Directives::field('  ',ob_get_clean(),'name') ?>\n</form>"
        );
    }

    #[test]
    fn test_block_rule_compile_time_receives_indent_and_args() {
        let registry = HandlerRegistry::new().with_compiler(
            "Forms",
            "wrap",
            |input: &CompileInput<'_>| {
                Ok(format!(
                    "[{}|{}|{}]",
                    input.indent.unwrap_or_default().len(),
                    input.body.unwrap_or_default().trim(),
                    input.args.raw()
                ))
            },
        );
        let compiler = compiler(registry);
        let out = run(
            &BlockRule,
            &compiler,
            "x\n    @@Forms::wrap(1, 2):\n      inner\n    @@endForms::wrap\ny",
        );
        assert_eq!(out, "x\n    [4|inner|1, 2]\ny");
    }

    #[test]
    fn test_block_rule_handler_failure() {
        let registry = HandlerRegistry::new().with_compiler("Directives", "w", |_| {
            Err(HandlerError::failed("bad body"))
        });
        let compiler = compiler(registry);
        let err = BlockRule
            .apply("x\n@@w(1):\n  body\n@@endw", &compiler.context())
            .unwrap_err();
        let PreprocessError::CompileTimeHandlerFailure {
            handler,
            args,
            position,
            source,
        } = &err
        else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(handler, "Directives::w_compiler");
        assert_eq!(args, "1");
        assert_eq!(position.line, 2);
        assert_eq!(position.column, 1);
        assert_eq!(source, &HandlerError::failed("bad body"));
    }

    #[test]
    fn test_block_rule_malformed_terminator() {
        let compiler = compiler(HandlerRegistry::new());
        let err = BlockRule
            .apply("@@x('a'):\nbody\n@endx\n", &compiler.context())
            .unwrap_err();
        let PreprocessError::MalformedBlockTerminator {
            directive,
            args,
            position,
        } = &err
        else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(directive, "x");
        assert_eq!(args, "'a'");
        assert_eq!(position.line, 3);
        assert!(err.to_string().starts_with("Ill-formed close tag for macro @@x('a')"));
    }

    #[test]
    fn test_block_rule_unterminated() {
        let compiler = compiler(HandlerRegistry::new());
        let err = BlockRule
            .apply("ok\n  @@x:\nbody\n", &compiler.context())
            .unwrap_err();
        let PreprocessError::UnterminatedBlock {
            directive,
            position,
        } = &err
        else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(directive, "x");
        assert_eq!(position.line, 2);
        assert_eq!(position.column, 3);
    }

    #[test]
    fn test_native_pass() {
        let compiler = compiler(HandlerRegistry::new());
        let pass = NativePass::new("upper", |s: &str| s.to_uppercase());
        assert_eq!(pass.name(), "upper");
        assert_eq!(run(&pass, &compiler, "abc"), "ABC");
    }
}
