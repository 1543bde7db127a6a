//! Directive preprocessor for host template engines.
//!
//! Rewrites a small directive syntax embedded in templates into host-engine
//! code before the host compiles them.
//!
//! # Directive Types
//!
//! - **Boolean attribute**: `checked="@boolAttr($on)"` prints the attribute
//!   name only when the expression is truthy.
//! - **Short call**: `@@[ns::]method[(args)]` calls a handler and prints
//!   its result.
//! - **Block**: `@@[ns::]method[(args)]:` ... `@@end[ns::]method` renders its
//!   body and passes it to a handler, with the indentation of the start line.
//!
//! # Architecture
//!
//! A [`TemplateCompiler`] runs an ordered list of [`Extension`] passes over
//! the whole template: the boolean-attribute rule, the short-call rule, the
//! block rule, then any host-native passes. Each rule collects non-overlapping
//! [`Rewrites`] and applies them in one traversal.
//!
//! Handlers live in a [`HandlerRegistry`]. When a handler has a compile-time
//! variant, the directive is expanded during preprocessing and the result is
//! spliced into the template. Otherwise the compiler emits a host call
//! through the configured [`HostSyntax`] ([`PhpSyntax`] by default).
//!
//! # Example
//!
//! ```
//! use rb_directive::{HandlerRegistry, PreprocessorConfig, TemplateCompiler, register_builtins};
//!
//! let mut registry = HandlerRegistry::new();
//! register_builtins(&mut registry, "Directives");
//!
//! let compiler = TemplateCompiler::new(PreprocessorConfig::default(), registry);
//! let output = compiler
//!     .compile("<form>\n  @@field('email'):\n    <input>\n  @@endfield\n</form>")
//!     .unwrap();
//!
//! assert!(output.contains("<?php ob_start() ?><input>"));
//! assert!(output.contains("Directives::field('  ',ob_get_clean(),'email')"));
//! ```

mod args;
mod block;
mod compiler;
mod dispatch;
mod error;
mod php;
mod registry;
mod resolver;
mod rewrite;
mod rules;
pub mod scanner;
mod syntax;

pub use args::{DirectiveArgs, strip_array_suffix};
pub use compiler::{
    CompileContext, DEFAULT_MAX_DEPTH, DEFAULT_NAMESPACE, PreprocessorConfig, TemplateCompiler,
};
pub use error::{HandlerError, Position, PreprocessError};
pub use php::{PhpSyntax, TOKEN_FIELD, register_builtins};
pub use registry::{
    CompileFn, CompileInput, HandlerEntry, HandlerRegistry, RenderFn, RenderInput,
};
pub use resolver::{COMPILER_SUFFIX, HandlerRef};
pub use rewrite::{Rewrite, Rewrites};
pub use rules::{BlockRule, BoolAttrRule, Extension, NativePass, ShortCallRule};
pub use syntax::HostSyntax;
