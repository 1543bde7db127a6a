//! Preprocessing and handler error types.

use std::fmt;

/// Location of a directive inside the template being compiled (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number.
    pub line: usize,
    /// Column number, counted in characters.
    pub column: usize,
}

impl Position {
    /// First character of a template.
    pub(crate) const START: Self = Self { line: 1, column: 1 };

    /// Locate a byte offset inside `text`.
    ///
    /// `origin` is where `text` begins in the enclosing template
    /// ([`Position::START`] unless `text` is a block body compiled
    /// recursively). Columns on the first line of `text` continue from it.
    pub(crate) fn locate(text: &str, offset: usize, origin: Position) -> Self {
        let before = &text[..offset.min(text.len())];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let chars = before[line_start..].chars().count();
        if line == 0 {
            Self {
                line: origin.line,
                column: origin.column + chars,
            }
        } else {
            Self {
                line: origin.line + line,
                column: chars + 1,
            }
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Error returned by a directive handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// No handler is registered under the requested name.
    #[error("unknown handler {0}")]
    UnknownHandler(String),
    /// The handler ran and reported a failure.
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Create a [`HandlerError::Failed`] with the given message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Fatal error raised while preprocessing a template.
///
/// Any of these aborts the compilation of the whole template; no partial
/// output is ever returned alongside them.
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    /// A block was closed with the single-`@` marker of the other dialect.
    #[error(
        "Ill-formed close tag for macro @@{directive}({args}) at {position}: expected @@end{directive}"
    )]
    MalformedBlockTerminator {
        /// Directive name as written at the start marker.
        directive: String,
        /// Raw argument text of the start marker.
        args: String,
        /// Position of the offending close tag.
        position: Position,
    },
    /// A block start marker has no terminator before the end of input.
    #[error("Unterminated block @@{directive} at {position}: missing @@end{directive}")]
    UnterminatedBlock {
        /// Directive name as written at the start marker.
        directive: String,
        /// Position of the start marker.
        position: Position,
    },
    /// A short call is followed by a colon but cannot open a block.
    #[error(
        "Directive @@{directive} at {position} is followed by ':' but no block can be formed \
         (missing @@end{directive}, or the marker does not start a line)"
    )]
    AmbiguousShortCallColon {
        /// Directive name as written.
        directive: String,
        /// Position of the directive.
        position: Position,
    },
    /// A compile-time handler returned an error.
    #[error("Compile-time handler {handler} failed at {position} with arguments ({args}): {source}")]
    CompileTimeHandlerFailure {
        /// Compile-time handler name (`namespace::method_compiler`).
        handler: String,
        /// Raw argument text passed to the handler.
        args: String,
        /// Position of the directive.
        position: Position,
        /// Error reported by the handler.
        #[source]
        source: HandlerError,
    },
    /// Block bodies are nested deeper than the configured limit.
    #[error("Block nesting exceeds the maximum depth of {max_depth} at {position}")]
    NestingTooDeep {
        /// Configured maximum depth.
        max_depth: usize,
        /// Position of the block whose body could not be expanded.
        position: Position,
    },
}

impl PreprocessError {
    /// Position of the offending directive.
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            Self::MalformedBlockTerminator { position, .. }
            | Self::UnterminatedBlock { position, .. }
            | Self::AmbiguousShortCallColon { position, .. }
            | Self::CompileTimeHandlerFailure { position, .. }
            | Self::NestingTooDeep { position, .. } => *position,
        }
    }
}
