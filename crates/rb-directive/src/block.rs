//! Block content extraction.

use crate::scanner::{self, BlockStart, DirectiveOccurrence, Terminator};

/// A block with its terminator resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block<'a> {
    /// The whole block, from the preceding whitespace to the end marker.
    pub occurrence: DirectiveOccurrence<'a>,
    /// Byte offset of the body in the scanned text.
    pub body_offset: usize,
}

/// Outcome of scanning a block body for its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Extracted<'a> {
    /// Closed by `@@end<name>`.
    Matched(Block<'a>),
    /// Closed by `@end<name>`.
    Malformed {
        start: BlockStart<'a>,
        terminator: Terminator,
    },
    /// Input ended inside the body.
    Unterminated(BlockStart<'a>),
}

/// Resolve the body and terminator of the block opened by `start`.
///
/// The body starts after the colon and any whitespace following it, and
/// ends right before the first end marker for the name as written.
pub(crate) fn extract<'a>(text: &'a str, start: BlockStart<'a>) -> Extracted<'a> {
    let after_colon = &text[start.span.end..];
    let body_offset = start.span.end + (after_colon.len() - after_colon.trim_start().len());

    let Some(terminator) = scanner::find_terminator(text, body_offset, start.name.full) else {
        return Extracted::Unterminated(start);
    };
    if !terminator.well_formed {
        return Extracted::Malformed { start, terminator };
    }

    Extracted::Matched(Block {
        occurrence: DirectiveOccurrence {
            span: start.span.start..terminator.span.end,
            preceding_whitespace: start.preceding_whitespace,
            name: start.name,
            args: start.args,
            indent: Some(start.indent),
            body: Some(&text[body_offset..terminator.span.start]),
        },
        body_offset,
    })
}
