//! Span-based text rewriting.
//!
//! Each rule pass collects its rewrites first and applies them afterwards.

use std::ops::Range;

/// A replacement of one byte range of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Byte range in the source text.
    pub span: Range<usize>,
    /// Replacement text.
    pub replacement: String,
}

/// Collects the rewrites of one pass and applies them in a single traversal.
///
/// Rewrites must be added in source order and must not overlap; the scanner
/// guarantees this by resuming each search at the end of the previous match.
///
/// # Example
///
/// ```
/// use rb_directive::Rewrites;
///
/// let source = "Hello @@name, bye @@name.";
/// let mut rewrites = Rewrites::new();
/// rewrites.add(6..12, "<?php echo $name ?>");
/// rewrites.add(18..24, "<?php echo $name ?>");
///
/// assert_eq!(
///     rewrites.apply(source),
///     "Hello <?php echo $name ?>, bye <?php echo $name ?>."
/// );
/// ```
#[derive(Debug, Default)]
pub struct Rewrites {
    items: Vec<Rewrite>,
}

impl Rewrites {
    /// Create a new empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new collector with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Register a rewrite of `span`.
    ///
    /// The span must start at or after the end of the previously added one.
    pub fn add(&mut self, span: Range<usize>, replacement: impl Into<String>) {
        debug_assert!(span.start <= span.end, "inverted rewrite span {span:?}");
        debug_assert!(
            self.items.last().is_none_or(|last| last.span.end <= span.start),
            "overlapping rewrite span {span:?}"
        );
        self.items.push(Rewrite {
            span,
            replacement: replacement.into(),
        });
    }

    /// Apply all rewrites to `source`.
    ///
    /// Consumes the collector to prevent accidental reuse against a
    /// different text.
    #[must_use]
    pub fn apply(self, source: &str) -> String {
        if self.items.is_empty() {
            return source.to_owned();
        }

        let added: usize = self.items.iter().map(|r| r.replacement.len()).sum();
        let mut output = String::with_capacity(source.len() + added);
        let mut copied = 0;

        for rewrite in self.items {
            output.push_str(&source[copied..rewrite.span.start]);
            output.push_str(&rewrite.replacement);
            copied = rewrite.span.end;
        }
        output.push_str(&source[copied..]);

        output
    }

    /// Check if there are any rewrites registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of registered rewrites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}
