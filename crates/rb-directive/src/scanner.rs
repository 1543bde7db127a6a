//! Directive pattern matching.
//!
//! Hand-written scanner for the three directive shapes:
//!
//! - boolean attributes: `name="@boolAttr(expr)"`
//! - short calls: `@@[ns::]method[(args)]`
//! - blocks: `@@[ns::]method[(args)]:` ... `@@end[ns::]method`
//!
//! Every `find_*` function takes the full text and a cursor and returns the
//! next occurrence at or after the cursor. Occurrence spans never start
//! before the cursor, so a rule can feed `span.end` back in as the next
//! cursor and collect non-overlapping rewrites.

use std::ops::Range;

/// Marker of the inline boolean-attribute directive.
pub const BOOL_ATTR_MARKER: &str = "@boolAttr";
/// Marker opening a short call or a block.
pub const CALL_MARKER: &str = "@@";
/// Keyword of block end markers (`@@endname`).
pub const END_KEYWORD: &str = "end";

/// Directive name as written: `method` or `namespace::method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveName<'a> {
    /// The whole name, including the namespace when written.
    pub full: &'a str,
    /// Namespace, if one was written.
    pub namespace: Option<&'a str>,
    /// Method name.
    pub method: &'a str,
}

/// A short-call or block directive found in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveOccurrence<'a> {
    /// Byte range replaced by the rewrite, including `preceding_whitespace`.
    pub span: Range<usize>,
    /// Whitespace run before the directive (or before its line, for blocks).
    pub preceding_whitespace: &'a str,
    /// Directive name.
    pub name: DirectiveName<'a>,
    /// Argument text between the parentheses, if parentheses were written.
    pub args: Option<&'a str>,
    /// Indentation of the block's start line.
    pub indent: Option<&'a str>,
    /// Block body, between the start marker and the terminator.
    pub body: Option<&'a str>,
}

impl DirectiveOccurrence<'_> {
    /// Byte offset of the `@@` marker.
    #[must_use]
    pub fn marker_offset(&self) -> usize {
        self.span.start + self.preceding_whitespace.len() + self.indent.map_or(0, str::len)
    }

    /// Argument text, empty when no parentheses were written.
    #[must_use]
    pub fn args_text(&self) -> &str {
        self.args.unwrap_or_default()
    }
}

/// A short call `@@[ns::]method[(args)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortCall<'a> {
    /// The matched directive.
    pub occurrence: DirectiveOccurrence<'a>,
    /// Whether the character right after the match is `:`.
    pub followed_by_colon: bool,
}

/// Start marker of a block: `@@[ns::]method[(args)]:` at the start of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStart<'a> {
    /// From the start of the preceding whitespace to just past the `:`.
    pub span: Range<usize>,
    /// Whitespace run before the start line.
    pub preceding_whitespace: &'a str,
    /// Spaces and tabs between the line start and the marker.
    pub indent: &'a str,
    /// Directive name.
    pub name: DirectiveName<'a>,
    /// Argument text, if parentheses were written.
    pub args: Option<&'a str>,
}

/// End marker of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminator {
    /// Byte range of the end marker.
    pub span: Range<usize>,
    /// `true` for `@@endname`, `false` for the single-`@` form.
    pub well_formed: bool,
}

/// An inline boolean attribute: `name="@boolAttr(expr)"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeOccurrence<'a> {
    /// From the start of the preceding whitespace to the closing quote.
    pub span: Range<usize>,
    /// Whitespace separating the attribute from what precedes it.
    pub preceding_whitespace: &'a str,
    /// Attribute name.
    pub attribute: &'a str,
    /// Condition expression, verbatim.
    pub expression: &'a str,
}

/// Find the next `name="@boolAttr(expr)"` attribute.
///
/// The attribute value must consist of the directive alone (whitespace
/// aside), and must be closed by the same quote character that opened it.
#[must_use]
pub fn find_inline_attribute(text: &str, cursor: usize) -> Option<AttributeOccurrence<'_>> {
    let mut from = cursor;
    while let Some(rel) = text[from..].find(BOOL_ATTR_MARKER) {
        let at = from + rel;
        from = at + BOOL_ATTR_MARKER.len();
        if let Some(found) = attribute_at(text, cursor, at) {
            return Some(found);
        }
    }
    None
}

/// Find the next short call `@@[ns::]method[(args)]`.
///
/// Names starting with `end` are block terminators and never short calls.
#[must_use]
pub fn find_short_call(text: &str, cursor: usize) -> Option<ShortCall<'_>> {
    let mut from = cursor;
    while let Some(rel) = text[from..].find(CALL_MARKER) {
        let at = from + rel;
        from = at + 1;

        if preceded_by_word(text, at) {
            continue;
        }
        let Some((name, name_end)) = parse_name(text, at + CALL_MARKER.len()) else {
            continue;
        };
        if name.full.starts_with(END_KEYWORD) {
            continue;
        }

        let (args, end) = parse_call_tail(text, name_end);
        let start = whitespace_start(text, cursor, at);
        return Some(ShortCall {
            occurrence: DirectiveOccurrence {
                span: start..end,
                preceding_whitespace: &text[start..at],
                name,
                args: args.map(|r| &text[r]),
                indent: None,
                body: None,
            },
            followed_by_colon: text[end..].starts_with(':'),
        });
    }
    None
}

/// Find the next block start marker.
#[must_use]
pub fn find_block(text: &str, cursor: usize) -> Option<BlockStart<'_>> {
    let mut from = cursor;
    while let Some(rel) = text[from..].find(CALL_MARKER) {
        let at = from + rel;
        from = at + 1;
        if let Some(start) = block_start_at(text, cursor, at) {
            return Some(start);
        }
    }
    None
}

/// Parse a block start marker whose `@@` sits at `at`.
///
/// Returns `None` unless the marker is the first non-blank text of its line
/// and is immediately followed by `:` (after the optional argument list).
#[must_use]
pub fn block_start_at(text: &str, cursor: usize, at: usize) -> Option<BlockStart<'_>> {
    let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
    if line_start < cursor {
        return None;
    }
    let indent = &text[line_start..at];
    if !indent.chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }

    let (name, name_end) = parse_name(text, at + CALL_MARKER.len())?;
    let (args, end) = parse_call_tail(text, name_end);
    if !text[end..].starts_with(':') {
        return None;
    }

    let start = whitespace_start(text, cursor, line_start);
    Some(BlockStart {
        span: start..end + 1,
        preceding_whitespace: &text[start..line_start],
        indent,
        name,
        args: args.map(|r| &text[r]),
    })
}

/// Find the first end marker for `name` at or after `from`.
///
/// Both `@@endname` (well-formed) and `@endname` (malformed) are reported;
/// whichever comes first wins. The name must end at a word boundary, and the
/// single-`@` form must not follow a word character (`me@endname.org`).
#[must_use]
pub fn find_terminator(text: &str, from: usize, name: &str) -> Option<Terminator> {
    let mut search = from;
    while let Some(rel) = text[search..].find('@') {
        let at = search + rel;
        search = at + 1;
        let well_formed = text[at..].starts_with(CALL_MARKER);
        if !well_formed && preceded_by_word(text, at) {
            continue;
        }
        let marker_len = if well_formed { CALL_MARKER.len() } else { 1 };
        if let Some(end) = end_keyword_at(text, at + marker_len, name) {
            return Some(Terminator {
                span: at..end,
                well_formed,
            });
        }
    }
    None
}

/// Word character as understood by the directive grammar (ASCII `\w`).
pub(crate) fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_qualifier_char(c: char) -> bool {
    is_word(c) || c == '\\'
}

fn is_attribute_char(c: char) -> bool {
    is_word(c) || c == '\\' || c == '-'
}

fn word_len(s: &str) -> usize {
    s.find(|c: char| !is_word(c)).unwrap_or(s.len())
}

fn preceded_by_word(text: &str, at: usize) -> bool {
    text[..at].chars().next_back().is_some_and(is_word)
}

/// Start of the whitespace run that ends at `end`, never before `floor`.
fn whitespace_start(text: &str, floor: usize, end: usize) -> usize {
    floor + text[floor..end].trim_end_matches(char::is_whitespace).len()
}

/// Parse `method` or `namespace::method` starting at `start`.
fn parse_name(text: &str, start: usize) -> Option<(DirectiveName<'_>, usize)> {
    let rest = &text[start..];

    let qualifier_len = rest
        .find(|c: char| !is_qualifier_char(c))
        .unwrap_or(rest.len());
    if qualifier_len > 0 && rest[qualifier_len..].starts_with("::") {
        let method_start = qualifier_len + 2;
        let method_len = word_len(&rest[method_start..]);
        if method_len > 0 {
            let end = method_start + method_len;
            let name = DirectiveName {
                full: &rest[..end],
                namespace: Some(&rest[..qualifier_len]),
                method: &rest[method_start..end],
            };
            return Some((name, start + end));
        }
    }

    let method_len = word_len(rest);
    if method_len == 0 {
        return None;
    }
    let name = DirectiveName {
        full: &rest[..method_len],
        namespace: None,
        method: &rest[..method_len],
    };
    Some((name, start + method_len))
}

/// Parse an optional `(args)` after a name.
///
/// Returns the byte range of the argument text and the end of the call.
fn parse_call_tail(text: &str, name_end: usize) -> (Option<Range<usize>>, usize) {
    let after = &text[name_end..];
    let open = name_end + (after.len() - after.trim_start().len());
    if text[open..].starts_with('(')
        && let Some(end) = scan_args(text, open)
    {
        return (Some(open + 1..end - 1), end);
    }
    (None, name_end)
}

/// Index just past the `)` matching the `(` at `open`.
///
/// Nested parentheses and quoted strings are skipped.
fn scan_args(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Match `end<name>` at `start`, returning the end offset.
fn end_keyword_at(text: &str, start: usize, name: &str) -> Option<usize> {
    let rest = text[start..]
        .strip_prefix(END_KEYWORD)?
        .strip_prefix(name)?;
    if rest.chars().next().is_some_and(is_word) {
        return None;
    }
    Some(text.len() - rest.len())
}

/// Match the attribute whose `@boolAttr` marker sits at `at`.
fn attribute_at(text: &str, cursor: usize, at: usize) -> Option<AttributeOccurrence<'_>> {
    // Backwards from the marker: optional blanks, quote, `=`, attribute name.
    let before = text[cursor..at].trim_end_matches(char::is_whitespace);
    let quote = before
        .chars()
        .next_back()
        .filter(|c| *c == '"' || *c == '\'')?;
    let before = before[..before.len() - 1].trim_end_matches(char::is_whitespace);
    let before = before
        .strip_suffix('=')?
        .trim_end_matches(char::is_whitespace);
    let name_len = before.len() - before.trim_end_matches(is_attribute_char).len();
    if name_len == 0 {
        return None;
    }
    let name_end = cursor + before.len();
    let name_start = name_end - name_len;
    if preceded_by_word(text, name_start) {
        return None;
    }
    let space_start = whitespace_start(text, cursor, name_start);

    // Forwards: optional blanks, `(`, the first `)` followed by the same quote.
    let after_marker = at + BOOL_ATTR_MARKER.len();
    let rest = &text[after_marker..];
    let open = after_marker + (rest.len() - rest.trim_start().len());
    if !text[open..].starts_with('(') {
        return None;
    }
    let expr_start = open + 1;
    let mut search = expr_start;
    while let Some(rel) = text[search..].find(')') {
        let close = search + rel;
        let tail = &text[close + 1..];
        let trimmed = tail.trim_start();
        if trimmed.starts_with(quote) {
            let quote_at = close + 1 + (tail.len() - trimmed.len());
            return Some(AttributeOccurrence {
                span: space_start..quote_at + 1,
                preceding_whitespace: &text[space_start..name_start],
                attribute: &text[name_start..name_end],
                expression: &text[expr_start..close],
            });
        }
        search = close + 1;
    }
    None
}
