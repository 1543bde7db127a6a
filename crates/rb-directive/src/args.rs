//! Directive argument text.
//!
//! Arguments are opaque host-language code. They are embedded verbatim into
//! generated calls; the helpers here only split and unquote them for
//! compile-time handlers that want individual values.

/// Raw argument text of a directive: the part between `(` and `)`.
///
/// # Example
///
/// ```
/// use rb_directive::DirectiveArgs;
///
/// let args = DirectiveArgs::new(r#"'roles[]', "Roles", ['id' => 'x, y']"#);
/// assert_eq!(args.split().len(), 3);
/// assert_eq!(args.field_name(), Some("roles".to_owned()));
/// assert_eq!(args.get(1).map(DirectiveArgs::unquote), Some("Roles"));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectiveArgs<'a> {
    raw: &'a str,
}

impl<'a> DirectiveArgs<'a> {
    /// Wrap raw argument text.
    #[must_use]
    pub fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    /// The argument text exactly as written.
    #[must_use]
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Whether no arguments were written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Split on top-level commas.
    ///
    /// Commas inside quoted strings or inside `()`, `[]` and `{}` do not
    /// split. Each part is trimmed.
    #[must_use]
    pub fn split(&self) -> Vec<&'a str> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut start = 0;

        for (i, c) in self.raw.char_indices() {
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
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(self.raw[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            }
        }
        parts.push(self.raw[start..].trim());
        parts
    }

    /// Get the argument at `index` after [`split`](Self::split).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.split().get(index).copied()
    }

    /// Field name from the first argument, unquoted, without the `[]` suffix.
    ///
    /// Array fields (multi-selects, checkbox groups) are written `name[]`.
    #[must_use]
    pub fn field_name(&self) -> Option<String> {
        self.get(0)
            .map(|first| strip_array_suffix(Self::unquote(first)).to_owned())
            .filter(|name| !name.is_empty())
    }

    /// Strip one pair of matching single or double quotes.
    #[must_use]
    pub fn unquote(value: &str) -> &str {
        let value = value.trim();
        for q in ['\'', '"'] {
            if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
                return &value[1..value.len() - 1];
            }
        }
        value
    }
}

/// Remove a trailing `[]` array marker from a field name.
#[must_use]
pub fn strip_array_suffix(name: &str) -> &str {
    name.strip_suffix("[]").unwrap_or(name)
}
