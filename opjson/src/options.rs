/// Indentation applied to nested values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Indent {
    /// Written at the start of every line after the first.
    pub prefix: String,
    /// Written once per nesting level after the prefix.
    pub unit: String,
}

/// Options for JSON encoding.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Line layout for nested values (default: compact)
    pub indent: Option<Indent>,

    /// Escape `<`, `>`, `&`, U+2028 and U+2029 in strings (default: true)
    pub html_escape: bool,

    /// Emit map entries sorted by key (default: true)
    pub deterministic_map_order: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            indent: None,
            html_escape: true,
            deterministic_map_order: true,
        }
    }
}

impl EncodeOptions {
    /// Create new default options (compact, HTML-safe, sorted maps).
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent with two spaces and no prefix.
    pub fn pretty(self) -> Self {
        self.indent("", "  ")
    }

    /// Indent nested values: every line after the first starts with
    /// `prefix` followed by one `unit` per nesting level.
    pub fn indent(mut self, prefix: impl Into<String>, unit: impl Into<String>) -> Self {
        self.indent = Some(Indent {
            prefix: prefix.into(),
            unit: unit.into(),
        });
        self
    }

    /// Turn HTML escaping of strings on or off.
    pub fn html_escape(mut self, enabled: bool) -> Self {
        self.html_escape = enabled;
        self
    }

    /// Emit map entries in the collection's own iteration order instead of
    /// sorting them by key.
    pub fn unordered_map(mut self) -> Self {
        self.deterministic_map_order = false;
        self
    }

    /// Write a newline followed by the line prefix for `depth` levels.
    pub(crate) fn write_newline(&self, buf: &mut Vec<u8>, depth: usize) {
        if let Some(indent) = &self.indent {
            buf.push(b'\n');
            buf.extend_from_slice(indent.prefix.as_bytes());
            for _ in 0..depth {
                buf.extend_from_slice(indent.unit.as_bytes());
            }
        }
    }

    /// The full line prefix at `depth`, as used for re-indenting hook output.
    pub(crate) fn line_prefix(&self, depth: usize) -> Vec<u8> {
        let mut prefix = Vec::new();
        if let Some(indent) = &self.indent {
            prefix.extend_from_slice(indent.prefix.as_bytes());
            for _ in 0..depth {
                prefix.extend_from_slice(indent.unit.as_bytes());
            }
        }
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opjson_testhelpers::test;

    #[test]
    fn defaults_are_compact_html_safe_and_sorted() {
        let options = EncodeOptions::default();
        assert!(options.indent.is_none());
        assert!(options.html_escape);
        assert!(options.deterministic_map_order);
    }

    #[test]
    fn newline_repeats_unit_per_level() {
        let options = EncodeOptions::new().indent(">", "--");
        let mut buf = Vec::new();
        options.write_newline(&mut buf, 2);
        assert_eq!(buf, b"\n>----");
        assert_eq!(options.line_prefix(1), b">--");
    }

    #[test]
    fn compact_mode_writes_no_whitespace() {
        let mut buf = Vec::new();
        EncodeOptions::new().write_newline(&mut buf, 3);
        assert!(buf.is_empty());
    }
}
