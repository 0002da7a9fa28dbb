//! Validation and re-layout of JSON produced by marshal hooks.
//!
//! Hook output is spliced into the surrounding document, so it must hold a
//! single JSON value, and its whitespace must follow the layout of the
//! rest of the output.

/// How a fragment is laid out when copied.
#[derive(Clone, Copy)]
pub(crate) struct Layout<'a> {
    /// `Some((line_prefix, unit))` to indent, `None` to compact.
    pub indent: Option<(&'a [u8], &'a [u8])>,
    pub html_escape: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    ValueOrClose,
    KeyOrClose,
    Key,
    Colon,
    CommaOrClose,
    Done,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open(u8),
    Close(u8),
    Comma,
    Colon,
    Str(&'a [u8]),
    Literal(&'a [u8]),
}

struct Tokens<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn next(&mut self) -> Result<Option<Token<'a>>, String> {
        while let Some(&b) = self.src.get(self.pos) {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let Some(&b) = self.src.get(self.pos) else {
            return Ok(None);
        };
        let start = self.pos;
        self.pos += 1;
        let token = match b {
            b'{' | b'[' => Token::Open(b),
            b'}' | b']' => Token::Close(b),
            b',' => Token::Comma,
            b':' => Token::Colon,
            b'"' => Token::Str(self.string(start)?),
            b'-' | b'0'..=b'9' | b'a'..=b'z' => {
                while let Some(&b) = self.src.get(self.pos) {
                    if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.') {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                let literal = &self.src[start..self.pos];
                if !is_literal(literal) {
                    return Err(format!(
                        "invalid literal `{}` at offset {start}",
                        String::from_utf8_lossy(literal)
                    ));
                }
                Token::Literal(literal)
            }
            other => {
                return Err(format!(
                    "unexpected character {:?} at offset {start}",
                    char::from(other)
                ));
            }
        };
        Ok(Some(token))
    }

    fn string(&mut self, start: usize) -> Result<&'a [u8], String> {
        loop {
            let Some(&b) = self.src.get(self.pos) else {
                return Err(format!("unterminated string starting at offset {start}"));
            };
            self.pos += 1;
            match b {
                b'"' => break,
                b'\\' => {
                    let escape = self.src.get(self.pos).copied();
                    self.pos += 1;
                    match escape {
                        Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {}
                        Some(b'u') => {
                            let hex = self.src.get(self.pos..self.pos + 4);
                            if !hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                                return Err(format!("invalid unicode escape at offset {}", self.pos));
                            }
                            self.pos += 4;
                        }
                        _ => return Err(format!("invalid escape at offset {}", self.pos - 1)),
                    }
                }
                0x00..=0x1f => {
                    return Err(format!("control character in string at offset {}", self.pos - 1));
                }
                _ => {}
            }
        }
        let raw = &self.src[start..self.pos];
        if core::str::from_utf8(raw).is_err() {
            return Err(format!("invalid UTF-8 in string starting at offset {start}"));
        }
        Ok(raw)
    }
}

fn is_literal(text: &[u8]) -> bool {
    matches!(text, b"true" | b"false" | b"null") || is_number(text)
}

fn is_number(text: &[u8]) -> bool {
    let mut rest = text.strip_prefix(b"-").unwrap_or(text);
    let digits = |s: &[u8]| s.iter().take_while(|b| b.is_ascii_digit()).count();

    let int = digits(rest);
    if int == 0 || (int > 1 && rest[0] == b'0') {
        return false;
    }
    rest = &rest[int..];

    if let Some(frac) = rest.strip_prefix(b".") {
        let n = digits(frac);
        if n == 0 {
            return false;
        }
        rest = &frac[n..];
    }

    if let Some(exp) = rest.strip_prefix(b"e").or_else(|| rest.strip_prefix(b"E")) {
        let exp = exp
            .strip_prefix(b"+")
            .or_else(|| exp.strip_prefix(b"-"))
            .unwrap_or(exp);
        let n = digits(exp);
        if n == 0 {
            return false;
        }
        rest = &exp[n..];
    }

    rest.is_empty()
}

/// Copies the single JSON value in `src` to `dst` using `layout`.
///
/// On error nothing is appended to `dst`.
pub(crate) fn reformat(dst: &mut Vec<u8>, src: &[u8], layout: Layout<'_>) -> Result<(), String> {
    let start = dst.len();
    let result = Reformatter {
        dst,
        layout,
        depth: 0,
        pending_newline: false,
    }
    .run(src);
    if result.is_err() {
        dst.truncate(start);
    }
    result
}

struct Reformatter<'d, 'l> {
    dst: &'d mut Vec<u8>,
    layout: Layout<'l>,
    depth: usize,
    /// An opening bracket was written and its first member is not yet
    /// known; if the container closes right away it stays empty.
    pending_newline: bool,
}

impl Reformatter<'_, '_> {
    fn run(mut self, src: &[u8]) -> Result<(), String> {
        let mut tokens = Tokens { src, pos: 0 };
        let mut stack: Vec<u8> = Vec::new();
        let mut expect = Expect::Value;

        while let Some(token) = tokens.next()? {
            expect = match (token, expect) {
                (Token::Str(_) | Token::Literal(_), Expect::Value | Expect::ValueOrClose) => {
                    self.value(token);
                    if stack.is_empty() {
                        Expect::Done
                    } else {
                        Expect::CommaOrClose
                    }
                }
                (Token::Str(_), Expect::Key | Expect::KeyOrClose) => {
                    self.value(token);
                    Expect::Colon
                }
                (Token::Open(open), Expect::Value | Expect::ValueOrClose) => {
                    self.before_member();
                    self.dst.push(open);
                    self.depth += 1;
                    self.pending_newline = true;
                    stack.push(open);
                    if open == b'{' {
                        Expect::KeyOrClose
                    } else {
                        Expect::ValueOrClose
                    }
                }
                (Token::Close(close), Expect::CommaOrClose | Expect::KeyOrClose | Expect::ValueOrClose) => {
                    let open = stack.pop();
                    let matched = matches!((open, close), (Some(b'{'), b'}') | (Some(b'['), b']'));
                    let allowed = match expect {
                        Expect::KeyOrClose => close == b'}',
                        Expect::ValueOrClose => close == b']',
                        _ => true,
                    };
                    if !matched || !allowed {
                        return Err(format!("unexpected `{}` at offset {}", char::from(close), tokens.pos - 1));
                    }
                    self.depth -= 1;
                    if self.pending_newline {
                        self.pending_newline = false;
                    } else {
                        self.newline(self.depth);
                    }
                    self.dst.push(close);
                    if stack.is_empty() {
                        Expect::Done
                    } else {
                        Expect::CommaOrClose
                    }
                }
                (Token::Comma, Expect::CommaOrClose) => {
                    self.dst.push(b',');
                    self.newline(self.depth);
                    if stack.last() == Some(&b'{') {
                        Expect::Key
                    } else {
                        Expect::Value
                    }
                }
                (Token::Colon, Expect::Colon) => {
                    self.dst.push(b':');
                    if self.layout.indent.is_some() {
                        self.dst.push(b' ');
                    }
                    Expect::Value
                }
                _ => {
                    return Err(format!("unexpected token at offset {}", tokens.pos - 1));
                }
            };
        }

        match expect {
            Expect::Done => Ok(()),
            Expect::Value if stack.is_empty() => Err("empty input".to_string()),
            _ => Err("unexpected end of input".to_string()),
        }
    }

    fn before_member(&mut self) {
        if self.pending_newline {
            self.pending_newline = false;
            self.newline(self.depth);
        }
    }

    fn value(&mut self, token: Token<'_>) {
        self.before_member();
        match token {
            Token::Str(raw) if self.layout.html_escape => escape_html(self.dst, raw),
            Token::Str(raw) | Token::Literal(raw) => self.dst.extend_from_slice(raw),
            _ => {}
        }
    }

    fn newline(&mut self, depth: usize) {
        if let Some((prefix, unit)) = self.layout.indent {
            self.dst.push(b'\n');
            self.dst.extend_from_slice(prefix);
            for _ in 0..depth {
                self.dst.extend_from_slice(unit);
            }
        }
    }
}

/// Copies an already-valid string token, escaping markup characters and
/// the JavaScript line separators.
fn escape_html(dst: &mut Vec<u8>, raw: &[u8]) {
    let mut start = 0;
    let mut i = 0;
    while i < raw.len() {
        let replacement: Option<(&[u8], usize)> = match raw[i] {
            b'<' => Some((b"\\u003c", 1)),
            b'>' => Some((b"\\u003e", 1)),
            b'&' => Some((b"\\u0026", 1)),
            0xe2 if raw.get(i + 1) == Some(&0x80) && raw.get(i + 2) == Some(&0xa8) => {
                Some((b"\\u2028", 3))
            }
            0xe2 if raw.get(i + 1) == Some(&0x80) && raw.get(i + 2) == Some(&0xa9) => {
                Some((b"\\u2029", 3))
            }
            _ => None,
        };
        match replacement {
            Some((escaped, width)) => {
                dst.extend_from_slice(&raw[start..i]);
                dst.extend_from_slice(escaped);
                i += width;
                start = i;
            }
            None => i += 1,
        }
    }
    dst.extend_from_slice(&raw[start..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use opjson_testhelpers::test;

    fn compact(src: &str) -> Result<String, String> {
        let mut dst = Vec::new();
        reformat(
            &mut dst,
            src.as_bytes(),
            Layout {
                indent: None,
                html_escape: false,
            },
        )?;
        Ok(String::from_utf8(dst).unwrap())
    }

    fn indented(src: &str, prefix: &str) -> String {
        let mut dst = Vec::new();
        reformat(
            &mut dst,
            src.as_bytes(),
            Layout {
                indent: Some((prefix.as_bytes(), b"  ")),
                html_escape: false,
            },
        )
        .unwrap();
        String::from_utf8(dst).unwrap()
    }

    #[test]
    fn compaction_drops_insignificant_whitespace() {
        assert_eq!(
            compact(" { \"a\" : [ 1 , 2.5e3 ] ,\n\"b\" : \"x y\" } ").unwrap(),
            r#"{"a":[1,2.5e3],"b":"x y"}"#
        );
    }

    #[test]
    fn indentation_follows_nesting() {
        let out = indented(r#"{"a":[1,{}],"b":[]}"#, "");
        assert_eq!(
            out,
            indoc! {r#"
                {
                  "a": [
                    1,
                    {}
                  ],
                  "b": []
                }"#}
        );
    }

    #[test]
    fn indentation_prefix_applies_after_first_line() {
        assert_eq!(indented("[1]", "    "), "[\n      1\n    ]");
    }

    #[test]
    fn malformed_fragments_are_rejected() {
        for bad in ["", "  ", "{", "[1,]", r#"{"a"}"#, "1 2", "tru", "01", r#""open"#, "[}"] {
            assert!(compact(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn html_escape_rewrites_string_contents() {
        let mut dst = Vec::new();
        reformat(
            &mut dst,
            br#""<a&b>""#,
            Layout {
                indent: None,
                html_escape: true,
            },
        )
        .unwrap();
        assert_eq!(dst, b"\"\\u003ca\\u0026b\\u003e\"");
    }
}
