//! Primitive value encoders: numbers, booleans, strings and byte strings.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Writes an integer in decimal.
#[inline]
pub(crate) fn write_int<I: itoa::Integer>(buf: &mut Vec<u8>, value: I) {
    let mut digits = itoa::Buffer::new();
    buf.extend_from_slice(digits.format(value).as_bytes());
}

#[inline]
pub(crate) fn write_bool(buf: &mut Vec<u8>, value: bool) {
    buf.extend_from_slice(if value { b"true" } else { b"false" });
}

/// Writes a finite float in its shortest round-trip form. Integral values
/// lose the `.0` suffix, so `3.0` encodes as `3`.
///
/// Returns the JSON-less spelling of the value (`NaN`, `+Inf`, `-Inf`) as
/// the error when it is not finite.
pub(crate) fn write_float<F>(buf: &mut Vec<u8>, value: F) -> Result<(), &'static str>
where
    F: ryu::Float + Into<f64>,
{
    let wide: f64 = value.into();
    if wide.is_nan() {
        return Err("NaN");
    }
    if wide.is_infinite() {
        return Err(if wide > 0.0 { "+Inf" } else { "-Inf" });
    }
    let mut digits = ryu::Buffer::new();
    let text = digits.format_finite(value);
    let text = text.strip_suffix(".0").unwrap_or(text);
    buf.extend_from_slice(text.as_bytes());
    Ok(())
}

/// Writes `value` as a quoted JSON string.
#[inline]
pub(crate) fn write_str(buf: &mut Vec<u8>, value: &str, html_escape: bool) {
    write_string_bytes(buf, value.as_bytes(), html_escape);
}

/// Writes possibly invalid UTF-8 as a quoted JSON string. Every byte that
/// is not part of a valid sequence becomes an escaped U+FFFD.
///
/// Strings are scanned 16 bytes at a time; a window that is plain ASCII
/// with nothing to escape is copied as is, anything else goes through the
/// byte-by-byte path.
pub(crate) fn write_string_bytes(buf: &mut Vec<u8>, bytes: &[u8], html_escape: bool) {
    const STEP_SIZE: usize = 16;
    type Chunk = [u8; STEP_SIZE];

    buf.reserve(bytes.len() + 2);
    buf.push(b'"');

    let mut rest = bytes;
    while let Some(Ok(chunk)) = rest.get(..STEP_SIZE).map(Chunk::try_from) {
        if is_plain_window(u128::from_ne_bytes(chunk), html_escape) {
            buf.extend_from_slice(&chunk);
            rest = &rest[STEP_SIZE..];
        } else {
            let used = write_escaped_run(buf, rest, STEP_SIZE, html_escape);
            rest = &rest[used..];
        }
    }
    write_escaped_run(buf, rest, rest.len(), html_escape);

    buf.push(b'"');
}

/// Writes `bytes` as a quoted base64 string (standard alphabet, padded).
pub(crate) fn write_base64(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.push(b'"');
    match base64::encoded_len(bytes.len(), true) {
        Some(len) => {
            let start = buf.len();
            buf.resize(start + len, 0);
            let written = STANDARD
                .encode_slice(bytes, &mut buf[start..])
                .unwrap_or_default();
            buf.truncate(start + written);
        }
        None => buf.extend_from_slice(STANDARD.encode(bytes).as_bytes()),
    }
    buf.push(b'"');
}

#[inline]
fn is_plain_window(window: u128, html_escape: bool) -> bool {
    let completely_ascii = window & 0x80808080808080808080808080808080 == 0;
    let plain = completely_ascii
        && !contains_byte(window, b'"')
        && !contains_byte(window, b'\\')
        && no_control_chars(window);
    if !html_escape {
        return plain;
    }
    plain
        && !contains_byte(window, b'<')
        && !contains_byte(window, b'>')
        && !contains_byte(window, b'&')
}

/// Escapes at least `limit` bytes of `bytes` (or all of them), stopping on
/// a character boundary. Returns the number of bytes consumed.
fn write_escaped_run(buf: &mut Vec<u8>, bytes: &[u8], limit: usize, html_escape: bool) -> usize {
    let mut i = 0;
    let mut start = 0;
    while i < limit && i < bytes.len() {
        let b = bytes[i];
        if b < 0x80 {
            if needs_escape(b, html_escape) {
                buf.extend_from_slice(&bytes[start..i]);
                write_ascii_escape(buf, b);
                start = i + 1;
            }
            i += 1;
            continue;
        }
        match decode_char(&bytes[i..]) {
            Some((c, width)) => {
                if html_escape && (c == '\u{2028}' || c == '\u{2029}') {
                    buf.extend_from_slice(&bytes[start..i]);
                    buf.extend_from_slice(if c == '\u{2028}' {
                        b"\\u2028"
                    } else {
                        b"\\u2029"
                    });
                    start = i + width;
                }
                i += width;
            }
            None => {
                buf.extend_from_slice(&bytes[start..i]);
                buf.extend_from_slice(b"\\ufffd");
                i += 1;
                start = i;
            }
        }
    }
    buf.extend_from_slice(&bytes[start..i]);
    i
}

#[inline]
fn needs_escape(b: u8, html_escape: bool) -> bool {
    match b {
        0x00..=0x1f | b'"' | b'\\' => true,
        b'<' | b'>' | b'&' => html_escape,
        _ => false,
    }
}

fn write_ascii_escape(buf: &mut Vec<u8>, b: u8) {
    match b {
        b'"' => buf.extend_from_slice(b"\\\""),
        b'\\' => buf.extend_from_slice(b"\\\\"),
        b'\n' => buf.extend_from_slice(b"\\n"),
        b'\r' => buf.extend_from_slice(b"\\r"),
        b'\t' => buf.extend_from_slice(b"\\t"),
        _ => buf.extend_from_slice(&[
            b'\\',
            b'u',
            b'0',
            b'0',
            HEX[(b >> 4) as usize],
            HEX[(b & 0xf) as usize],
        ]),
    }
}

/// Decodes one UTF-8 sequence at the start of `bytes`.
fn decode_char(bytes: &[u8]) -> Option<(char, usize)> {
    let width = match *bytes.first()? {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return None,
    };
    let text = core::str::from_utf8(bytes.get(..width)?).ok()?;
    text.chars().next().map(|c| (c, width))
}

/// Check if any byte in the u128 equals the target byte.
/// Uses the SWAR (SIMD Within A Register) technique.
#[inline]
const fn contains_byte(val: u128, byte: u8) -> bool {
    let mask = 0x01010101010101010101010101010101u128 * (byte as u128);
    let xor_result = val ^ mask;
    let has_zero = (xor_result.wrapping_sub(0x01010101010101010101010101010101))
        & !xor_result
        & 0x80808080808080808080808080808080;
    has_zero != 0
}

/// Check that all bytes are at least 0x20.
#[inline]
const fn no_control_chars(value: u128) -> bool {
    let masked = value & 0xe0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0;
    let has_zero = (masked.wrapping_sub(0x01010101010101010101010101010101))
        & !masked
        & 0x80808080808080808080808080808080;
    has_zero == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use opjson_testhelpers::test;

    fn string(s: &str, html: bool) -> String {
        let mut buf = Vec::new();
        write_str(&mut buf, s, html);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn html_mode_escapes_markup() {
        assert_eq!(
            string("a<b&c\n\"d\\e", true),
            "\"a\\u003cb\\u0026c\\n\\\"d\\\\e\""
        );
        assert_eq!(string("a<b&c\n\"d\\e", false), r#""a<b&c\n\"d\\e""#);
        assert_eq!(string("x>y", true), "\"x\\u003ey\"");
    }

    #[test]
    fn line_separators_escape_only_in_html_mode() {
        assert_eq!(string("a\u{2028}b\u{2029}", true), "\"a\\u2028b\\u2029\"");
        assert_eq!(string("a\u{2028}b", false), "\"a\u{2028}b\"");
    }

    #[test]
    fn control_bytes_use_short_or_unicode_escapes() {
        assert_eq!(string("\t\r\u{1}\u{1f}", false), "\"\\t\\r\\u0001\\u001f\"");
    }

    #[test]
    fn long_strings_cross_the_fast_path() {
        let plain = "abcdefghijklmnopqrstuvwxyz0123456789";
        assert_eq!(string(plain, true), format!("\"{plain}\""));

        // escape needed in the second window, multi-byte char straddling a window edge
        let mixed = "0123456789abcdeé<tail and more text here>";
        let expected = serde_json::to_string(mixed)
            .unwrap()
            .replace('<', "\\u003c")
            .replace('>', "\\u003e");
        assert_eq!(string(mixed, true), expected);
    }

    #[test]
    fn invalid_utf8_becomes_replacement_escapes() {
        let mut buf = Vec::new();
        write_string_bytes(&mut buf, b"ok\xff\xe2\x82!", false);
        assert_eq!(buf, "\"ok\\ufffd\\ufffd\\ufffd!\"".as_bytes());
    }

    #[test]
    fn floats_use_shortest_form() {
        let mut buf = Vec::new();
        write_float(&mut buf, 3.0f64).unwrap();
        buf.push(b' ');
        write_float(&mut buf, 0.1f64).unwrap();
        buf.push(b' ');
        write_float(&mut buf, 1.5f32).unwrap();
        assert_eq!(buf, b"3 0.1 1.5");
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let mut buf = Vec::new();
        assert_eq!(write_float(&mut buf, f64::NAN), Err("NaN"));
        assert_eq!(write_float(&mut buf, f64::INFINITY), Err("+Inf"));
        assert_eq!(write_float(&mut buf, f32::NEG_INFINITY), Err("-Inf"));
        assert!(buf.is_empty());
    }

    #[test]
    fn base64_is_quoted_and_padded() {
        let mut buf = Vec::new();
        write_base64(&mut buf, b"hello");
        assert_eq!(buf, br#""aGVsbG8=""#);
        buf.clear();
        write_base64(&mut buf, b"");
        assert_eq!(buf, br#""""#);
    }

    #[test]
    fn integers_cover_extremes() {
        let mut buf = Vec::new();
        write_int(&mut buf, i64::MIN);
        buf.push(b',');
        write_int(&mut buf, u64::MAX);
        assert_eq!(buf, b"-9223372036854775808,18446744073709551615");
    }
}
