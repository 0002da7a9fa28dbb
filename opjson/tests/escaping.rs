use std::collections::HashMap;

use opjson::{
    BoxError, EncodeOptions, MarshalText, describe, describe_text_marshaler, to_string,
    to_string_with_options,
};
use opjson_testhelpers::test;

fn plain() -> EncodeOptions {
    EncodeOptions::default().html_escape(false)
}

#[test]
fn html_safe_by_default() {
    assert_eq!(
        to_string(&"a<b&c\n\"d\\e").unwrap(),
        r#""a\u003cb\u0026c\n\"d\\e""#
    );
    assert_eq!(to_string(&"<>&").unwrap(), r#""\u003c\u003e\u0026""#);
}

#[test]
fn html_escaping_can_be_disabled() {
    assert_eq!(
        to_string_with_options(&"a<b&c\n\"d\\e", &plain()).unwrap(),
        r#""a<b&c\n\"d\\e""#
    );
}

#[test]
fn line_separators_follow_html_mode() {
    let text = "x\u{2028}y\u{2029}";
    assert_eq!(to_string(&text).unwrap(), r#""x\u2028y\u2029""#);
    assert_eq!(
        to_string_with_options(&text, &plain()).unwrap(),
        "\"x\u{2028}y\u{2029}\""
    );
}

#[test]
fn control_characters() {
    assert_eq!(
        to_string(&"\u{0}\u{1}\t\r\n\u{1f}").unwrap(),
        r#""\u0000\u0001\t\r\n\u001f""#
    );
}

#[test]
fn unicode_passes_through() {
    let text = "héllo, 日本語 🦀";
    assert_eq!(to_string(&text).unwrap(), format!("\"{text}\""));
}

#[test]
fn long_strings_escape_anywhere() {
    let mut text = "abcdefghijklmnopqrstuvwxyz".repeat(3);
    text.insert(40, '"');
    text.push('<');
    let json = to_string(&text).unwrap();
    let parsed: String = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, text);
    assert!(json.ends_with(r#"\u003c""#));
    assert_eq!(json.matches(r#"\""#).count(), 1);
}

describe! {
    struct Markup {
        #[json(rename = "<k>")]
        key: &'static str,
        #[json(string)]
        quoted: &'static str,
    }
}

#[test]
fn keys_and_quoted_strings_escape_too() {
    let value = Markup {
        key: "&",
        quoted: "<",
    };
    assert_eq!(
        to_string(&value).unwrap(),
        r#"{"\u003ck\u003e":"\u0026","quoted":"\"\\u003c\""}"#
    );
    assert_eq!(
        to_string_with_options(&value, &plain()).unwrap(),
        r#"{"<k>":"&","quoted":"\"<\""}"#
    );
}

#[test]
fn map_keys_escape() {
    let map = HashMap::from([("a\"b".to_string(), 1u8), ("<".to_string(), 2)]);
    assert_eq!(to_string(&map).unwrap(), r#"{"\u003c":2,"a\"b":1}"#);
}

struct RawBytes(&'static [u8]);

impl MarshalText for RawBytes {
    fn marshal_text(&self) -> Result<Vec<u8>, BoxError> {
        Ok(self.0.to_vec())
    }
}

describe_text_marshaler!(RawBytes);

#[test]
fn invalid_utf8_is_replaced_per_byte() {
    assert_eq!(
        to_string(&RawBytes(b"a\xffb\xc3")).unwrap(),
        r#""a\ufffdb\ufffd""#
    );
    assert_eq!(
        to_string(&RawBytes("é<".as_bytes())).unwrap(),
        r#""é\u003c""#
    );
}

#[test]
fn string_output_matches_byte_output() {
    for value in [RawBytes(b"\xff\xfe"), RawBytes(b"ok"), RawBytes(b"\xe2\x80\xa8<")] {
        let bytes = opjson::to_vec(&value).unwrap();
        assert_eq!(to_string(&value).unwrap().as_bytes(), bytes.as_slice());
    }
}
