#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![doc = include_str!("../README.md")]

/// Trace-level logging macro that forwards to `tracing::trace!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

/// Trace-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Debug-level logging macro that forwards to `tracing::debug!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

/// Debug-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

mod cache;
mod compiler;
mod context;
mod encode;
mod error;
mod fragment;
mod options;
mod pool;
mod program;
mod sort;
mod vm;
mod writer;

use std::sync::Arc;

pub use cache::ProgramCache;
pub use error::EncodeError;
pub use opjson_core::{
    BoxError, ByteBuf, Describe, DynDescribe, MarshalJson, MarshalText, Shape, describe,
    describe_marshaler, describe_opaque, describe_text_marshaler,
};
pub use options::{EncodeOptions, Indent};
pub use program::Program;
pub use writer::Encoder;

use cache::ProgramKey;
use opjson_core::PtrConst;
use vm::Vm;

/// Encode a value to JSON bytes.
///
/// # Example
///
/// ```
/// use opjson::{describe, to_vec};
///
/// describe! {
///     struct Point { x: i32, y: i32 }
/// }
///
/// let point = Point { x: 10, y: 20 };
/// let bytes = to_vec(&point).unwrap();
/// assert_eq!(bytes, br#"{"x":10,"y":20}"#);
/// ```
pub fn to_vec<T: Describe>(value: &T) -> Result<Vec<u8>, EncodeError> {
    to_vec_with_options(value, &EncodeOptions::default())
}

/// Encode a value to JSON bytes, indented with two spaces.
pub fn to_vec_pretty<T: Describe>(value: &T) -> Result<Vec<u8>, EncodeError> {
    to_vec_with_options(value, &EncodeOptions::default().pretty())
}

/// Encode a value to JSON bytes with custom options.
///
/// # Example
///
/// ```
/// use opjson::{EncodeOptions, describe, to_vec_with_options};
///
/// describe! {
///     struct Note { text: String }
/// }
///
/// let note = Note { text: "<b>".into() };
///
/// let bytes = to_vec_with_options(&note, &EncodeOptions::default()).unwrap();
/// assert_eq!(bytes, b"{\"text\":\"\\u003cb\\u003e\"}");
///
/// let bytes = to_vec_with_options(&note, &EncodeOptions::default().html_escape(false)).unwrap();
/// assert_eq!(bytes, br#"{"text":"<b>"}"#);
/// ```
pub fn to_vec_with_options<T: Describe>(
    value: &T,
    options: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    encode_into(&mut buf, T::SHAPE, PtrConst::new(value), options)?;
    Ok(buf)
}

/// Encode a type-erased value to JSON bytes with custom options.
pub fn to_vec_dyn(value: &dyn DynDescribe, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    encode_into(&mut buf, value.shape(), PtrConst::new(value), options)?;
    Ok(buf)
}

/// Encode a value to a JSON string.
///
/// # Example
///
/// ```
/// use opjson::{describe, to_string};
///
/// describe! {
///     struct Person {
///         name: String,
///         #[json(omitempty)]
///         age: u32,
///     }
/// }
///
/// let person = Person { name: "Alice".into(), age: 0 };
/// assert_eq!(to_string(&person).unwrap(), r#"{"name":"Alice"}"#);
/// ```
pub fn to_string<T: Describe>(value: &T) -> Result<String, EncodeError> {
    to_string_with_options(value, &EncodeOptions::default())
}

/// Encode a value to a JSON string, indented with two spaces.
pub fn to_string_pretty<T: Describe>(value: &T) -> Result<String, EncodeError> {
    to_string_with_options(value, &EncodeOptions::default().pretty())
}

/// Encode a value to a JSON string with custom options.
pub fn to_string_with_options<T: Describe>(
    value: &T,
    options: &EncodeOptions,
) -> Result<String, EncodeError> {
    let bytes = to_vec_with_options(value, options)?;
    // string contents are escaped and hook output is validated as UTF-8
    Ok(String::from_utf8(bytes)?)
}

/// Encode a value as JSON into a `std::io::Write` writer.
pub fn to_writer_std<W, T>(writer: W, value: &T) -> Result<(), EncodeError>
where
    W: std::io::Write,
    T: Describe,
{
    to_writer_std_with_options(writer, value, &EncodeOptions::default())
}

/// Encode a value as JSON with custom options into a `std::io::Write`
/// writer. Nothing is written if encoding fails.
///
/// # Example
///
/// ```
/// use opjson::{EncodeOptions, describe, to_writer_std_with_options};
///
/// describe! {
///     struct Pair { a: u8, b: Vec<u8> }
/// }
///
/// let mut out = Vec::new();
/// let options = EncodeOptions::default().indent("", "\t");
/// to_writer_std_with_options(&mut out, &Pair { a: 1, b: vec![] }, &options).unwrap();
/// assert_eq!(out, b"{\n\t\"a\": 1,\n\t\"b\": []\n}");
/// ```
pub fn to_writer_std_with_options<W, T>(
    mut writer: W,
    value: &T,
    options: &EncodeOptions,
) -> Result<(), EncodeError>
where
    W: std::io::Write,
    T: Describe,
{
    let bytes = to_vec_with_options(value, options)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Returns the root program used to encode `T` with `options`, compiling
/// it if needed.
pub fn program_for<T: Describe>(options: &EncodeOptions) -> Result<Arc<Program>, EncodeError> {
    cache::get_or_compile(T::SHAPE, ProgramKey::new(T::SHAPE, options, true))
}

/// Appends the JSON for the value at `ptr` to `buf`. On error `buf` is
/// left as it was.
pub(crate) fn encode_into(
    buf: &mut Vec<u8>,
    shape: &'static Shape,
    ptr: PtrConst<'_>,
    options: &EncodeOptions,
) -> Result<(), EncodeError> {
    let start = buf.len();
    let result = cache::get_or_compile(shape, ProgramKey::new(shape, options, true))
        .and_then(|program| Vm::new(options).run(buf, program, ptr));
    match result {
        Ok(()) => {
            if buf.last() == Some(&b',') {
                buf.pop();
            }
            Ok(())
        }
        Err(err) => {
            debug!("encoding {} failed: {err}", shape.type_name());
            buf.truncate(start);
            Err(err)
        }
    }
}
