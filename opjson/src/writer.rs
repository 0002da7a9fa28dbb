//! Streaming encoder over a `std::io::Write`.

use std::io::Write;

use opjson_core::{Describe, DynDescribe, PtrConst};

use crate::error::EncodeError;
use crate::options::EncodeOptions;

/// Writes a stream of JSON values, one per line.
///
/// ```
/// use opjson::Encoder;
///
/// let mut encoder = Encoder::new(Vec::new());
/// encoder.encode(&vec![1, 2]).unwrap();
/// encoder.encode(&"<tag>").unwrap();
/// assert_eq!(encoder.into_inner(), b"[1,2]\n\"\\u003ctag\\u003e\"\n");
/// ```
pub struct Encoder<W> {
    writer: W,
    options: EncodeOptions,
    buf: Vec<u8>,
}

impl<W: Write> Encoder<W> {
    /// Create an encoder with default options.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, EncodeOptions::default())
    }

    /// Create an encoder with custom options.
    pub fn with_options(writer: W, options: EncodeOptions) -> Self {
        Self {
            writer,
            options,
            buf: Vec::new(),
        }
    }

    /// Indent subsequent values. See [`EncodeOptions::indent`].
    pub fn set_indent(&mut self, prefix: impl Into<String>, unit: impl Into<String>) {
        self.options = core::mem::take(&mut self.options).indent(prefix, unit);
    }

    /// Turn HTML escaping of strings on or off.
    pub fn set_escape_html(&mut self, enabled: bool) {
        self.options.html_escape = enabled;
    }

    /// The options used for subsequent values.
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Encode `value` and write it followed by a newline. Nothing is
    /// written if encoding fails.
    pub fn encode<T: Describe>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.encode_shape(T::SHAPE, PtrConst::new(value))
    }

    /// Encode a type-erased value followed by a newline.
    pub fn encode_dyn(&mut self, value: &dyn DynDescribe) -> Result<(), EncodeError> {
        self.encode_shape(value.shape(), PtrConst::new(value))
    }

    fn encode_shape(
        &mut self,
        shape: &'static opjson_core::Shape,
        ptr: PtrConst<'_>,
    ) -> Result<(), EncodeError> {
        self.buf.clear();
        crate::encode_into(&mut self.buf, shape, ptr, &self.options)?;
        self.buf.push(b'\n');
        self.writer.write_all(&self.buf)?;
        Ok(())
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
