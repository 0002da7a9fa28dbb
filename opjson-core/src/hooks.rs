//! Custom encoding hooks and type-erased values.

use core::ops::{Deref, DerefMut};

use crate::{Describe, MarshalerDef, PtrConst, Shape, TextMarshalerDef};

/// Error type returned by encoding hooks.
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

/// A type that writes its own JSON.
///
/// The returned bytes must hold exactly one JSON value. The encoder
/// validates them and re-formats whitespace to match the surrounding
/// output.
pub trait MarshalJson {
    /// Produces the JSON for `self`.
    fn marshal_json(&self) -> Result<Vec<u8>, BoxError>;
}

/// A type that renders itself as text.
///
/// The text is encoded as a JSON string. Map keys of such types use the
/// text as the key.
pub trait MarshalText {
    /// Produces the text for `self`. Invalid UTF-8 is replaced when
    /// encoded.
    fn marshal_text(&self) -> Result<Vec<u8>, BoxError>;
}

unsafe fn marshal_json_thunk<T: MarshalJson>(ptr: PtrConst<'_>) -> Result<Vec<u8>, BoxError> {
    unsafe { ptr.get::<T>() }.marshal_json()
}

unsafe fn marshal_text_thunk<T: MarshalText>(ptr: PtrConst<'_>) -> Result<Vec<u8>, BoxError> {
    unsafe { ptr.get::<T>() }.marshal_text()
}

impl MarshalerDef {
    /// The hook of `T`.
    pub const fn of<T: MarshalJson>() -> Self {
        Self {
            marshal_json: marshal_json_thunk::<T>,
        }
    }
}

impl TextMarshalerDef {
    /// The hook of `T`.
    pub const fn of<T: MarshalText>() -> Self {
        Self {
            marshal_text: marshal_text_thunk::<T>,
        }
    }
}

/// Object-safe access to a value's descriptor.
///
/// `Box<dyn DynDescribe>` and `Arc<dyn DynDescribe>` encode as whatever
/// concrete value they hold.
///
/// # Safety
///
/// `shape` must return the descriptor of the concrete type behind `self`.
/// Every [`Describe`] type gets this through the blanket impl.
pub unsafe trait DynDescribe: 'static {
    /// The descriptor of the concrete type.
    fn shape(&self) -> &'static Shape;
}

unsafe impl<T: Describe> DynDescribe for T {
    fn shape(&self) -> &'static Shape {
        T::SHAPE
    }
}

/// Bytes that encode as a base64 string rather than an array of numbers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteBuf(pub Vec<u8>);

impl ByteBuf {
    /// Wraps `bytes`.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }
}

impl Deref for ByteBuf {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for ByteBuf {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl From<Vec<u8>> for ByteBuf {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}
