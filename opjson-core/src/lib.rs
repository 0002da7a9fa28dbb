#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod bitflags;

mod ptr;
pub use ptr::*;

mod shape;
pub use shape::*;

mod field;
pub use field::*;

mod hooks;
pub use hooks::*;

mod macros;

mod impls;

/// A type whose memory layout can be described to the encoder.
///
/// Implementations are normally generated by [`describe!`] for structs and
/// by the hook macros for types with custom encodings.
///
/// # Safety
///
/// The encoder reads values through raw pointers guided by `SHAPE`. The
/// shape must match the type's real layout: field offsets and field shapes
/// must be those of the actual fields, and every vtable function must accept
/// a pointer to a `Self`. A wrong shape lets the encoder read out of bounds
/// or reinterpret memory as the wrong type.
///
/// ```compile_fail
/// use opjson_core::{Describe, Kind, ScalarKind, Shape};
///
/// struct Meters(f64);
///
/// // a plain `impl` is rejected; the layout claim must be acknowledged
/// impl Describe for Meters {
///     const SHAPE: &'static Shape = &const { Shape::new::<Meters>(Kind::Scalar(ScalarKind::F64)) };
/// }
/// ```
pub unsafe trait Describe: 'static {
    /// The descriptor for `Self`.
    const SHAPE: &'static Shape;
}

/// Returns the descriptor of `T`.
///
/// Field and element descriptors refer to this function through a function
/// pointer, which lets a type mention itself without a const cycle.
#[inline]
pub fn shape_of<T: Describe>() -> &'static Shape {
    T::SHAPE
}
