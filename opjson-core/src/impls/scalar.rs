use crate::{Describe, Kind, ScalarKind, Shape};

macro_rules! impl_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            unsafe impl Describe for $ty {
                const SHAPE: &'static Shape =
                    &const { Shape::new::<$ty>(Kind::Scalar(ScalarKind::$kind)) };
            }
        )*
    };
}

impl_scalar! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
}
