use crate::{ArrayDef, Describe, Kind, PtrConst, Shape, SliceDef, SliceVTable, shape_of};

unsafe impl<T: Describe> Describe for Vec<T> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Slice(SliceDef {
            elem: shape_of::<T>,
            stride: core::mem::size_of::<T>(),
            vtable: &const {
                SliceVTable {
                    len: |ptr| unsafe { ptr.get::<Vec<T>>().len() },
                    data: |ptr| unsafe { PtrConst::new(ptr.get::<Vec<T>>().as_slice()) },
                }
            },
        }))
    };
}

unsafe impl<T: Describe> Describe for Box<[T]> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Slice(SliceDef {
            elem: shape_of::<T>,
            stride: core::mem::size_of::<T>(),
            vtable: &const {
                SliceVTable {
                    len: |ptr| unsafe { ptr.get::<Box<[T]>>().len() },
                    data: |ptr| unsafe { PtrConst::new(&**ptr.get::<Box<[T]>>()) },
                }
            },
        }))
    };
}

unsafe impl<T: Describe, const N: usize> Describe for [T; N] {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Array(ArrayDef {
            elem: shape_of::<T>,
            len: N,
            stride: core::mem::size_of::<T>(),
        }))
    };
}
