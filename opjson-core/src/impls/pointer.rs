use alloc::rc::Rc;
use alloc::sync::Arc;
use core::cell::OnceCell;
use std::sync::OnceLock;

use crate::{Describe, Kind, PointerDef, PtrConst, Shape, shape_of};

unsafe impl<T: Describe> Describe for Option<T> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Pointer(PointerDef {
            pointee: shape_of::<T>,
            deref: |ptr| unsafe { ptr.get::<Option<T>>().as_ref().map(PtrConst::new) },
        }))
    };
}

unsafe impl<T: Describe> Describe for Box<T> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Pointer(PointerDef {
            pointee: shape_of::<T>,
            deref: |ptr| Some(PtrConst::new(&**unsafe { ptr.get::<Box<T>>() })),
        }))
    };
}

unsafe impl<T: Describe> Describe for Rc<T> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Pointer(PointerDef {
            pointee: shape_of::<T>,
            deref: |ptr| Some(PtrConst::new(&**unsafe { ptr.get::<Rc<T>>() })),
        }))
    };
}

unsafe impl<T: Describe> Describe for Arc<T> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Pointer(PointerDef {
            pointee: shape_of::<T>,
            deref: |ptr| Some(PtrConst::new(&**unsafe { ptr.get::<Arc<T>>() })),
        }))
    };
}

unsafe impl<T: Describe> Describe for OnceCell<T> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Pointer(PointerDef {
            pointee: shape_of::<T>,
            deref: |ptr| unsafe { ptr.get::<OnceCell<T>>().get().map(PtrConst::new) },
        }))
    };
}

unsafe impl<T: Describe> Describe for OnceLock<T> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Pointer(PointerDef {
            pointee: shape_of::<T>,
            deref: |ptr| unsafe { ptr.get::<OnceLock<T>>().get().map(PtrConst::new) },
        }))
    };
}
