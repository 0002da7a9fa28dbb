use alloc::sync::Arc;

use crate::{Describe, DynDef, DynDescribe, Kind, PtrConst, Shape};

// `Box<dyn DynDescribe>` is itself `DynDescribe` through the blanket impl,
// so the inner trait object is named explicitly before asking for its shape.

unsafe impl Describe for Box<dyn DynDescribe> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Interface(DynDef {
            resolve: |ptr| {
                let inner: &dyn DynDescribe = &**unsafe { ptr.get::<Box<dyn DynDescribe>>() };
                Some((inner.shape(), PtrConst::new(inner)))
            },
        }))
    };
}

unsafe impl Describe for Arc<dyn DynDescribe + Send + Sync> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Interface(DynDef {
            resolve: |ptr| {
                let inner: &(dyn DynDescribe + Send + Sync) =
                    &**unsafe { ptr.get::<Arc<dyn DynDescribe + Send + Sync>>() };
                Some((inner.shape(), PtrConst::new(inner)))
            },
        }))
    };
}
