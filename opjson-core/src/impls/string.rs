use alloc::borrow::Cow;

use crate::{ByteBuf, BytesDef, Describe, Kind, Shape, StringDef};

unsafe impl Describe for String {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::String(StringDef {
            as_str: |ptr| unsafe { ptr.get::<String>().as_str() },
        }))
    };
}

unsafe impl Describe for &'static str {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::String(StringDef {
            as_str: |ptr| unsafe { *ptr.get::<&'static str>() },
        }))
    };
}

unsafe impl Describe for Box<str> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::String(StringDef {
            as_str: |ptr| unsafe { &**ptr.get::<Box<str>>() },
        }))
    };
}

unsafe impl Describe for Cow<'static, str> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::String(StringDef {
            as_str: |ptr| unsafe { &**ptr.get::<Cow<'static, str>>() },
        }))
    };
}

unsafe impl Describe for ByteBuf {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Bytes(BytesDef {
            as_bytes: |ptr| unsafe { ptr.get::<ByteBuf>().0.as_slice() },
        }))
    };
}
