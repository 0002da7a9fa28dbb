use std::collections::{BTreeMap, HashMap};

use crate::{Describe, Kind, MapDef, MapVTable, PtrConst, Shape, shape_of};

unsafe impl<K: Describe, V: Describe, S: 'static> Describe for HashMap<K, V, S> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Map(MapDef {
            key: shape_of::<K>,
            value: shape_of::<V>,
            vtable: &const {
                MapVTable {
                    len: |ptr| unsafe { ptr.get::<HashMap<K, V, S>>().len() },
                    for_each: |ptr, visit| {
                        let map = unsafe { ptr.get::<HashMap<K, V, S>>() };
                        for (key, value) in map {
                            visit(PtrConst::new(key), PtrConst::new(value));
                        }
                    },
                }
            },
        }))
    };
}

unsafe impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    const SHAPE: &'static Shape = &const {
        Shape::new::<Self>(Kind::Map(MapDef {
            key: shape_of::<K>,
            value: shape_of::<V>,
            vtable: &const {
                MapVTable {
                    len: |ptr| unsafe { ptr.get::<BTreeMap<K, V>>().len() },
                    for_each: |ptr, visit| {
                        let map = unsafe { ptr.get::<BTreeMap<K, V>>() };
                        for (key, value) in map {
                            visit(PtrConst::new(key), PtrConst::new(value));
                        }
                    },
                }
            },
        }))
    };
}
