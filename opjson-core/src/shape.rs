//! Type descriptors.

use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};

use crate::{BoxError, Field, PtrConst};

/// Identity of a described type.
///
/// Wraps `TypeId::of` behind a function pointer so it can be stored in a
/// `const` descriptor.
#[derive(Clone, Copy)]
pub struct ShapeId(fn() -> TypeId);

impl ShapeId {
    /// The identity of `T`.
    #[inline]
    pub const fn of<T: 'static + ?Sized>() -> Self {
        Self(TypeId::of::<T>)
    }

    /// The underlying `TypeId`.
    #[inline]
    pub fn type_id(self) -> TypeId {
        (self.0)()
    }
}

impl PartialEq for ShapeId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl Eq for ShapeId {}

impl Hash for ShapeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id().hash(state);
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.type_id().fmt(f)
    }
}

/// Describes one Rust type: its identity, its name and how to reach its
/// contents in memory.
#[derive(Clone, Copy)]
pub struct Shape {
    /// Type identity, used as the program cache key.
    pub id: ShapeId,
    /// Full type name, used in error messages.
    pub name: fn() -> &'static str,
    /// What the type is and how to walk it.
    pub kind: Kind,
}

impl Shape {
    /// Builds the descriptor of `T` with the given kind.
    #[inline]
    pub const fn new<T: 'static>(kind: Kind) -> Self {
        Self {
            id: ShapeId::of::<T>(),
            name: core::any::type_name::<T>,
            kind,
        }
    }

    /// The full type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        (self.name)()
    }

    /// Returns `true` if both descriptors describe the same type.
    #[inline]
    pub fn is(&self, other: &Shape) -> bool {
        self.id == other.id
    }

    /// Reports whether the value at `ptr` is the empty value of its kind:
    /// `false`, `0`, an empty string, sequence or map, or an absent
    /// indirection. Structs, arrays with elements and hooked types are
    /// never empty.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a valid value of the type this shape describes.
    pub unsafe fn is_zero(&self, ptr: PtrConst<'_>) -> bool {
        unsafe {
            match self.kind {
                Kind::Scalar(scalar) => scalar.is_zero(ptr),
                Kind::String(def) => (def.as_str)(ptr).is_empty(),
                Kind::Bytes(def) => (def.as_bytes)(ptr).is_empty(),
                Kind::Array(def) => def.len == 0,
                Kind::Slice(def) => (def.vtable.len)(ptr) == 0,
                Kind::Map(def) => (def.vtable.len)(ptr) == 0,
                Kind::Pointer(def) => (def.deref)(ptr).is_none(),
                Kind::Interface(def) => (def.resolve)(ptr).is_none(),
                Kind::Struct(_)
                | Kind::Marshaler(_)
                | Kind::TextMarshaler(_)
                | Kind::Opaque => false,
            }
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("name", &self.type_name())
            .field("kind", &self.kind.label())
            .finish()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// The kind of a described type.
#[derive(Clone, Copy)]
pub enum Kind {
    /// Booleans, integers and floats.
    Scalar(ScalarKind),
    /// UTF-8 text.
    String(StringDef),
    /// A byte string, encoded as base64.
    Bytes(BytesDef),
    /// A fixed-length sequence stored inline.
    Array(ArrayDef),
    /// A growable sequence reached through a data pointer.
    Slice(SliceDef),
    /// A key-value collection.
    Map(MapDef),
    /// A record with named fields at fixed offsets.
    Struct(StructDef),
    /// An indirection that may be absent.
    Pointer(PointerDef),
    /// A type-erased value whose concrete type is only known at runtime.
    Interface(DynDef),
    /// A type that produces its own JSON.
    Marshaler(MarshalerDef),
    /// A type that produces text, encoded as a JSON string.
    TextMarshaler(TextMarshalerDef),
    /// A type with no JSON representation.
    Opaque,
}

impl Kind {
    /// Short lowercase name of the kind.
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Scalar(scalar) => scalar.label(),
            Kind::String(_) => "string",
            Kind::Bytes(_) => "bytes",
            Kind::Array(_) => "array",
            Kind::Slice(_) => "slice",
            Kind::Map(_) => "map",
            Kind::Struct(_) => "struct",
            Kind::Pointer(_) => "pointer",
            Kind::Interface(_) => "interface",
            Kind::Marshaler(_) => "marshaler",
            Kind::TextMarshaler(_) => "text marshaler",
            Kind::Opaque => "opaque",
        }
    }
}

/// Primitive value kinds, read directly from memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
}

impl ScalarKind {
    /// Short lowercase name of the kind.
    pub fn label(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::Isize => "isize",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::Usize => "usize",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
        }
    }

    /// Returns `true` for the integer kinds.
    pub fn is_integer(self) -> bool {
        !matches!(self, ScalarKind::Bool | ScalarKind::F32 | ScalarKind::F64)
    }

    /// Reports whether the scalar at `ptr` is `false` or zero.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a valid value of this kind.
    pub unsafe fn is_zero(self, ptr: PtrConst<'_>) -> bool {
        unsafe {
            match self {
                ScalarKind::Bool => !ptr.read::<bool>(),
                ScalarKind::I8 => ptr.read::<i8>() == 0,
                ScalarKind::I16 => ptr.read::<i16>() == 0,
                ScalarKind::I32 => ptr.read::<i32>() == 0,
                ScalarKind::I64 => ptr.read::<i64>() == 0,
                ScalarKind::Isize => ptr.read::<isize>() == 0,
                ScalarKind::U8 => ptr.read::<u8>() == 0,
                ScalarKind::U16 => ptr.read::<u16>() == 0,
                ScalarKind::U32 => ptr.read::<u32>() == 0,
                ScalarKind::U64 => ptr.read::<u64>() == 0,
                ScalarKind::Usize => ptr.read::<usize>() == 0,
                ScalarKind::F32 => ptr.read::<f32>() == 0.0,
                ScalarKind::F64 => ptr.read::<f64>() == 0.0,
            }
        }
    }
}

/// Borrows string contents.
pub type AsStrFn = for<'mem> unsafe fn(PtrConst<'mem>) -> &'mem str;

/// Text types.
#[derive(Clone, Copy)]
pub struct StringDef {
    /// Borrows the text.
    pub as_str: AsStrFn,
}

/// Borrows byte string contents.
pub type AsBytesFn = for<'mem> unsafe fn(PtrConst<'mem>) -> &'mem [u8];

/// Byte string types.
#[derive(Clone, Copy)]
pub struct BytesDef {
    /// Borrows the bytes.
    pub as_bytes: AsBytesFn,
}

/// Fixed-length sequences. Elements start at the value's own address.
#[derive(Clone, Copy)]
pub struct ArrayDef {
    /// Element descriptor.
    pub elem: fn() -> &'static Shape,
    /// Number of elements.
    pub len: usize,
    /// Distance in bytes between consecutive elements.
    pub stride: usize,
}

/// Growable sequences.
#[derive(Clone, Copy)]
pub struct SliceDef {
    /// Element descriptor.
    pub elem: fn() -> &'static Shape,
    /// Distance in bytes between consecutive elements.
    pub stride: usize,
    /// Length and data access.
    pub vtable: &'static SliceVTable,
}

/// Access functions for growable sequences.
#[derive(Clone, Copy)]
pub struct SliceVTable {
    /// Number of elements.
    pub len: unsafe fn(PtrConst<'_>) -> usize,
    /// Address of the first element. Only called when the length is
    /// non-zero.
    pub data: for<'mem> unsafe fn(PtrConst<'mem>) -> PtrConst<'mem>,
}

/// Visits every entry of a map as `(key, value)` pointers.
pub type MapForEachFn =
    for<'mem> unsafe fn(PtrConst<'mem>, &mut dyn FnMut(PtrConst<'mem>, PtrConst<'mem>));

/// Key-value collections.
#[derive(Clone, Copy)]
pub struct MapDef {
    /// Key descriptor.
    pub key: fn() -> &'static Shape,
    /// Value descriptor.
    pub value: fn() -> &'static Shape,
    /// Length and iteration.
    pub vtable: &'static MapVTable,
}

/// Access functions for maps.
#[derive(Clone, Copy)]
pub struct MapVTable {
    /// Number of entries.
    pub len: unsafe fn(PtrConst<'_>) -> usize,
    /// Entry iteration, in the collection's own order.
    pub for_each: MapForEachFn,
}

/// Records.
#[derive(Clone, Copy)]
pub struct StructDef {
    /// Fields in declaration order.
    pub fields: &'static [Field],
}

/// Follows an indirection, or reports that it is absent.
pub type DerefFn = for<'mem> unsafe fn(PtrConst<'mem>) -> Option<PtrConst<'mem>>;

/// Indirections: `Option`, `Box`, reference-counted pointers, once-cells.
#[derive(Clone, Copy)]
pub struct PointerDef {
    /// Descriptor of the target.
    pub pointee: fn() -> &'static Shape,
    /// Follows the indirection.
    pub deref: DerefFn,
}

/// Resolves a type-erased value to its concrete descriptor and address.
pub type ResolveFn =
    for<'mem> unsafe fn(PtrConst<'mem>) -> Option<(&'static Shape, PtrConst<'mem>)>;

/// Type-erased values.
#[derive(Clone, Copy)]
pub struct DynDef {
    /// Finds the concrete value. `None` encodes as `null`.
    pub resolve: ResolveFn,
}

/// Produces the JSON of a value through its own hook.
pub type MarshalFn = unsafe fn(PtrConst<'_>) -> Result<Vec<u8>, BoxError>;

/// Types with a JSON hook.
#[derive(Clone, Copy)]
pub struct MarshalerDef {
    /// Calls the hook.
    pub marshal_json: MarshalFn,
}

/// Types with a text hook.
#[derive(Clone, Copy)]
pub struct TextMarshalerDef {
    /// Calls the hook.
    pub marshal_text: MarshalFn,
}
