use crate::Shape;

crate::__opjson_bitflags! {
    /// Encoding options attached to a struct field.
    pub struct FieldFlags: u8 {
        /// Skip the field when its value is empty.
        const OMIT_EMPTY = 1 << 0;
        /// Encode a scalar field as a JSON string holding its text.
        const STRING = 1 << 1;
        /// Promote the fields of a nested struct into the parent object.
        const EMBED = 1 << 2;
        /// Never encode the field.
        const SKIP = 1 << 3;
    }
}

/// A struct field: its JSON key, where it lives and what it holds.
#[derive(Clone, Copy, Debug)]
pub struct Field {
    /// Key used in the JSON object.
    pub name: &'static str,
    /// Byte offset from the start of the struct.
    pub offset: usize,
    /// Descriptor of the field's type.
    pub shape: fn() -> &'static Shape,
    /// Encoding options.
    pub flags: FieldFlags,
}

impl Field {
    /// A field with no options.
    pub const fn new(name: &'static str, offset: usize, shape: fn() -> &'static Shape) -> Self {
        Self {
            name,
            offset,
            shape,
            flags: FieldFlags::empty(),
        }
    }

    /// Sets [`FieldFlags::OMIT_EMPTY`].
    pub const fn omitempty(mut self) -> Self {
        self.flags = self.flags.union(FieldFlags::OMIT_EMPTY);
        self
    }

    /// Sets [`FieldFlags::STRING`].
    pub const fn string(mut self) -> Self {
        self.flags = self.flags.union(FieldFlags::STRING);
        self
    }

    /// Sets [`FieldFlags::EMBED`].
    pub const fn embed(mut self) -> Self {
        self.flags = self.flags.union(FieldFlags::EMBED);
        self
    }

    /// Sets [`FieldFlags::SKIP`].
    pub const fn skip(mut self) -> Self {
        self.flags = self.flags.union(FieldFlags::SKIP);
        self
    }

    /// Replaces the JSON key.
    pub const fn rename(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// The field's descriptor.
    #[inline]
    pub fn shape(&self) -> &'static Shape {
        (self.shape)()
    }

    /// Returns `true` if `flag` is set.
    #[inline]
    pub fn has(&self, flag: FieldFlags) -> bool {
        self.flags.contains(flag)
    }
}
