//! Compiled opcode programs.
//!
//! A program is an arena of [`Opcode`]s linked by index. Every value an
//! opcode writes is followed by a `,`; container-closing opcodes and the
//! root replace or drop that trailing comma.

use core::fmt::{self, Write};

use opjson_core::{
    AsBytesFn, AsStrFn, DerefFn, MapForEachFn, MarshalFn, PtrConst, ResolveFn, ScalarKind, Shape,
};

use crate::cache::ProgramKey;

/// Index of a slot in a context region.
pub(crate) type Slot = usize;

/// Marks a link that the compiler has not resolved yet.
pub(crate) const UNLINKED: usize = usize::MAX;

/// Slots shared by the opcodes of one sequence loop.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SeqSlots {
    pub index: Slot,
    pub len: Slot,
    pub data: Slot,
    pub elem: Slot,
    pub stride: usize,
}

/// Slots shared by the opcodes of one map loop.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MapSlots {
    pub iter: Slot,
    pub index: Slot,
    pub len: Slot,
    pub key: Slot,
    pub value: Slot,
}

pub(crate) enum Op {
    /// Ends a root program.
    End,
    /// Ends a sub-program and resumes the caller.
    Return,
    /// Continuation point after an indirection or container.
    ScopeEnd,

    Scalar {
        kind: ScalarKind,
        quoted: bool,
    },
    Str {
        as_str: AsStrFn,
        quoted: bool,
    },
    Bytes {
        as_bytes: AsBytesFn,
    },

    /// Follows an indirection into `target`, or writes `null` and skips to
    /// the scope end.
    Ptr {
        deref: DerefFn,
        target: Slot,
    },

    EmptyStruct,
    /// Follows a pointer embedded in a struct into `target`. Without a
    /// pointee, skips the fields promoted through it.
    Embed {
        offset: usize,
        deref: DerefFn,
        target: Slot,
        first: bool,
    },
    Field {
        key: Box<[u8]>,
        offset: usize,
        target: Slot,
        first: bool,
        omit_empty: Option<&'static Shape>,
    },
    StructEnd,

    SliceHead {
        seq: SeqSlots,
        len: unsafe fn(PtrConst<'_>) -> usize,
        data: for<'mem> unsafe fn(PtrConst<'mem>) -> PtrConst<'mem>,
    },
    ArrayHead {
        seq: SeqSlots,
        len: usize,
    },
    SeqElem {
        seq: SeqSlots,
    },
    SeqEnd,

    MapHead {
        map: MapSlots,
        len: unsafe fn(PtrConst<'_>) -> usize,
        for_each: MapForEachFn,
    },
    MapKey {
        map: MapSlots,
    },
    MapValue {
        map: MapSlots,
    },
    MapEnd {
        map: MapSlots,
    },

    /// Resolves a type-erased value and calls the program of its concrete
    /// type.
    Interface {
        resolve: ResolveFn,
    },
    /// Calls the program of a type that is still being compiled.
    Recursive,

    Marshal {
        marshal: MarshalFn,
    },
    MarshalText {
        marshal: MarshalFn,
    },
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Op::End => "end",
            Op::Return => "return",
            Op::ScopeEnd => "scope_end",
            Op::Scalar { .. } => "scalar",
            Op::Str { .. } => "string",
            Op::Bytes { .. } => "bytes",
            Op::Ptr { .. } => "ptr",
            Op::EmptyStruct => "empty_struct",
            Op::Embed { .. } => "embed",
            Op::Field { .. } => "field",
            Op::StructEnd => "struct_end",
            Op::SliceHead { .. } => "slice_head",
            Op::ArrayHead { .. } => "array_head",
            Op::SeqElem { .. } => "seq_elem",
            Op::SeqEnd => "seq_end",
            Op::MapHead { .. } => "map_head",
            Op::MapKey { .. } => "map_key",
            Op::MapValue { .. } => "map_value",
            Op::MapEnd { .. } => "map_end",
            Op::Interface { .. } => "interface",
            Op::Recursive => "recursive",
            Op::Marshal { .. } => "marshal",
            Op::MarshalText { .. } => "marshal_text",
        }
    }
}

/// One instruction of a program.
pub(crate) struct Opcode {
    pub op: Op,
    /// Type of the value the opcode works on.
    pub shape: &'static Shape,
    /// Slot holding the address of that value.
    pub slot: Slot,
    /// Nesting depth of the value, relative to the program's root.
    pub indent: usize,
    pub next: usize,
    /// Closing opcode of the scope this opcode opens, if any.
    pub end: usize,
    /// Next field of the same struct. For an embed guard, the first
    /// opcode past the fields promoted through it.
    pub next_field: usize,
}

/// A compiled, immutable encoding program for one type and one option
/// combination.
///
/// Programs are cached process-wide and shared between threads.
pub struct Program {
    pub(crate) ops: Vec<Opcode>,
    pub(crate) head: usize,
    pub(crate) slots: usize,
    pub(crate) shape: &'static Shape,
    pub(crate) key: ProgramKey,
}

impl Program {
    /// The type this program encodes.
    pub fn shape(&self) -> &'static Shape {
        self.shape
    }

    /// Number of opcodes.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if the program has no opcodes.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Size of the context region this program needs.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Renders the program as one line per opcode, for debugging.
    ///
    /// ```
    /// use opjson::{EncodeOptions, describe, program_for};
    ///
    /// describe! {
    ///     struct Point { x: i32, y: i32 }
    /// }
    ///
    /// let program = program_for::<Point>(&EncodeOptions::default()).unwrap();
    /// let listing = program.disassemble();
    /// assert!(listing.contains(r#""x" +0"#));
    /// assert!(listing.lines().last().unwrap().contains("end"));
    /// ```
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (idx, code) in self.ops.iter().enumerate() {
            // writing to a String cannot fail
            let _ = self.write_line(&mut out, idx, code);
        }
        out
    }

    fn write_line(&self, out: &mut String, idx: usize, code: &Opcode) -> fmt::Result {
        let marker = if idx == self.head { '>' } else { ' ' };
        write!(out, "{marker}{idx:>4} ")?;
        for _ in 0..code.indent {
            out.push_str("  ");
        }
        write!(out, "{} [s{}]", code.op.name(), code.slot)?;
        match &code.op {
            Op::Scalar { kind, quoted } => {
                write!(out, " {}", kind.label())?;
                if *quoted {
                    out.push_str(" quoted");
                }
            }
            Op::Str { quoted: true, .. } => out.push_str(" quoted"),
            Op::Field {
                key,
                offset,
                target,
                omit_empty,
                ..
            } => {
                let name = String::from_utf8_lossy(key);
                let name = name.trim_end_matches([':', ' ']);
                write!(out, " {name} +{offset} -> s{target}")?;
                if omit_empty.is_some() {
                    out.push_str(" omitempty");
                }
            }
            Op::Ptr { target, .. } => write!(out, " -> s{target}")?,
            Op::Embed { offset, target, .. } => write!(out, " +{offset} -> s{target}")?,
            Op::ArrayHead { len, .. } => write!(out, " len={len}")?,
            Op::Interface { .. } | Op::Recursive | Op::Marshal { .. } | Op::MarshalText { .. } => {
                write!(out, " {}", code.shape.type_name())?
            }
            _ => {}
        }
        if code.next != UNLINKED {
            write!(out, " next={}", code.next)?;
        }
        if code.end != UNLINKED {
            write!(out, " end={}", code.end)?;
        }
        if code.next_field != UNLINKED {
            write!(out, " next_field={}", code.next_field)?;
        }
        out.push('\n');
        Ok(())
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("shape", &self.shape.type_name())
            .field("ops", &self.ops.len())
            .field("slots", &self.slots)
            .field("root", &self.key.root)
            .finish()
    }
}
