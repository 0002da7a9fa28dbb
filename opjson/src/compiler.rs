//! Shape to opcode-graph compiler.

use opjson_core::{DerefFn, FieldFlags, Kind, Shape, ShapeId, StructDef};

use crate::cache::ProgramKey;
use crate::context::FIRST_FREE_SLOT;
use crate::encode::write_str;
use crate::error::{EncodeError, Result};
use crate::program::{MapSlots, Op, Opcode, Program, SeqSlots, Slot, UNLINKED};

/// A compiled piece of graph with one entry and one exit. The exit's
/// `next` is left unlinked for the caller to patch.
#[derive(Clone, Copy)]
struct Fragment {
    head: usize,
    tail: usize,
}

/// Compiles the program for `shape`.
///
/// Structs that appear again inside themselves become `Recursive` opcodes,
/// which call the struct's own program at runtime.
pub(crate) fn compile(shape: &'static Shape, key: ProgramKey) -> Result<Program> {
    let mut compiler = Compiler {
        ops: Vec::new(),
        slots: FIRST_FREE_SLOT,
        key,
        stack: Vec::new(),
    };
    let input = 0;
    let root = compiler.value(shape, input, 0, false)?;
    let terminal = compiler.push(if key.root { Op::End } else { Op::Return }, shape, input, 0);
    compiler.link(root.tail, terminal);

    debug_assert!(
        compiler
            .ops
            .iter()
            .all(|code| code.next != UNLINKED || matches!(code.op, Op::End | Op::Return)),
        "unlinked opcode in program for {}",
        shape.type_name()
    );

    let program = Program {
        ops: compiler.ops,
        head: root.head,
        slots: compiler.slots,
        shape,
        key,
    };
    debug!(
        "compiled {} ({} ops, {} slots, root={})",
        shape.type_name(),
        program.len(),
        program.slots,
        key.root
    );
    trace!("program for {}:\n{}", shape.type_name(), program.disassemble());
    Ok(program)
}

struct Compiler {
    ops: Vec<Opcode>,
    slots: usize,
    key: ProgramKey,
    /// Structs currently being compiled, outermost first.
    stack: Vec<ShapeId>,
}

/// A struct field after embedded structs have been promoted.
struct FlatField {
    name: &'static str,
    /// Relative to the struct, or to the pointee of `origin`.
    offset: usize,
    shape: &'static Shape,
    flags: FieldFlags,
    depth: usize,
    /// Innermost embedded pointer the field is reached through.
    origin: Option<usize>,
}

/// One pointer layer of an embedded field, such as the `Option` or the
/// `Box` of an embedded `Option<Box<T>>`.
struct EmbedPtr {
    /// Enclosing embedded pointer, if any.
    parent: Option<usize>,
    /// Offset of the pointer within the struct or the parent's pointee.
    offset: usize,
    deref: DerefFn,
    shape: &'static Shape,
}

impl EmbedPtr {
    /// Indices of `origin` and its parents, outermost first.
    fn chain(embeds: &[EmbedPtr], origin: Option<usize>) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut cursor = origin;
        while let Some(index) = cursor {
            chain.push(index);
            cursor = embeds[index].parent;
        }
        chain.reverse();
        chain
    }
}

impl Compiler {
    fn alloc_slot(&mut self) -> Slot {
        let slot = self.slots;
        self.slots += 1;
        slot
    }

    fn push(&mut self, op: Op, shape: &'static Shape, slot: Slot, indent: usize) -> usize {
        self.ops.push(Opcode {
            op,
            shape,
            slot,
            indent,
            next: UNLINKED,
            end: UNLINKED,
            next_field: UNLINKED,
        });
        self.ops.len() - 1
    }

    fn single(&mut self, op: Op, shape: &'static Shape, slot: Slot, indent: usize) -> Fragment {
        let idx = self.push(op, shape, slot, indent);
        Fragment {
            head: idx,
            tail: idx,
        }
    }

    fn link(&mut self, from: usize, to: usize) {
        self.ops[from].next = to;
    }

    /// Compiles the value of `shape` whose address is stored in `slot`.
    /// `quoted` wraps scalars in a JSON string.
    fn value(
        &mut self,
        shape: &'static Shape,
        slot: Slot,
        depth: usize,
        quoted: bool,
    ) -> Result<Fragment> {
        let fragment = match shape.kind {
            Kind::Scalar(kind) => self.single(Op::Scalar { kind, quoted }, shape, slot, depth),
            Kind::String(def) => self.single(
                Op::Str {
                    as_str: def.as_str,
                    quoted,
                },
                shape,
                slot,
                depth,
            ),
            Kind::Bytes(def) => self.single(
                Op::Bytes {
                    as_bytes: def.as_bytes,
                },
                shape,
                slot,
                depth,
            ),
            Kind::Pointer(def) => {
                let target = self.alloc_slot();
                let ptr = self.push(
                    Op::Ptr {
                        deref: def.deref,
                        target,
                    },
                    shape,
                    slot,
                    depth,
                );
                let body = self.value((def.pointee)(), target, depth, quoted)?;
                let end = self.push(Op::ScopeEnd, shape, slot, depth);
                self.link(ptr, body.head);
                self.link(body.tail, end);
                self.ops[ptr].end = end;
                Fragment {
                    head: ptr,
                    tail: end,
                }
            }
            Kind::Struct(def) => {
                if self.stack.contains(&shape.id) {
                    trace!("recursive reference to {}", shape.type_name());
                    self.single(Op::Recursive, shape, slot, depth)
                } else {
                    self.stack.push(shape.id);
                    let fragment = self.structure(shape, &def, slot, depth);
                    self.stack.pop();
                    fragment?
                }
            }
            Kind::Slice(def) => {
                let seq = self.seq_slots(def.stride);
                let head = self.push(
                    Op::SliceHead {
                        seq,
                        len: def.vtable.len,
                        data: def.vtable.data,
                    },
                    shape,
                    slot,
                    depth,
                );
                self.sequence(shape, head, seq, (def.elem)(), depth)?
            }
            Kind::Array(def) => {
                let seq = self.seq_slots(def.stride);
                let head = self.push(Op::ArrayHead { seq, len: def.len }, shape, slot, depth);
                self.sequence(shape, head, seq, (def.elem)(), depth)?
            }
            Kind::Map(def) => {
                let map = MapSlots {
                    iter: self.alloc_slot(),
                    index: self.alloc_slot(),
                    len: self.alloc_slot(),
                    key: self.alloc_slot(),
                    value: self.alloc_slot(),
                };
                let head = self.push(
                    Op::MapHead {
                        map,
                        len: def.vtable.len,
                        for_each: def.vtable.for_each,
                    },
                    shape,
                    slot,
                    depth,
                );
                let key_op = self.push(Op::MapKey { map }, shape, slot, depth);
                let key = self.map_key(shape, (def.key)(), map.key, depth + 1)?;
                let value_op = self.push(Op::MapValue { map }, shape, slot, depth);
                let value = self.value((def.value)(), map.value, depth + 1, false)?;
                let end = self.push(Op::MapEnd { map }, shape, slot, depth);

                self.link(head, key_op);
                self.link(key_op, key.head);
                self.link(key.tail, value_op);
                self.link(value_op, value.head);
                self.link(value.tail, key_op);
                self.ops[head].end = end;
                self.ops[key_op].end = end;
                Fragment { head, tail: end }
            }
            Kind::Interface(def) => self.single(
                Op::Interface {
                    resolve: def.resolve,
                },
                shape,
                slot,
                depth,
            ),
            Kind::Marshaler(def) => self.single(
                Op::Marshal {
                    marshal: def.marshal_json,
                },
                shape,
                slot,
                depth,
            ),
            Kind::TextMarshaler(def) => self.single(
                Op::MarshalText {
                    marshal: def.marshal_text,
                },
                shape,
                slot,
                depth,
            ),
            Kind::Opaque => {
                return Err(EncodeError::UnsupportedType {
                    type_name: shape.type_name(),
                    reason: "type has no JSON representation",
                });
            }
        };
        Ok(fragment)
    }

    fn seq_slots(&mut self, stride: usize) -> SeqSlots {
        SeqSlots {
            index: self.alloc_slot(),
            len: self.alloc_slot(),
            data: self.alloc_slot(),
            elem: self.alloc_slot(),
            stride,
        }
    }

    /// Builds the loop shared by slices and arrays around an already pushed
    /// head opcode.
    fn sequence(
        &mut self,
        shape: &'static Shape,
        head: usize,
        seq: SeqSlots,
        elem: &'static Shape,
        depth: usize,
    ) -> Result<Fragment> {
        let slot = self.ops[head].slot;
        let body = self.value(elem, seq.elem, depth + 1, false)?;
        let step = self.push(Op::SeqElem { seq }, shape, slot, depth);
        let end = self.push(Op::SeqEnd, shape, slot, depth);
        self.link(head, body.head);
        self.link(body.tail, step);
        self.link(step, body.head);
        self.ops[head].end = end;
        self.ops[step].end = end;
        Ok(Fragment { head, tail: end })
    }

    /// Map keys encode as JSON strings: text as is, integers as their
    /// decimal digits, text marshalers as their text.
    fn map_key(
        &mut self,
        map: &'static Shape,
        key: &'static Shape,
        slot: Slot,
        depth: usize,
    ) -> Result<Fragment> {
        match key.kind {
            Kind::String(_) | Kind::TextMarshaler(_) => self.value(key, slot, depth, false),
            Kind::Scalar(kind) if kind.is_integer() => self.value(key, slot, depth, true),
            _ => Err(EncodeError::UnsupportedType {
                type_name: map.type_name(),
                reason: "map keys must be strings, integers or text marshalers",
            }),
        }
    }

    /// Fields promoted through embedded pointers are preceded by a guard
    /// opcode per pointer layer. A guard that finds no pointee skips every
    /// field reached through it.
    fn structure(
        &mut self,
        shape: &'static Shape,
        def: &StructDef,
        slot: Slot,
        depth: usize,
    ) -> Result<Fragment> {
        let (fields, embeds) = visible_fields(shape, def);
        if fields.is_empty() {
            return Ok(self.single(Op::EmptyStruct, shape, slot, depth));
        }

        // (opcode, body tail for fields, embedded pointers it sits behind)
        let mut entries: Vec<(usize, Option<usize>, Vec<usize>)> = Vec::new();
        let mut embed_slots = vec![slot; embeds.len()];
        let mut open: Vec<usize> = Vec::new();
        for field in &fields {
            let chain = EmbedPtr::chain(&embeds, field.origin);
            while open.last().is_some_and(|top| !chain.contains(top)) {
                open.pop();
            }
            for level in open.len()..chain.len() {
                let index = chain[level];
                let embed = &embeds[index];
                let base = embed.parent.map_or(slot, |parent| embed_slots[parent]);
                let target = self.alloc_slot();
                embed_slots[index] = target;
                let guard = self.push(
                    Op::Embed {
                        offset: embed.offset,
                        deref: embed.deref,
                        target,
                        first: entries.is_empty(),
                    },
                    embed.shape,
                    base,
                    depth,
                );
                entries.push((guard, None, chain[..=level].to_vec()));
                open.push(index);
            }

            let target = self.alloc_slot();
            let key = self.key_bytes(field.name);
            let op = self.push(
                Op::Field {
                    key,
                    offset: field.offset,
                    target,
                    first: entries.is_empty(),
                    omit_empty: field
                        .flags
                        .contains(FieldFlags::OMIT_EMPTY)
                        .then_some(field.shape),
                },
                field.shape,
                field.origin.map_or(slot, |origin| embed_slots[origin]),
                depth,
            );
            let quoted = field.flags.contains(FieldFlags::STRING) && is_quotable(field.shape);
            let body = self.value(field.shape, target, depth + 1, quoted)?;
            self.link(op, body.head);
            entries.push((op, Some(body.tail), chain));
        }
        let end = self.push(Op::StructEnd, shape, slot, depth);

        let op_at = |i: usize| entries.get(i).map_or(end, |entry| entry.0);
        for (i, (op, tail, chain)) in entries.iter().enumerate() {
            let following = op_at(i + 1);
            match tail {
                Some(tail) => {
                    self.ops[*tail].next = following;
                    self.ops[*op].next_field = following;
                }
                None => {
                    // a guard's chain ends with its own embedded pointer
                    let skip = chain
                        .last()
                        .and_then(|guarded| {
                            entries.iter().rposition(|entry| entry.2.contains(guarded))
                        })
                        .map_or(following, |last| op_at(last + 1));
                    self.ops[*op].next = following;
                    self.ops[*op].next_field = skip;
                }
            }
            self.ops[*op].end = end;
        }
        Ok(Fragment {
            head: entries[0].0,
            tail: end,
        })
    }

    /// The escaped key followed by `:`, plus a space when indenting.
    fn key_bytes(&self, name: &str) -> Box<[u8]> {
        let mut key = Vec::with_capacity(name.len() + 4);
        write_str(&mut key, name, self.key.html_escape);
        key.push(b':');
        if self.key.indent {
            key.push(b' ');
        }
        key.into_boxed_slice()
    }
}

/// Scalars and text, directly or behind indirections, can be quoted.
fn is_quotable(shape: &'static Shape) -> bool {
    match shape.kind {
        Kind::Scalar(_) | Kind::String(_) => true,
        Kind::Pointer(def) => is_quotable((def.pointee)()),
        _ => false,
    }
}

/// Flattens embedded structs and resolves name conflicts: the shallowest
/// field wins, and several fields sharing the shallowest depth cancel each
/// other out.
fn visible_fields(shape: &'static Shape, def: &StructDef) -> (Vec<FlatField>, Vec<EmbedPtr>) {
    let mut all = Vec::new();
    let mut embeds = Vec::new();
    let mut visiting = vec![shape.id];
    flatten(def, 0, None, 0, &mut all, &mut embeds, &mut visiting);

    let visible = |field: &FlatField| {
        let shallowest = all
            .iter()
            .filter(|other| other.name == field.name)
            .map(|other| other.depth)
            .min()
            .unwrap_or(field.depth);
        field.depth == shallowest
            && all
                .iter()
                .filter(|other| other.name == field.name && other.depth == shallowest)
                .count()
                == 1
    };
    let keep: Vec<bool> = all.iter().map(visible).collect();
    let fields = all
        .into_iter()
        .zip(keep)
        .filter_map(|(field, keep)| keep.then_some(field))
        .collect();
    (fields, embeds)
}

/// Embedded fields are promoted when they hold a struct, directly or behind
/// any number of pointers.
fn flatten(
    def: &StructDef,
    base: usize,
    origin: Option<usize>,
    depth: usize,
    out: &mut Vec<FlatField>,
    embeds: &mut Vec<EmbedPtr>,
    visiting: &mut Vec<ShapeId>,
) {
    for field in def.fields {
        if field.has(FieldFlags::SKIP) {
            continue;
        }
        let shape = field.shape();
        if field.has(FieldFlags::EMBED) {
            let mut layers = Vec::new();
            let mut target = shape;
            while let Kind::Pointer(pointer) = target.kind {
                layers.push((target, pointer.deref));
                target = (pointer.pointee)();
            }
            if let Kind::Struct(inner) = target.kind {
                if !visiting.contains(&target.id) {
                    let mut inner_base = base + field.offset;
                    let mut inner_origin = origin;
                    for (layer, deref) in layers {
                        embeds.push(EmbedPtr {
                            parent: inner_origin,
                            offset: inner_base,
                            deref,
                            shape: layer,
                        });
                        inner_origin = Some(embeds.len() - 1);
                        inner_base = 0;
                    }
                    visiting.push(target.id);
                    flatten(&inner, inner_base, inner_origin, depth + 1, out, embeds, visiting);
                    visiting.pop();
                    continue;
                }
            }
        }
        out.push(FlatField {
            name: field.name,
            offset: base + field.offset,
            shape,
            flags: field.flags,
            depth,
            origin,
        });
    }
}
