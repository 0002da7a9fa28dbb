//! Opcode interpreter.

use core::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use opjson_core::{PtrConst, ScalarKind, Shape};

use crate::cache::{self, ProgramKey};
use crate::context::{
    Context, FRAME_BASE, FRAME_ENTRY, FRAME_INDENT, FRAME_PROGRAM, FRAME_RETURN, INPUT_SLOT,
    MapIter,
};
use crate::encode::{write_base64, write_bool, write_float, write_int, write_string_bytes};
use crate::error::{EncodeError, Result};
use crate::fragment::{self, Layout};
use crate::options::EncodeOptions;
use crate::pool::{CONTEXTS, MAP_ITERS};
use crate::program::{Op, Opcode, Program};
use crate::sort::{self, MapPositions};

/// Call depth past which every dynamic or recursive call is checked
/// against the set of values currently being encoded.
pub(crate) const START_DETECTING_CYCLES_AFTER: usize = 1000;

/// What to do after an opcode ran.
enum Step {
    Goto(usize),
    Call {
        shape: &'static Shape,
        addr: usize,
        ret: usize,
        indent: usize,
    },
    Return,
    Done,
}

/// Per-encode interpreter state.
pub(crate) struct Vm<'o> {
    options: &'o EncodeOptions,
    ctx: Context,
    iters: Vec<MapIter>,
    sorts: Vec<MapPositions>,
    /// `(address, type)` of values being encoded by active calls, once
    /// the call depth passed the threshold.
    seen: HashSet<(usize, TypeId)>,
    depth: usize,
    /// Programs reached during this encode, addressed by frame slots.
    programs: Vec<Arc<Program>>,
    lookup: HashMap<ProgramKey, usize>,
    scratch: Vec<u8>,
}

impl Drop for Vm<'_> {
    fn drop(&mut self) {
        for iter in self.iters.drain(..) {
            MAP_ITERS.give(iter);
        }
        CONTEXTS.give(core::mem::take(&mut self.ctx));
    }
}

/// Rebuilds a pointer from a slot value.
///
/// # Safety
///
/// `addr` must come from a pointer into the value being encoded.
#[inline]
unsafe fn at<'mem>(addr: usize) -> PtrConst<'mem> {
    unsafe { PtrConst::from_addr(addr) }
}

impl<'o> Vm<'o> {
    pub(crate) fn new(options: &'o EncodeOptions) -> Self {
        Self {
            options,
            ctx: CONTEXTS.take(),
            iters: Vec::new(),
            sorts: Vec::new(),
            seen: HashSet::new(),
            depth: 0,
            programs: Vec::new(),
            lookup: HashMap::new(),
            scratch: Vec::new(),
        }
    }

    /// Runs the root program `root` over `value`, appending to `buf`. Every
    /// value is written with its trailing comma, which the caller strips.
    pub(crate) fn run(
        &mut self,
        buf: &mut Vec<u8>,
        root: Arc<Program>,
        value: PtrConst<'_>,
    ) -> Result<()> {
        self.lookup.insert(root.key, self.programs.len());
        self.programs.push(Arc::clone(&root));
        let mut current = self.programs.len() - 1;
        let mut program = root;
        let mut base_indent = 0;
        let mut pc = program.head;

        self.ctx.prepare(program.slots);
        self.ctx.store(INPUT_SLOT, value.addr());

        loop {
            let code = &program.ops[pc];
            match self.step(buf, &program, code, base_indent)? {
                Step::Goto(next) => pc = next,
                Step::Done => return Ok(()),
                Step::Call {
                    shape,
                    addr,
                    ret,
                    indent,
                } => {
                    self.depth += 1;
                    let entry = if self.depth > START_DETECTING_CYCLES_AFTER {
                        if !self.seen.insert((addr, shape.id.type_id())) {
                            return Err(EncodeError::unsupported_value(
                                shape.type_name(),
                                format!("encountered a cycle via {}", shape.type_name()),
                            ));
                        }
                        addr
                    } else {
                        0
                    };

                    let (index, callee) = self.program_for(shape)?;
                    let caller_base = self.ctx.enter(program.slots, callee.slots);
                    self.ctx.store(INPUT_SLOT, addr);
                    self.ctx.store(FRAME_PROGRAM, current);
                    self.ctx.store(FRAME_RETURN, ret);
                    self.ctx.store(FRAME_BASE, caller_base);
                    self.ctx.store(FRAME_INDENT, base_indent);
                    self.ctx.store(FRAME_ENTRY, entry);
                    trace!(depth = self.depth, "call {}", shape.type_name());

                    base_indent += indent;
                    current = index;
                    pc = callee.head;
                    program = callee;
                }
                Step::Return => {
                    let entry = self.ctx.load(FRAME_ENTRY);
                    if entry != 0 {
                        self.seen.remove(&(entry, program.shape.id.type_id()));
                    }
                    self.depth -= 1;
                    pc = self.ctx.load(FRAME_RETURN);
                    current = self.ctx.load(FRAME_PROGRAM);
                    base_indent = self.ctx.load(FRAME_INDENT);
                    self.ctx.leave(self.ctx.load(FRAME_BASE));
                    program = Arc::clone(&self.programs[current]);
                }
            }
        }
    }

    /// Looks up the sub-program for `shape`, first among the programs this
    /// encode already used, then in the process-wide cache.
    fn program_for(&mut self, shape: &'static Shape) -> Result<(usize, Arc<Program>)> {
        let key = ProgramKey::new(shape, self.options, false);
        if let Some(&index) = self.lookup.get(&key) {
            return Ok((index, Arc::clone(&self.programs[index])));
        }
        let program = cache::get_or_compile(shape, key)?;
        let index = self.programs.len();
        self.programs.push(Arc::clone(&program));
        self.lookup.insert(key, index);
        Ok((index, program))
    }

    #[inline]
    fn ptr(&self, code: &Opcode) -> PtrConst<'static> {
        // SAFETY: the slot was filled from a pointer into the encoded value
        unsafe { at(self.ctx.load(code.slot)) }
    }

    fn step(
        &mut self,
        buf: &mut Vec<u8>,
        program: &Program,
        code: &Opcode,
        base_indent: usize,
    ) -> Result<Step> {
        let depth = base_indent + code.indent;
        let step = match &code.op {
            Op::End => Step::Done,
            Op::Return => Step::Return,
            Op::ScopeEnd => Step::Goto(code.next),

            Op::Scalar { kind, quoted } => {
                let ptr = self.ptr(code);
                if *quoted {
                    buf.push(b'"');
                }
                write_scalar(buf, *kind, ptr, code.shape)?;
                if *quoted {
                    buf.push(b'"');
                }
                buf.push(b',');
                Step::Goto(code.next)
            }
            Op::Str { as_str, quoted } => {
                let text = unsafe { (*as_str)(self.ptr(code)) };
                if *quoted {
                    self.scratch.clear();
                    write_string_bytes(&mut self.scratch, text.as_bytes(), self.options.html_escape);
                    write_string_bytes(buf, &self.scratch, self.options.html_escape);
                } else {
                    write_string_bytes(buf, text.as_bytes(), self.options.html_escape);
                }
                buf.push(b',');
                Step::Goto(code.next)
            }
            Op::Bytes { as_bytes } => {
                write_base64(buf, unsafe { (*as_bytes)(self.ptr(code)) });
                buf.push(b',');
                Step::Goto(code.next)
            }

            Op::Ptr { deref, target } => match unsafe { (*deref)(self.ptr(code)) } {
                Some(inner) => {
                    self.ctx.store(*target, inner.addr());
                    Step::Goto(code.next)
                }
                None => {
                    buf.extend_from_slice(b"null,");
                    Step::Goto(program.ops[code.end].next)
                }
            },

            Op::EmptyStruct => {
                buf.extend_from_slice(b"{},");
                Step::Goto(code.next)
            }
            Op::Embed {
                offset,
                deref,
                target,
                first,
            } => {
                if *first {
                    buf.push(b'{');
                }
                let pointer = unsafe { self.ptr(code).field(*offset) };
                match unsafe { (*deref)(pointer) } {
                    Some(inner) => {
                        self.ctx.store(*target, inner.addr());
                        Step::Goto(code.next)
                    }
                    None => Step::Goto(code.next_field),
                }
            }
            Op::Field {
                key,
                offset,
                target,
                first,
                omit_empty,
            } => {
                if *first {
                    buf.push(b'{');
                }
                let field = unsafe { self.ptr(code).field(*offset) };
                if let Some(shape) = omit_empty {
                    if unsafe { shape.is_zero(field) } {
                        return Ok(Step::Goto(code.next_field));
                    }
                }
                self.options.write_newline(buf, depth + 1);
                buf.extend_from_slice(key);
                self.ctx.store(*target, field.addr());
                Step::Goto(code.next)
            }
            Op::StructEnd => {
                self.close(buf, b'}', depth);
                Step::Goto(code.next)
            }

            Op::SliceHead { seq, len, data } => {
                let ptr = self.ptr(code);
                let n = unsafe { (*len)(ptr) };
                if n == 0 {
                    buf.extend_from_slice(b"[],");
                    return Ok(Step::Goto(program.ops[code.end].next));
                }
                let first = unsafe { (*data)(ptr) }.addr();
                buf.push(b'[');
                self.ctx.store(seq.index, 0);
                self.ctx.store(seq.len, n);
                self.ctx.store(seq.data, first);
                self.ctx.store(seq.elem, first);
                self.options.write_newline(buf, depth + 1);
                Step::Goto(code.next)
            }
            Op::ArrayHead { seq, len } => {
                if *len == 0 {
                    buf.extend_from_slice(b"[],");
                    return Ok(Step::Goto(program.ops[code.end].next));
                }
                let first = self.ctx.load(code.slot);
                buf.push(b'[');
                self.ctx.store(seq.index, 0);
                self.ctx.store(seq.len, *len);
                self.ctx.store(seq.data, first);
                self.ctx.store(seq.elem, first);
                self.options.write_newline(buf, depth + 1);
                Step::Goto(code.next)
            }
            Op::SeqElem { seq } => {
                let index = self.ctx.load(seq.index) + 1;
                if index < self.ctx.load(seq.len) {
                    self.ctx.store(seq.index, index);
                    let elem = self.ctx.load(seq.data) + index * seq.stride;
                    self.ctx.store(seq.elem, elem);
                    self.options.write_newline(buf, depth + 1);
                    Step::Goto(code.next)
                } else {
                    Step::Goto(code.end)
                }
            }
            Op::SeqEnd => {
                self.close(buf, b']', depth);
                Step::Goto(code.next)
            }

            Op::MapHead { map, len, for_each } => {
                let ptr = self.ptr(code);
                let n = unsafe { (*len)(ptr) };
                if n == 0 {
                    buf.extend_from_slice(b"{},");
                    return Ok(Step::Goto(program.ops[code.end].next));
                }
                let mut iter = MAP_ITERS.take();
                unsafe {
                    (*for_each)(ptr, &mut |key, value| {
                        iter.entries.push((key.addr(), value.addr()));
                    });
                }
                buf.push(b'{');
                self.ctx.store(map.iter, self.iters.len());
                self.ctx.store(map.index, 0);
                self.ctx.store(map.len, iter.entries.len());
                self.iters.push(iter);
                if self.options.deterministic_map_order {
                    self.sorts.push(MapPositions::default());
                }
                Step::Goto(code.next)
            }
            Op::MapKey { map } => {
                let index = self.ctx.load(map.index);
                if index >= self.ctx.load(map.len) {
                    return Ok(Step::Goto(code.end));
                }
                let start = buf.len();
                self.options.write_newline(buf, depth + 1);
                if self.options.deterministic_map_order {
                    if let Some(positions) = self.sorts.last_mut() {
                        positions.begin_entry(start, buf.len());
                    }
                }
                let (key, _) = self.iters[self.ctx.load(map.iter)].entries[index];
                self.ctx.store(map.key, key);
                Step::Goto(code.next)
            }
            Op::MapValue { map } => {
                // the key was written as a value: swap its comma for a colon
                buf.pop();
                if self.options.deterministic_map_order {
                    if let Some(positions) = self.sorts.last_mut() {
                        positions.end_key(buf.len());
                    }
                }
                buf.push(b':');
                if self.options.indent.is_some() {
                    buf.push(b' ');
                }
                let index = self.ctx.load(map.index);
                let (_, value) = self.iters[self.ctx.load(map.iter)].entries[index];
                self.ctx.store(map.value, value);
                self.ctx.store(map.index, index + 1);
                Step::Goto(code.next)
            }
            Op::MapEnd { map } => {
                if self.options.deterministic_map_order {
                    if let Some(positions) = self.sorts.pop() {
                        sort::sort_entries(buf, &positions);
                    }
                }
                debug_assert_eq!(self.ctx.load(map.iter) + 1, self.iters.len());
                if let Some(iter) = self.iters.pop() {
                    MAP_ITERS.give(iter);
                }
                self.close(buf, b'}', depth);
                Step::Goto(code.next)
            }

            Op::Interface { resolve } => match unsafe { (*resolve)(self.ptr(code)) } {
                Some((shape, inner)) => Step::Call {
                    shape,
                    addr: inner.addr(),
                    ret: code.next,
                    indent: code.indent,
                },
                None => {
                    buf.extend_from_slice(b"null,");
                    Step::Goto(code.next)
                }
            },
            Op::Recursive => Step::Call {
                shape: code.shape,
                addr: self.ctx.load(code.slot),
                ret: code.next,
                indent: code.indent,
            },

            Op::Marshal { marshal } => {
                let type_name = code.shape.type_name();
                let json = unsafe { (*marshal)(self.ptr(code)) }
                    .map_err(|source| EncodeError::MarshalerError { type_name, source })?;
                if json.is_empty() {
                    return Err(EncodeError::EmptyMarshalResult { type_name });
                }
                let prefix;
                let layout = Layout {
                    indent: match &self.options.indent {
                        Some(indent) => {
                            prefix = self.options.line_prefix(depth);
                            Some((prefix.as_slice(), indent.unit.as_bytes()))
                        }
                        None => None,
                    },
                    html_escape: self.options.html_escape,
                };
                fragment::reformat(buf, &json, layout)
                    .map_err(|message| EncodeError::InvalidMarshalOutput { type_name, message })?;
                buf.push(b',');
                Step::Goto(code.next)
            }
            Op::MarshalText { marshal } => {
                let type_name = code.shape.type_name();
                let text = unsafe { (*marshal)(self.ptr(code)) }
                    .map_err(|source| EncodeError::MarshalerError { type_name, source })?;
                write_string_bytes(buf, &text, self.options.html_escape);
                buf.push(b',');
                Step::Goto(code.next)
            }
        };
        Ok(step)
    }

    /// Closes a container whose members each left a trailing comma. An
    /// opening bracket as the last byte means no member was written.
    fn close(&self, buf: &mut Vec<u8>, bracket: u8, depth: usize) {
        if buf.last() == Some(&b',') {
            buf.pop();
            self.options.write_newline(buf, depth);
        }
        buf.push(bracket);
        buf.push(b',');
    }
}

fn write_scalar(
    buf: &mut Vec<u8>,
    kind: ScalarKind,
    ptr: PtrConst<'_>,
    shape: &'static Shape,
) -> Result<()> {
    unsafe {
        match kind {
            ScalarKind::Bool => write_bool(buf, ptr.read::<bool>()),
            ScalarKind::I8 => write_int(buf, ptr.read::<i8>()),
            ScalarKind::I16 => write_int(buf, ptr.read::<i16>()),
            ScalarKind::I32 => write_int(buf, ptr.read::<i32>()),
            ScalarKind::I64 => write_int(buf, ptr.read::<i64>()),
            ScalarKind::Isize => write_int(buf, ptr.read::<isize>()),
            ScalarKind::U8 => write_int(buf, ptr.read::<u8>()),
            ScalarKind::U16 => write_int(buf, ptr.read::<u16>()),
            ScalarKind::U32 => write_int(buf, ptr.read::<u32>()),
            ScalarKind::U64 => write_int(buf, ptr.read::<u64>()),
            ScalarKind::Usize => write_int(buf, ptr.read::<usize>()),
            ScalarKind::F32 => write_float(buf, ptr.read::<f32>())
                .map_err(|value| EncodeError::unsupported_value(shape.type_name(), value))?,
            ScalarKind::F64 => write_float(buf, ptr.read::<f64>())
                .map_err(|value| EncodeError::unsupported_value(shape.type_name(), value))?,
        }
    }
    Ok(())
}
