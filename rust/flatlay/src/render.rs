//! Instruction rendering: turns a [`LayoutPlan`] into a compilable unit.
//!
//! A [`RenderedUnit`] carries the same codec twice. `source` is Rust source text
//! of a codec type whose `encode`/`decode` functions call the [`crate::wire`]
//! primitives directly; it compiles in any crate that can name the value type.
//! `program` is the lowered op list a [`BuildHost`] compiles in process.
//!
//! [`BuildHost`]: crate::host::BuildHost

use std::fmt;

use crate::members::{MemberDescriptor, MemberOrigin};
use crate::plan::{EncodeOp, LayoutPlan, RuntimeKind, PayloadUnit};
use crate::strategy::{AddressMode, StringEncoding, Strategy};

/// One lowered codec instruction. Each member op is a complete step that
/// begins at the cursor and commits every byte it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Bounds check covering the next run of `Scalar` ops (raw mode only).
    Guard { member: &'static str, bytes: usize },
    Scalar {
        slot: usize,
        member: &'static str,
        width: usize,
    },
    Flagged {
        slot: usize,
        member: &'static str,
        width: usize,
    },
    Text {
        slot: usize,
        member: &'static str,
        nullable: bool,
    },
    Elements {
        slot: usize,
        member: &'static str,
        width: usize,
        nullable: bool,
    },
}

impl Op {
    pub fn slot(&self) -> Option<usize> {
        match self {
            Op::Guard { .. } => None,
            Op::Scalar { slot, .. }
            | Op::Flagged { slot, .. }
            | Op::Text { slot, .. }
            | Op::Elements { slot, .. } => Some(*slot),
        }
    }
}

/// Value-dependent size term, evaluated per encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeOp {
    Presence {
        slot: usize,
        member: &'static str,
        width: usize,
    },
    Text {
        slot: usize,
        member: &'static str,
        nullable: bool,
    },
    Elements {
        slot: usize,
        member: &'static str,
        width: usize,
        nullable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Constant part of the total size.
    pub fixed_size: usize,
    pub size: Vec<SizeOp>,
    pub ops: Vec<Op>,
    /// Number of member accessors the program addresses.
    pub slots: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedUnit {
    /// Name of the generated codec type, e.g. `PointCheckedCodec`.
    pub type_name: String,
    pub source: String,
    pub program: Program,
    pub strategy: Strategy,
}

impl fmt::Display for RenderedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

pub fn render(plan: &LayoutPlan, strategy: Strategy) -> RenderedUnit {
    let program = lower(plan, strategy);
    let type_name = codec_name(plan.type_name, strategy);
    let source = SourceRenderer {
        plan,
        program: &program,
        strategy,
        codec: &type_name,
        value_type: source_type(plan.type_name),
        out: SourceWriter::default(),
    }
    .render();
    RenderedUnit {
        type_name,
        source,
        program,
        strategy,
    }
}

/// Lowers the plan into ops. In raw mode every maximal run of consecutive
/// fixed-width members is preceded by one guard covering the whole run.
pub fn lower(plan: &LayoutPlan, strategy: Strategy) -> Program {
    let mut ops = Vec::with_capacity(plan.steps.len() + 1);
    let mut run_start: Option<usize> = None;

    for step in &plan.steps {
        let slot = step.member.slot;
        let member = step.member.name;
        let op = match step.encode {
            EncodeOp::WriteScalar { width } => {
                if strategy.address == AddressMode::Raw {
                    match run_start {
                        Some(guard) => {
                            if let Op::Guard { bytes, .. } = &mut ops[guard] {
                                *bytes += width;
                            }
                        }
                        None => {
                            run_start = Some(ops.len());
                            ops.push(Op::Guard {
                                member,
                                bytes: width,
                            });
                        }
                    }
                }
                ops.push(Op::Scalar {
                    slot,
                    member,
                    width,
                });
                continue;
            }
            EncodeOp::WriteFlagged { width } => Op::Flagged {
                slot,
                member,
                width,
            },
            EncodeOp::WriteText { nullable } => Op::Text {
                slot,
                member,
                nullable,
            },
            EncodeOp::WriteElements { width, nullable } => Op::Elements {
                slot,
                member,
                width,
                nullable,
            },
        };
        run_start = None;
        ops.push(op);
    }

    let size = plan
        .total_size
        .runtime
        .iter()
        .map(|term| match term.kind {
            RuntimeKind::Presence { width } => SizeOp::Presence {
                slot: term.slot,
                member: term.member,
                width,
            },
            RuntimeKind::Payload {
                unit: PayloadUnit::Chars,
                nullable,
            } => SizeOp::Text {
                slot: term.slot,
                member: term.member,
                nullable,
            },
            RuntimeKind::Payload {
                unit: PayloadUnit::Elements(width),
                nullable,
            } => SizeOp::Elements {
                slot: term.slot,
                member: term.member,
                width,
                nullable,
            },
        })
        .collect();

    Program {
        fixed_size: plan.total_size.fixed,
        size,
        ops,
        slots: plan.steps.len(),
    }
}

/// Builds the codec type name from the last path segments of the value type.
fn codec_name(type_name: &str, strategy: Strategy) -> String {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = type_name.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            current.push(c);
        } else if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            current.clear();
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut name = String::new();
    for word in words {
        for (i, part) in word.split('_').filter(|p| !p.is_empty()).enumerate() {
            let mut part_chars = part.chars();
            if let Some(first) = part_chars.next() {
                if i == 0 && name.is_empty() && first.is_ascii_digit() {
                    name.push('T');
                }
                name.extend(first.to_uppercase());
                name.push_str(part_chars.as_str());
            }
        }
    }
    name.push_str(strategy.suffix());
    name.push_str("Codec");
    name
}

/// Rewrites paths produced by `std::any::type_name` that only resolve inside
/// the defining crate: `alloc::` becomes `std::` and primitives are named through
/// their `::flatlay` re-exports.
fn source_type(type_name: &str) -> String {
    const ALLOC: &str = "alloc::";
    const PRIMITIVES: &str = "flatlay_primitives::";
    let mut out = String::with_capacity(type_name.len());
    let mut rest = type_name;
    while let Some(c) = rest.chars().next() {
        let at_boundary = out
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == ':'));
        if at_boundary {
            if let Some(tail) = rest.strip_prefix(ALLOC) {
                out.push_str("std::");
                rest = tail;
                continue;
            }
            if let Some(tail) = rest.strip_prefix(PRIMITIVES) {
                let module = tail
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .unwrap_or(tail.len());
                out.push_str("::flatlay::");
                rest = tail[module..].strip_prefix("::").unwrap_or(tail);
                continue;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Spells a field or method name so that it parses, escaping keywords.
fn ident(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_owned()
    }
}

#[derive(Default)]
struct SourceWriter {
    out: String,
    indent: usize,
}

impl SourceWriter {
    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    fn close(&mut self, text: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }
}

struct SourceRenderer<'a> {
    plan: &'a LayoutPlan,
    program: &'a Program,
    strategy: Strategy,
    codec: &'a str,
    value_type: String,
    out: SourceWriter,
}

impl<'a> SourceRenderer<'a> {
    fn render(mut self) -> String {
        let codec = self.codec;
        let value_type = self.value_type.clone();
        self.out.line(&format!("// Layout of {}.", self.plan.type_name));
        self.out
            .line(&format!("// Total size: {}.", self.plan.total_size));
        self.out.line(&format!("pub struct {codec};"));
        self.out.line("");
        self.out.open(&format!("impl {codec} {{"));

        self.out.open(&format!(
            "pub fn encode(value: &{value_type}) -> ::flatlay::Result<::std::vec::Vec<u8>> {{"
        ));
        self.out
            .line("let mut buffer = ::std::vec![0u8; Self::encoded_len(value)?];");
        self.out.line("let written = Self::write(value, &mut buffer)?;");
        self.out.line("buffer.truncate(written);");
        self.out.line("Ok(buffer)");
        self.out.close("}");
        self.out.line("");

        self.render_size(&value_type);
        self.out.line("");
        self.render_write(&value_type);
        self.out.line("");

        self.out.open(&format!(
            "pub fn decode(buffer: &[u8]) -> ::flatlay::Result<{value_type}> {{"
        ));
        self.out.line("Self::read(buffer).map(|(value, _)| value)");
        self.out.close("}");
        self.out.line("");

        self.render_read(&value_type);
        self.out.close("}");
        self.out.out
    }

    fn member(&self, slot: usize) -> Option<&'a MemberDescriptor> {
        self.plan.members().find(|member| member.slot == slot)
    }

    fn mode(&self) -> &'static str {
        match self.strategy.address {
            AddressMode::Checked => "checked",
            AddressMode::Raw => "raw",
        }
    }

    fn encoding(&self) -> &'static str {
        match self.strategy.strings {
            StringEncoding::Utf8 => "::flatlay::StringEncoding::Utf8",
            StringEncoding::Utf16 => "::flatlay::StringEncoding::Utf16",
        }
    }

    /// Emits `emit` with an expression borrowing the member's current value.
    fn with_value(&mut self, slot: usize, emit: impl FnOnce(&mut SourceWriter, &str)) {
        match self.member(slot).map(|member| (member.origin, member.name)) {
            Some((MemberOrigin::Property { getter: Some(getter), .. }, _)) => {
                self.out.open("{");
                self.out
                    .line(&format!("let member = value.{}();", ident(getter)));
                emit(&mut self.out, "&member");
                self.out.close("}");
            }
            Some((MemberOrigin::Field, name)) => {
                emit(&mut self.out, &format!("&value.{}", ident(name)))
            }
            _ => emit(&mut self.out, "value"),
        }
    }

    /// Emits `emit` with an expression mutably borrowing the member's slot.
    fn with_slot(&mut self, slot: usize, emit: impl FnOnce(&mut SourceWriter, &str)) {
        let member = self.member(slot);
        match member.map(|member| (member.origin, member.name, member.type_name)) {
            Some((MemberOrigin::Property { setter: Some(setter), .. }, _, type_name)) => {
                self.out.open("{");
                self.out.line(&format!(
                    "let mut member = <{} as ::core::default::Default>::default();",
                    source_type(type_name)
                ));
                emit(&mut self.out, "&mut member");
                self.out.line(&format!("value.{}(member);", ident(setter)));
                self.out.close("}");
            }
            Some((MemberOrigin::Field, name, _)) => {
                emit(&mut self.out, &format!("&mut value.{}", ident(name)))
            }
            _ => emit(&mut self.out, "&mut value"),
        }
    }

    fn render_size(&mut self, value_type: &str) {
        self.out.open(&format!(
            "pub fn encoded_len(value: &{value_type}) -> ::flatlay::Result<usize> {{"
        ));
        let binding = if self.program.size.is_empty() { "" } else { "mut " };
        self.out.line(&format!(
            "let {binding}size = {}usize;",
            self.program.fixed_size
        ));
        let encoding = self.encoding();
        for term in self.program.size.clone() {
            match term {
                SizeOp::Presence {
                    slot,
                    member,
                    width,
                } => self.with_value(slot, |out, expr| {
                    out.line(&format!(
                        "size += ::flatlay::wire::presence_len({expr}, \"{member}\", {width})?;"
                    ))
                }),
                SizeOp::Text {
                    slot,
                    member,
                    nullable,
                } => self.with_value(slot, |out, expr| {
                    out.line(&format!(
                        "size += ::flatlay::wire::text_len({expr}, \"{member}\", {nullable}, {encoding})?;"
                    ))
                }),
                SizeOp::Elements {
                    slot,
                    member,
                    width,
                    nullable,
                } => self.with_value(slot, |out, expr| {
                    out.line(&format!(
                        "size += ::flatlay::wire::elements_len({expr}, \"{member}\", {nullable}, {width})?;"
                    ))
                }),
            }
        }
        self.out.line("Ok(size)");
        self.out.close("}");
    }

    fn render_write(&mut self, value_type: &str) {
        self.out.open(&format!(
            "pub fn write(value: &{value_type}, buffer: &mut [u8]) -> ::flatlay::Result<usize> {{"
        ));
        self.out
            .line("let mut cursor = ::flatlay::wire::Cursor::new();");
        let mode = self.mode();
        let encoding = self.encoding();
        for op in self.program.ops.clone() {
            match op {
                Op::Guard { member, bytes } => self.out.line(&format!(
                    "cursor.guard(buffer.len(), {bytes}, \"{member}\")?;"
                )),
                Op::Scalar {
                    slot,
                    member,
                    width,
                } => self.with_value(slot, |out, expr| match mode {
                    "raw" => {
                        out.line("// SAFETY: covered by the guard above.");
                        out.line(&format!(
                            "unsafe {{ ::flatlay::wire::raw::write_scalar(buffer, &mut cursor, \"{member}\", {expr}, {width})? }};"
                        ));
                    }
                    _ => out.line(&format!(
                        "::flatlay::wire::checked::write_scalar(buffer, &mut cursor, \"{member}\", {expr}, {width})?;"
                    )),
                }),
                Op::Flagged {
                    slot,
                    member,
                    width,
                } => self.with_value(slot, |out, expr| {
                    out.line(&format!(
                        "::flatlay::wire::{mode}::write_flagged(buffer, &mut cursor, \"{member}\", {expr}, {width})?;"
                    ))
                }),
                Op::Text {
                    slot,
                    member,
                    nullable,
                } => self.with_value(slot, |out, expr| {
                    out.line(&format!(
                        "::flatlay::wire::{mode}::write_text(buffer, &mut cursor, \"{member}\", {expr}, {nullable}, {encoding})?;"
                    ))
                }),
                Op::Elements {
                    slot,
                    member,
                    width,
                    nullable,
                } => self.with_value(slot, |out, expr| {
                    out.line(&format!(
                        "::flatlay::wire::{mode}::write_elements(buffer, &mut cursor, \"{member}\", {expr}, {nullable}, {width})?;"
                    ))
                }),
            }
        }
        self.out.line("Ok(cursor.position())");
        self.out.close("}");
    }

    fn render_read(&mut self, value_type: &str) {
        self.out.open(&format!(
            "pub fn read(buffer: &[u8]) -> ::flatlay::Result<({value_type}, usize)> {{"
        ));
        self.out
            .line("let mut cursor = ::flatlay::wire::Cursor::new();");
        self.out.line(&format!(
            "let mut value = <{value_type} as ::core::default::Default>::default();"
        ));
        let mode = self.mode();
        let encoding = self.encoding();
        for op in self.program.ops.clone() {
            match op {
                Op::Guard { member, bytes } => self.out.line(&format!(
                    "cursor.guard(buffer.len(), {bytes}, \"{member}\")?;"
                )),
                Op::Scalar {
                    slot,
                    member,
                    width,
                } => self.with_slot(slot, |out, expr| match mode {
                    "raw" => {
                        out.line("// SAFETY: covered by the guard above.");
                        out.line(&format!(
                            "unsafe {{ ::flatlay::wire::raw::read_scalar(buffer, &mut cursor, \"{member}\", {expr}, {width})? }};"
                        ));
                    }
                    _ => out.line(&format!(
                        "::flatlay::wire::checked::read_scalar(buffer, &mut cursor, \"{member}\", {expr}, {width})?;"
                    )),
                }),
                Op::Flagged {
                    slot,
                    member,
                    width,
                } => self.with_slot(slot, |out, expr| {
                    out.line(&format!(
                        "::flatlay::wire::{mode}::read_flagged(buffer, &mut cursor, \"{member}\", {expr}, {width})?;"
                    ))
                }),
                Op::Text {
                    slot,
                    member,
                    nullable,
                } => self.with_slot(slot, |out, expr| {
                    out.line(&format!(
                        "::flatlay::wire::{mode}::read_text(buffer, &mut cursor, \"{member}\", {expr}, {nullable}, {encoding})?;"
                    ))
                }),
                Op::Elements {
                    slot,
                    member,
                    width,
                    nullable,
                } => self.with_slot(slot, |out, expr| {
                    out.line(&format!(
                        "::flatlay::wire::{mode}::read_elements(buffer, &mut cursor, \"{member}\", {expr}, {nullable}, {width})?;"
                    ))
                }),
            }
        }
        self.out.line("Ok((value, cursor.position()))");
        self.out.close("}");
    }
}
