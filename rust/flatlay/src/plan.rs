//! Layout planning: assigns every member its offset formula, size contribution
//! and encode/decode instruction.
//!
//! Members are laid out back to back in enumeration order with no padding:
//!
//! | kind            | bytes                                                   |
//! |-----------------|---------------------------------------------------------|
//! | scalar, enum    | native image                                            |
//! | nullable scalar | flag (`0` present, `1` null), then the image if present |
//! | string          | `i32` byte length (`-1` null), then the payload         |
//! | array, list     | `i32` byte length (`-1` null), then the element images  |

use std::fmt;

use crate::classify::LayoutKind;
use crate::members::MemberDescriptor;

/// Byte width of a length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Byte width of a presence flag.
pub const PRESENCE_FLAG: usize = 1;

/// Unit in which the payload of a variable-length member is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadUnit {
    /// Characters; the byte width is chosen by the rendering strategy.
    Chars,
    /// Fixed-width elements of the given byte width.
    Elements(usize),
}

/// A member's contribution to the total size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTerm {
    Fixed(usize),
    /// Presence flag plus `width` bytes when the value is present.
    Flagged { width: usize },
    /// Length prefix plus the realized payload.
    Prefixed { unit: PayloadUnit },
}

impl SizeTerm {
    /// Bytes the member occupies regardless of its value.
    pub const fn fixed_part(&self) -> usize {
        match self {
            SizeTerm::Fixed(width) => *width,
            SizeTerm::Flagged { .. } => PRESENCE_FLAG,
            SizeTerm::Prefixed { .. } => LENGTH_PREFIX,
        }
    }

    pub const fn is_runtime(&self) -> bool {
        !matches!(self, SizeTerm::Fixed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeOp {
    /// Write the native image at the current offset.
    WriteScalar { width: usize },
    /// Write the presence flag, then the image only if present.
    WriteFlagged { width: usize },
    /// Write the byte length (`-1` for null), then the payload if non-empty.
    WriteText { nullable: bool },
    /// Write the byte length (`-1` for null), then bulk-copy the elements.
    WriteElements { width: usize, nullable: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOp {
    ReadScalar { width: usize },
    /// Read the flag; on `0` read the image, otherwise the value is null.
    ReadFlagged { width: usize },
    /// Read the length `L`; a negative `L` is null, otherwise read `L` bytes.
    ReadText { nullable: bool },
    ReadElements { width: usize, nullable: bool },
}

/// Offset of a member: a constant plus the realized sizes of the listed members.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetExpr {
    pub fixed: usize,
    pub runtime: Vec<&'static str>,
}

impl OffsetExpr {
    pub fn is_fixed(&self) -> bool {
        self.runtime.is_empty()
    }
}

impl fmt::Display for OffsetExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fixed)?;
        for name in &self.runtime {
            write!(f, " + |{name}|")?;
        }
        Ok(())
    }
}

/// Value-dependent part of the total size contributed by one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeTerm {
    pub slot: usize,
    pub member: &'static str,
    pub kind: RuntimeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    /// `width` bytes when the nullable value is present.
    Presence { width: usize },
    /// Payload bytes of a string or sequence.
    Payload { unit: PayloadUnit, nullable: bool },
}

/// The total-size expression: constant bytes plus one term per variable member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SizeExpr {
    pub fixed: usize,
    pub runtime: Vec<RuntimeTerm>,
}

impl SizeExpr {
    /// Evaluates the expression given the realized size of every runtime term.
    pub fn evaluate(&self, mut realized: impl FnMut(&RuntimeTerm) -> usize) -> usize {
        self.runtime
            .iter()
            .fold(self.fixed, |total, term| total + realized(term))
    }
}

impl fmt::Display for SizeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fixed)?;
        for term in &self.runtime {
            match term.kind {
                RuntimeKind::Presence { width } => write!(f, " + {width}?{}", term.member)?,
                RuntimeKind::Payload {
                    unit: PayloadUnit::Chars,
                    ..
                } => write!(f, " + chars({}) * charWidth", term.member)?,
                RuntimeKind::Payload {
                    unit: PayloadUnit::Elements(width),
                    ..
                } => write!(f, " + len({}) * {width}", term.member)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub member: MemberDescriptor,
    pub offset: OffsetExpr,
    pub encode: EncodeOp,
    pub decode: DecodeOp,
    pub size: SizeTerm,
}

/// The layout of one type. Built once per type and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    pub type_name: &'static str,
    pub steps: Vec<PlannedStep>,
    pub total_size: SizeExpr,
}

impl LayoutPlan {
    pub fn members(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.steps.iter().map(|step| &step.member)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Smallest buffer any value of the type can decode from.
    pub fn min_size(&self) -> usize {
        self.total_size.fixed
    }

    /// `true` when every value of the type encodes to the same number of bytes.
    pub fn is_fixed(&self) -> bool {
        self.total_size.runtime.is_empty()
    }
}

impl fmt::Display for LayoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "layout {} (size {})", self.type_name, self.total_size)?;
        for step in &self.steps {
            writeln!(
                f,
                "  @{:<12} {:<16} {}",
                step.offset.to_string(),
                step.member.name,
                step.member.kind
            )?;
        }
        Ok(())
    }
}

/// Lays out `members` in order.
///
/// Every descriptor must carry a supported layout kind; unsupported members are
/// expected to have been dropped by the enumerator and are skipped here too.
pub fn plan(type_name: &'static str, members: &[MemberDescriptor]) -> LayoutPlan {
    let mut offset = OffsetExpr::default();
    let mut total_size = SizeExpr::default();
    let mut steps = Vec::with_capacity(members.len());

    for member in members {
        let Some((encode, decode, size)) = instructions(member.kind) else {
            continue;
        };
        steps.push(PlannedStep {
            member: member.clone(),
            offset: offset.clone(),
            encode,
            decode,
            size,
        });

        offset.fixed += size.fixed_part();
        total_size.fixed += size.fixed_part();
        let runtime = match size {
            SizeTerm::Fixed(_) => None,
            SizeTerm::Flagged { width } => Some(RuntimeKind::Presence { width }),
            SizeTerm::Prefixed { unit } => Some(RuntimeKind::Payload {
                unit,
                nullable: member.kind.is_nullable(),
            }),
        };
        if let Some(kind) = runtime {
            offset.runtime.push(member.name);
            total_size.runtime.push(RuntimeTerm {
                slot: member.slot,
                member: member.name,
                kind,
            });
        }
    }

    LayoutPlan {
        type_name,
        steps,
        total_size,
    }
}

fn instructions(kind: LayoutKind) -> Option<(EncodeOp, DecodeOp, SizeTerm)> {
    let ops = match kind {
        LayoutKind::Scalar(element) | LayoutKind::Enum(element) => {
            let width = element.width();
            (
                EncodeOp::WriteScalar { width },
                DecodeOp::ReadScalar { width },
                SizeTerm::Fixed(width),
            )
        }
        LayoutKind::NullableScalar(element) => {
            let width = element.width();
            (
                EncodeOp::WriteFlagged { width },
                DecodeOp::ReadFlagged { width },
                SizeTerm::Flagged { width },
            )
        }
        LayoutKind::String { nullable } => (
            EncodeOp::WriteText { nullable },
            DecodeOp::ReadText { nullable },
            SizeTerm::Prefixed {
                unit: PayloadUnit::Chars,
            },
        ),
        LayoutKind::FixedArray { element, nullable }
        | LayoutKind::FixedList { element, nullable } => {
            let width = element.width();
            (
                EncodeOp::WriteElements { width, nullable },
                DecodeOp::ReadElements { width, nullable },
                SizeTerm::Prefixed {
                    unit: PayloadUnit::Elements(width),
                },
            )
        }
        LayoutKind::Unsupported => return None,
    };
    Some(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Flat;
    use crate::members::enumerate;

    #[derive(Default, Flat)]
    struct Reading {
        pub id: u32,
        pub label: Option<String>,
        pub scale: f64,
        pub delta: Option<i16>,
        pub samples: Vec<u16>,
        pub flag: bool,
    }

    fn reading_plan() -> LayoutPlan {
        let members = enumerate::<Reading>(false).unwrap();
        plan("Reading", &members.descriptors)
    }

    #[test]
    fn test_offsets_thread_runtime_members() {
        let plan = reading_plan();
        let offsets: Vec<String> = plan.steps.iter().map(|s| s.offset.to_string()).collect();
        assert_eq!(
            offsets,
            [
                "0",
                "4",
                "8 + |label|",
                "16 + |label|",
                "17 + |label| + |delta|",
                "21 + |label| + |delta| + |samples|",
            ]
        );
        assert_eq!(plan.min_size(), 22);
        assert!(!plan.is_fixed());
    }

    #[test]
    fn test_size_expression() {
        let plan = reading_plan();
        assert_eq!(
            plan.total_size.to_string(),
            "22 + chars(label) * charWidth + 2?delta + len(samples) * 2"
        );
        let size = plan.total_size.evaluate(|term| match term.kind {
            RuntimeKind::Presence { width } => width,
            RuntimeKind::Payload { .. } => 10,
        });
        assert_eq!(size, 22 + 10 + 2 + 10);
        assert_eq!(plan.total_size.runtime[1].slot, 3);
    }

    #[test]
    fn test_instructions() {
        let plan = reading_plan();
        assert_eq!(plan.steps[0].encode, EncodeOp::WriteScalar { width: 4 });
        assert_eq!(plan.steps[1].decode, DecodeOp::ReadText { nullable: true });
        assert_eq!(plan.steps[3].size, SizeTerm::Flagged { width: 2 });
        assert_eq!(
            plan.steps[4].decode,
            DecodeOp::ReadElements {
                width: 2,
                nullable: false
            }
        );
    }

    #[test]
    fn test_fixed_layout() {
        #[derive(Default, Flat)]
        struct Point {
            pub x: i32,
            pub y: i32,
        }

        let members = enumerate::<Point>(false).unwrap();
        let plan = plan("Point", &members.descriptors);
        assert!(plan.is_fixed());
        assert_eq!(plan.min_size(), 8);
        assert_eq!(plan.steps[1].offset, OffsetExpr { fixed: 4, runtime: vec![] });
        assert!(plan.to_string().starts_with("layout Point (size 8)"));
    }
}
