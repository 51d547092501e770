//! Type classification: maps a structural [`TypeDescriptor`] onto the layout kind
//! that decides how a member is laid out on the wire.

use std::fmt;

/// Fixed-width value types that are laid out as their native memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    I128,
    U128,
    F32,
    F64,
    Decimal,
    Guid,
    TimeSpan,
    DateTime,
    DateTimeOffset,
}

impl ScalarKind {
    /// Size in bytes of the native representation.
    pub const fn width(self) -> usize {
        match self {
            ScalarKind::Bool | ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::Char | ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::I64
            | ScalarKind::U64
            | ScalarKind::F64
            | ScalarKind::TimeSpan
            | ScalarKind::DateTime => 8,
            ScalarKind::I128
            | ScalarKind::U128
            | ScalarKind::Decimal
            | ScalarKind::Guid
            | ScalarKind::DateTimeOffset => 16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Char => "char",
            ScalarKind::I8 => "i8",
            ScalarKind::U8 => "u8",
            ScalarKind::I16 => "i16",
            ScalarKind::U16 => "u16",
            ScalarKind::I32 => "i32",
            ScalarKind::U32 => "u32",
            ScalarKind::I64 => "i64",
            ScalarKind::U64 => "u64",
            ScalarKind::I128 => "i128",
            ScalarKind::U128 => "u128",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Decimal => "Decimal",
            ScalarKind::Guid => "Guid",
            ScalarKind::TimeSpan => "TimeSpan",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::DateTimeOffset => "DateTimeOffset",
        }
    }

    /// Path that names the type from any crate depending on `flatlay`.
    pub const fn rust_path(self) -> &'static str {
        match self {
            ScalarKind::Decimal => "::flatlay::Decimal",
            ScalarKind::Guid => "::flatlay::Guid",
            ScalarKind::TimeSpan => "::flatlay::TimeSpan",
            ScalarKind::DateTime => "::flatlay::DateTime",
            ScalarKind::DateTimeOffset => "::flatlay::DateTimeOffset",
            other => other.name(),
        }
    }

    /// Whether the kind may back a fieldless enum.
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            ScalarKind::I8
                | ScalarKind::U8
                | ScalarKind::I16
                | ScalarKind::U16
                | ScalarKind::I32
                | ScalarKind::U32
                | ScalarKind::I64
                | ScalarKind::U64
        )
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structural description of a Rust type, produced by [`Flat::descriptor`].
///
/// [`Flat::descriptor`]: crate::Flat::descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Scalar(ScalarKind),
    /// Fieldless enum stored as its integer representation.
    Enum {
        name: &'static str,
        repr: ScalarKind,
    },
    Option(Box<TypeDescriptor>),
    String,
    /// `Box<[T]>`.
    Array(Box<TypeDescriptor>),
    /// `Vec<T>`.
    List(Box<TypeDescriptor>),
    /// User struct with named members.
    Composite {
        name: &'static str,
    },
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    /// Anything else; never laid out.
    Opaque {
        name: &'static str,
    },
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Scalar(kind) => write!(f, "{kind}"),
            TypeDescriptor::Enum { name, repr } => write!(f, "{name}({repr})"),
            TypeDescriptor::Option(inner) => write!(f, "Option<{inner}>"),
            TypeDescriptor::String => f.write_str("String"),
            TypeDescriptor::Array(element) => write!(f, "Box<[{element}]>"),
            TypeDescriptor::List(element) => write!(f, "Vec<{element}>"),
            TypeDescriptor::Composite { name } | TypeDescriptor::Opaque { name } => {
                f.write_str(name)
            }
            TypeDescriptor::Map { key, value } => write!(f, "Map<{key}, {value}>"),
        }
    }
}

/// A fixed-width element: a whitelisted scalar or an enum's underlying integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedElement {
    pub kind: ScalarKind,
    /// Name of the enum when the element is one.
    pub enum_name: Option<&'static str>,
}

impl FixedElement {
    pub const fn scalar(kind: ScalarKind) -> FixedElement {
        FixedElement {
            kind,
            enum_name: None,
        }
    }

    pub const fn width(&self) -> usize {
        self.kind.width()
    }

    pub fn is_enum(&self) -> bool {
        self.enum_name.is_some()
    }
}

impl fmt::Display for FixedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.enum_name {
            Some(name) => write!(f, "{name}({})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// How a member is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Native image of a whitelisted scalar.
    Scalar(FixedElement),
    /// Native image of the enum's underlying integer.
    Enum(FixedElement),
    /// Presence byte followed by the value when present.
    NullableScalar(FixedElement),
    /// Length-prefixed text; a negative length marks null.
    String { nullable: bool },
    /// Length-prefixed `Box<[T]>` of fixed-width elements.
    FixedArray { element: FixedElement, nullable: bool },
    /// Length-prefixed `Vec<T>` of fixed-width elements.
    FixedList { element: FixedElement, nullable: bool },
    Unsupported,
}

impl LayoutKind {
    pub fn is_supported(&self) -> bool {
        !matches!(self, LayoutKind::Unsupported)
    }

    /// `true` when the encoded size of the member depends on its value.
    pub fn is_variable(&self) -> bool {
        !matches!(self, LayoutKind::Scalar(_) | LayoutKind::Enum(_))
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            LayoutKind::NullableScalar(_) => true,
            LayoutKind::String { nullable }
            | LayoutKind::FixedArray { nullable, .. }
            | LayoutKind::FixedList { nullable, .. } => *nullable,
            _ => false,
        }
    }

    /// Underlying fixed element of scalar, nullable scalar and sequence kinds.
    pub fn element(&self) -> Option<FixedElement> {
        match self {
            LayoutKind::Scalar(element)
            | LayoutKind::Enum(element)
            | LayoutKind::NullableScalar(element)
            | LayoutKind::FixedArray { element, .. }
            | LayoutKind::FixedList { element, .. } => Some(*element),
            LayoutKind::String { .. } | LayoutKind::Unsupported => None,
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let null = |nullable: bool| if nullable { "?" } else { "" };
        match self {
            LayoutKind::Scalar(element) => write!(f, "scalar {element}"),
            LayoutKind::Enum(element) => write!(f, "enum {element}"),
            LayoutKind::NullableScalar(element) => write!(f, "nullable {element}"),
            LayoutKind::String { nullable } => write!(f, "string{}", null(*nullable)),
            LayoutKind::FixedArray { element, nullable } => {
                write!(f, "array<{element}>{}", null(*nullable))
            }
            LayoutKind::FixedList { element, nullable } => {
                write!(f, "list<{element}>{}", null(*nullable))
            }
            LayoutKind::Unsupported => f.write_str("unsupported"),
        }
    }
}

/// Decides the layout kind of a type. Pure and deterministic.
///
/// `Option` is recognized only around fixed-width elements, strings and sequences
/// of fixed-width elements; a sequence qualifies only when its element is a
/// whitelisted scalar or an enum. Everything else is [`LayoutKind::Unsupported`].
pub fn classify(descriptor: &TypeDescriptor) -> LayoutKind {
    match descriptor {
        TypeDescriptor::Scalar(kind) => LayoutKind::Scalar(FixedElement::scalar(*kind)),
        TypeDescriptor::Enum { .. } => match fixed_element(descriptor) {
            Some(element) => LayoutKind::Enum(element),
            None => LayoutKind::Unsupported,
        },
        TypeDescriptor::String => LayoutKind::String { nullable: false },
        TypeDescriptor::Array(element) => sequence(element, false, true),
        TypeDescriptor::List(element) => sequence(element, false, false),
        TypeDescriptor::Option(inner) => match inner.as_ref() {
            TypeDescriptor::Scalar(_) | TypeDescriptor::Enum { .. } => {
                match fixed_element(inner) {
                    Some(element) => LayoutKind::NullableScalar(element),
                    None => LayoutKind::Unsupported,
                }
            }
            TypeDescriptor::String => LayoutKind::String { nullable: true },
            TypeDescriptor::Array(element) => sequence(element, true, true),
            TypeDescriptor::List(element) => sequence(element, true, false),
            _ => LayoutKind::Unsupported,
        },
        TypeDescriptor::Composite { .. }
        | TypeDescriptor::Map { .. }
        | TypeDescriptor::Opaque { .. } => LayoutKind::Unsupported,
    }
}

fn fixed_element(descriptor: &TypeDescriptor) -> Option<FixedElement> {
    match descriptor {
        TypeDescriptor::Scalar(kind) => Some(FixedElement::scalar(*kind)),
        TypeDescriptor::Enum { name, repr } if repr.is_integer() => Some(FixedElement {
            kind: *repr,
            enum_name: Some(*name),
        }),
        _ => None,
    }
}

fn sequence(element: &TypeDescriptor, nullable: bool, array: bool) -> LayoutKind {
    match fixed_element(element) {
        Some(element) if array => LayoutKind::FixedArray { element, nullable },
        Some(element) => LayoutKind::FixedList { element, nullable },
        None => LayoutKind::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(kind: ScalarKind) -> TypeDescriptor {
        TypeDescriptor::Scalar(kind)
    }

    fn option(inner: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::Option(Box::new(inner))
    }

    #[test]
    fn test_scalars_and_enums() {
        assert_eq!(
            classify(&scalar(ScalarKind::Guid)),
            LayoutKind::Scalar(FixedElement::scalar(ScalarKind::Guid))
        );
        let color = TypeDescriptor::Enum {
            name: "Color",
            repr: ScalarKind::U8,
        };
        let kind = classify(&color);
        assert!(matches!(kind, LayoutKind::Enum(e) if e.width() == 1 && e.is_enum()));

        let bogus = TypeDescriptor::Enum {
            name: "Bogus",
            repr: ScalarKind::F32,
        };
        assert_eq!(classify(&bogus), LayoutKind::Unsupported);
    }

    #[test]
    fn test_nullable_kinds() {
        assert_eq!(
            classify(&option(scalar(ScalarKind::I64))),
            LayoutKind::NullableScalar(FixedElement::scalar(ScalarKind::I64))
        );
        assert_eq!(
            classify(&option(TypeDescriptor::String)),
            LayoutKind::String { nullable: true }
        );
        assert_eq!(
            classify(&option(TypeDescriptor::List(Box::new(scalar(ScalarKind::U16))))),
            LayoutKind::FixedList {
                element: FixedElement::scalar(ScalarKind::U16),
                nullable: true
            }
        );
        assert_eq!(
            classify(&option(option(scalar(ScalarKind::I8)))),
            LayoutKind::Unsupported
        );
        assert_eq!(
            classify(&option(TypeDescriptor::Composite { name: "Inner" })),
            LayoutKind::Unsupported
        );
    }

    #[test]
    fn test_sequences_require_fixed_elements() {
        assert!(matches!(
            classify(&TypeDescriptor::Array(Box::new(scalar(ScalarKind::F64)))),
            LayoutKind::FixedArray { nullable: false, .. }
        ));
        assert_eq!(
            classify(&TypeDescriptor::List(Box::new(TypeDescriptor::String))),
            LayoutKind::Unsupported
        );
        assert_eq!(
            classify(&TypeDescriptor::List(Box::new(option(scalar(ScalarKind::I32))))),
            LayoutKind::Unsupported
        );
        assert_eq!(
            classify(&TypeDescriptor::Map {
                key: Box::new(TypeDescriptor::String),
                value: Box::new(scalar(ScalarKind::I32)),
            }),
            LayoutKind::Unsupported
        );
    }

    #[test]
    fn test_widths() {
        assert_eq!(ScalarKind::Bool.width(), 1);
        assert_eq!(ScalarKind::Char.width(), 4);
        assert_eq!(ScalarKind::DateTime.width(), 8);
        assert_eq!(ScalarKind::DateTimeOffset.width(), 16);
        assert_eq!(
            ScalarKind::Decimal.width(),
            std::mem::size_of::<flatlay_primitives::Decimal>()
        );
    }
}
