//! Member enumeration: turns the members a type declares into the ordered list of
//! descriptors that takes part in its layout.
//!
//! A member is eligible when it is public, not ignored, readable and writable
//! and classifies into a supported layout kind. Properties are considered only
//! when properties are enabled. Ineligible members are dropped silently: the
//! value they hold is not encoded and decodes back as the member's default.
//! This is easy to trip over, so [`report`] lists every member together with the
//! reason it was excluded.

use std::fmt;

use crate::classify::{classify, FixedElement, LayoutKind, TypeDescriptor};
use crate::error::Error;
use crate::reflect::{Flat, Reflect};
use crate::Result;

/// Reads a member of `T` and hands it to the visitor.
pub type Getter<T> = fn(&T, &mut dyn FnMut(&dyn Reflect) -> Result<()>) -> Result<()>;

/// Hands a writable slot for a member of `T` to the visitor and stores the result.
pub type Setter<T> = fn(&mut T, &mut dyn FnMut(&mut dyn Reflect) -> Result<()>) -> Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Where a member's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOrigin {
    /// The whole value of a top-level classifiable type.
    Value,
    /// A named struct field.
    Field,
    /// A value exposed through accessor methods.
    Property {
        getter: Option<&'static str>,
        setter: Option<&'static str>,
    },
}

/// A member as declared by a [`Flat`] implementation.
pub struct MemberInfo<T> {
    pub name: &'static str,
    pub type_name: &'static str,
    pub origin: MemberOrigin,
    pub visibility: Visibility,
    pub ignore: bool,
    /// `None` for ignored members, whose type need not implement [`Flat`].
    pub descriptor: Option<fn() -> TypeDescriptor>,
    pub get: Option<Getter<T>>,
    pub set: Option<Setter<T>>,
}

impl<T> MemberInfo<T> {
    pub fn field(
        name: &'static str,
        type_name: &'static str,
        visibility: Visibility,
        descriptor: fn() -> TypeDescriptor,
        get: Getter<T>,
        set: Setter<T>,
    ) -> MemberInfo<T> {
        MemberInfo {
            name,
            type_name,
            origin: MemberOrigin::Field,
            visibility,
            ignore: false,
            descriptor: Some(descriptor),
            get: Some(get),
            set: Some(set),
        }
    }

    /// A field marked `#[flat(skip)]`.
    pub fn skipped(
        name: &'static str,
        type_name: &'static str,
        visibility: Visibility,
    ) -> MemberInfo<T> {
        MemberInfo {
            name,
            type_name,
            origin: MemberOrigin::Field,
            visibility,
            ignore: true,
            descriptor: None,
            get: None,
            set: None,
        }
    }

    pub fn property(
        name: &'static str,
        type_name: &'static str,
        descriptor: fn() -> TypeDescriptor,
        get: Option<(&'static str, Getter<T>)>,
        set: Option<(&'static str, Setter<T>)>,
    ) -> MemberInfo<T> {
        MemberInfo {
            name,
            type_name,
            origin: MemberOrigin::Property {
                getter: get.map(|(method, _)| method),
                setter: set.map(|(method, _)| method),
            },
            visibility: Visibility::Public,
            ignore: false,
            descriptor: Some(descriptor),
            get: get.map(|(_, get)| get),
            set: set.map(|(_, set)| set),
        }
    }

    pub fn ignored(mut self) -> MemberInfo<T> {
        self.ignore = true;
        self
    }

    pub fn is_property(&self) -> bool {
        matches!(self.origin, MemberOrigin::Property { .. })
    }
}

impl<T> fmt::Debug for MemberInfo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("origin", &self.origin)
            .field("visibility", &self.visibility)
            .field("ignore", &self.ignore)
            .finish_non_exhaustive()
    }
}

/// Read and write access to one eligible member.
pub struct Accessor<T> {
    pub get: Getter<T>,
    pub set: Setter<T>,
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Accessor<T> {}

impl<T: Flat> Accessor<T> {
    /// Accessor of the whole value.
    pub fn identity() -> Accessor<T> {
        Accessor {
            get: |value, visit| visit(value as &dyn Reflect),
            set: |value, visit| visit(value as &mut dyn Reflect),
        }
    }
}

/// Immutable description of one member, as consumed by the layout planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub name: &'static str,
    pub type_name: &'static str,
    pub declared: TypeDescriptor,
    pub kind: LayoutKind,
    /// Element type wrapped by a nullable scalar.
    pub nullable_underlying: Option<FixedElement>,
    /// Element type of an array or list.
    pub element: Option<FixedElement>,
    pub ignore: bool,
    pub origin: MemberOrigin,
    /// Index of the member's [`Accessor`].
    pub slot: usize,
}

impl MemberDescriptor {
    fn new(
        name: &'static str,
        type_name: &'static str,
        origin: MemberOrigin,
        ignore: bool,
        declared: TypeDescriptor,
        slot: usize,
    ) -> MemberDescriptor {
        let kind = if ignore {
            LayoutKind::Unsupported
        } else {
            classify(&declared)
        };
        let nullable_underlying = match kind {
            LayoutKind::NullableScalar(element) => Some(element),
            _ => None,
        };
        let element = match kind {
            LayoutKind::FixedArray { element, .. } | LayoutKind::FixedList { element, .. } => {
                Some(element)
            }
            _ => None,
        };
        MemberDescriptor {
            name,
            type_name,
            declared,
            kind,
            nullable_underlying,
            element,
            ignore,
            origin,
            slot,
        }
    }
}

/// Why a declared member is not part of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Ignored,
    NotPublic,
    PropertiesDisabled,
    /// A property without both a getter and a setter.
    NotReadWrite,
    Unsupported,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Exclusion::Ignored => "ignored",
            Exclusion::NotPublic => "not public",
            Exclusion::PropertiesDisabled => "properties are disabled",
            Exclusion::NotReadWrite => "not readable and writable",
            Exclusion::Unsupported => "unsupported type",
        })
    }
}

/// One declared member and the verdict of the enumerator on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberReport {
    pub descriptor: MemberDescriptor,
    pub exclusion: Option<Exclusion>,
}

/// Eligible members of a type in wire order, with their accessors.
pub struct Members<T> {
    pub descriptors: Vec<MemberDescriptor>,
    pub accessors: Vec<Accessor<T>>,
}

impl<T> Members<T> {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Produces the ordered members of `T`.
///
/// A type that classifies on its own yields a single synthetic member for the
/// whole value. A composite yields its eligible fields in declaration order
/// followed by its eligible properties. Any other type is an error.
pub fn enumerate<T: Flat>(include_properties: bool) -> Result<Members<T>> {
    let declared = T::descriptor();
    let kind = classify(&declared);
    if kind.is_supported() {
        let descriptor = MemberDescriptor::new(
            T::type_name(),
            T::type_name(),
            MemberOrigin::Value,
            false,
            declared,
            0,
        );
        return Ok(Members {
            descriptors: vec![descriptor],
            accessors: vec![Accessor::identity()],
        });
    }
    if !matches!(declared, TypeDescriptor::Composite { .. }) {
        return Err(Error::unsupported_type(T::type_name()));
    }

    let mut fields = Vec::new();
    let mut properties = Vec::new();
    for (index, info) in T::members().into_iter().enumerate() {
        let report = inspect(index, &info, include_properties);
        if let Some(reason) = report.exclusion {
            log::trace!(
                "{}: dropping member '{}' ({}): {reason}",
                T::type_name(),
                info.name,
                info.type_name,
            );
            continue;
        }
        let (Some(get), Some(set)) = (info.get, info.set) else {
            continue;
        };
        let target = if info.is_property() {
            &mut properties
        } else {
            &mut fields
        };
        target.push((report.descriptor, Accessor { get, set }));
    }

    let (mut descriptors, accessors): (Vec<_>, Vec<_>) =
        fields.into_iter().chain(properties).unzip();
    for (slot, descriptor) in descriptors.iter_mut().enumerate() {
        descriptor.slot = slot;
    }
    Ok(Members {
        descriptors,
        accessors,
    })
}

/// Lists every member `T` declares, in declaration order, with the reason it is
/// excluded from the layout if it is.
pub fn report<T: Flat>(include_properties: bool) -> Vec<MemberReport> {
    T::members()
        .iter()
        .enumerate()
        .map(|(index, info)| inspect(index, info, include_properties))
        .collect()
}

fn inspect<T>(index: usize, info: &MemberInfo<T>, include_properties: bool) -> MemberReport {
    let declared = match info.descriptor {
        Some(descriptor) => descriptor(),
        None => TypeDescriptor::Opaque {
            name: info.type_name,
        },
    };
    let descriptor = MemberDescriptor::new(
        info.name,
        info.type_name,
        info.origin,
        info.ignore,
        declared,
        index,
    );
    let exclusion = if info.ignore {
        Some(Exclusion::Ignored)
    } else if info.visibility != Visibility::Public {
        Some(Exclusion::NotPublic)
    } else if info.is_property() && !include_properties {
        Some(Exclusion::PropertiesDisabled)
    } else if info.get.is_none() || info.set.is_none() {
        Some(Exclusion::NotReadWrite)
    } else if !descriptor.kind.is_supported() {
        Some(Exclusion::Unsupported)
    } else {
        None
    };
    MemberReport {
        descriptor,
        exclusion,
    }
}
