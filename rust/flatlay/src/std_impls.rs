use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};

use flatlay_primitives::{DateTime, DateTimeOffset, Decimal, Guid, TimeSpan};

use crate::classify::{ScalarKind, TypeDescriptor};
use crate::reflect::{
    load_checked, load_checked_slice, load_pod_slice, store_pod, store_pod_slice, Flat, Reflect,
    ValueResult,
};

macro_rules! impl_pod_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Reflect for $ty {
            fn store_scalar(&self, dst: &mut [u8]) -> ValueResult<()> {
                store_pod(self, dst)
            }

            fn load_scalar(&mut self, src: &[u8]) -> ValueResult<()> {
                *self = load_checked(src)?;
                Ok(())
            }
        }

        impl Flat for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::Scalar(ScalarKind::$kind)
            }

            fn type_name() -> &'static str {
                ScalarKind::$kind.rust_path()
            }

            fn store_slice(items: &[Self], dst: &mut [u8]) -> ValueResult<()> {
                store_pod_slice(items, dst)
            }

            fn load_slice(src: &[u8]) -> ValueResult<Vec<Self>> {
                load_pod_slice(src)
            }
        }
    )*};
}

macro_rules! impl_checked_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Reflect for $ty {
            fn store_scalar(&self, dst: &mut [u8]) -> ValueResult<()> {
                store_pod(self, dst)
            }

            fn load_scalar(&mut self, src: &[u8]) -> ValueResult<()> {
                *self = load_checked(src)?;
                Ok(())
            }
        }

        impl Flat for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::Scalar(ScalarKind::$kind)
            }

            fn type_name() -> &'static str {
                ScalarKind::$kind.rust_path()
            }

            fn store_slice(items: &[Self], dst: &mut [u8]) -> ValueResult<()> {
                store_pod_slice(items, dst)
            }

            fn load_slice(src: &[u8]) -> ValueResult<Vec<Self>> {
                load_checked_slice(src)
            }
        }
    )*};
}

impl_pod_scalar!(
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    i128 => I128,
    u128 => U128,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    Guid => Guid,
    TimeSpan => TimeSpan,
    DateTime => DateTime,
    DateTimeOffset => DateTimeOffset,
);

impl_checked_scalar!(
    bool => Bool,
    char => Char,
);

impl Reflect for String {
    fn text(&self) -> Option<&str> {
        Some(self)
    }

    fn set_text(&mut self, text: String) -> ValueResult<()> {
        *self = text;
        Ok(())
    }
}

impl Flat for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::String
    }

    fn type_name() -> &'static str {
        "::std::string::String"
    }
}

impl<T: Flat> Reflect for Option<T> {
    fn nullable(&self) -> Option<Option<&dyn Reflect>> {
        Some(self.as_ref().map(|inner| inner as &dyn Reflect))
    }

    fn set_null(&mut self) -> ValueResult<()> {
        *self = None;
        Ok(())
    }

    fn present_mut(&mut self) -> Option<&mut dyn Reflect> {
        let inner: &mut dyn Reflect = self.insert(T::default());
        Some(inner)
    }
}

impl<T: Flat> Flat for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Option(Box::new(T::descriptor()))
    }
}

impl<T: Flat> Reflect for Vec<T> {
    fn element_count(&self) -> Option<usize> {
        Some(self.len())
    }

    fn store_elements(&self, dst: &mut [u8]) -> ValueResult<()> {
        T::store_slice(self, dst)
    }

    fn load_elements(&mut self, src: &[u8]) -> ValueResult<()> {
        *self = T::load_slice(src)?;
        Ok(())
    }
}

impl<T: Flat> Flat for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::List(Box::new(T::descriptor()))
    }
}

impl<T: Flat> Reflect for Box<[T]> {
    fn element_count(&self) -> Option<usize> {
        Some(self.len())
    }

    fn store_elements(&self, dst: &mut [u8]) -> ValueResult<()> {
        T::store_slice(self, dst)
    }

    fn load_elements(&mut self, src: &[u8]) -> ValueResult<()> {
        *self = T::load_slice(src)?.into_boxed_slice();
        Ok(())
    }
}

impl<T: Flat> Flat for Box<[T]> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Array(Box::new(T::descriptor()))
    }
}

// Maps have no flat layout. They still describe themselves so that a composite
// holding one compiles and the enumerator can drop the member.

impl<K, V, S> Reflect for HashMap<K, V, S>
where
    K: Flat + Eq + Hash,
    V: Flat,
    S: BuildHasher + Default + Send + Sync + 'static,
{
}

impl<K, V, S> Flat for HashMap<K, V, S>
where
    K: Flat + Eq + Hash,
    V: Flat,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Map {
            key: Box::new(K::descriptor()),
            value: Box::new(V::descriptor()),
        }
    }
}

impl<K: Flat + Ord, V: Flat> Reflect for BTreeMap<K, V> {}

impl<K: Flat + Ord, V: Flat> Flat for BTreeMap<K, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Map {
            key: Box::new(K::descriptor()),
            value: Box::new(V::descriptor()),
        }
    }
}

// Shapes with no layout at all. They only need to name themselves.

macro_rules! impl_opaque {
    ($([$($params:tt)*] $ty:ty),* $(,)?) => {$(
        impl<$($params)*> Reflect for $ty {}

        impl<$($params)*> Flat for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::Opaque {
                    name: std::any::type_name::<Self>(),
                }
            }
        }
    )*};
}

impl_opaque!(
    [] usize,
    [] isize,
    [T: Default + Send + Sync + 'static] Box<T>,
    [T: Send + Sync + 'static] VecDeque<T>,
    [T: Send + Sync + 'static] BTreeSet<T>,
    [T: Send + Sync + 'static, S: Default + Send + Sync + 'static] HashSet<T, S>,
);

impl<T: Send + Sync + 'static, const N: usize> Reflect for [T; N] {}

impl<T: Send + Sync + 'static, const N: usize> Flat for [T; N]
where
    [T; N]: Default,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Opaque {
            name: std::any::type_name::<Self>(),
        }
    }
}
