// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The fixed native-type to descriptor table.

use super::{Complex, ComplexComponent, OuterType, TypeDescriptor};
use crate::future::SharedFuture;
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

/// A native type that has a [`TypeDescriptor`].
///
/// Implemented for every supported shape; user structs and enums get it from
/// `#[derive(Reflect)]`. Using a type without an implementation as a field,
/// parameter or return type does not compile.
pub trait Describe: Clone + 'static {
    /// Build a fresh descriptor. Prefer [`descriptor_of`], which caches.
    fn describe() -> TypeDescriptor;
}

fn cache() -> &'static DashMap<TypeId, Arc<TypeDescriptor>> {
    static CACHE: OnceLock<DashMap<TypeId, Arc<TypeDescriptor>>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

/// Shared descriptor for `T`, built on first use.
pub fn descriptor_of<T: Describe>() -> Arc<TypeDescriptor> {
    let id = TypeId::of::<T>();
    if let Some(desc) = cache().get(&id) {
        return Arc::clone(&desc);
    }
    // Built without holding a shard guard: `describe` recurses into
    // `descriptor_of` for child types.
    let built = Arc::new(T::describe());
    Arc::clone(&cache().entry(id).or_insert(built))
}

macro_rules! describe_primitive {
    ($($ty:ty => $outer:ident),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::primitive::<$ty>(stringify!($ty), OuterType::$outer)
                }
            }
        )*
    };
}

describe_primitive! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl Describe for String {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::string()
    }
}

impl<T: ComplexComponent> Describe for Complex<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::complex::<T>()
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::vector::<T>()
    }
}

impl<K, V> Describe for HashMap<K, V>
where
    K: Describe + Eq + Hash,
    V: Describe,
{
    fn describe() -> TypeDescriptor {
        TypeDescriptor::unordered_map::<K, V>()
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::optional::<T>()
    }
}

impl<T: Describe> Describe for SharedFuture<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::shared_future::<T>()
    }
}
