// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors for runtime type information.
//!
//! A [`TypeDescriptor`] is a closed, tagged, fully recursive description of
//! one native type. Besides the shape (the [`OuterType`] tag and child
//! descriptors), every value-bearing descriptor carries the native layout
//! and a small table of type-erased operations so that code holding only a
//! raw pointer and the descriptor can copy, destroy and walk the value.
//!
//! Descriptors are produced by the [`Describe`] trait and cached per native
//! type by [`descriptor_of`].

mod complex;
mod describe;
mod ops;

pub use complex::{Complex, ComplexComponent};
pub use describe::{descriptor_of, Describe};
pub use ops::{FutureOps, MapOps, OptionalOps, ValueOps, VariantOps, VectorOps};

use crate::reflect::{Reflect, VariantValue};
use std::alloc::Layout;
use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Top-level shape tag.
///
/// Discriminants are part of the foreign ABI and never change.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OuterType {
    Bool = 0,
    I8 = 1,
    I16 = 2,
    I32 = 3,
    I64 = 4,
    U8 = 5,
    U16 = 6,
    U32 = 7,
    U64 = 8,
    F32 = 9,
    F64 = 10,
    String = 11,
    Complex = 12,
    Vector = 13,
    UnorderedMap = 14,
    Struct = 15,
    Optional = 16,
    Variant = 17,
    SharedFuture = 18,
    Function = 19,
}

impl OuterType {
    /// `true` for bool, integers and floats.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        (self as u32) <= (Self::F64 as u32)
    }

    /// `true` for one-argument containers (the tags that carry a value type).
    #[must_use]
    pub const fn has_value_type(self) -> bool {
        matches!(
            self,
            Self::Vector | Self::Optional | Self::SharedFuture | Self::Complex
        )
    }
}

/// Shape-specific payload of a [`TypeDescriptor`].
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Bool, integer or float; the tag lives in the descriptor.
    Primitive,
    String,
    Complex {
        component: Arc<TypeDescriptor>,
    },
    Vector {
        element: Arc<TypeDescriptor>,
        ops: VectorOps,
    },
    UnorderedMap {
        key: Arc<TypeDescriptor>,
        value: Arc<TypeDescriptor>,
        ops: MapOps,
    },
    /// Reference to a registered struct, resolved through the type registry.
    Struct { name: &'static str, type_hash: u64 },
    Optional {
        value: Arc<TypeDescriptor>,
        ops: OptionalOps,
    },
    Variant {
        alternatives: Alternatives,
        ops: VariantOps,
    },
    SharedFuture {
        value: Arc<TypeDescriptor>,
        ops: FutureOps,
    },
    Function(FunctionDescriptor),
}

/// Alternatives of a variant, described on first access.
///
/// An enum may hold itself (`Branch(Vec<Tree>)`), so the alternatives are
/// not built together with the variant's own descriptor. By the time they
/// are, `descriptor_of` has cached the variant and the recursion ends there.
#[derive(Clone)]
pub struct Alternatives {
    describe: fn() -> Vec<Arc<TypeDescriptor>>,
    resolved: OnceLock<Vec<Arc<TypeDescriptor>>>,
}

impl Alternatives {
    fn new(describe: fn() -> Vec<Arc<TypeDescriptor>>) -> Self {
        Self {
            describe,
            resolved: OnceLock::new(),
        }
    }

    /// Alternative descriptors in declaration order.
    #[must_use]
    pub fn get(&self) -> &[Arc<TypeDescriptor>] {
        self.resolved.get_or_init(self.describe)
    }
}

impl fmt::Debug for Alternatives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolved.get() {
            Some(alts) => f
                .debug_list()
                .entries(alts.iter().map(|a| a.name()))
                .finish(),
            None => f.write_str("[<unresolved>]"),
        }
    }
}

/// A complete type descriptor.
#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    outer: OuterType,
    type_id: Option<TypeId>,
    layout: Layout,
    ops: Option<ValueOps>,
    kind: TypeKind,
}

impl TypeDescriptor {
    fn value<T: Clone + 'static>(name: impl Into<String>, outer: OuterType, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            outer,
            type_id: Some(TypeId::of::<T>()),
            layout: Layout::new::<T>(),
            ops: Some(ValueOps::of::<T>()),
            kind,
        }
    }

    /// Primitive scalar descriptor.
    pub(crate) fn primitive<T: Clone + 'static>(name: &str, outer: OuterType) -> Self {
        debug_assert!(outer.is_primitive());
        Self::value::<T>(name, outer, TypeKind::Primitive)
    }

    pub(crate) fn string() -> Self {
        Self::value::<String>("String", OuterType::String, TypeKind::String)
    }

    pub(crate) fn complex<T: ComplexComponent>() -> Self {
        let component = descriptor_of::<T>();
        Self::value::<Complex<T>>(
            format!("Complex<{}>", component.name()),
            OuterType::Complex,
            TypeKind::Complex { component },
        )
    }

    pub(crate) fn vector<T: Describe>() -> Self {
        let element = descriptor_of::<T>();
        Self::value::<Vec<T>>(
            format!("Vec<{}>", element.name()),
            OuterType::Vector,
            TypeKind::Vector {
                element,
                ops: VectorOps::of::<T>(),
            },
        )
    }

    pub(crate) fn unordered_map<K, V>() -> Self
    where
        K: Describe + Eq + std::hash::Hash,
        V: Describe,
    {
        let key = descriptor_of::<K>();
        let value = descriptor_of::<V>();
        Self::value::<std::collections::HashMap<K, V>>(
            format!("HashMap<{}, {}>", key.name(), value.name()),
            OuterType::UnorderedMap,
            TypeKind::UnorderedMap {
                key,
                value,
                ops: MapOps::of::<K, V>(),
            },
        )
    }

    pub(crate) fn optional<T: Describe>() -> Self {
        let value = descriptor_of::<T>();
        Self::value::<Option<T>>(
            format!("Option<{}>", value.name()),
            OuterType::Optional,
            TypeKind::Optional {
                value,
                ops: OptionalOps::of::<T>(),
            },
        )
    }

    pub(crate) fn shared_future<T: Describe>() -> Self {
        let value = descriptor_of::<T>();
        Self::value::<crate::future::SharedFuture<T>>(
            format!("SharedFuture<{}>", value.name()),
            OuterType::SharedFuture,
            TypeKind::SharedFuture {
                value,
                ops: FutureOps::of::<T>(),
            },
        )
    }

    /// Descriptor for a reflected struct.
    ///
    /// Only the struct's name and hash are stored; members are found through
    /// the type registry when the value is interpreted.
    pub fn structure<T: Reflect>() -> Self {
        Self::value::<T>(
            T::TYPE_NAME,
            OuterType::Struct,
            TypeKind::Struct {
                name: T::TYPE_NAME,
                type_hash: type_hash::<T>(),
            },
        )
    }

    /// Descriptor for a sum type whose alternatives are described by `T`.
    ///
    /// `T::alternatives` runs on the first call to
    /// [`alternatives`](Self::alternatives), not here.
    pub fn variant<T: VariantValue>(name: &str) -> Self {
        Self::value::<T>(
            name,
            OuterType::Variant,
            TypeKind::Variant {
                alternatives: Alternatives::new(T::alternatives),
                ops: VariantOps::of::<T>(),
            },
        )
    }

    /// Descriptor for a member function signature.
    #[must_use]
    pub fn function(function: FunctionDescriptor) -> Self {
        Self {
            name: function.signature(),
            outer: OuterType::Function,
            type_id: None,
            layout: Layout::new::<()>(),
            ops: None,
            kind: TypeKind::Function(function),
        }
    }

    /// Display name, e.g. `Vec<f64>` or the struct's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn outer_type(&self) -> OuterType {
        self.outer
    }

    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Native type identity (`None` for function descriptors).
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    /// Byte size of a value; the size a result buffer must have.
    #[must_use]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    #[must_use]
    pub fn align(&self) -> usize {
        self.layout.align()
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Copy/drop table (`None` for function descriptors).
    #[must_use]
    pub fn ops(&self) -> Option<&ValueOps> {
        self.ops.as_ref()
    }

    /// Map key descriptor; present iff the outer type is `UnorderedMap`.
    #[must_use]
    pub fn key_type(&self) -> Option<&Arc<TypeDescriptor>> {
        match &self.kind {
            TypeKind::UnorderedMap { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Element descriptor; present iff the outer type is Vector, Optional,
    /// SharedFuture or Complex.
    #[must_use]
    pub fn value_type(&self) -> Option<&Arc<TypeDescriptor>> {
        match &self.kind {
            TypeKind::Vector { element, .. } => Some(element),
            TypeKind::Optional { value, .. } | TypeKind::SharedFuture { value, .. } => Some(value),
            TypeKind::Complex { component } => Some(component),
            _ => None,
        }
    }

    /// Mapped value descriptor of an `UnorderedMap`.
    #[must_use]
    pub fn map_value_type(&self) -> Option<&Arc<TypeDescriptor>> {
        match &self.kind {
            TypeKind::UnorderedMap { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Alternatives of a `Variant`, in declaration order.
    #[must_use]
    pub fn alternatives(&self) -> Option<&[Arc<TypeDescriptor>]> {
        match &self.kind {
            TypeKind::Variant { alternatives, .. } => Some(alternatives.get()),
            _ => None,
        }
    }

    #[must_use]
    pub fn function_descriptor(&self) -> Option<&FunctionDescriptor> {
        match &self.kind {
            TypeKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// `(name, hash)` of the referenced struct for `Struct` descriptors.
    #[must_use]
    pub fn struct_ref(&self) -> Option<(&'static str, u64)> {
        match self.kind {
            TypeKind::Struct { name, type_hash } => Some((name, type_hash)),
            _ => None,
        }
    }

    /// Structural equality: same tag, same native type, same children.
    #[must_use]
    pub fn same_shape(&self, other: &TypeDescriptor) -> bool {
        if self.outer != other.outer || self.type_id != other.type_id {
            return false;
        }
        match (&self.kind, &other.kind) {
            (TypeKind::Function(a), TypeKind::Function(b)) => a.same_signature(b),
            _ => self.name == other.name,
        }
    }

    /// Check the tag invariants of this node and its children.
    ///
    /// # Panics
    ///
    /// Panics when a node is inconsistent. Descriptors are validated while
    /// a struct is being registered, so bad metadata stops the process at
    /// startup instead of surfacing mid-call.
    pub fn validate(&self) {
        self.validate_in(&mut Vec::new());
    }

    // `seen` holds the variants on the current path; a variant that
    // contains itself is checked once.
    fn validate_in(&self, seen: &mut Vec<TypeId>) {
        assert_eq!(
            self.key_type().is_some(),
            self.outer == OuterType::UnorderedMap,
            "descriptor '{}': key type present iff UnorderedMap",
            self.name
        );
        assert_eq!(
            self.value_type().is_some(),
            self.outer.has_value_type(),
            "descriptor '{}': value type present iff one-argument container",
            self.name
        );
        assert_eq!(
            self.ops.is_none(),
            self.outer == OuterType::Function,
            "descriptor '{}': value ops missing",
            self.name
        );
        if let Some(key) = self.key_type() {
            key.validate_in(seen);
        }
        if let Some(value) = self.value_type().or(self.map_value_type()) {
            value.validate_in(seen);
        }
        if let TypeKind::Variant { alternatives, .. } = &self.kind {
            let id = self.type_id.unwrap_or_else(TypeId::of::<()>);
            if seen.contains(&id) {
                return;
            }
            let alternatives = alternatives.get();
            assert!(
                !alternatives.is_empty(),
                "descriptor '{}': variant without alternatives",
                self.name
            );
            seen.push(id);
            alternatives.iter().for_each(|a| a.validate_in(seen));
            seen.pop();
        }
        if let Some(function) = self.function_descriptor() {
            function.params().iter().for_each(|p| p.validate_in(seen));
            if let Some(ret) = function.returns() {
                ret.validate_in(seen);
            }
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("outer", &self.outer)
            .field("size", &self.layout.size())
            .field("align", &self.layout.align())
            .finish_non_exhaustive()
    }
}

/// Signature of a member function.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    params: Vec<Arc<TypeDescriptor>>,
    returns: Option<Arc<TypeDescriptor>>,
    is_const: bool,
}

impl FunctionDescriptor {
    #[must_use]
    pub fn new(
        params: Vec<Arc<TypeDescriptor>>,
        returns: Option<Arc<TypeDescriptor>>,
        is_const: bool,
    ) -> Self {
        Self {
            params,
            returns,
            is_const,
        }
    }

    /// Parameter descriptors in call order.
    #[must_use]
    pub fn params(&self) -> &[Arc<TypeDescriptor>] {
        &self.params
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Return descriptor, `None` for void.
    #[must_use]
    pub fn returns(&self) -> Option<&Arc<TypeDescriptor>> {
        self.returns.as_ref()
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        self.returns.is_none()
    }

    /// `true` when the function takes its receiver by shared reference.
    #[must_use]
    pub fn is_const(&self) -> bool {
        self.is_const
    }

    /// Human-readable signature, e.g. `fn(f64, f64) -> f64 const`.
    #[must_use]
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| p.name()).collect();
        let mut sig = format!("fn({})", params.join(", "));
        if let Some(ret) = &self.returns {
            sig.push_str(" -> ");
            sig.push_str(ret.name());
        }
        if self.is_const {
            sig.push_str(" const");
        }
        sig
    }

    fn same_signature(&self, other: &FunctionDescriptor) -> bool {
        self.is_const == other.is_const
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.same_shape(b))
            && match (&self.returns, &other.returns) {
                (Some(a), Some(b)) => a.same_shape(b),
                (None, None) => true,
                _ => false,
            }
    }
}

/// FNV-1a 64-bit hash of the native type path of `T`.
///
/// Used as the fast identity pre-check before falling back to names.
#[must_use]
pub fn type_hash<T: ?Sized + 'static>() -> u64 {
    fnv1a64(std::any::type_name::<T>())
}

pub(crate) const fn fnv1a64(s: &str) -> u64 {
    let bytes = s.as_bytes();
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        i += 1;
    }
    hash
}
