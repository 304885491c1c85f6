// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Raw value views.
//!
//! [`RawValue`] pairs an address with the descriptor that explains it and
//! exposes the descriptor's operation tables behind kind checks. It is the
//! way to walk strings, containers, optionals and variants when all that is
//! known about a value is its [`TypeDescriptor`].

use crate::error::{BridgeError, Result};
use crate::registry::TypeRegistry;
use crate::types::{
    Describe, MapOps, OptionalOps, OuterType, TypeDescriptor, TypeKind, VariantOps, VectorOps,
};
use std::any::TypeId;
use std::ptr;
use std::sync::Arc;

/// A described, borrowed value.
///
/// The view does not own the value. Every accessor relies on the
/// construction contract of [`RawValue::new`].
#[derive(Debug, Clone)]
pub struct RawValue {
    desc: Arc<TypeDescriptor>,
    ptr: *mut u8,
}

impl RawValue {
    /// # Safety
    ///
    /// `ptr` must point to a live value of the type `desc` describes, and
    /// stay valid while the view (or any view derived from it) is used.
    pub unsafe fn new(desc: Arc<TypeDescriptor>, ptr: *mut u8) -> Result<Self> {
        if ptr.is_null() {
            return Err(BridgeError::invalid(format!("null pointer for {}", desc.name())));
        }
        Ok(Self { desc, ptr })
    }

    fn check_construct(desc: &TypeDescriptor, dst: *mut u8, outer: OuterType) -> Result<()> {
        if desc.outer_type() != outer {
            return Err(BridgeError::mismatch(format!("{:?}", outer), desc.name()));
        }
        if dst.is_null() {
            return Err(BridgeError::invalid(format!("null destination for {}", desc.name())));
        }
        Ok(())
    }

    /// Construct an empty string, vector, map or optional in place and
    /// return a view over it.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of `desc.size()` bytes with
    /// `desc.align()` alignment and hold no live value. The caller owns the
    /// new value and must eventually [`drop_in_place`](Self::drop_in_place)
    /// it.
    pub unsafe fn construct_empty(desc: Arc<TypeDescriptor>, dst: *mut u8) -> Result<Self> {
        Self::check_construct(&desc, dst, desc.outer_type())?;
        match desc.kind() {
            TypeKind::String => ptr::write(dst.cast::<String>(), String::new()),
            TypeKind::Vector { ops, .. } => (ops.construct_empty)(dst),
            TypeKind::UnorderedMap { ops, .. } => (ops.construct_empty)(dst),
            TypeKind::Optional { ops, .. } => (ops.construct)(dst, ptr::null()),
            _ => return Err(BridgeError::mismatch("empty-constructible", desc.name())),
        }
        Ok(Self { desc, ptr: dst })
    }

    /// Construct a string holding a copy of `value` in place.
    ///
    /// # Safety
    ///
    /// As for [`construct_empty`](Self::construct_empty).
    pub unsafe fn construct_string(
        desc: Arc<TypeDescriptor>,
        dst: *mut u8,
        value: &str,
    ) -> Result<Self> {
        Self::check_construct(&desc, dst, OuterType::String)?;
        ptr::write(dst.cast::<String>(), value.to_owned());
        Ok(Self { desc, ptr: dst })
    }

    /// Construct an optional in place: empty when `payload` is null (no
    /// payload is built), otherwise holding a clone of `*payload`.
    ///
    /// # Safety
    ///
    /// As for [`construct_empty`](Self::construct_empty); a non-null
    /// `payload` must point to a live value of the payload type.
    pub unsafe fn construct_optional(
        desc: Arc<TypeDescriptor>,
        dst: *mut u8,
        payload: *const u8,
    ) -> Result<Self> {
        Self::check_construct(&desc, dst, OuterType::Optional)?;
        let TypeKind::Optional { ops, .. } = desc.kind() else {
            return Err(BridgeError::mismatch("Optional", desc.name()));
        };
        (ops.construct)(dst, payload);
        Ok(Self { desc, ptr: dst })
    }

    /// Construct a variant in place from its `{index, payload}` form.
    ///
    /// # Safety
    ///
    /// As for [`construct_empty`](Self::construct_empty); `payload` must
    /// point to a live value of alternative `index`'s type.
    pub unsafe fn construct_variant(
        desc: Arc<TypeDescriptor>,
        dst: *mut u8,
        index: usize,
        payload: *const u8,
    ) -> Result<Self> {
        Self::check_construct(&desc, dst, OuterType::Variant)?;
        let TypeKind::Variant { alternatives, ops } = desc.kind() else {
            return Err(BridgeError::mismatch("Variant", desc.name()));
        };
        if index >= alternatives.get().len() {
            return Err(BridgeError::invalid(format!(
                "alternative {} out of range for {}",
                index,
                desc.name()
            )));
        }
        if payload.is_null() {
            return Err(BridgeError::invalid("null payload pointer"));
        }
        if !(ops.construct)(dst, index, payload) {
            return Err(BridgeError::invalid(format!("alternative {} rejected", index)));
        }
        Ok(Self { desc, ptr: dst })
    }

    /// View over a typed reference.
    pub fn of<T: Describe>(value: &mut T) -> Self {
        Self {
            desc: crate::types::descriptor_of::<T>(),
            ptr: (value as *mut T).cast(),
        }
    }

    #[must_use]
    pub fn desc(&self) -> &Arc<TypeDescriptor> {
        &self.desc
    }

    #[must_use]
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    #[must_use]
    pub fn outer_type(&self) -> OuterType {
        self.desc.outer_type()
    }

    fn expect_outer(&self, outer: OuterType) -> Result<()> {
        if self.desc.outer_type() == outer {
            Ok(())
        } else {
            Err(BridgeError::mismatch(format!("{:?}", outer), self.desc.name()))
        }
    }

    fn child(&self, desc: &Arc<TypeDescriptor>, ptr: *mut u8) -> Result<Self> {
        // SAFETY: `ptr` comes from an ops table applied to our own value.
        unsafe { Self::new(Arc::clone(desc), ptr) }
    }

    /// Copy the value out as `T`.
    pub fn read<T: Describe>(&self) -> Result<T> {
        if self.desc.type_id() != Some(TypeId::of::<T>()) {
            return Err(BridgeError::mismatch(self.desc.name(), std::any::type_name::<T>()));
        }
        // SAFETY: type identity checked above.
        Ok(unsafe { (&*self.ptr.cast::<T>()).clone() })
    }

    /// Deep-assign `value` over the viewed value.
    pub fn write<T: Describe>(&self, value: &T) -> Result<()> {
        if self.desc.type_id() != Some(TypeId::of::<T>()) {
            return Err(BridgeError::mismatch(self.desc.name(), std::any::type_name::<T>()));
        }
        // SAFETY: type identity checked above.
        unsafe { (&mut *self.ptr.cast::<T>()).clone_from(value) };
        Ok(())
    }

    pub fn string(&self) -> Result<&str> {
        self.expect_outer(OuterType::String)?;
        // SAFETY: String-tagged descriptors describe `String`.
        Ok(unsafe { (&*self.ptr.cast::<String>()).as_str() })
    }

    pub fn set_string(&self, value: &str) -> Result<()> {
        self.expect_outer(OuterType::String)?;
        // SAFETY: as above.
        let s = unsafe { &mut *self.ptr.cast::<String>() };
        s.clear();
        s.push_str(value);
        Ok(())
    }

    fn vector(&self) -> Result<(&Arc<TypeDescriptor>, &VectorOps)> {
        match self.desc.kind() {
            TypeKind::Vector { element, ops } => Ok((element, ops)),
            _ => Err(BridgeError::mismatch("Vector", self.desc.name())),
        }
    }

    pub fn vector_len(&self) -> Result<usize> {
        let (_, ops) = self.vector()?;
        Ok(unsafe { (ops.len)(self.ptr) })
    }

    /// View of element `index`; `InvalidArgument` when out of range.
    pub fn vector_at(&self, index: usize) -> Result<Self> {
        let (element, ops) = self.vector()?;
        let ptr = unsafe { (ops.element)(self.ptr, index) };
        if ptr.is_null() {
            return Err(BridgeError::invalid(format!("index {} out of range", index)));
        }
        self.child(element, ptr)
    }

    /// Append a clone of the element at `element`.
    ///
    /// # Safety
    ///
    /// `element` must point to a live value of the element type.
    pub unsafe fn vector_push(&self, element: *const u8) -> Result<()> {
        let (_, ops) = self.vector()?;
        if element.is_null() {
            return Err(BridgeError::invalid("null element pointer"));
        }
        (ops.push)(self.ptr, element);
        Ok(())
    }

    pub fn vector_clear(&self) -> Result<()> {
        let (_, ops) = self.vector()?;
        unsafe { (ops.clear)(self.ptr) };
        Ok(())
    }

    #[allow(clippy::type_complexity)]
    fn map(&self) -> Result<(&Arc<TypeDescriptor>, &Arc<TypeDescriptor>, &MapOps)> {
        match self.desc.kind() {
            TypeKind::UnorderedMap { key, value, ops } => Ok((key, value, ops)),
            _ => Err(BridgeError::mismatch("UnorderedMap", self.desc.name())),
        }
    }

    pub fn map_len(&self) -> Result<usize> {
        let (_, _, ops) = self.map()?;
        Ok(unsafe { (ops.len)(self.ptr) })
    }

    /// `(key, value)` views of the n-th entry in iteration order.
    pub fn map_entry(&self, index: usize) -> Result<(Self, Self)> {
        let (key, value, ops) = self.map()?;
        let (k, v) = unsafe { (ops.entry)(self.ptr, index) }
            .ok_or_else(|| BridgeError::invalid(format!("entry {} out of range", index)))?;
        Ok((self.child(key, k.cast_mut())?, self.child(value, v)?))
    }

    /// View of the value stored under the key at `key`, if any.
    ///
    /// # Safety
    ///
    /// `key` must point to a live value of the key type.
    pub unsafe fn map_find(&self, key: *const u8) -> Result<Option<Self>> {
        let (_, value, ops) = self.map()?;
        if key.is_null() {
            return Err(BridgeError::invalid("null key pointer"));
        }
        let found = (ops.find)(self.ptr, key);
        if found.is_null() {
            return Ok(None);
        }
        self.child(value, found).map(Some)
    }

    /// Insert (or overwrite) clones of `key` and `value`.
    ///
    /// # Safety
    ///
    /// `key` and `value` must point to live values of the key and mapped
    /// types.
    pub unsafe fn map_insert(&self, key: *const u8, value: *const u8) -> Result<()> {
        let (_, _, ops) = self.map()?;
        if key.is_null() || value.is_null() {
            return Err(BridgeError::invalid("null key or value pointer"));
        }
        (ops.insert)(self.ptr, key, value);
        Ok(())
    }

    pub fn map_clear(&self) -> Result<()> {
        let (_, _, ops) = self.map()?;
        unsafe { (ops.clear)(self.ptr) };
        Ok(())
    }

    fn optional(&self) -> Result<(&Arc<TypeDescriptor>, &OptionalOps)> {
        match self.desc.kind() {
            TypeKind::Optional { value, ops } => Ok((value, ops)),
            _ => Err(BridgeError::mismatch("Optional", self.desc.name())),
        }
    }

    pub fn optional_has_value(&self) -> Result<bool> {
        let (_, ops) = self.optional()?;
        Ok(unsafe { (ops.has_value)(self.ptr) })
    }

    /// Payload view, `None` when empty.
    pub fn optional_value(&self) -> Result<Option<Self>> {
        let (value, ops) = self.optional()?;
        let ptr = unsafe { (ops.value)(self.ptr) };
        if ptr.is_null() {
            return Ok(None);
        }
        self.child(value, ptr).map(Some)
    }

    pub fn optional_reset(&self) -> Result<()> {
        let (_, ops) = self.optional()?;
        unsafe { (ops.reset)(self.ptr) };
        Ok(())
    }

    /// Store a clone of the payload at `value`.
    ///
    /// # Safety
    ///
    /// `value` must point to a live value of the payload type.
    pub unsafe fn optional_emplace(&self, value: *const u8) -> Result<()> {
        let (_, ops) = self.optional()?;
        if value.is_null() {
            return Err(BridgeError::invalid("null payload pointer"));
        }
        (ops.emplace)(self.ptr, value);
        Ok(())
    }

    fn variant(&self) -> Result<(&[Arc<TypeDescriptor>], &VariantOps)> {
        match self.desc.kind() {
            TypeKind::Variant { alternatives, ops } => Ok((alternatives.get(), ops)),
            _ => Err(BridgeError::mismatch("Variant", self.desc.name())),
        }
    }

    pub fn variant_index(&self) -> Result<usize> {
        let (_, ops) = self.variant()?;
        Ok(unsafe { (ops.index)(self.ptr) })
    }

    /// View of the active alternative's payload.
    pub fn variant_value(&self) -> Result<Self> {
        let (alternatives, ops) = self.variant()?;
        let index = unsafe { (ops.index)(self.ptr) };
        let desc = alternatives
            .get(index)
            .ok_or_else(|| BridgeError::invalid(format!("active index {} out of range", index)))?;
        let ptr = unsafe { (ops.value)(self.ptr) };
        self.child(desc, ptr)
    }

    /// Switch to alternative `index`, cloned from `payload`.
    ///
    /// # Safety
    ///
    /// `payload` must point to a live value of alternative `index`'s type.
    pub unsafe fn variant_emplace(&self, index: usize, payload: *const u8) -> Result<()> {
        let (alternatives, ops) = self.variant()?;
        if index >= alternatives.len() {
            return Err(BridgeError::invalid(format!(
                "alternative {} out of range for {}",
                index,
                self.desc.name()
            )));
        }
        if payload.is_null() {
            return Err(BridgeError::invalid("null payload pointer"));
        }
        if (ops.emplace)(self.ptr, index, payload) {
            Ok(())
        } else {
            Err(BridgeError::invalid(format!("alternative {} rejected", index)))
        }
    }

    /// View of a data member of a struct value, resolving the struct
    /// through `registry`.
    pub fn field(&self, registry: &TypeRegistry, name: &str) -> Result<Self> {
        let sd = registry.resolve(&self.desc)?;
        let member = sd.require_member(name)?;
        let ptr = unsafe { member.get(self.ptr)? };
        self.child(member.type_desc(), ptr)
    }

    /// Clone the value into uninitialized storage at `dst`.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of `desc().size()` bytes with
    /// `desc().align()` alignment and hold no live value.
    pub unsafe fn clone_into(&self, dst: *mut u8) -> Result<()> {
        let ops = self
            .desc
            .ops()
            .ok_or_else(|| BridgeError::mismatch("value", self.desc.name()))?;
        if dst.is_null() {
            return Err(BridgeError::invalid("null destination"));
        }
        (ops.clone_into)(self.ptr, dst);
        Ok(())
    }

    /// Run the value's destructor; the view must not be used afterwards.
    ///
    /// # Safety
    ///
    /// The value must be owned by the caller (e.g. a result buffer filled
    /// by the invocation engine) and not dropped again by anyone else.
    pub unsafe fn drop_in_place(self) -> Result<()> {
        let ops = self
            .desc
            .ops()
            .ok_or_else(|| BridgeError::mismatch("value", self.desc.name()))?;
        (ops.drop_in_place)(self.ptr);
        Ok(())
    }
}
