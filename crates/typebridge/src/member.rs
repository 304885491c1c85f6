// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Struct members and their accessors.
//!
//! A [`MemberInfo`] is either a data member (field type plus byte offset
//! inside the owner) or a function member (signature plus a type-erased
//! [`Invoker`]). Members are collected by a [`StructBuilder`] and frozen into
//! a [`StructDescriptor`] when the owning type is registered.

use crate::error::{BridgeError, Result};
use crate::invoke::{IntoInvoker, Invoker};
use crate::types::{descriptor_of, type_hash, Describe, FunctionDescriptor, TypeDescriptor};
use std::alloc::Layout;
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Data or function member.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Data = 0,
    Function = 1,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Function => write!(f, "function"),
        }
    }
}

#[derive(Clone)]
enum Access {
    Data { offset: usize },
    Function(Invoker),
}

/// Metadata for one struct member.
#[derive(Clone)]
pub struct MemberInfo {
    name: String,
    type_desc: Arc<TypeDescriptor>,
    owner_hash: u64,
    owner_id: TypeId,
    access: Access,
}

impl MemberInfo {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> MemberKind {
        match self.access {
            Access::Data { .. } => MemberKind::Data,
            Access::Function(_) => MemberKind::Function,
        }
    }

    /// Field type for data members, the `Function` descriptor otherwise.
    #[must_use]
    pub fn type_desc(&self) -> &Arc<TypeDescriptor> {
        &self.type_desc
    }

    /// Hash of the type this member belongs to.
    #[must_use]
    pub fn owner_hash(&self) -> u64 {
        self.owner_hash
    }

    #[must_use]
    pub fn owner_type_id(&self) -> TypeId {
        self.owner_id
    }

    /// Byte offset of a data member inside its owner.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self.access {
            Access::Data { offset } => Some(offset),
            Access::Function(_) => None,
        }
    }

    #[must_use]
    pub fn function_descriptor(&self) -> Option<&FunctionDescriptor> {
        self.type_desc.function_descriptor()
    }

    #[must_use]
    pub fn invoker(&self) -> Option<&Invoker> {
        match &self.access {
            Access::Function(invoker) => Some(invoker),
            Access::Data { .. } => None,
        }
    }

    fn data_offset(&self) -> Result<usize> {
        self.offset().ok_or_else(|| BridgeError::WrongMemberKind {
            member: self.name.clone(),
            expected: MemberKind::Data,
        })
    }

    /// Address of this field inside `instance`.
    ///
    /// # Safety
    ///
    /// `instance` must point to a live value of the owning type.
    pub unsafe fn get(&self, instance: *mut u8) -> Result<*mut u8> {
        let offset = self.data_offset()?;
        if instance.is_null() {
            return Err(BridgeError::invalid("null instance pointer"));
        }
        Ok(instance.add(offset))
    }

    /// Deep-copy the value at `value` into this field of `instance`.
    ///
    /// # Safety
    ///
    /// `instance` must point to a live value of the owning type and `value`
    /// to a live value of this member's type.
    pub unsafe fn set(&self, instance: *mut u8, value: *const u8) -> Result<()> {
        let field = self.get(instance)?;
        if value.is_null() {
            return Err(BridgeError::invalid("null value pointer"));
        }
        let ops = self
            .type_desc
            .ops()
            .ok_or_else(|| BridgeError::invalid(format!("member '{}' has no value ops", self.name)))?;
        (ops.assign)(field, value.cast());
        Ok(())
    }

    fn check_types<T: 'static, F: 'static>(&self) -> Result<()> {
        if self.owner_id != TypeId::of::<T>() {
            return Err(BridgeError::mismatch(
                format!("owner of '{}'", self.name),
                std::any::type_name::<T>(),
            ));
        }
        if self.type_desc.type_id() != Some(TypeId::of::<F>()) {
            return Err(BridgeError::mismatch(
                self.type_desc.name(),
                std::any::type_name::<F>(),
            ));
        }
        Ok(())
    }

    /// Typed read of a data member.
    pub fn read<T: 'static, F: Clone + 'static>(&self, obj: &T) -> Result<F> {
        let offset = self.data_offset()?;
        self.check_types::<T, F>()?;
        // SAFETY: owner and field types verified above; offset is in bounds of T.
        let field = unsafe { &*(obj as *const T).cast::<u8>().add(offset).cast::<F>() };
        Ok(field.clone())
    }

    /// Typed write of a data member.
    pub fn write<T: 'static, F: Clone + 'static>(&self, obj: &mut T, value: &F) -> Result<()> {
        let offset = self.data_offset()?;
        self.check_types::<T, F>()?;
        // SAFETY: owner and field types verified above; offset is in bounds of T.
        let field = unsafe { &mut *(obj as *mut T).cast::<u8>().add(offset).cast::<F>() };
        field.clone_from(value);
        Ok(())
    }
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("type", &self.type_desc.name())
            .finish()
    }
}

/// Collects the members of `T` in declaration order.
pub struct StructBuilder<T> {
    name: String,
    members: Vec<MemberInfo>,
    _owner: PhantomData<fn() -> T>,
}

impl<T: Describe> StructBuilder<T> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            _owner: PhantomData,
        }
    }

    /// Name the struct is being registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a data member of type `F` located `offset` bytes into `T`.
    ///
    /// # Safety
    ///
    /// There must be a field of type exactly `F` at `offset` in every `T`.
    /// Use [`reflect_field!`](crate::reflect_field) to have both computed.
    #[must_use]
    pub unsafe fn field_at<F: Describe>(mut self, name: &str, offset: usize) -> Self {
        debug_assert!(offset + std::mem::size_of::<F>() <= std::mem::size_of::<T>());
        self.members.push(MemberInfo {
            name: name.to_string(),
            type_desc: descriptor_of::<F>(),
            owner_hash: type_hash::<T>(),
            owner_id: TypeId::of::<T>(),
            access: Access::Data { offset },
        });
        self
    }

    /// [`StructBuilder::field_at`] with `F` inferred from a projection.
    ///
    /// # Safety
    ///
    /// Same contract as `field_at`: `project` must return the field that
    /// lives at `offset`.
    #[doc(hidden)]
    #[must_use]
    pub unsafe fn field_projected<F: Describe>(
        self,
        name: &str,
        offset: usize,
        _project: fn(&T) -> &F,
    ) -> Self {
        self.field_at::<F>(name, offset)
    }

    /// Bind a member function.
    ///
    /// `f` is any `Fn(&T, A..) -> R` (const) or `Fn(&mut T, A..) -> R` with
    /// up to eight describable arguments and a describable or unit result.
    #[must_use]
    pub fn method<M, Marker>(mut self, name: &str, f: M) -> Self
    where
        M: IntoInvoker<T, Marker>,
    {
        let invoker = f.into_invoker();
        self.members.push(MemberInfo {
            name: name.to_string(),
            type_desc: Arc::new(TypeDescriptor::function(invoker.function().clone())),
            owner_hash: type_hash::<T>(),
            owner_id: TypeId::of::<T>(),
            access: Access::Function(invoker),
        });
        self
    }

    /// Freeze the collected members.
    ///
    /// # Panics
    ///
    /// Panics on an empty or duplicate member name.
    #[must_use]
    pub fn build(self) -> StructDescriptor {
        let mut seen = HashSet::new();
        for member in &self.members {
            assert!(
                !member.name.is_empty(),
                "struct '{}': empty member name",
                self.name
            );
            assert!(
                seen.insert(member.name.as_str()),
                "struct '{}': duplicate member '{}'",
                self.name,
                member.name
            );
        }
        StructDescriptor {
            type_name: self.name,
            type_hash: type_hash::<T>(),
            type_id: TypeId::of::<T>(),
            layout: Layout::new::<T>(),
            descriptor: descriptor_of::<T>(),
            members: self.members,
        }
    }
}

/// Register a field by name, computing its offset and type.
///
/// ```ignore
/// let builder = reflect_field!(builder, Calculator, value);
/// let builder = reflect_field!(builder, Calculator, value, "current");
/// ```
#[macro_export]
macro_rules! reflect_field {
    ($builder:expr, $owner:ty, $field:ident) => {
        $crate::reflect_field!($builder, $owner, $field, stringify!($field))
    };
    ($builder:expr, $owner:ty, $field:ident, $name:expr) => {{
        let builder: $crate::StructBuilder<$owner> = $builder;
        // SAFETY: offset and projection name the same field of the same type.
        unsafe {
            builder.field_projected(
                $name,
                ::core::mem::offset_of!($owner, $field),
                |owner: &$owner| &owner.$field,
            )
        }
    }};
}

/// Full metadata for one registered struct.
pub struct StructDescriptor {
    type_name: String,
    type_hash: u64,
    type_id: TypeId,
    layout: Layout,
    descriptor: Arc<TypeDescriptor>,
    members: Vec<MemberInfo>,
}

impl StructDescriptor {
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn type_hash(&self) -> u64 {
        self.type_hash
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    #[must_use]
    pub fn align(&self) -> usize {
        self.layout.align()
    }

    /// `Struct`-tagged descriptor of the type itself.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Like [`StructDescriptor::member`] but reports `UnknownMember`.
    pub fn require_member(&self, name: &str) -> Result<&MemberInfo> {
        self.member(name).ok_or_else(|| BridgeError::UnknownMember {
            type_name: self.type_name.clone(),
            member: name.to_string(),
        })
    }

    pub fn data_members(&self) -> impl Iterator<Item = &MemberInfo> {
        self.members.iter().filter(|m| m.kind() == MemberKind::Data)
    }

    pub fn functions(&self) -> impl Iterator<Item = &MemberInfo> {
        self.members
            .iter()
            .filter(|m| m.kind() == MemberKind::Function)
    }

    /// # Panics
    ///
    /// Panics when a member descriptor is malformed or belongs to another type.
    pub fn validate(&self) {
        self.descriptor.validate();
        for member in &self.members {
            assert_eq!(
                member.owner_hash, self.type_hash,
                "struct '{}': member '{}' bound to another type",
                self.type_name, member.name
            );
            member.type_desc.validate();
        }
    }
}

impl fmt::Debug for StructDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructDescriptor")
            .field("type_name", &self.type_name)
            .field("type_hash", &format_args!("{:#018x}", self.type_hash))
            .field("size", &self.layout.size())
            .field("members", &self.members)
            .finish()
    }
}
