// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compile-time reflection capability.
//!
//! These traits are what `#[derive(Reflect)]` and `#[reflect_methods]`
//! generate. They can also be implemented by hand with a [`StructBuilder`]
//! when a type cannot use the derive.
//!
//! ```
//! use typebridge::{reflect_field, Reflect, StructBuilder, TypeDescriptor, Describe};
//!
//! #[derive(Clone)]
//! struct Point {
//!     x: f64,
//!     y: f64,
//! }
//!
//! impl Describe for Point {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::structure::<Self>()
//!     }
//! }
//!
//! impl Reflect for Point {
//!     const TYPE_NAME: &'static str = "Point";
//!
//!     fn reflect(builder: StructBuilder<Self>) -> StructBuilder<Self> {
//!         let builder = reflect_field!(builder, Point, x);
//!         let builder = reflect_field!(builder, Point, y);
//!         builder.method("norm", |p: &Point| (p.x * p.x + p.y * p.y).sqrt())
//!     }
//! }
//!
//! let sd = typebridge::register_type::<Point>("Point").unwrap();
//! assert_eq!(sd.member_count(), 3);
//! ```

use crate::member::StructBuilder;
use crate::types::{Describe, TypeDescriptor};
use std::sync::Arc;

/// A struct whose members can be enumerated at registration time.
pub trait Reflect: Describe + Sized {
    /// Name the type is described under in `Struct` descriptors.
    const TYPE_NAME: &'static str;

    /// Add this type's members to `builder`, in declaration order.
    fn reflect(builder: StructBuilder<Self>) -> StructBuilder<Self>;
}

/// Member functions of a type, usually generated by `#[reflect_methods]`.
pub trait ReflectMethods: Sized + 'static {
    fn methods(builder: StructBuilder<Self>) -> StructBuilder<Self>;
}

/// A sum type viewed as `{active_index, payload}`.
///
/// Each alternative holds exactly one payload value. Alternative `i` is
/// described by `alternatives()[i]`.
pub trait VariantValue: Clone + 'static {
    /// Alternative descriptors in declaration order.
    fn alternatives() -> Vec<Arc<TypeDescriptor>>;

    fn active_index(&self) -> usize;

    /// Address of the active payload.
    fn payload_ptr(&self) -> *const u8;

    fn payload_mut_ptr(&mut self) -> *mut u8;

    /// Build alternative `index` from a clone of the payload at `payload`.
    ///
    /// Returns `None` when `index` is out of range.
    ///
    /// # Safety
    ///
    /// `payload` must point to a live value of alternative `index`'s type.
    unsafe fn from_payload(index: usize, payload: *const u8) -> Option<Self>;
}
