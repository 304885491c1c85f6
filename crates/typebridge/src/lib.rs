// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # typebridge - runtime type description and dynamic invocation
//!
//! Lets code outside the compiling crate (a foreign language, a scripting
//! layer, a test harness) discover the shape of native structs and call
//! their member functions by name, without hand-written bindings.
//!
//! ## Quick Start
//!
//! ```rust
//! use typebridge::{reflect_methods, Reflect};
//!
//! #[derive(Clone, Default, Reflect)]
//! #[reflect(methods)]
//! struct Calculator {
//!     value: f64,
//! }
//!
//! #[reflect_methods]
//! impl Calculator {
//!     pub fn add(&mut self, x: f64) -> f64 {
//!         self.value += x;
//!         self.value
//!     }
//! }
//!
//! let sd = typebridge::register_type::<Calculator>("Calculator").unwrap();
//! let mut calc = Calculator::default();
//! let x = 5.0f64;
//! let mut out = 0.0f64;
//! unsafe {
//!     typebridge::call_method(
//!         (&mut calc as *mut Calculator).cast(),
//!         "Calculator",
//!         "add",
//!         &[(&x as *const f64).cast()],
//!         (&mut out as *mut f64).cast(),
//!     )
//!     .unwrap();
//! }
//! assert_eq!(out, 5.0);
//! assert_eq!(sd.members().len(), 2);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  Foreign side (typebridge-c: tb_* functions, #[repr(C)] records)|
//! +---------------------------------------------------------------+
//! |  Invocation engine   | RawValue views  | SharedFuture get/poll |
//! +---------------------------------------------------------------+
//! |  TypeRegistry (name/hash -> StructDescriptor) | InstanceRegistry|
//! +---------------------------------------------------------------+
//! |  MemberInfo (offset accessors, invokers) <- StructBuilder      |
//! +---------------------------------------------------------------+
//! |  TypeDescriptor tree + ops tables  <- Describe / derive(Reflect)|
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`types`] - descriptor model and the native type table
//! - [`member`] - members, accessors and the struct builder
//! - [`registry`] / [`instance`] - process-wide tables
//! - [`invoke`] - type-erased calls
//! - [`value`] - walking values through their descriptors
//! - [`future`] - shared futures
//! - [`config`] - runtime configuration

// Lets generated `::typebridge::...` paths resolve inside this crate.
extern crate self as typebridge;

/// Runtime configuration (timeouts, strictness, panic containment).
pub mod config;
/// Error taxonomy and status codes.
pub mod error;
/// Shared futures and promises.
pub mod future;
/// Process-wide instance registry.
pub mod instance;
/// Invocation engine.
pub mod invoke;
/// Struct members, accessors and builder.
pub mod member;
/// Reflection traits implemented by the derive macros.
pub mod reflect;
/// Process-wide type registry.
pub mod registry;
/// Type descriptor model.
pub mod types;
/// Descriptor-driven views over raw values.
pub mod value;

pub use config::{BridgeConfig, ABI_VERSION};
pub use error::{BridgeError, Result};
pub use future::{FutureWait, Promise, SharedFuture};
pub use instance::{instance_registry, InstanceEntry, InstanceRegistry};
pub use invoke::{
    call_member_function, call_method, future_get, future_is_ready, future_is_valid, Invoker,
};
pub use member::{MemberInfo, MemberKind, StructBuilder, StructDescriptor};
pub use reflect::{Reflect, ReflectMethods, VariantValue};
pub use registry::{type_registry, TypeRegistry};
pub use types::{
    descriptor_of, type_hash, Complex, Describe, FunctionDescriptor, OuterType, TypeDescriptor,
    TypeKind,
};
pub use value::RawValue;

// Derive and attribute macros (`#[derive(typebridge::Reflect)]`).
pub use typebridge_codegen::{reflect_methods, Reflect};

use std::sync::Arc;

/// Register `T` under `name` in the global type registry.
///
/// See [`TypeRegistry::register`].
pub fn register_type<T: Reflect>(name: &str) -> Result<Arc<StructDescriptor>> {
    type_registry().register::<T>(name)
}

/// Descriptor registered under `name`, if any.
pub fn get_type_info(name: &str) -> Option<Arc<StructDescriptor>> {
    type_registry().lookup(name)
}

/// Publish an object address in the global instance registry.
///
/// The object must outlive its registration; see [`instance`].
pub fn register_instance(key: &str, address: *mut u8, type_name: &str) -> Result<()> {
    instance_registry()
        .register(key, address, type_name)
        .map(|_| ())
}

/// `(address, type_name)` registered under `key`.
pub fn lookup_instance(key: &str) -> Option<InstanceEntry> {
    instance_registry().lookup(key)
}

#[cfg(test)]
mod tests;
