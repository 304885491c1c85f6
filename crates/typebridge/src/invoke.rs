// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Invocation engine.
//!
//! # Architecture
//!
//! - **Invoker**: one type-erased adapter per bound member function,
//!   generated by [`IntoInvoker`] for every arity from 0 to 8. It clones
//!   each argument out of the caller's pointers, calls the function and
//!   moves the result into the caller's buffer (ownership is transferred
//!   exactly once; the caller releases it with the return descriptor's
//!   `drop_in_place`).
//! - **Checks**: [`TypeRegistry::call_member_function`] validates member
//!   kind, owning type, arity and pointers before anything runs.
//! - **Containment**: panics inside the bound function are caught and
//!   reported as [`BridgeError::Panicked`].
//! - **Futures**: functions returning a `SharedFuture` hand the handle back
//!   without blocking; [`future_is_ready`] and [`future_get`] poll or block.

use crate::config::{config, BridgeConfig};
use crate::error::{BridgeError, Result};
use crate::member::{MemberInfo, MemberKind, StructDescriptor};
use crate::registry::{type_registry, TypeRegistry};
use crate::types::{descriptor_of, Describe, FunctionDescriptor, OuterType, TypeDescriptor, TypeKind};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

type ErasedCall = dyn Fn(*mut u8, &[*const u8], *mut u8) + Send + Sync;

/// Type-erased adapter performing one member function call.
#[derive(Clone)]
pub struct Invoker {
    function: FunctionDescriptor,
    call: Arc<ErasedCall>,
}

impl Invoker {
    fn new<C>(function: FunctionDescriptor, call: C) -> Self
    where
        C: Fn(*mut u8, &[*const u8], *mut u8) + Send + Sync + 'static,
    {
        Self {
            function,
            call: Arc::new(call),
        }
    }

    #[must_use]
    pub fn function(&self) -> &FunctionDescriptor {
        &self.function
    }

    /// Call without any checks.
    ///
    /// # Safety
    ///
    /// `instance` must point to a live value of the owning type, `args` must
    /// hold exactly `arity` pointers to values of the parameter types, and
    /// `result` must be null or point to uninitialized storage for the
    /// return type.
    pub unsafe fn call_unchecked(&self, instance: *mut u8, args: &[*const u8], result: *mut u8) {
        (self.call)(instance, args, result);
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("signature", &self.function.signature())
            .finish()
    }
}

/// Result type of a bindable function: unit or anything describable.
pub trait ReturnValue: 'static {
    /// `None` for void.
    fn descriptor() -> Option<Arc<TypeDescriptor>>;

    /// Move `self` into `out`, or drop it if `out` is null.
    ///
    /// # Safety
    ///
    /// A non-null `out` must be valid, aligned, uninitialized storage for
    /// `Self`.
    unsafe fn write_to(self, out: *mut u8);
}

impl ReturnValue for () {
    fn descriptor() -> Option<Arc<TypeDescriptor>> {
        None
    }

    unsafe fn write_to(self, _out: *mut u8) {}
}

impl<T: Describe> ReturnValue for T {
    fn descriptor() -> Option<Arc<TypeDescriptor>> {
        Some(descriptor_of::<T>())
    }

    unsafe fn write_to(self, out: *mut u8) {
        if !out.is_null() {
            ptr::write(out.cast::<T>(), self);
        }
    }
}

/// Marker for functions taking the receiver by shared reference.
pub struct ByRef;

/// Marker for functions taking the receiver by exclusive reference.
pub struct ByMut;

/// Conversion of a Rust callable into an [`Invoker`] bound to `T`.
///
/// `Marker` only disambiguates the implementations; it is inferred.
pub trait IntoInvoker<T, Marker> {
    fn into_invoker(self) -> Invoker;
}

macro_rules! impl_into_invoker {
    ($($arg:ident $val:ident),*) => {
        impl<T, F, R, $($arg,)*> IntoInvoker<T, (ByRef, fn($($arg,)*) -> R)> for F
        where
            T: 'static,
            F: Fn(&T, $($arg,)*) -> R + Send + Sync + 'static,
            R: ReturnValue,
            $($arg: Describe,)*
        {
            fn into_invoker(self) -> Invoker {
                let function = FunctionDescriptor::new(
                    vec![$(descriptor_of::<$arg>(),)*],
                    R::descriptor(),
                    true,
                );
                Invoker::new(function, move |instance: *mut u8, args: &[*const u8], out: *mut u8| {
                    let &[$($val,)*] = args else {
                        return;
                    };
                    // SAFETY: pointer types and arity are the caller's contract.
                    unsafe {
                        let this = &*instance.cast::<T>();
                        let result = (self)(this, $((&*$val.cast::<$arg>()).clone(),)*);
                        result.write_to(out);
                    }
                })
            }
        }

        impl<T, F, R, $($arg,)*> IntoInvoker<T, (ByMut, fn($($arg,)*) -> R)> for F
        where
            T: 'static,
            F: Fn(&mut T, $($arg,)*) -> R + Send + Sync + 'static,
            R: ReturnValue,
            $($arg: Describe,)*
        {
            fn into_invoker(self) -> Invoker {
                let function = FunctionDescriptor::new(
                    vec![$(descriptor_of::<$arg>(),)*],
                    R::descriptor(),
                    false,
                );
                Invoker::new(function, move |instance: *mut u8, args: &[*const u8], out: *mut u8| {
                    let &[$($val,)*] = args else {
                        return;
                    };
                    // SAFETY: pointer types and arity are the caller's contract.
                    unsafe {
                        let this = &mut *instance.cast::<T>();
                        let result = (self)(this, $((&*$val.cast::<$arg>()).clone(),)*);
                        result.write_to(out);
                    }
                })
            }
        }
    };
}

impl_into_invoker!();
impl_into_invoker!(A0 a0);
impl_into_invoker!(A0 a0, A1 a1);
impl_into_invoker!(A0 a0, A1 a1, A2 a2);
impl_into_invoker!(A0 a0, A1 a1, A2 a2, A3 a3);
impl_into_invoker!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4);
impl_into_invoker!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_into_invoker!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_into_invoker!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl TypeRegistry {
    /// Call `member` on `instance`, a value of the type registered as
    /// `type_name`.
    ///
    /// Checks, in order: `WrongMemberKind`, `UnknownType`, `TypeMismatch`
    /// (member bound to another type), `ArityMismatch`, then
    /// `InvalidArgument` for null pointers. The instance is untouched when
    /// any check fails.
    ///
    /// # Safety
    ///
    /// `instance` must point to a live value of `type_name`, each `args[i]`
    /// to a live value of parameter `i`'s type, and `result` (for non-void
    /// functions) to uninitialized storage of at least the return
    /// descriptor's size and alignment. The engine cannot check buffer
    /// sizes.
    pub unsafe fn call_member_function(
        &self,
        instance: *mut u8,
        type_name: &str,
        member: &MemberInfo,
        args: &[*const u8],
        result: *mut u8,
    ) -> Result<()> {
        self.call_member_function_with_config(&config(), instance, type_name, member, args, result)
    }

    /// [`TypeRegistry::call_member_function`] with an explicit configuration.
    ///
    /// # Safety
    ///
    /// See [`TypeRegistry::call_member_function`].
    pub unsafe fn call_member_function_with_config(
        &self,
        cfg: &BridgeConfig,
        instance: *mut u8,
        type_name: &str,
        member: &MemberInfo,
        args: &[*const u8],
        result: *mut u8,
    ) -> Result<()> {
        let Some(invoker) = member.invoker() else {
            return Err(BridgeError::WrongMemberKind {
                member: member.name().to_string(),
                expected: MemberKind::Function,
            });
        };
        let sd = self
            .lookup(type_name)
            .ok_or_else(|| BridgeError::UnknownType(type_name.to_string()))?;
        if member.owner_hash() != sd.type_hash() || member.owner_type_id() != StructDescriptor::type_id(&sd) {
            return Err(BridgeError::mismatch(
                sd.type_name(),
                format!("member '{}' of another type", member.name()),
            ));
        }
        let function = invoker.function();
        if args.len() != function.arity() {
            return Err(BridgeError::ArityMismatch {
                member: member.name().to_string(),
                expected: function.arity(),
                got: args.len(),
            });
        }
        if instance.is_null() {
            return Err(BridgeError::invalid("null instance pointer"));
        }
        if let Some(i) = args.iter().position(|a| a.is_null()) {
            return Err(BridgeError::invalid(format!("null pointer for argument {}", i)));
        }
        let out = if function.is_void() {
            if !result.is_null() && cfg.strict_void_result {
                return Err(BridgeError::invalid(format!(
                    "'{}' returns nothing but a result buffer was given",
                    member.name()
                )));
            }
            ptr::null_mut()
        } else {
            if result.is_null() {
                return Err(BridgeError::invalid(format!(
                    "'{}' returns a value but the result buffer is null",
                    member.name()
                )));
            }
            result
        };

        log::trace!("[invoke] {}::{} {}", sd.type_name(), member.name(), function.signature());

        if !cfg.catch_panics {
            invoker.call_unchecked(instance, args, out);
            return Ok(());
        }
        panic::catch_unwind(AssertUnwindSafe(|| invoker.call_unchecked(instance, args, out))).map_err(
            |payload| {
                let message = panic_message(payload.as_ref());
                log::warn!(
                    "[invoke] {}::{} panicked: {}",
                    sd.type_name(),
                    member.name(),
                    message
                );
                BridgeError::Panicked {
                    member: member.name().to_string(),
                    message,
                }
            },
        )
    }

    /// Call a member function by name.
    ///
    /// # Safety
    ///
    /// See [`TypeRegistry::call_member_function`].
    pub unsafe fn call_method(
        &self,
        instance: *mut u8,
        type_name: &str,
        member: &str,
        args: &[*const u8],
        result: *mut u8,
    ) -> Result<()> {
        self.call_method_with_config(&config(), instance, type_name, member, args, result)
    }

    /// [`TypeRegistry::call_method`] with an explicit configuration.
    ///
    /// # Safety
    ///
    /// See [`TypeRegistry::call_member_function`].
    pub unsafe fn call_method_with_config(
        &self,
        cfg: &BridgeConfig,
        instance: *mut u8,
        type_name: &str,
        member: &str,
        args: &[*const u8],
        result: *mut u8,
    ) -> Result<()> {
        let sd = self
            .lookup(type_name)
            .ok_or_else(|| BridgeError::UnknownType(type_name.to_string()))?;
        let info = sd.require_member(member)?;
        self.call_member_function_with_config(cfg, instance, type_name, info, args, result)
    }
}

/// [`TypeRegistry::call_member_function`] on the global registry.
///
/// # Safety
///
/// See [`TypeRegistry::call_member_function`].
pub unsafe fn call_member_function(
    instance: *mut u8,
    type_name: &str,
    member: &MemberInfo,
    args: &[*const u8],
    result: *mut u8,
) -> Result<()> {
    type_registry().call_member_function(instance, type_name, member, args, result)
}

/// [`TypeRegistry::call_method`] on the global registry.
///
/// # Safety
///
/// See [`TypeRegistry::call_member_function`].
pub unsafe fn call_method(
    instance: *mut u8,
    type_name: &str,
    member: &str,
    args: &[*const u8],
    result: *mut u8,
) -> Result<()> {
    type_registry().call_method(instance, type_name, member, args, result)
}

fn future_ops(desc: &TypeDescriptor) -> Result<&crate::types::FutureOps> {
    match desc.kind() {
        TypeKind::SharedFuture { ops, .. } => Ok(ops),
        _ => Err(BridgeError::mismatch(
            format!("{:?}", OuterType::SharedFuture),
            desc.name(),
        )),
    }
}

/// Whether `future_get` would return without blocking.
///
/// # Safety
///
/// `future` must point to a live value described by `desc`.
pub unsafe fn future_is_ready(desc: &TypeDescriptor, future: *const u8) -> Result<bool> {
    let ops = future_ops(desc)?;
    if future.is_null() {
        return Err(BridgeError::invalid("null future pointer"));
    }
    Ok((ops.is_ready)(future))
}

/// Whether the future has shared state at all.
///
/// # Safety
///
/// `future` must point to a live value described by `desc`.
pub unsafe fn future_is_valid(desc: &TypeDescriptor, future: *const u8) -> Result<bool> {
    let ops = future_ops(desc)?;
    if future.is_null() {
        return Err(BridgeError::invalid("null future pointer"));
    }
    Ok((ops.is_valid)(future))
}

/// Block until the future resolves and clone its value into `out`.
///
/// `timeout = None` falls back to the configured `future_timeout`.
///
/// # Safety
///
/// `future` must point to a live value described by `desc`; `out` to
/// uninitialized storage for the future's value type.
pub unsafe fn future_get(
    desc: &TypeDescriptor,
    future: *const u8,
    out: *mut u8,
    timeout: Option<Duration>,
) -> Result<()> {
    future_get_with_config(&config(), desc, future, out, timeout)
}

/// [`future_get`] with an explicit configuration.
///
/// # Safety
///
/// See [`future_get`].
pub unsafe fn future_get_with_config(
    cfg: &BridgeConfig,
    desc: &TypeDescriptor,
    future: *const u8,
    out: *mut u8,
    timeout: Option<Duration>,
) -> Result<()> {
    let ops = future_ops(desc)?;
    if future.is_null() || out.is_null() {
        return Err(BridgeError::invalid("null future or output pointer"));
    }
    let timeout = timeout.or(cfg.future_timeout);
    log::trace!("[invoke] future_get {} timeout={:?}", desc.name(), timeout);
    (ops.get)(future, timeout, out)
}
