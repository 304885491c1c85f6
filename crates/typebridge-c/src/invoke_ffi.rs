// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Member access, member function calls and shared futures.
//!
//! Argument and result pointers follow the core engine's contract: each
//! argument points to a live value of the parameter type and stays owned by
//! the caller; the result buffer is uninitialized storage that receives a
//! newly constructed value the caller must later release with
//! `tb_value_drop`.

use std::os::raw::{c_char, c_void};
use std::time::Duration;

use typebridge::{BridgeError, MemberInfo};

use crate::records::{native_member, native_type, TbMemberInfo, TbTypeDescriptor};
use crate::{error, str_arg, TbStatus};

unsafe fn member_arg<'a>(member: *const TbMemberInfo) -> Result<&'a MemberInfo, TbStatus> {
    native_member(member)
        .ok_or_else(|| error::fail(BridgeError::InvalidArgument("member is NULL".into())))
}

unsafe fn args_slice<'a>(args: *const *const c_void, count: usize) -> Result<&'a [*const u8], TbStatus> {
    if count == 0 {
        return Ok(&[]);
    }
    if args.is_null() {
        return Err(error::fail(BridgeError::InvalidArgument(
            "argument array is NULL".into(),
        )));
    }
    Ok(std::slice::from_raw_parts(args.cast::<*const u8>(), count))
}

/// Address of a data member inside `instance`.
///
/// # Safety
/// - `member` must be a record returned by this library.
/// - `instance` must point to a live object of the member's owning type.
/// - `out_field` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_member_get(
    member: *const TbMemberInfo,
    instance: *mut c_void,
    out_field: *mut *mut c_void,
) -> TbStatus {
    let member = match member_arg(member) {
        Ok(member) => member,
        Err(status) => return status,
    };
    if out_field.is_null() {
        return error::fail(BridgeError::InvalidArgument("out_field is NULL".into()));
    }
    crate::status(|| {
        *out_field = member.get(instance.cast())?.cast();
        Ok(())
    })
}

/// Deep-copy `value` into a data member of `instance`.
///
/// # Safety
/// - `member` must be a record returned by this library.
/// - `instance` must point to a live object of the owning type, `value` to a
///   live value of the member's type.
#[no_mangle]
pub unsafe extern "C" fn tb_member_set(
    member: *const TbMemberInfo,
    instance: *mut c_void,
    value: *const c_void,
) -> TbStatus {
    let member = match member_arg(member) {
        Ok(member) => member,
        Err(status) => return status,
    };
    crate::status(|| member.set(instance.cast(), value.cast()))
}

/// Invoke a function member on `instance`.
///
/// # Safety
/// - `instance` must point to a live object of type `type_name`.
/// - `args` must hold `arg_count` pointers to live values of the parameter
///   types, in declaration order.
/// - `result` must be NULL for void functions, otherwise uninitialized
///   storage of the return type's size and alignment.
///
/// # Returns
/// `TbStatus::TbOk` on success. On any failure the instance is untouched and
/// nothing is written to `result`.
#[no_mangle]
pub unsafe extern "C" fn tb_call_member_function(
    instance: *mut c_void,
    type_name: *const c_char,
    member: *const TbMemberInfo,
    args: *const *const c_void,
    arg_count: usize,
    result: *mut c_void,
) -> TbStatus {
    let type_name = match str_arg(type_name, "type name") {
        Ok(name) => name,
        Err(status) => return status,
    };
    let member = match member_arg(member) {
        Ok(member) => member,
        Err(status) => return status,
    };
    let args = match args_slice(args, arg_count) {
        Ok(args) => args,
        Err(status) => return status,
    };
    crate::status(|| {
        typebridge::call_member_function(instance.cast(), type_name, member, args, result.cast())
    })
}

/// Invoke a function member found by name.
///
/// # Safety
/// See [`tb_call_member_function`]; `member_name` must be a valid
/// null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn tb_call_method(
    instance: *mut c_void,
    type_name: *const c_char,
    member_name: *const c_char,
    args: *const *const c_void,
    arg_count: usize,
    result: *mut c_void,
) -> TbStatus {
    let type_name = match str_arg(type_name, "type name") {
        Ok(name) => name,
        Err(status) => return status,
    };
    let member_name = match str_arg(member_name, "member name") {
        Ok(name) => name,
        Err(status) => return status,
    };
    let args = match args_slice(args, arg_count) {
        Ok(args) => args,
        Err(status) => return status,
    };
    crate::status(|| {
        typebridge::call_method(instance.cast(), type_name, member_name, args, result.cast())
    })
}

/// Whether `tb_future_get` would return without blocking.
///
/// # Safety
/// - `desc` must be a `SharedFuture` record returned by this library and
///   `future` must point to a live value of that type.
/// - `out_ready` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_future_is_ready(
    desc: *const TbTypeDescriptor,
    future: *const c_void,
    out_ready: *mut bool,
) -> TbStatus {
    let Some(native) = native_type(desc) else {
        return error::fail(BridgeError::InvalidArgument("descriptor is NULL".into()));
    };
    if out_ready.is_null() {
        return error::fail(BridgeError::InvalidArgument("out_ready is NULL".into()));
    }
    crate::status(|| {
        *out_ready = typebridge::future_is_ready(&native, future.cast())?;
        Ok(())
    })
}

/// Wait for a shared future and copy its value into `out`.
///
/// A negative `timeout_ms` uses the configured default timeout (which may
/// be "wait forever").
///
/// # Safety
/// - `desc` must be a `SharedFuture` record returned by this library and
///   `future` must point to a live value of that type.
/// - `out` must be uninitialized storage for the future's value type.
///
/// # Returns
/// `TbStatus::TbFutureTimeout`, `TbStatus::TbFutureInvalid` or
/// `TbStatus::TbFutureBroken` when no value could be obtained; `out` is left
/// untouched in those cases.
#[no_mangle]
pub unsafe extern "C" fn tb_future_get(
    desc: *const TbTypeDescriptor,
    future: *const c_void,
    out: *mut c_void,
    timeout_ms: i64,
) -> TbStatus {
    let Some(native) = native_type(desc) else {
        return error::fail(BridgeError::InvalidArgument("descriptor is NULL".into()));
    };
    let timeout = u64::try_from(timeout_ms).ok().map(Duration::from_millis);
    crate::status(|| typebridge::future_get(&native, future.cast(), out.cast(), timeout))
}
