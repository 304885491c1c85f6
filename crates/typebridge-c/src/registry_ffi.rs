// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type and instance registry lookups.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::ptr;

use typebridge::{instance_registry, type_registry, BridgeError};

use crate::records::{interned_name, struct_record, TbMemberInfo, TbStructInfo};
use crate::{error, str_arg, TbStatus};

/// Number of types in the global registry.
#[no_mangle]
pub extern "C" fn tb_type_count() -> usize {
    type_registry().len()
}

/// Look up a registered struct by name.
///
/// # Safety
/// - `name` must be a valid null-terminated C string.
/// - `out_info` must be valid for writes.
///
/// # Returns
/// `TbStatus::TbOk` with `*out_info` set, `TbStatus::TbUnknownType` if no
/// such type is registered.
#[no_mangle]
pub unsafe extern "C" fn tb_get_type_info(
    name: *const c_char,
    out_info: *mut *const TbStructInfo,
) -> TbStatus {
    if out_info.is_null() {
        return error::fail(BridgeError::InvalidArgument("out_info is NULL".into()));
    }
    *out_info = ptr::null();
    let name = match str_arg(name, "type name") {
        Ok(name) => name,
        Err(status) => return status,
    };
    crate::status(|| {
        let info = type_registry()
            .lookup(name)
            .ok_or_else(|| BridgeError::UnknownType(name.to_string()))?;
        *out_info = struct_record(&info);
        Ok(())
    })
}

/// Look up a registered struct by type hash (see `TbTypeDescriptor::struct_hash`).
///
/// # Safety
/// - `out_info` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_get_type_info_by_hash(
    hash: u64,
    out_info: *mut *const TbStructInfo,
) -> TbStatus {
    if out_info.is_null() {
        return error::fail(BridgeError::InvalidArgument("out_info is NULL".into()));
    }
    *out_info = ptr::null();
    crate::status(|| {
        let info = type_registry()
            .lookup_by_hash(hash)
            .ok_or_else(|| BridgeError::UnknownType(format!("{hash:#018x}")))?;
        *out_info = struct_record(&info);
        Ok(())
    })
}

/// Find a member of `info` by name.
///
/// # Safety
/// - `info` must be a record returned by this library.
/// - `name` must be a valid null-terminated C string.
/// - `out_member` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_find_member(
    info: *const TbStructInfo,
    name: *const c_char,
    out_member: *mut *const TbMemberInfo,
) -> TbStatus {
    if info.is_null() || out_member.is_null() {
        return error::fail(BridgeError::InvalidArgument("NULL struct info or out_member".into()));
    }
    *out_member = ptr::null();
    let name = match str_arg(name, "member name") {
        Ok(name) => name,
        Err(status) => return status,
    };
    let info = &*info;
    let members = std::slice::from_raw_parts(info.members, info.member_count);
    let found = members
        .iter()
        .find(|m| CStr::from_ptr(m.name).to_bytes() == name.as_bytes());
    match found {
        Some(member) => {
            *out_member = member;
            error::clear();
            TbStatus::TbOk
        }
        None => error::fail(BridgeError::UnknownMember {
            type_name: CStr::from_ptr(info.type_name).to_string_lossy().into_owned(),
            member: name.to_string(),
        }),
    }
}

/// Register (or overwrite) a named instance.
///
/// The registry does not own the object; the caller keeps it alive for as
/// long as the key is looked up.
///
/// # Safety
/// - `key` and `type_name` must be valid null-terminated C strings.
/// - `address` must point to a live object of the named type.
#[no_mangle]
pub unsafe extern "C" fn tb_register_instance(
    key: *const c_char,
    address: *mut c_void,
    type_name: *const c_char,
) -> TbStatus {
    let key = match str_arg(key, "instance key") {
        Ok(key) => key,
        Err(status) => return status,
    };
    let type_name = match str_arg(type_name, "type name") {
        Ok(name) => name,
        Err(status) => return status,
    };
    crate::status(|| {
        instance_registry()
            .register(key, address.cast(), type_name)
            .map(|_| ())
    })
}

/// Look up a named instance.
///
/// `*out_type_name` (optional) receives the type name the instance was
/// registered with; the string lives for the rest of the process.
/// `*out_info` (optional) receives the struct record of that type, or NULL
/// when the type is not registered.
///
/// # Safety
/// - `key` must be a valid null-terminated C string.
/// - `out_address` must be valid for writes; `out_type_name` and `out_info`
///   NULL or valid for writes.
///
/// # Returns
/// `TbStatus::TbNotFound` if no instance is registered under `key`.
#[no_mangle]
pub unsafe extern "C" fn tb_get_instance(
    key: *const c_char,
    out_address: *mut *mut c_void,
    out_type_name: *mut *const c_char,
    out_info: *mut *const TbStructInfo,
) -> TbStatus {
    if out_address.is_null() {
        return error::fail(BridgeError::InvalidArgument("out_address is NULL".into()));
    }
    *out_address = ptr::null_mut();
    if !out_type_name.is_null() {
        *out_type_name = ptr::null();
    }
    if !out_info.is_null() {
        *out_info = ptr::null();
    }
    let key = match str_arg(key, "instance key") {
        Ok(key) => key,
        Err(status) => return status,
    };
    let Some(entry) = instance_registry().lookup(key) else {
        return error::fail_status(TbStatus::TbNotFound, format!("No instance named '{key}'"));
    };
    *out_address = entry.address().cast();
    if !out_type_name.is_null() {
        *out_type_name = interned_name(entry.type_name());
    }
    if !out_info.is_null() {
        if let Some(info) = type_registry().lookup(entry.type_name()) {
            *out_info = struct_record(&info);
        }
    }
    error::clear();
    TbStatus::TbOk
}
