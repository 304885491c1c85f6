// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value helpers driven by type records.
//!
//! These let C read and build strings, containers, optionals and variants
//! without knowing their native layout. Every helper checks that `desc`
//! has the expected outer type and fails with `TbStatus::TbTypeMismatch`
//! otherwise.
//!
//! # Usage from C
//!
//! ```c
//! const TbMemberInfo* scores = NULL;
//! tb_find_member(person_info, "scores", &scores);
//! void* field = NULL;
//! tb_member_get(scores, person, &field);
//!
//! size_t n = 0;
//! tb_vector_len(scores->type_desc, field, &n);
//! for (size_t i = 0; i < n; i++) {
//!     void* elem = NULL;
//!     tb_vector_at(scores->type_desc, field, i, &elem);
//!     printf("%d\n", *(int32_t*)elem);
//! }
//! ```

use std::os::raw::c_void;
use std::sync::Arc;

use typebridge::{BridgeError, RawValue, TypeDescriptor};

use crate::records::{native_type, TbTypeDescriptor};
use crate::{error, TbStatus};

unsafe fn descriptor(desc: *const TbTypeDescriptor) -> Result<Arc<TypeDescriptor>, TbStatus> {
    native_type(desc)
        .ok_or_else(|| error::fail(BridgeError::InvalidArgument("descriptor is NULL".into())))
}

unsafe fn view(desc: *const TbTypeDescriptor, value: *const c_void) -> Result<RawValue, TbStatus> {
    let native = descriptor(desc)?;
    RawValue::new(native, value.cast_mut().cast()).map_err(error::fail)
}

/// Run a constructor against the native descriptor behind `desc`.
macro_rules! with_descriptor {
    ($desc:expr, |$d:ident| $body:expr) => {
        match descriptor($desc) {
            Ok($d) => crate::status(|| $body.map(|_| ())),
            Err(status) => status,
        }
    };
}

unsafe fn utf8_arg<'a>(bytes: *const u8, len: usize) -> typebridge::Result<&'a str> {
    let raw: &[u8] = if len == 0 {
        &[]
    } else if bytes.is_null() {
        return Err(BridgeError::InvalidArgument("string bytes are NULL".into()));
    } else {
        std::slice::from_raw_parts(bytes, len)
    };
    std::str::from_utf8(raw).map_err(|_| BridgeError::InvalidArgument("string is not UTF-8".into()))
}

macro_rules! with_view {
    ($desc:expr, $value:expr, |$v:ident| $body:expr) => {
        match view($desc, $value) {
            Ok($v) => crate::status(|| $body),
            Err(status) => status,
        }
    };
}

unsafe fn write_out<T>(out: *mut T, value: T) -> typebridge::Result<()> {
    if out.is_null() {
        return Err(BridgeError::InvalidArgument("output pointer is NULL".into()));
    }
    *out = value;
    Ok(())
}

// =============================================================================
// Whole values
// =============================================================================

/// Clone the value at `src` into uninitialized storage at `dst`.
///
/// # Safety
/// `src` must point to a live value described by `desc`; `dst` to
/// uninitialized storage of the same size and alignment.
#[no_mangle]
pub unsafe extern "C" fn tb_value_clone(
    desc: *const TbTypeDescriptor,
    src: *const c_void,
    dst: *mut c_void,
) -> TbStatus {
    with_view!(desc, src, |v| v.clone_into(dst.cast()))
}

/// Drop the value at `value` in place (e.g. a call result).
///
/// # Safety
/// `value` must point to a live value described by `desc`; it is invalid
/// afterwards.
#[no_mangle]
pub unsafe extern "C" fn tb_value_drop(desc: *const TbTypeDescriptor, value: *mut c_void) -> TbStatus {
    with_view!(desc, value, |v| v.drop_in_place())
}

/// Construct an empty value in uninitialized storage: `""` for strings,
/// no elements for vectors and maps, no payload for optionals.
///
/// This is how C builds argument values it does not own natively. The
/// caller releases the value with `tb_value_drop`.
///
/// # Safety
/// `dst` must be valid for writes of `desc->size` bytes aligned to
/// `desc->align` and hold no live value.
///
/// # Returns
/// `TbStatus::TbTypeMismatch` for any other shape.
#[no_mangle]
pub unsafe extern "C" fn tb_value_construct_empty(
    desc: *const TbTypeDescriptor,
    dst: *mut c_void,
) -> TbStatus {
    with_descriptor!(desc, |d| RawValue::construct_empty(d, dst.cast()))
}

// =============================================================================
// Strings
// =============================================================================

/// Byte length of a string value.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `out_len` must be
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_string_len(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    out_len: *mut usize,
) -> TbStatus {
    with_view!(desc, value, |v| write_out(out_len, v.string()?.len()))
}

/// Copy a string value into `buf` as a null-terminated UTF-8 string.
///
/// # Safety
/// - `value` must point to a live value described by `desc`.
/// - `buf` must be valid for `buf_len` bytes; `out_len` NULL or valid for writes.
///
/// # Returns
/// `TbStatus::TbBufferTooSmall` when `buf_len` cannot hold the string and
/// its terminator; `*out_len` still receives the required length.
#[no_mangle]
pub unsafe extern "C" fn tb_string_copy(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    buf: *mut u8,
    buf_len: usize,
    out_len: *mut usize,
) -> TbStatus {
    with_view!(desc, value, |v| {
        let text = v.string()?;
        if !out_len.is_null() {
            *out_len = text.len();
        }
        if buf.is_null() || buf_len <= text.len() {
            return Err(BridgeError::BufferTooSmall {
                required: text.len() + 1,
                provided: buf_len,
            });
        }
        std::ptr::copy_nonoverlapping(text.as_ptr(), buf, text.len());
        *buf.add(text.len()) = 0;
        Ok(())
    })
}

/// Replace a string value with `len` bytes of UTF-8 at `bytes`.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `bytes` must be
/// valid for `len` bytes (or NULL when `len == 0`).
#[no_mangle]
pub unsafe extern "C" fn tb_string_set(
    desc: *const TbTypeDescriptor,
    value: *mut c_void,
    bytes: *const u8,
    len: usize,
) -> TbStatus {
    with_view!(desc, value, |v| v.set_string(utf8_arg(bytes, len)?))
}

/// Construct a string from `len` bytes of UTF-8 in uninitialized storage.
///
/// # Safety
/// `dst` must be valid for writes of `desc->size` bytes aligned to
/// `desc->align` and hold no live value; `bytes` must be valid for `len`
/// bytes (or NULL when `len == 0`).
///
/// # Example (C)
/// ```c
/// // describe(const std::string& prefix)
/// const TbTypeDescriptor* str = describe->function->params[0];
/// void* prefix = aligned_alloc(str->align, str->size);
/// tb_string_construct(str, prefix, "sensor", 6);
/// const void* args[] = { prefix };
/// tb_call_method(obj, "Sensor", "describe", args, 1, result);
/// tb_value_drop(str, prefix);
/// ```
#[no_mangle]
pub unsafe extern "C" fn tb_string_construct(
    desc: *const TbTypeDescriptor,
    dst: *mut c_void,
    bytes: *const u8,
    len: usize,
) -> TbStatus {
    with_descriptor!(desc, |d| {
        let text = utf8_arg(bytes, len)?;
        RawValue::construct_string(d, dst.cast(), text)
    })
}

// =============================================================================
// Vectors
// =============================================================================

/// # Safety
/// `value` must point to a live value described by `desc`; `out_len` must be
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_vector_len(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    out_len: *mut usize,
) -> TbStatus {
    with_view!(desc, value, |v| write_out(out_len, v.vector_len()?))
}

/// Address of element `index`, valid until the vector is modified.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `out_elem` must
/// be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_vector_at(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    index: usize,
    out_elem: *mut *mut c_void,
) -> TbStatus {
    with_view!(desc, value, |v| write_out(out_elem, v.vector_at(index)?.ptr().cast()))
}

/// Append a clone of `elem`.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `elem` to a live
/// value of the element type.
#[no_mangle]
pub unsafe extern "C" fn tb_vector_push(
    desc: *const TbTypeDescriptor,
    value: *mut c_void,
    elem: *const c_void,
) -> TbStatus {
    with_view!(desc, value, |v| v.vector_push(elem.cast()))
}

/// # Safety
/// `value` must point to a live value described by `desc`.
#[no_mangle]
pub unsafe extern "C" fn tb_vector_clear(desc: *const TbTypeDescriptor, value: *mut c_void) -> TbStatus {
    with_view!(desc, value, |v| v.vector_clear())
}

// =============================================================================
// Maps
// =============================================================================

/// # Safety
/// `value` must point to a live value described by `desc`; `out_len` must be
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_map_len(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    out_len: *mut usize,
) -> TbStatus {
    with_view!(desc, value, |v| write_out(out_len, v.map_len()?))
}

/// Key and value addresses of the `index`-th entry in iteration order.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `out_key` and
/// `out_value` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_map_entry(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    index: usize,
    out_key: *mut *const c_void,
    out_value: *mut *mut c_void,
) -> TbStatus {
    with_view!(desc, value, |v| {
        let (key, mapped) = v.map_entry(index)?;
        write_out(out_key, key.ptr().cast_const().cast())?;
        write_out(out_value, mapped.ptr().cast())
    })
}

/// Address of the value stored under `key`, or NULL when absent.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `key` to a live
/// value of the key type; `out_value` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_map_find(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    key: *const c_void,
    out_value: *mut *mut c_void,
) -> TbStatus {
    with_view!(desc, value, |v| {
        let found = v.map_find(key.cast())?;
        write_out(
            out_value,
            found.map_or(std::ptr::null_mut(), |m| m.ptr().cast()),
        )
    })
}

/// Insert clones of `key` and `mapped`, replacing any existing entry.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `key` and
/// `mapped` to live values of the key and mapped types.
#[no_mangle]
pub unsafe extern "C" fn tb_map_insert(
    desc: *const TbTypeDescriptor,
    value: *mut c_void,
    key: *const c_void,
    mapped: *const c_void,
) -> TbStatus {
    with_view!(desc, value, |v| v.map_insert(key.cast(), mapped.cast()))
}

/// # Safety
/// `value` must point to a live value described by `desc`.
#[no_mangle]
pub unsafe extern "C" fn tb_map_clear(desc: *const TbTypeDescriptor, value: *mut c_void) -> TbStatus {
    with_view!(desc, value, |v| v.map_clear())
}

// =============================================================================
// Optionals
// =============================================================================

/// # Safety
/// `value` must point to a live value described by `desc`; `out_has` must be
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_optional_has_value(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    out_has: *mut bool,
) -> TbStatus {
    with_view!(desc, value, |v| write_out(out_has, v.optional_has_value()?))
}

/// Address of the payload, or NULL when empty.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `out_payload`
/// must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_optional_value(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    out_payload: *mut *mut c_void,
) -> TbStatus {
    with_view!(desc, value, |v| {
        let payload = v.optional_value()?;
        write_out(
            out_payload,
            payload.map_or(std::ptr::null_mut(), |p| p.ptr().cast()),
        )
    })
}

/// # Safety
/// `value` must point to a live value described by `desc`.
#[no_mangle]
pub unsafe extern "C" fn tb_optional_reset(desc: *const TbTypeDescriptor, value: *mut c_void) -> TbStatus {
    with_view!(desc, value, |v| v.optional_reset())
}

/// Store a clone of `payload`.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `payload` to a
/// live value of the payload type.
#[no_mangle]
pub unsafe extern "C" fn tb_optional_emplace(
    desc: *const TbTypeDescriptor,
    value: *mut c_void,
    payload: *const c_void,
) -> TbStatus {
    with_view!(desc, value, |v| v.optional_emplace(payload.cast()))
}

/// Construct an optional in uninitialized storage: empty when `payload`
/// is NULL, otherwise holding a clone of `*payload`.
///
/// # Safety
/// `dst` must be valid for writes of `desc->size` bytes aligned to
/// `desc->align` and hold no live value; a non-NULL `payload` must point to
/// a live value of the payload type.
#[no_mangle]
pub unsafe extern "C" fn tb_optional_construct(
    desc: *const TbTypeDescriptor,
    dst: *mut c_void,
    payload: *const c_void,
) -> TbStatus {
    with_descriptor!(desc, |d| RawValue::construct_optional(d, dst.cast(), payload.cast()))
}

// =============================================================================
// Variants
// =============================================================================

/// Zero-based index of the active alternative.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `out_index` must
/// be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_variant_index(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    out_index: *mut usize,
) -> TbStatus {
    with_view!(desc, value, |v| write_out(out_index, v.variant_index()?))
}

/// Address of the active alternative's payload. Its type is
/// `desc->alternatives[index]`.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `out_payload`
/// must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tb_variant_value(
    desc: *const TbTypeDescriptor,
    value: *const c_void,
    out_payload: *mut *mut c_void,
) -> TbStatus {
    with_view!(desc, value, |v| write_out(out_payload, v.variant_value()?.ptr().cast()))
}

/// Make alternative `index` active with a clone of `payload`.
///
/// # Safety
/// `value` must point to a live value described by `desc`; `payload` to a
/// live value of alternative `index`'s type.
#[no_mangle]
pub unsafe extern "C" fn tb_variant_emplace(
    desc: *const TbTypeDescriptor,
    value: *mut c_void,
    index: usize,
    payload: *const c_void,
) -> TbStatus {
    with_view!(desc, value, |v| v.variant_emplace(index, payload.cast()))
}

/// Construct a variant in uninitialized storage with alternative `index`
/// active, holding a clone of `payload`.
///
/// # Safety
/// `dst` must be valid for writes of `desc->size` bytes aligned to
/// `desc->align` and hold no live value; `payload` must point to a live
/// value of `desc->alternatives[index]`'s type.
///
/// # Returns
/// `TbStatus::TbInvalidArgument` when `index` is out of range.
#[no_mangle]
pub unsafe extern "C" fn tb_variant_construct(
    desc: *const TbTypeDescriptor,
    dst: *mut c_void,
    index: usize,
    payload: *const c_void,
) -> TbStatus {
    with_descriptor!(desc, |d| RawValue::construct_variant(
        d,
        dst.cast(),
        index,
        payload.cast()
    ))
}
