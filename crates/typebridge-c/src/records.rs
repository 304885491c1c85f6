// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `#[repr(C)]` mirrors of the descriptor model.
//!
//! Records are built once per descriptor, cached, and never freed, so the
//! pointers handed to C stay valid for the life of the process. A record
//! keeps the native `Arc` it was built from alive through `native`.
//!
//! Struct-tagged type records do not embed their members; C resolves them
//! with `tb_get_type_info_by_hash(record->struct_hash, ...)`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::{c_char, c_void};
use std::ptr;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use typebridge::{FunctionDescriptor, MemberInfo, StructDescriptor, TypeDescriptor};

/// Tag value used for an absent key or value type.
pub const TB_NO_TYPE: u32 = u32::MAX;

/// C view of a type descriptor.
#[repr(C)]
#[derive(Debug)]
pub struct TbTypeDescriptor {
    /// `OuterType` discriminant.
    pub outer_type: u32,
    /// Key tag for maps, `TB_NO_TYPE` otherwise.
    pub key_type: u32,
    /// Element, payload or mapped value tag, `TB_NO_TYPE` when absent.
    pub value_type: u32,
    pub size: usize,
    pub align: usize,
    /// Display name, e.g. `"Vec<f64>"`.
    pub name: *const c_char,
    pub key: *const TbTypeDescriptor,
    pub value: *const TbTypeDescriptor,
    /// Variant alternatives in declaration order.
    pub alternatives: *const *const TbTypeDescriptor,
    pub alternative_count: usize,
    /// Signature of a `Function` descriptor, NULL otherwise.
    pub function: *const TbFunctionDescriptor,
    /// Registry hash of a `Struct` descriptor, 0 otherwise.
    pub struct_hash: u64,
    /// Opaque native descriptor handle.
    pub native: *const c_void,
}

/// C view of a member function signature.
#[repr(C)]
#[derive(Debug)]
pub struct TbFunctionDescriptor {
    pub params: *const *const TbTypeDescriptor,
    pub param_count: usize,
    /// NULL for void functions.
    pub return_type: *const TbTypeDescriptor,
    pub is_const: bool,
}

/// C view of one struct member.
#[repr(C)]
#[derive(Debug)]
pub struct TbMemberInfo {
    pub name: *const c_char,
    /// `MemberKind` discriminant (0 = data, 1 = function).
    pub kind: u32,
    pub type_desc: *const TbTypeDescriptor,
    /// Field offset for data members, 0 for functions.
    pub offset: usize,
    /// Signature for function members, NULL for data members.
    pub function: *const TbFunctionDescriptor,
    /// Opaque native member handle.
    pub native: *const c_void,
}

/// C view of a registered struct.
#[repr(C)]
#[derive(Debug)]
pub struct TbStructInfo {
    pub type_name: *const c_char,
    pub type_hash: u64,
    pub size: usize,
    pub align: usize,
    pub descriptor: *const TbTypeDescriptor,
    pub members: *const TbMemberInfo,
    pub member_count: usize,
}

// Caches hold record addresses keyed by the address of the native Arc they
// mirror. Both sides are leaked, so neither address is ever reused.
fn type_cache() -> &'static DashMap<usize, usize> {
    static CACHE: OnceLock<DashMap<usize, usize>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

fn struct_cache() -> &'static DashMap<usize, usize> {
    static CACHE: OnceLock<DashMap<usize, usize>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

fn name_cache() -> &'static DashMap<String, usize> {
    static CACHE: OnceLock<DashMap<String, usize>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

/// Type records under construction on this thread.
///
/// A variant can reach itself through its alternatives, so a record is
/// visible here before its children are filled in. Nothing is moved to the
/// shared cache until the outermost `type_record` call has finished.
#[derive(Default)]
struct Pending {
    depth: usize,
    records: HashMap<usize, usize>,
}

thread_local! {
    static PENDING: RefCell<Pending> = RefCell::new(Pending::default());
}

fn leak_name(name: &str) -> *const c_char {
    CString::new(name).unwrap_or_default().into_raw()
}

/// Process-lifetime C copy of `name`, one per distinct string.
pub(crate) fn interned_name(name: &str) -> *const c_char {
    if let Some(found) = name_cache().get(name) {
        return *found as *const c_char;
    }
    let leaked = leak_name(name) as usize;
    *name_cache().entry(name.to_string()).or_insert(leaked) as *const c_char
}

fn leak_array<T>(items: Vec<*const T>) -> *const *const T {
    if items.is_empty() {
        return ptr::null();
    }
    Box::leak(items.into_boxed_slice()).as_ptr()
}

fn tag(desc: Option<&Arc<TypeDescriptor>>) -> u32 {
    desc.map_or(TB_NO_TYPE, |d| d.outer_type() as u32)
}

/// Record for `desc`, building it (and its children) on first use.
pub(crate) fn type_record(desc: &Arc<TypeDescriptor>) -> *const TbTypeDescriptor {
    let key = Arc::as_ptr(desc) as usize;
    if let Some(found) = type_cache().get(&key) {
        return *found as *const TbTypeDescriptor;
    }
    if let Some(found) = PENDING.with(|p| p.borrow().records.get(&key).copied()) {
        return found as *const TbTypeDescriptor;
    }

    PENDING.with(|p| p.borrow_mut().depth += 1);
    let built = build_type_record(desc, key);
    let finished = PENDING.with(|p| {
        let mut p = p.borrow_mut();
        p.depth -= 1;
        if p.depth == 0 {
            std::mem::take(&mut p.records)
        } else {
            HashMap::new()
        }
    });
    if finished.is_empty() {
        return built;
    }
    for (k, record) in finished {
        type_cache().entry(k).or_insert(record);
    }
    type_cache()
        .get(&key)
        .map_or(built, |found| *found as *const TbTypeDescriptor)
}

fn build_type_record(desc: &Arc<TypeDescriptor>, key: usize) -> *const TbTypeDescriptor {
    let key_desc = desc.key_type();
    let value_desc = desc.value_type().or_else(|| desc.map_value_type());
    let record: *mut TbTypeDescriptor = Box::leak(Box::new(TbTypeDescriptor {
        outer_type: desc.outer_type() as u32,
        key_type: tag(key_desc),
        value_type: tag(value_desc),
        size: desc.size(),
        align: desc.align(),
        name: leak_name(desc.name()),
        key: ptr::null(),
        value: ptr::null(),
        alternatives: ptr::null(),
        alternative_count: 0,
        function: ptr::null(),
        struct_hash: desc.struct_ref().map_or(0, |(_, hash)| hash),
        native: Arc::into_raw(Arc::clone(desc)).cast(),
    }));
    PENDING.with(|p| p.borrow_mut().records.insert(key, record as usize));

    let key_record = key_desc.map_or(ptr::null(), type_record);
    let value_record = value_desc.map_or(ptr::null(), type_record);
    let alternatives: Vec<_> = desc
        .alternatives()
        .map(|alts| alts.iter().map(type_record).collect())
        .unwrap_or_default();
    let function = desc
        .function_descriptor()
        .map_or(ptr::null(), function_record);

    // SAFETY: freshly leaked above and not yet reachable from another thread.
    unsafe {
        (*record).key = key_record;
        (*record).value = value_record;
        (*record).alternative_count = alternatives.len();
        (*record).alternatives = leak_array(alternatives);
        (*record).function = function;
    }
    record
}

fn function_record(function: &FunctionDescriptor) -> *const TbFunctionDescriptor {
    let params: Vec<_> = function.params().iter().map(type_record).collect();
    let record = TbFunctionDescriptor {
        param_count: params.len(),
        params: leak_array(params),
        return_type: function.returns().map_or(ptr::null(), type_record),
        is_const: function.is_const(),
    };
    Box::leak(Box::new(record))
}

fn member_record(member: &MemberInfo) -> TbMemberInfo {
    let type_desc = type_record(member.type_desc());
    // SAFETY: `type_record` returns a leaked, never-freed record.
    let function = unsafe { (*type_desc).function };
    TbMemberInfo {
        name: leak_name(member.name()),
        kind: member.kind() as u32,
        type_desc,
        offset: member.offset().unwrap_or(0),
        function,
        native: (member as *const MemberInfo).cast(),
    }
}

/// Record for a registered struct.
pub(crate) fn struct_record(info: &Arc<StructDescriptor>) -> *const TbStructInfo {
    let key = Arc::as_ptr(info) as usize;
    if let Some(found) = struct_cache().get(&key) {
        return *found as *const TbStructInfo;
    }

    // Member records point into the descriptor's member list; pin it.
    let pinned: &'static StructDescriptor = unsafe { &*Arc::into_raw(Arc::clone(info)) };
    let members: Vec<TbMemberInfo> = pinned.members().iter().map(member_record).collect();
    let record = TbStructInfo {
        type_name: leak_name(pinned.type_name()),
        type_hash: pinned.type_hash(),
        size: pinned.size(),
        align: pinned.align(),
        descriptor: type_record(pinned.descriptor()),
        member_count: members.len(),
        members: Box::leak(members.into_boxed_slice()).as_ptr(),
    };
    let built = Box::leak(Box::new(record)) as *const TbStructInfo as usize;
    *struct_cache().entry(key).or_insert(built) as *const TbStructInfo
}

/// Native descriptor behind a record.
///
/// # Safety
/// `record` must be a pointer handed out by this crate.
pub(crate) unsafe fn native_type(record: *const TbTypeDescriptor) -> Option<Arc<TypeDescriptor>> {
    if record.is_null() || (*record).native.is_null() {
        return None;
    }
    let raw = (*record).native.cast::<TypeDescriptor>();
    Arc::increment_strong_count(raw);
    Some(Arc::from_raw(raw))
}

/// Native member behind a record.
///
/// # Safety
/// `record` must be a pointer handed out by this crate.
pub(crate) unsafe fn native_member<'a>(record: *const TbMemberInfo) -> Option<&'a MemberInfo> {
    if record.is_null() || (*record).native.is_null() {
        return None;
    }
    Some(&*(*record).native.cast::<MemberInfo>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use typebridge::{descriptor_of, OuterType};

    #[test]
    fn test_map_record_three_tag_view() {
        let desc = descriptor_of::<std::collections::HashMap<String, Vec<f64>>>();
        let record = unsafe { &*type_record(&desc) };
        assert_eq!(record.outer_type, OuterType::UnorderedMap as u32);
        assert_eq!(record.key_type, OuterType::String as u32);
        assert_eq!(record.value_type, OuterType::Vector as u32);
        let value = unsafe { &*record.value };
        assert_eq!(value.value_type, OuterType::F64 as u32);
        assert_eq!(
            unsafe { CStr::from_ptr(value.name) }.to_str(),
            Ok("Vec<f64>")
        );
    }

    #[test]
    fn test_records_are_cached() {
        let desc = descriptor_of::<Option<i32>>();
        assert_eq!(type_record(&desc), type_record(&desc));
        let record = unsafe { &*type_record(&descriptor_of::<i32>()) };
        assert_eq!(record.key_type, TB_NO_TYPE);
        assert_eq!(record.value_type, TB_NO_TYPE);
        assert!(record.alternatives.is_null());
        assert_eq!(record.size, 4);
    }

    #[derive(Clone, typebridge::Reflect)]
    enum Chain {
        End(i32),
        Link(Vec<Chain>),
    }

    #[test]
    fn test_self_referencing_variant_record() {
        let desc = descriptor_of::<Chain>();
        let record = type_record(&desc);
        let view = unsafe { &*record };
        assert_eq!(view.outer_type, OuterType::Variant as u32);
        assert_eq!(view.alternative_count, 2);
        let alternatives = unsafe { std::slice::from_raw_parts(view.alternatives, 2) };
        assert_eq!(unsafe { (*alternatives[0]).outer_type }, OuterType::I32 as u32);
        let list = unsafe { &*alternatives[1] };
        assert_eq!(list.outer_type, OuterType::Vector as u32);
        assert!(ptr::eq(list.value, record));
        assert_eq!(type_record(&desc), record);
    }

    #[test]
    fn test_interned_names_are_shared() {
        let a = interned_name("Sensor");
        assert_eq!(a, interned_name("Sensor"));
        assert_eq!(unsafe { CStr::from_ptr(a) }.to_str(), Ok("Sensor"));
        assert_ne!(a, interned_name("Address"));
    }
}
