// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-erased operation tables.
//!
//! Each table is a set of plain function pointers monomorphized for one
//! native type. All of them are `unsafe`: the caller guarantees that every
//! pointer refers to a live, aligned value of the type the table was built
//! for (or, for `clone_into`/`construct` destinations, to uninitialized
//! storage of the right size and alignment).

use crate::error::Result;
use crate::future::SharedFuture;
use crate::reflect::VariantValue;
use std::collections::HashMap;
use std::hash::Hash;
use std::ptr;
use std::time::Duration;

/// Copy and destruction of a value.
#[derive(Debug, Clone, Copy)]
pub struct ValueOps {
    /// Run the destructor in place; the storage itself is not freed.
    pub drop_in_place: unsafe fn(*mut u8),
    /// Clone `src` into uninitialized `dst` (placement construction).
    pub clone_into: unsafe fn(src: *const u8, dst: *mut u8),
    /// Deep-copy `src` over the initialized value at `dst`.
    pub assign: unsafe fn(dst: *mut u8, src: *const u8),
}

unsafe fn drop_value<T>(ptr: *mut u8) {
    ptr::drop_in_place(ptr.cast::<T>());
}

unsafe fn clone_value<T: Clone>(src: *const u8, dst: *mut u8) {
    ptr::write(dst.cast::<T>(), (&*src.cast::<T>()).clone());
}

unsafe fn assign_value<T: Clone>(dst: *mut u8, src: *const u8) {
    (&mut *dst.cast::<T>()).clone_from(&*src.cast::<T>());
}

impl ValueOps {
    #[must_use]
    pub fn of<T: Clone + 'static>() -> Self {
        Self {
            drop_in_place: drop_value::<T>,
            clone_into: clone_value::<T>,
            assign: assign_value::<T>,
        }
    }
}

/// `Vec<T>` access.
#[derive(Debug, Clone, Copy)]
pub struct VectorOps {
    pub len: unsafe fn(*const u8) -> usize,
    /// Element address, null when out of bounds.
    pub element: unsafe fn(*mut u8, usize) -> *mut u8,
    /// Push a clone of the element at the second pointer.
    pub push: unsafe fn(*mut u8, *const u8),
    pub clear: unsafe fn(*mut u8),
    /// Write an empty vector into uninitialized storage.
    pub construct_empty: unsafe fn(*mut u8),
}

unsafe fn vec_len<T>(v: *const u8) -> usize {
    (&*v.cast::<Vec<T>>()).len()
}

unsafe fn vec_element<T>(v: *mut u8, index: usize) -> *mut u8 {
    (&mut *v.cast::<Vec<T>>())
        .get_mut(index)
        .map_or(ptr::null_mut(), |e| (e as *mut T).cast())
}

unsafe fn vec_push<T: Clone>(v: *mut u8, elem: *const u8) {
    (&mut *v.cast::<Vec<T>>()).push((&*elem.cast::<T>()).clone());
}

unsafe fn vec_clear<T>(v: *mut u8) {
    (&mut *v.cast::<Vec<T>>()).clear();
}

unsafe fn vec_construct<T>(v: *mut u8) {
    ptr::write(v.cast::<Vec<T>>(), Vec::new());
}

impl VectorOps {
    #[must_use]
    pub fn of<T: Clone + 'static>() -> Self {
        Self {
            len: vec_len::<T>,
            element: vec_element::<T>,
            push: vec_push::<T>,
            clear: vec_clear::<T>,
            construct_empty: vec_construct::<T>,
        }
    }
}

/// `HashMap<K, V>` access.
///
/// Entry order follows the map's iteration order, which is stable while the
/// map is not modified.
#[derive(Debug, Clone, Copy)]
pub struct MapOps {
    pub len: unsafe fn(*const u8) -> usize,
    /// `(key, value)` addresses of the n-th entry.
    pub entry: unsafe fn(*mut u8, usize) -> Option<(*const u8, *mut u8)>,
    /// Value address for the key at the second pointer, null if absent.
    pub find: unsafe fn(*mut u8, *const u8) -> *mut u8,
    /// Insert (or overwrite) clones of key and value.
    pub insert: unsafe fn(*mut u8, *const u8, *const u8),
    pub clear: unsafe fn(*mut u8),
    /// Write an empty map into uninitialized storage.
    pub construct_empty: unsafe fn(*mut u8),
}

unsafe fn map_len<K, V>(m: *const u8) -> usize {
    (&*m.cast::<HashMap<K, V>>()).len()
}

unsafe fn map_entry<K, V>(m: *mut u8, index: usize) -> Option<(*const u8, *mut u8)> {
    (&mut *m.cast::<HashMap<K, V>>())
        .iter_mut()
        .nth(index)
        .map(|(k, v)| ((k as *const K).cast(), (v as *mut V).cast()))
}

unsafe fn map_find<K: Eq + Hash, V>(m: *mut u8, key: *const u8) -> *mut u8 {
    (&mut *m.cast::<HashMap<K, V>>())
        .get_mut(&*key.cast::<K>())
        .map_or(ptr::null_mut(), |v| (v as *mut V).cast())
}

unsafe fn map_insert<K: Eq + Hash + Clone, V: Clone>(m: *mut u8, key: *const u8, value: *const u8) {
    (&mut *m.cast::<HashMap<K, V>>()).insert(
        (&*key.cast::<K>()).clone(),
        (&*value.cast::<V>()).clone(),
    );
}

unsafe fn map_clear<K, V>(m: *mut u8) {
    (&mut *m.cast::<HashMap<K, V>>()).clear();
}

unsafe fn map_construct<K, V>(m: *mut u8) {
    ptr::write(m.cast::<HashMap<K, V>>(), HashMap::new());
}

impl MapOps {
    #[must_use]
    pub fn of<K, V>() -> Self
    where
        K: Eq + Hash + Clone + 'static,
        V: Clone + 'static,
    {
        Self {
            len: map_len::<K, V>,
            entry: map_entry::<K, V>,
            find: map_find::<K, V>,
            insert: map_insert::<K, V>,
            clear: map_clear::<K, V>,
            construct_empty: map_construct::<K, V>,
        }
    }
}

/// `Option<T>` access. An empty optional never constructs a payload.
#[derive(Debug, Clone, Copy)]
pub struct OptionalOps {
    pub has_value: unsafe fn(*const u8) -> bool,
    /// Payload address, null when empty.
    pub value: unsafe fn(*mut u8) -> *mut u8,
    pub reset: unsafe fn(*mut u8),
    /// Store a clone of the payload at the second pointer.
    pub emplace: unsafe fn(*mut u8, *const u8),
    /// Write into uninitialized storage: empty for a null payload pointer,
    /// otherwise a clone of the payload.
    pub construct: unsafe fn(*mut u8, *const u8),
}

unsafe fn opt_has_value<T>(o: *const u8) -> bool {
    (&*o.cast::<Option<T>>()).is_some()
}

unsafe fn opt_value<T>(o: *mut u8) -> *mut u8 {
    (&mut *o.cast::<Option<T>>())
        .as_mut()
        .map_or(ptr::null_mut(), |v| (v as *mut T).cast())
}

unsafe fn opt_reset<T>(o: *mut u8) {
    *o.cast::<Option<T>>() = None;
}

unsafe fn opt_emplace<T: Clone>(o: *mut u8, value: *const u8) {
    *o.cast::<Option<T>>() = Some((&*value.cast::<T>()).clone());
}

unsafe fn opt_construct<T: Clone>(o: *mut u8, value: *const u8) {
    let payload = (!value.is_null()).then(|| (&*value.cast::<T>()).clone());
    ptr::write(o.cast::<Option<T>>(), payload);
}

impl OptionalOps {
    #[must_use]
    pub fn of<T: Clone + 'static>() -> Self {
        Self {
            has_value: opt_has_value::<T>,
            value: opt_value::<T>,
            reset: opt_reset::<T>,
            emplace: opt_emplace::<T>,
            construct: opt_construct::<T>,
        }
    }
}

/// Sum type access through the `{active_index, payload}` view.
#[derive(Debug, Clone, Copy)]
pub struct VariantOps {
    pub index: unsafe fn(*const u8) -> usize,
    /// Address of the active alternative's payload.
    pub value: unsafe fn(*mut u8) -> *mut u8,
    /// Replace the value at the first pointer with alternative `index`
    /// cloned from the payload pointer. `false` if `index` is out of range.
    pub emplace: unsafe fn(*mut u8, usize, *const u8) -> bool,
    /// Like `emplace` but the destination is uninitialized.
    pub construct: unsafe fn(*mut u8, usize, *const u8) -> bool,
}

unsafe fn variant_index<T: VariantValue>(v: *const u8) -> usize {
    (&*v.cast::<T>()).active_index()
}

unsafe fn variant_value<T: VariantValue>(v: *mut u8) -> *mut u8 {
    (&mut *v.cast::<T>()).payload_mut_ptr()
}

unsafe fn variant_emplace<T: VariantValue>(v: *mut u8, index: usize, payload: *const u8) -> bool {
    match T::from_payload(index, payload) {
        Some(value) => {
            *v.cast::<T>() = value;
            true
        }
        None => false,
    }
}

unsafe fn variant_construct<T: VariantValue>(v: *mut u8, index: usize, payload: *const u8) -> bool {
    match T::from_payload(index, payload) {
        Some(value) => {
            ptr::write(v.cast::<T>(), value);
            true
        }
        None => false,
    }
}

impl VariantOps {
    #[must_use]
    pub fn of<T: VariantValue>() -> Self {
        Self {
            index: variant_index::<T>,
            value: variant_value::<T>,
            emplace: variant_emplace::<T>,
            construct: variant_construct::<T>,
        }
    }
}

/// `SharedFuture<T>` access.
#[derive(Debug, Clone, Copy)]
pub struct FutureOps {
    pub is_valid: unsafe fn(*const u8) -> bool,
    pub is_ready: unsafe fn(*const u8) -> bool,
    /// Block (up to the timeout) and clone the value into the uninitialized
    /// buffer at the last pointer.
    pub get: unsafe fn(*const u8, Option<Duration>, *mut u8) -> Result<()>,
}

unsafe fn future_is_valid<T>(f: *const u8) -> bool {
    (&*f.cast::<SharedFuture<T>>()).is_valid()
}

unsafe fn future_is_ready<T>(f: *const u8) -> bool {
    (&*f.cast::<SharedFuture<T>>()).is_ready()
}

unsafe fn future_get<T: Clone>(f: *const u8, timeout: Option<Duration>, out: *mut u8) -> Result<()> {
    let value = (&*f.cast::<SharedFuture<T>>()).get_with(timeout)?;
    ptr::write(out.cast::<T>(), value);
    Ok(())
}

impl FutureOps {
    #[must_use]
    pub fn of<T: Clone + 'static>() -> Self {
        Self {
            is_valid: future_is_valid::<T>,
            is_ready: future_is_ready::<T>,
            get: future_get::<T>,
        }
    }
}
