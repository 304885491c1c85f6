// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide type registry.
//!
//! Maps registered names (and type hashes) to [`StructDescriptor`]s.
//! Registration is idempotent per native type and rejects a second native
//! type under an existing name. Entries are never removed, so an
//! `Arc<StructDescriptor>` handed out once stays meaningful for the rest of
//! the process.
//!
//! Lookups take a shared lock; only the insert of a new type takes the
//! exclusive one. Descriptors are built outside the lock.

use crate::error::{BridgeError, Result};
use crate::member::{StructBuilder, StructDescriptor};
use crate::reflect::Reflect;
use crate::types::{type_hash, TypeDescriptor};
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

#[derive(Default)]
struct Tables {
    by_name: HashMap<String, Arc<StructDescriptor>>,
    by_hash: HashMap<u64, Arc<StructDescriptor>>,
}

/// Name and hash indexed table of struct descriptors.
#[derive(Default)]
pub struct TypeRegistry {
    tables: RwLock<Tables>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check an existing entry against the incoming type.
    fn existing(
        tables: &Tables,
        name: &str,
        hash: u64,
        id: TypeId,
    ) -> Option<Result<Arc<StructDescriptor>>> {
        let sd = tables.by_name.get(name)?;
        if sd.type_hash() == hash && sd.type_id() == id {
            return Some(Ok(Arc::clone(sd)));
        }
        log::warn!(
            "[registry] type conflict on '{}': {:#018x} already registered, got {:#018x}",
            name,
            sd.type_hash(),
            hash
        );
        Some(Err(BridgeError::TypeConflict {
            name: name.to_string(),
            existing_hash: sd.type_hash(),
            new_hash: hash,
        }))
    }

    /// Register `T` under `name`.
    ///
    /// Registering the same `T` again is a no-op that returns the existing
    /// descriptor. Registering a different type under a taken name fails
    /// with `TypeConflict` and leaves the registry unchanged.
    ///
    /// # Panics
    ///
    /// Panics when `T`'s reflected metadata is malformed (empty or
    /// duplicate member names, inconsistent descriptors).
    pub fn register<T: Reflect>(&self, name: &str) -> Result<Arc<StructDescriptor>> {
        if name.is_empty() {
            return Err(BridgeError::invalid("empty type name"));
        }
        let hash = type_hash::<T>();
        let id = TypeId::of::<T>();
        if let Some(found) = Self::existing(&self.tables.read(), name, hash, id) {
            return found;
        }

        let sd = T::reflect(StructBuilder::new(name)).build();
        sd.validate();
        let sd = Arc::new(sd);

        let mut tables = self.tables.write();
        if let Some(found) = Self::existing(&tables, name, hash, id) {
            return found;
        }
        tables.by_name.insert(name.to_string(), Arc::clone(&sd));
        tables.by_hash.entry(hash).or_insert_with(|| Arc::clone(&sd));
        log::debug!(
            "[registry] registered '{}' hash={:#018x} size={} members={}",
            name,
            hash,
            sd.size(),
            sd.member_count()
        );
        Ok(sd)
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<StructDescriptor>> {
        self.tables.read().by_name.get(name).cloned()
    }

    /// First descriptor registered for the native type with this hash.
    #[must_use]
    pub fn lookup_by_hash(&self, hash: u64) -> Option<Arc<StructDescriptor>> {
        self.tables.read().by_hash.get(&hash).cloned()
    }

    #[must_use]
    pub fn lookup_by_type<T: 'static>(&self) -> Option<Arc<StructDescriptor>> {
        self.lookup_by_hash(type_hash::<T>())
            .filter(|sd| sd.type_id() == TypeId::of::<T>())
    }

    /// Resolve a `Struct`-tagged descriptor: by hash first, then by name.
    ///
    /// The entry found must describe the same native type as `desc`.
    /// Another type registered under the same name is a `TypeMismatch`.
    pub fn resolve(&self, desc: &TypeDescriptor) -> Result<Arc<StructDescriptor>> {
        let (name, hash) = desc
            .struct_ref()
            .ok_or_else(|| BridgeError::mismatch("struct", desc.name()))?;
        let sd = self
            .lookup_by_hash(hash)
            .or_else(|| self.lookup(name))
            .ok_or_else(|| BridgeError::UnknownType(name.to_string()))?;
        if sd.type_hash() != hash || desc.type_id().is_some_and(|id| id != sd.type_id()) {
            log::warn!(
                "[registry] '{}' resolved to another native type: {:#018x} != {:#018x}",
                name,
                sd.type_hash(),
                hash
            );
            return Err(BridgeError::mismatch(
                format!("{} ({:#018x})", name, hash),
                format!("{} ({:#018x})", sd.type_name(), sd.type_hash()),
            ));
        }
        Ok(sd)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.read().by_name.is_empty()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().by_name.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

/// The process-wide registry (created on first use, never torn down).
pub fn type_registry() -> &'static TypeRegistry {
    static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(TypeRegistry::new)
}
