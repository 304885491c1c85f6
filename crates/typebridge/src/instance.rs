// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide instance registry.
//!
//! Maps string keys to live object addresses and their registered type
//! name, giving foreign callers a root to start from.
//!
//! # Lifetime contract
//!
//! The registry does not own the objects it points to and cannot tell when
//! one is destroyed. Registering an address promises that the object
//! outlives every use of its entry (typically a process-wide global or a
//! leaked allocation). Reading a dangling entry is undefined behavior on the
//! registering side, not an error the registry reports.
//!
//! Re-registering a key overwrites the previous entry.

use crate::error::{BridgeError, Result};
use crate::reflect::Reflect;
use crate::registry::type_registry;
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::{Arc, OnceLock};

/// One registered object.
#[derive(Debug, Clone)]
pub struct InstanceEntry {
    address: *mut u8,
    type_name: Arc<str>,
}

// SAFETY: the entry is an address plus a name; synchronizing access to the
// object itself is the registering code's responsibility.
unsafe impl Send for InstanceEntry {}
unsafe impl Sync for InstanceEntry {}

impl InstanceEntry {
    #[must_use]
    pub fn address(&self) -> *mut u8 {
        self.address
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Key to object table.
#[derive(Default)]
pub struct InstanceRegistry {
    entries: DashMap<String, InstanceEntry>,
}

impl InstanceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `address` under `key`, returning the entry it replaced.
    ///
    /// The object must stay alive while registered (see the module docs).
    pub fn register(
        &self,
        key: &str,
        address: *mut u8,
        type_name: &str,
    ) -> Result<Option<InstanceEntry>> {
        if key.is_empty() {
            return Err(BridgeError::invalid("empty instance key"));
        }
        if address.is_null() {
            return Err(BridgeError::invalid(format!("null address for instance '{}'", key)));
        }
        let entry = InstanceEntry {
            address,
            type_name: Arc::from(type_name),
        };
        let previous = self.entries.insert(key.to_string(), entry);
        match &previous {
            Some(old) => log::debug!(
                "[instances] '{}' overwritten: {:p} ({}) -> {:p} ({})",
                key,
                old.address,
                old.type_name,
                address,
                type_name
            ),
            None => log::debug!("[instances] '{}' -> {:p} ({})", key, address, type_name),
        }
        Ok(previous)
    }

    /// Publish a `'static` object under its reflected type name.
    pub fn register_static<T: Reflect>(&self, key: &str, object: &'static mut T) -> Result<()> {
        let address = (object as *mut T).cast::<u8>();
        self.register(key, address, T::TYPE_NAME).map(|_| ())
    }

    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<InstanceEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Typed lookup.
    ///
    /// `Ok(None)` when the key is absent; `TypeMismatch` when the entry was
    /// registered as a type other than `T`.
    pub fn lookup_as<T: Reflect>(&self, key: &str) -> Result<Option<*mut T>> {
        let Some(entry) = self.lookup(key) else {
            return Ok(None);
        };
        let matches = entry.type_name() == T::TYPE_NAME
            || type_registry()
                .lookup(entry.type_name())
                .is_some_and(|sd| sd.type_id() == TypeId::of::<T>());
        if !matches {
            return Err(BridgeError::mismatch(T::TYPE_NAME, entry.type_name()));
        }
        Ok(Some(entry.address().cast::<T>()))
    }

    /// Registered keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort_unstable();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The process-wide instance registry.
pub fn instance_registry() -> &'static InstanceRegistry {
    static INSTANCES: OnceLock<InstanceRegistry> = OnceLock::new();
    INSTANCES.get_or_init(InstanceRegistry::new)
}
