//! Property storage for shader generation.
//!
//! A property is a named signed 32-bit value consulted by template
//! directives, analogous to a preprocessor define with a numeric value.
//! The store keeps its entries sorted by key hash so that identical
//! key/value sets always produce identical combined hashes, no matter in
//! which order they were inserted.
//!
//! # Performance
//!
//! - Insertion/lookup: O(log n) via binary search
//! - Combined hash: O(n), computed lazily and cached
//!
//! # Usage
//!
//! ```rust,ignore
//! use hlms::PropertyStore;
//!
//! let mut props = PropertyStore::new();
//! props.set_property("hlms_normal", 1);
//! props.set_property("hlms_uv_count", 2);
//!
//! // Fast combined hash for shader cache lookup
//! let hash = props.hash();
//! ```

use std::cell::Cell;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::utils::hashing::{self, HASH_SEED};
use crate::utils::interner::{self, Symbol};

/// An interned property name with a stable 32-bit content hash.
///
/// Two keys built from the same string always carry the same hash, within
/// a process and across processes. Ordering and equality go through the
/// hash only, so key comparison never touches string data.
#[derive(Debug, Clone, Copy, Eq)]
pub struct PropertyKey {
    hash: u32,
    sym: Symbol,
}

impl PropertyKey {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            hash: hashing::hash_str(name),
            sym: interner::intern(name),
        }
    }

    /// Stable content hash of the key name.
    #[inline]
    #[must_use]
    pub fn value(&self) -> u32 {
        self.hash
    }

    /// Resolves the key back to its name (for diagnostics).
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        interner::resolve(self.sym)
    }
}

impl PartialEq for PropertyKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Ord for PropertyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl PartialOrd for PropertyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for PropertyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Ordered collection of shader-generation properties.
///
/// Entries are kept sorted by key; at most one entry exists per key and
/// setting an existing key overwrites its value. The combined hash is
/// cached and invalidated (reset to the 0 sentinel) on any mutation.
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    properties: Vec<(PropertyKey, i32)>,
    cached_hash: Cell<u32>,
}

impl PropertyStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            properties: Vec::with_capacity(capacity),
            cached_hash: Cell::new(0),
        }
    }

    /// Inserts or overwrites a property.
    pub fn set_property(&mut self, key: impl Into<PropertyKey>, value: i32) {
        let key = key.into();
        match self.properties.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(idx) => self.properties[idx].1 = value,
            Err(idx) => self.properties.insert(idx, (key, value)),
        }
        self.cached_hash.set(0);
    }

    #[must_use]
    pub fn has_property(&self, key: impl Into<PropertyKey>) -> bool {
        let key = key.into();
        self.properties
            .binary_search_by_key(&key, |&(k, _)| k)
            .is_ok()
    }

    /// Returns the property value, or 0 when absent.
    #[inline]
    #[must_use]
    pub fn get_property(&self, key: impl Into<PropertyKey>) -> i32 {
        self.get_property_or(key, 0)
    }

    /// Returns the property value, or `default` when absent.
    #[must_use]
    pub fn get_property_or(&self, key: impl Into<PropertyKey>, default: i32) -> i32 {
        let key = key.into();
        match self.properties.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(idx) => self.properties[idx].1,
            Err(_) => default,
        }
    }

    /// Removes a property. No-op when the key is absent.
    pub fn remove_property(&mut self, key: impl Into<PropertyKey>) {
        let key = key.into();
        if let Ok(idx) = self.properties.binary_search_by_key(&key, |&(k, _)| k) {
            self.properties.remove(idx);
            self.cached_hash.set(0);
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.properties.clear();
        self.cached_hash.set(0);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterates entries in key-hash order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &(PropertyKey, i32)> {
        self.properties.iter()
    }

    /// Combined hash of the whole store.
    ///
    /// Interleaves each (key hash, value) pair into a flat buffer in
    /// sorted-key order and runs the fixed 32-bit mix over it. An empty
    /// store hashes to 0 exactly. The cached value uses 0 as the "needs
    /// recompute" sentinel, so a store whose true hash is 0 simply
    /// recomputes on every call.
    #[must_use]
    pub fn hash(&self) -> u32 {
        if self.properties.is_empty() {
            return 0;
        }

        let cached = self.cached_hash.get();
        if cached != 0 {
            return cached;
        }

        let mut buffer = Vec::with_capacity(self.properties.len() * 8);
        for &(key, value) in &self.properties {
            buffer.extend_from_slice(&key.value().to_le_bytes());
            buffer.extend_from_slice(&value.to_le_bytes());
        }

        let hash = hashing::murmur3_32(&buffer, HASH_SEED);
        self.cached_hash.set(hash);
        hash
    }
}

impl From<&[(&str, i32)]> for PropertyStore {
    fn from(entries: &[(&str, i32)]) -> Self {
        let mut store = Self::with_capacity(entries.len());
        for &(name, value) in entries {
            store.set_property(name, value);
        }
        store
    }
}
