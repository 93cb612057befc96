//! One-shot lazy hydration of remote-backed fields
//!
//! A [`LazyRecord`] guards a typed [`FieldTable`] with a single hydration flag. The first
//! read runs the hydration callback, which returns every field it could populate at once;
//! those values are applied with first-write-wins semantics so anything written earlier
//! (for example by a state transition) is kept. Fields the remote record left out stay
//! unset and never cause a second fetch.

use crate::error::Result;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use tracing::{debug, trace};

/// Typed per-entity field table with a set-if-absent contract
#[derive(Debug, Clone)]
pub struct FieldTable<K, V> {
    values: HashMap<K, V>,
}

impl<K, V> Default for FieldTable<K, V> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<K, V> FieldTable<K, V>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key`, if any write happened
    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    /// Whether `key` holds a value
    pub fn is_set(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    /// Record `value` unconditionally
    pub fn set(&mut self, key: K, value: V) {
        self.values.insert(key, value);
    }

    /// Record `value` only if `key` is still unset
    ///
    /// Returns `true` if the write took effect.
    pub fn set_if_absent(&mut self, key: K, value: V) -> bool {
        if self.values.contains_key(&key) {
            trace!(field = ?key, "field already set, keeping first value");
            return false;
        }
        self.values.insert(key, value);
        true
    }

    /// Number of set fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A [`FieldTable`] hydrated at most once from a remote record
#[derive(Debug, Clone)]
pub struct LazyRecord<K, V> {
    fields: FieldTable<K, V>,
    hydrated: bool,
}

impl<K, V> Default for LazyRecord<K, V> {
    fn default() -> Self {
        Self {
            fields: FieldTable::default(),
            hydrated: false,
        }
    }
}

impl<K, V> LazyRecord<K, V>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Create an unhydrated record
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether hydration has been attempted
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Run `hydrate` unless it already ran
    ///
    /// The callback yields `(field, value)` pairs which are applied with
    /// [`FieldTable::set_if_absent`]. The flag is set before the callback runs, so a
    /// failed hydration is reported once and never repeated; fields it would have filled
    /// stay unset.
    pub async fn ensure_hydrated<F, Fut>(&mut self, hydrate: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<(K, V)>>>,
    {
        if self.hydrated {
            return Ok(());
        }

        self.hydrated = true;
        let values = hydrate().await?;
        let mut applied = 0usize;
        for (key, value) in values {
            if self.fields.set_if_absent(key, value) {
                applied += 1;
            }
        }
        debug!(applied, "record hydrated");
        Ok(())
    }

    /// Hydrate if needed, then read `key`
    pub async fn read<F, Fut>(&mut self, key: K, hydrate: F) -> Result<Option<&V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<(K, V)>>>,
    {
        self.ensure_hydrated(hydrate).await?;
        Ok(self.fields.get(&key))
    }

    /// Read `key` without triggering hydration
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.fields.get(key)
    }

    /// Raw write; does not look at the hydration state
    pub fn set(&mut self, key: K, value: V) {
        self.fields.set(key, value);
    }

    /// First-write-wins write; does not look at the hydration state
    pub fn set_if_absent(&mut self, key: K, value: V) -> bool {
        self.fields.set_if_absent(key, value)
    }
}
