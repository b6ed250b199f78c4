//! Process-wide watch registry.
//!
//! Identity-keyed storage for active watches: original object to watch
//! entry, wrapper back to original (so removal-by-wrapper never passes
//! through the wrapper's own trapped operations), an optional name table
//! for scripted re-entry, and per-target ordered tables of watched
//! properties.
//!
//! Handles are non-owning arena indices, so the registry cannot extend any
//! object's lifetime; entries live until they are explicitly removed. No
//! operation here is observable by a watch it stores: every lookup is a
//! plain map access on identities, never a property read.

use super::policy::Policy;
use super::prop::PropShape;
use crate::object::{ObjectHandle, PropertyDescriptor, PropertyKey};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Registry row for a whole-object watch.
#[derive(Debug)]
pub(crate) struct ObjWatchEntry {
    /// The forwarding wrapper handed to the caller.
    pub(crate) wrapper: ObjectHandle,
    /// The resolved policy for this watch.
    pub(crate) policy: Rc<Policy>,
    /// Optional name for scripted lookup.
    pub(crate) name: Option<String>,
}

/// Registry row for a single-property watch.
#[derive(Debug)]
pub(crate) struct PropWatchEntry {
    /// The resolved policy for this watch.
    pub(crate) policy: Rc<Policy>,
    /// Snapshot of the pre-watch descriptor, for reversal.
    pub(crate) saved: PropertyDescriptor,
    /// Which installation shape is active.
    pub(crate) shape: PropShape,
    /// The property name as the caller spelled it, for reporting.
    pub(crate) label: String,
}

/// Identity-keyed storage of all active watches.
#[derive(Debug, Default)]
pub(crate) struct WatchRegistry {
    /// Original object identity -> whole-object watch entry.
    objects: FxHashMap<ObjectHandle, ObjWatchEntry>,
    /// Wrapper identity -> original object identity.
    wrappers: FxHashMap<ObjectHandle, ObjectHandle>,
    /// Registered name -> original object identity.
    names: FxHashMap<String, ObjectHandle>,
    /// Target identity -> watched properties in registration order.
    props: FxHashMap<ObjectHandle, IndexMap<PropertyKey, PropWatchEntry>>,
}

impl WatchRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // -- Whole-object watches ---------------------------------------------

    pub(crate) fn insert_object(&mut self, original: ObjectHandle, entry: ObjWatchEntry) {
        self.wrappers.insert(entry.wrapper, original);
        if let Some(name) = &entry.name {
            self.names.insert(name.clone(), original);
        }
        self.objects.insert(original, entry);
    }

    pub(crate) fn object(&self, original: ObjectHandle) -> Option<&ObjWatchEntry> {
        self.objects.get(&original)
    }

    pub(crate) fn object_policy(&self, original: ObjectHandle) -> Option<Rc<Policy>> {
        self.objects.get(&original).map(|e| Rc::clone(&e.policy))
    }

    /// Resolves either an original or a wrapper handle to the original.
    pub(crate) fn resolve_original(&self, handle: ObjectHandle) -> Option<ObjectHandle> {
        if self.objects.contains_key(&handle) {
            return Some(handle);
        }
        self.wrappers.get(&handle).copied()
    }

    pub(crate) fn original_by_name(&self, name: &str) -> Option<ObjectHandle> {
        self.names.get(name).copied()
    }

    /// Erases a whole-object watch, removing name-table and reverse-lookup
    /// rows in lockstep.
    pub(crate) fn remove_object(&mut self, original: ObjectHandle) -> Option<ObjWatchEntry> {
        let entry = self.objects.remove(&original)?;
        self.wrappers.remove(&entry.wrapper);
        if let Some(name) = &entry.name {
            self.names.remove(name);
        }
        Some(entry)
    }

    // -- Single-property watches ------------------------------------------

    /// Registers a property watch; rejects duplicates for the same
    /// `(target, key)` pair.
    pub(crate) fn insert_prop(
        &mut self,
        target: ObjectHandle,
        key: PropertyKey,
        entry: PropWatchEntry,
    ) -> bool {
        let table = self.props.entry(target).or_default();
        if table.contains_key(&key) {
            return false;
        }
        table.insert(key, entry);
        true
    }

    pub(crate) fn prop(
        &self,
        target: ObjectHandle,
        key: &PropertyKey,
    ) -> Option<&PropWatchEntry> {
        self.props.get(&target).and_then(|table| table.get(key))
    }

    pub(crate) fn prop_watched(&self, target: ObjectHandle, key: &PropertyKey) -> bool {
        self.props
            .get(&target)
            .is_some_and(|table| table.contains_key(key))
    }

    pub(crate) fn remove_prop(
        &mut self,
        target: ObjectHandle,
        key: &PropertyKey,
    ) -> Option<PropWatchEntry> {
        let table = self.props.get_mut(&target)?;
        let entry = table.shift_remove(key)?;
        if table.is_empty() {
            self.props.remove(&target);
        }
        Some(entry)
    }

    /// Watched property labels for a target, in registration order.
    pub(crate) fn watched_prop_labels(&self, target: ObjectHandle) -> Vec<String> {
        self.props
            .get(&target)
            .map(|table| table.values().map(|e| e.label.clone()).collect())
            .unwrap_or_default()
    }
}
