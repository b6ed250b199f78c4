//! Single-property interception.
//!
//! `watch_prop` rewrites one named member of one target in place, so every
//! get/set/call on that property flows through the policy pipeline before
//! and after reaching the original behavior. The target's identity is
//! preserved — no wrapper object is introduced on this path.
//!
//! Installation branches on the property's current shape, and reversal
//! restores the exact pre-watch shape:
//!
//! - **Method**: a function-valued data property is replaced with a
//!   wrapper function of the same call signature.
//! - **Accessor**: an existing getter/setter pair is wrapped pairwise.
//! - **Data**: a plain value is replaced by a synthesized accessor pair
//!   closing over a private slot holding the current value.
//!
//! All registration-time failures are non-throwing: they are reported
//! through the logging sink and surface as a sentinel `None`/`false`.

use super::context::{OpContext, OpKind};
use super::policy::{Policy, WatchOptions};
use super::registry::PropWatchEntry;
use crate::engine::Engine;
use crate::error::WatchError;
use crate::object::{FunctionId, ObjectHandle, PropertyDescriptor, PropertyKey, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// The active installation shape of a watched property.
///
/// Each shape has its own install and restore transition; restoration uses
/// the descriptor snapshot taken before mutating, never an assumed
/// canonical prior shape.
#[derive(Debug)]
pub(crate) enum PropShape {
    /// Plain data property, now backed by a private slot.
    Data {
        /// The slot holding the live value while the watch is installed.
        slot: Rc<RefCell<Value>>,
    },
    /// Pre-existing accessor pair, wrapped in place.
    Accessor,
    /// Function-valued property, replaced by a wrapper function.
    Method,
}

impl Engine {
    /// Watches one property of `target`.
    ///
    /// `property` names an own property: a plain string key, or the
    /// `"Symbol(desc)"` spelling of a symbol key that exists on the
    /// target. `options` may be a [`WatchOptions`] or a bare boolean (the
    /// legacy breakpoint shorthand).
    ///
    /// On success the resolved [`Policy`] is returned. Every failure —
    /// invalid target, empty or malformed name, missing own property,
    /// non-configurable descriptor, or an already-watched pair — is logged
    /// at error severity and reported as `None`, leaving the target
    /// untouched.
    pub fn watch_prop(
        &mut self,
        target: ObjectHandle,
        property: &str,
        options: impl Into<WatchOptions>,
    ) -> Option<Rc<Policy>> {
        match self.try_watch_prop(target, property, options.into()) {
            Ok(policy) => Some(policy),
            Err(err) => {
                log::error!(target: "vigil::watch", "[watch_prop] {err}");
                None
            }
        }
    }

    fn try_watch_prop(
        &mut self,
        target: ObjectHandle,
        property: &str,
        options: WatchOptions,
    ) -> Result<Rc<Policy>, WatchError> {
        if self.heap.ordinary(target).is_err() {
            return Err(WatchError::InvalidTarget);
        }

        let key = self.resolve_prop_key(target, property)?;
        let label = self.heap.display_key(&key);

        let saved = self
            .raw_descriptor(target, &key)
            .map_err(|_| WatchError::InvalidTarget)?
            .ok_or_else(|| WatchError::PropertyNotFound(label.clone()))?;
        if !saved.is_configurable() {
            return Err(WatchError::NotConfigurable(label.clone()));
        }
        if self.registry.prop_watched(target, &key) {
            return Err(WatchError::AlreadyWatched(label.clone()));
        }

        let policy = Rc::new(Policy::resolve(options));
        let shape = match &saved {
            PropertyDescriptor::Data {
                value: Value::Function(original),
                writable,
                enumerable,
                configurable,
            } => {
                let wrapper =
                    self.install_method_wrapper(target, key.clone(), *original, &policy);
                let desc = PropertyDescriptor::Data {
                    value: Value::Function(wrapper),
                    writable: *writable,
                    enumerable: *enumerable,
                    configurable: *configurable,
                };
                self.raw_install(target, &key, desc)
                    .map_err(|_| WatchError::InvalidTarget)?;
                PropShape::Method
            }
            PropertyDescriptor::Accessor {
                get,
                set,
                enumerable,
                configurable,
            } => {
                let wrapped_get = get
                    .map(|original| self.install_get_wrapper(target, key.clone(), original, &policy));
                let wrapped_set = set.map(|original| {
                    self.install_set_wrapper(target, key.clone(), *get, original, &policy)
                });
                let desc = PropertyDescriptor::Accessor {
                    get: wrapped_get,
                    set: wrapped_set,
                    enumerable: *enumerable,
                    configurable: *configurable,
                };
                self.raw_install(target, &key, desc)
                    .map_err(|_| WatchError::InvalidTarget)?;
                PropShape::Accessor
            }
            PropertyDescriptor::Data { value, .. } => {
                let slot = Rc::new(RefCell::new(value.clone()));
                let getter = self.install_slot_getter(target, key.clone(), &slot, &policy);
                let setter = self.install_slot_setter(target, key.clone(), &slot, &policy);
                let desc = PropertyDescriptor::accessor(Some(getter), Some(setter));
                self.raw_install(target, &key, desc)
                    .map_err(|_| WatchError::InvalidTarget)?;
                PropShape::Data { slot }
            }
        };

        self.registry.insert_prop(
            target,
            key,
            PropWatchEntry {
                policy: Rc::clone(&policy),
                saved,
                shape,
                label,
            },
        );
        Ok(policy)
    }

    /// Removes a property watch, restoring the pre-watch shape.
    ///
    /// For a data property the restored descriptor carries the slot's
    /// current value, so writes made while watched survive removal; the
    /// pre-watch flags and any original accessor pair or function value
    /// are restored from the snapshot. Returns `false` (with a warning)
    /// when nothing is registered for the pair, or when reversal itself
    /// fails — in which case the prior interception state is left intact.
    pub fn unwatch_prop(&mut self, target: ObjectHandle, property: &str) -> bool {
        let key = match self.resolve_prop_key(target, property) {
            Ok(key) => key,
            Err(_) => {
                let err = WatchError::NotWatched(property.to_string());
                log::warn!(target: "vigil::watch", "[unwatch_prop] {err}");
                return false;
            }
        };

        let Some(entry) = self.registry.prop(target, &key) else {
            let err = WatchError::NotWatched(self.heap.display_key(&key));
            log::warn!(target: "vigil::watch", "[unwatch_prop] {err}");
            return false;
        };

        let restored = match (&entry.shape, &entry.saved) {
            (
                PropShape::Data { slot },
                PropertyDescriptor::Data {
                    writable,
                    enumerable,
                    configurable,
                    ..
                },
            ) => PropertyDescriptor::Data {
                value: slot.borrow().clone(),
                writable: *writable,
                enumerable: *enumerable,
                configurable: *configurable,
            },
            _ => entry.saved.clone(),
        };

        match self.raw_install(target, &key, restored) {
            Ok(()) => {
                self.registry.remove_prop(target, &key);
                true
            }
            Err(engine_err) => {
                let err = WatchError::ReversalFailure(engine_err);
                log::warn!(target: "vigil::watch", "[unwatch_prop] {err}");
                false
            }
        }
    }

    /// The properties currently watched on `target`, in registration
    /// order. Empty when none are.
    pub fn get_watched_props(&self, target: ObjectHandle) -> Vec<String> {
        self.registry.watched_prop_labels(target)
    }

    // -- Key resolution ----------------------------------------------------

    /// Decodes a caller-spelled property name into a key.
    ///
    /// The `"Symbol(desc)"` spelling (quotes tolerated) is matched against
    /// the target's own symbol keys; anything else is a string key.
    fn resolve_prop_key(
        &self,
        target: ObjectHandle,
        property: &str,
    ) -> Result<PropertyKey, WatchError> {
        let name = property.trim();
        if name.is_empty() {
            return Err(WatchError::InvalidProperty);
        }

        if name.starts_with("Symbol(") {
            let cleaned: String = name.chars().filter(|c| *c != '"' && *c != '\'').collect();
            let obj = self
                .heap
                .ordinary(target)
                .map_err(|_| WatchError::InvalidTarget)?;
            return obj
                .own_keys()
                .into_iter()
                .filter(|key| matches!(key, PropertyKey::Symbol(_)))
                .find(|key| self.heap.display_key(key) == cleaned)
                .ok_or_else(|| WatchError::PropertyNotFound(cleaned));
        }

        Ok(PropertyKey::String(name.to_string()))
    }

    // -- Wrapper installation ----------------------------------------------

    fn install_method_wrapper(
        &mut self,
        target: ObjectHandle,
        key: PropertyKey,
        original: FunctionId,
        policy: &Rc<Policy>,
    ) -> FunctionId {
        let policy = Rc::clone(policy);
        self.register_fn(move |engine, this, args| {
            let ctx = OpContext::new(OpKind::Call, target)
                .with_key(key.clone())
                .with_arguments(args);
            let this = this.clone();
            let args = args.to_vec();
            engine.run_watched_op(&policy, ctx, move |e, _ctx| {
                e.call_function(original, &this, &args)
            })
        })
    }

    fn install_get_wrapper(
        &mut self,
        target: ObjectHandle,
        key: PropertyKey,
        original: FunctionId,
        policy: &Rc<Policy>,
    ) -> FunctionId {
        let policy = Rc::clone(policy);
        self.register_fn(move |engine, this, _args| {
            let ctx = OpContext::new(OpKind::Get, target).with_key(key.clone());
            let this = this.clone();
            engine.run_watched_op(&policy, ctx, move |e, _ctx| {
                e.call_function(original, &this, &[])
            })
        })
    }

    fn install_set_wrapper(
        &mut self,
        target: ObjectHandle,
        key: PropertyKey,
        original_get: Option<FunctionId>,
        original_set: FunctionId,
        policy: &Rc<Policy>,
    ) -> FunctionId {
        let policy = Rc::clone(policy);
        self.register_fn(move |engine, this, args| {
            let new_value = args.first().cloned().unwrap_or_default();
            // Old value via the original getter when one exists.
            let old_value = match original_get {
                Some(getter) => engine.call_function(getter, this, &[])?,
                None => Value::Undefined,
            };

            let ctx = OpContext::new(OpKind::Set, target)
                .with_key(key.clone())
                .with_old_value(old_value)
                .with_new_value(new_value.clone());
            let this = this.clone();
            let inner_policy = Rc::clone(&policy);
            engine.run_watched_op(&policy, ctx, move |e, ctx| {
                let stored = e.transformed_write(&inner_policy, ctx, new_value);
                e.call_function(original_set, &this, &[stored])?;
                Ok(Value::Bool(true))
            })?;
            Ok(Value::Undefined)
        })
    }

    fn install_slot_getter(
        &mut self,
        target: ObjectHandle,
        key: PropertyKey,
        slot: &Rc<RefCell<Value>>,
        policy: &Rc<Policy>,
    ) -> FunctionId {
        let policy = Rc::clone(policy);
        let slot = Rc::clone(slot);
        self.register_fn(move |engine, _this, _args| {
            let current = slot.borrow().clone();
            let ctx = OpContext::new(OpKind::Get, target)
                .with_key(key.clone())
                .with_old_value(current.clone());
            engine.run_watched_op(&policy, ctx, move |_e, _ctx| Ok(current))
        })
    }

    fn install_slot_setter(
        &mut self,
        target: ObjectHandle,
        key: PropertyKey,
        slot: &Rc<RefCell<Value>>,
        policy: &Rc<Policy>,
    ) -> FunctionId {
        let policy = Rc::clone(policy);
        let slot = Rc::clone(slot);
        self.register_fn(move |engine, _this, args| {
            let new_value = args.first().cloned().unwrap_or_default();
            let old_value = slot.borrow().clone();
            let ctx = OpContext::new(OpKind::Set, target)
                .with_key(key.clone())
                .with_old_value(old_value)
                .with_new_value(new_value.clone());
            let slot = Rc::clone(&slot);
            let inner_policy = Rc::clone(&policy);
            engine.run_watched_op(&policy, ctx, move |e, ctx| {
                let stored = e.transformed_write(&inner_policy, ctx, new_value);
                *slot.borrow_mut() = stored;
                Ok(Value::Bool(true))
            })?;
            Ok(Value::Undefined)
        })
    }
}
