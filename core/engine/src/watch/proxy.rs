//! Whole-object interception.
//!
//! `watch_obj` constructs a transparent, revocable forwarding wrapper
//! around a target. The wrapper intercepts the full capability set — get,
//! set, has, delete, define, enumerate, invoke, construct — and routes
//! each operation through the policy pipeline before forwarding to the
//! real target for the actual effect. The target's own shape is never
//! touched on this path: interception lives purely at the wrapper
//! boundary, and consumers holding the original handle bypass it
//! entirely.
//!
//! Removal revokes the wrapper (subsequent operations on it report
//! [`EngineError::WrapperRevoked`] and fire no hook) and returns the
//! original object.

use super::context::{OpContext, OpKind};
use super::policy::{Policy, WatchOptions};
use super::registry::ObjWatchEntry;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult, WatchError};
use crate::object::{ObjectHandle, PropertyDescriptor, PropertyKey, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// How a caller refers to an active whole-object watch: by the original
/// handle, by the wrapper it was handed, or by a registered name.
#[derive(Debug, Clone, Copy)]
pub enum WatchRef<'a> {
    /// The original object or its wrapper.
    Object(ObjectHandle),
    /// The name supplied at registration.
    Name(&'a str),
}

impl From<ObjectHandle> for WatchRef<'_> {
    fn from(handle: ObjectHandle) -> Self {
        Self::Object(handle)
    }
}

impl<'a> From<&'a str> for WatchRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl Engine {
    /// Wraps `target` in a forwarding wrapper that intercepts every
    /// structural operation.
    ///
    /// On an invalid target the error is logged and the original handle is
    /// returned unchanged, so callers always receive something usable. If
    /// the target is already watched the existing wrapper is returned and
    /// a warning is logged — re-entry is idempotent, not an error.
    pub fn watch_obj(
        &mut self,
        target: ObjectHandle,
        options: impl Into<WatchOptions>,
    ) -> ObjectHandle {
        self.register_obj_watch(target, options.into(), None)
    }

    /// Like [`watch_obj`](Self::watch_obj), additionally registering
    /// `name` for scripted lookup through [`unwatch_obj`](Self::unwatch_obj).
    pub fn watch_obj_named(
        &mut self,
        target: ObjectHandle,
        options: impl Into<WatchOptions>,
        name: &str,
    ) -> ObjectHandle {
        self.register_obj_watch(target, options.into(), Some(name.to_string()))
    }

    fn register_obj_watch(
        &mut self,
        target: ObjectHandle,
        options: WatchOptions,
        name: Option<String>,
    ) -> ObjectHandle {
        if self.heap.get(target).is_err() {
            log::error!(target: "vigil::watch", "[watch_obj] {}", WatchError::InvalidTarget);
            return target;
        }

        if let Some(entry) = self.registry.object(target) {
            log::warn!(target: "vigil::watch", "[watch_obj] object#{} is already watched", target.index());
            return entry.wrapper;
        }

        let policy = Rc::new(Policy::resolve(options));
        let wrapper = self.heap.alloc_watch_proxy(target);
        self.registry.insert_object(
            target,
            ObjWatchEntry {
                wrapper,
                policy,
                name: name.clone(),
            },
        );

        match &name {
            Some(name) => {
                log::info!(target: "vigil::watch", "[watch_obj] watching object#{} ({name})", target.index());
            }
            None => {
                log::info!(target: "vigil::watch", "[watch_obj] watching object#{}", target.index());
            }
        }
        wrapper
    }

    /// Removes a whole-object watch.
    ///
    /// Accepts the wrapper, the original object, or a registered name;
    /// revokes the wrapper, erases the registry and name-table entries,
    /// and returns the original object. Returns `None` (with a warning)
    /// when the reference does not resolve to an active watch, or when
    /// revocation itself fails — in which case the watch is left intact.
    pub fn unwatch_obj<'a>(&mut self, reference: impl Into<WatchRef<'a>>) -> Option<ObjectHandle> {
        let original = match reference.into() {
            WatchRef::Object(handle) => self.registry.resolve_original(handle),
            WatchRef::Name(name) => self.registry.original_by_name(name),
        };
        let Some(original) = original else {
            log::warn!(target: "vigil::watch", "[unwatch_obj] {}", WatchError::NotWatched("object".to_string()));
            return None;
        };

        // The entry is guaranteed present once the identity resolved.
        let wrapper = self.registry.object(original)?.wrapper;
        if let Err(err) = self.revoke_wrapper(wrapper) {
            let err = WatchError::ReversalFailure(err);
            log::warn!(target: "vigil::watch", "[unwatch_obj] {err}");
            return None;
        }

        self.registry.remove_object(original);
        log::info!(target: "vigil::watch", "[unwatch_obj] released object#{}", original.index());
        Some(original)
    }

    fn revoke_wrapper(&mut self, wrapper: ObjectHandle) -> EngineResult<()> {
        use crate::object::HeapObject;
        match self.heap.get_mut(wrapper)? {
            HeapObject::WatchProxy(proxy) => {
                proxy.target = None;
                Ok(())
            }
            HeapObject::Ordinary(_) => Err(EngineError::ObjectNotFound(wrapper)),
        }
    }

    /// The active policy for a wrapper's target, if any.
    ///
    /// A revoked or unwatched wrapper has none; operations on it fail with
    /// [`EngineError::WrapperRevoked`] before this is consulted.
    fn wrapper_policy(&self, target: ObjectHandle) -> Option<Rc<Policy>> {
        self.registry.object_policy(target)
    }

    // -- Capability traps --------------------------------------------------
    //
    // Every trap shares the same template: resolve the (unrevoked) target,
    // build the context, run the pipeline, forward through the engine's
    // generic operations — so a watched property on the target, or a
    // nested wrapper, still fires — and report the result. Writes forward
    // to the target directly rather than re-entering the wrapper's own
    // write path.

    pub(crate) fn proxied_get(
        &mut self,
        wrapper: ObjectHandle,
        key: &PropertyKey,
    ) -> EngineResult<Value> {
        let target = self.resolve_wrapper_target(wrapper)?;
        let Some(policy) = self.wrapper_policy(target) else {
            return self.get(target, key);
        };
        let ctx = OpContext::new(OpKind::Get, target).with_key(key.clone());
        let key = key.clone();
        self.run_watched_op(&policy, ctx, move |e, _ctx| e.get(target, &key))
    }

    pub(crate) fn proxied_set(
        &mut self,
        wrapper: ObjectHandle,
        key: &PropertyKey,
        value: Value,
    ) -> EngineResult<bool> {
        let target = self.resolve_wrapper_target(wrapper)?;
        let Some(policy) = self.wrapper_policy(target) else {
            return self.set(target, key, value);
        };
        let old_value = self.get(target, key)?;
        let ctx = OpContext::new(OpKind::Set, target)
            .with_key(key.clone())
            .with_old_value(old_value)
            .with_new_value(value.clone());
        let key = key.clone();
        let inner_policy = Rc::clone(&policy);
        self.run_watched_op(&policy, ctx, move |e, ctx| {
            let stored = e.transformed_write(&inner_policy, ctx, value);
            e.set(target, &key, stored)?;
            Ok(Value::Bool(true))
        })?;
        Ok(true)
    }

    pub(crate) fn proxied_has(
        &mut self,
        wrapper: ObjectHandle,
        key: &PropertyKey,
    ) -> EngineResult<bool> {
        let target = self.resolve_wrapper_target(wrapper)?;
        let Some(policy) = self.wrapper_policy(target) else {
            return self.has(target, key);
        };
        let ctx = OpContext::new(OpKind::Has, target).with_key(key.clone());
        let key = key.clone();
        let result = self.run_watched_op(&policy, ctx, move |e, _ctx| {
            Ok(Value::Bool(e.has(target, &key)?))
        })?;
        Ok(result == Value::Bool(true))
    }

    pub(crate) fn proxied_delete(
        &mut self,
        wrapper: ObjectHandle,
        key: &PropertyKey,
    ) -> EngineResult<bool> {
        let target = self.resolve_wrapper_target(wrapper)?;
        let Some(policy) = self.wrapper_policy(target) else {
            return self.delete(target, key);
        };
        let old_value = self.get(target, key)?;
        let ctx = OpContext::new(OpKind::Delete, target)
            .with_key(key.clone())
            .with_old_value(old_value);
        let key = key.clone();
        self.run_watched_op(&policy, ctx, move |e, _ctx| {
            Ok(Value::Bool(e.delete(target, &key)?))
        })?;
        Ok(true)
    }

    pub(crate) fn proxied_define(
        &mut self,
        wrapper: ObjectHandle,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> EngineResult<bool> {
        let target = self.resolve_wrapper_target(wrapper)?;
        let Some(policy) = self.wrapper_policy(target) else {
            return self.define_property(target, key, desc);
        };
        let mut ctx = OpContext::new(OpKind::DefineProperty, target).with_key(key.clone());
        if let Some(value) = desc.value() {
            ctx = ctx.with_new_value(value.clone());
        }
        let key = key.clone();
        self.run_watched_op(&policy, ctx, move |e, _ctx| {
            Ok(Value::Bool(e.define_property(target, &key, desc)?))
        })?;
        Ok(true)
    }

    pub(crate) fn proxied_own_keys(
        &mut self,
        wrapper: ObjectHandle,
    ) -> EngineResult<Vec<PropertyKey>> {
        let target = self.resolve_wrapper_target(wrapper)?;
        let Some(policy) = self.wrapper_policy(target) else {
            return self.own_keys(target);
        };
        let ctx = OpContext::new(OpKind::OwnKeys, target);
        // The pipeline result is a value, so the context carries the key
        // count; the keys themselves travel through this side channel.
        let collected: Rc<RefCell<Vec<PropertyKey>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&collected);
        self.run_watched_op(&policy, ctx, move |e, _ctx| {
            let keys = e.own_keys(target)?;
            let count = keys.len() as i64;
            *sink.borrow_mut() = keys;
            Ok(Value::Int(count))
        })?;
        Ok(collected.take())
    }

    pub(crate) fn proxied_invoke(
        &mut self,
        wrapper: ObjectHandle,
        this: &Value,
        args: &[Value],
    ) -> EngineResult<Value> {
        let target = self.resolve_wrapper_target(wrapper)?;
        let Some(policy) = self.wrapper_policy(target) else {
            return self.invoke(target, this, args);
        };
        let ctx = OpContext::new(OpKind::Call, target).with_arguments(args);
        let this = this.clone();
        let args = args.to_vec();
        self.run_watched_op(&policy, ctx, move |e, _ctx| {
            e.invoke(target, &this, &args)
        })
    }

    pub(crate) fn proxied_construct(
        &mut self,
        wrapper: ObjectHandle,
        args: &[Value],
    ) -> EngineResult<Value> {
        let target = self.resolve_wrapper_target(wrapper)?;
        let Some(policy) = self.wrapper_policy(target) else {
            return self.construct(target, args);
        };
        let ctx = OpContext::new(OpKind::Construct, target).with_arguments(args);
        let args = args.to_vec();
        self.run_watched_op(&policy, ctx, move |e, _ctx| e.construct(target, &args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_target_returns_the_input_unchanged() {
        let mut engine = Engine::new();
        let bogus = ObjectHandle(42);
        assert_eq!(engine.watch_obj(bogus, false), bogus);
    }

    #[test]
    fn rewatching_returns_the_identical_wrapper() {
        let mut engine = Engine::new();
        let target = engine.alloc_object();
        let first = engine.watch_obj(target, WatchOptions::default().with_log(false));
        let second = engine.watch_obj(target, WatchOptions::default().with_log(false));
        assert_eq!(first, second);
    }

    #[test]
    fn wrapper_shares_the_target_backing_storage() {
        let mut engine = Engine::new();
        let target = engine.alloc_object();
        engine.set(target, &"x".into(), Value::Int(1)).unwrap();
        let wrapper = engine.watch_obj(target, WatchOptions::default().with_log(false));

        assert!(engine.set(wrapper, &"x".into(), Value::Int(2)).unwrap());
        assert_eq!(engine.get(wrapper, &"x".into()).unwrap(), Value::Int(2));
        assert_eq!(engine.get(target, &"x".into()).unwrap(), Value::Int(2));
    }

    #[test]
    fn unwatch_by_wrapper_original_or_name() {
        let mut engine = Engine::new();

        let a = engine.alloc_object();
        let wrapper_a = engine.watch_obj(a, WatchOptions::default().with_log(false));
        assert_eq!(engine.unwatch_obj(wrapper_a), Some(a));

        let b = engine.alloc_object();
        engine.watch_obj(b, WatchOptions::default().with_log(false));
        assert_eq!(engine.unwatch_obj(b), Some(b));

        let c = engine.alloc_object();
        engine.watch_obj_named(c, WatchOptions::default().with_log(false), "session");
        assert_eq!(engine.unwatch_obj("session"), Some(c));
        assert_eq!(engine.unwatch_obj("session"), None);
    }

    #[test]
    fn revoked_wrapper_is_inert() {
        let mut engine = Engine::new();
        let target = engine.alloc_object();
        engine.set(target, &"x".into(), Value::Int(1)).unwrap();
        let wrapper = engine.watch_obj(target, WatchOptions::default().with_log(false));
        engine.unwatch_obj(wrapper).unwrap();

        assert_eq!(
            engine.get(wrapper, &"x".into()),
            Err(EngineError::WrapperRevoked)
        );
        // The original is unaffected.
        assert_eq!(engine.get(target, &"x".into()).unwrap(), Value::Int(1));
    }

    #[test]
    fn delete_and_define_report_fixed_success() {
        let mut engine = Engine::new();
        let target = engine.alloc_object();
        engine
            .define_property(
                target,
                &"pinned".into(),
                PropertyDescriptor::Data {
                    value: Value::Int(1),
                    writable: true,
                    enumerable: true,
                    configurable: false,
                },
            )
            .unwrap();
        let wrapper = engine.watch_obj(target, WatchOptions::default().with_log(false));

        // Forwarded deletion is rejected by the target, but the wrapper
        // reports the fixed success indicator.
        assert!(engine.delete(wrapper, &"pinned".into()).unwrap());
        assert!(engine.has(target, &"pinned".into()).unwrap());
    }

    #[test]
    fn own_keys_pass_through_in_order() {
        let mut engine = Engine::new();
        let target = engine.alloc_object();
        for name in ["b", "a", "c"] {
            engine.set(target, &name.into(), Value::Int(0)).unwrap();
        }
        let wrapper = engine.watch_obj(target, WatchOptions::default().with_log(false));
        let keys: Vec<String> = engine
            .own_keys(wrapper)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }
}
