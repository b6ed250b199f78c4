//! The engine: object heap, native-function table, watch registry and
//! host hooks behind one entry point.
//!
//! Every structural operation (get, set, has, delete, define, enumerate,
//! invoke, construct) is an [`Engine`] method. On an ordinary object the
//! operation hits the heap directly, invoking accessors where present; on
//! a watch wrapper it routes through the policy pipeline first and then
//! forwards to the real target.

use crate::error::{EngineError, EngineResult};
use crate::object::{
    FunctionId, Heap, HeapObject, ObjectHandle, PropertyDescriptor, PropertyKey, SymbolId, Value,
};
use crate::watch::hooks::{LogWatchHooks, WatchHooks};
use crate::watch::registry::WatchRegistry;
use std::fmt;
use std::rc::Rc;

/// A native function: receives the engine, the receiver and the argument
/// list, and produces a value.
pub type NativeFn = Rc<dyn Fn(&mut Engine, &Value, &[Value]) -> EngineResult<Value>>;

/// The object-watch engine.
///
/// Owns the object heap, the native-function table, the process-wide watch
/// registry and the installed [`WatchHooks`]. Single-threaded and
/// synchronous: every interception runs to completion on the caller's
/// thread before the triggering operation returns.
pub struct Engine {
    pub(crate) heap: Heap,
    pub(crate) fns: Vec<NativeFn>,
    pub(crate) registry: WatchRegistry,
    pub(crate) watch_hooks: Rc<dyn WatchHooks>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("heap", &self.heap)
            .field("functions", &self.fns.len())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the default host hooks (no debugger attached,
    /// watch lines forwarded to the `log` facade).
    pub fn new() -> Self {
        Self {
            heap: Heap::new(),
            fns: Vec::new(),
            registry: WatchRegistry::new(),
            watch_hooks: Rc::new(LogWatchHooks),
        }
    }

    /// Replaces the host hooks (debugger attention + log sink).
    pub fn set_watch_hooks(&mut self, hooks: Rc<dyn WatchHooks>) {
        self.watch_hooks = hooks;
    }

    // -- Allocation --------------------------------------------------------

    /// Allocates a fresh ordinary object.
    pub fn alloc_object(&mut self) -> ObjectHandle {
        self.heap.alloc()
    }

    /// Registers a native function and returns its id.
    pub fn register_fn<F>(&mut self, f: F) -> FunctionId
    where
        F: Fn(&mut Engine, &Value, &[Value]) -> EngineResult<Value> + 'static,
    {
        let id = FunctionId(self.fns.len() as u32);
        self.fns.push(Rc::new(f));
        id
    }

    /// Allocates a callable object backed by `function`.
    pub fn alloc_function(&mut self, function: FunctionId) -> ObjectHandle {
        self.heap.alloc_callable(function, false)
    }

    /// Allocates a constructable object backed by `function`.
    pub fn alloc_constructor(&mut self, function: FunctionId) -> ObjectHandle {
        self.heap.alloc_callable(function, true)
    }

    /// Allocates a symbol with the given description.
    pub fn alloc_symbol(&mut self, description: &str) -> SymbolId {
        self.heap.alloc_symbol(description)
    }

    /// Renders a key the way callers name it (symbols as `Symbol(desc)`).
    pub fn display_key(&self, key: &PropertyKey) -> String {
        self.heap.display_key(key)
    }

    // -- Structural operations --------------------------------------------

    /// Reads a property. Routes through the watch pipeline when `target`
    /// is a wrapper.
    pub fn get(&mut self, target: ObjectHandle, key: &PropertyKey) -> EngineResult<Value> {
        if self.heap.is_watch_proxy(target) {
            return self.proxied_get(target, key);
        }
        self.ordinary_get(target, key)
    }

    /// Writes a property. Returns whether the write took effect (a wrapper
    /// always reports success once it has forwarded).
    pub fn set(
        &mut self,
        target: ObjectHandle,
        key: &PropertyKey,
        value: Value,
    ) -> EngineResult<bool> {
        if self.heap.is_watch_proxy(target) {
            return self.proxied_set(target, key, value);
        }
        self.ordinary_set(target, key, value)
    }

    /// Checks whether the target has an own property `key`.
    pub fn has(&mut self, target: ObjectHandle, key: &PropertyKey) -> EngineResult<bool> {
        if self.heap.is_watch_proxy(target) {
            return self.proxied_has(target, key);
        }
        self.ordinary_has(target, key)
    }

    /// Deletes a property.
    pub fn delete(&mut self, target: ObjectHandle, key: &PropertyKey) -> EngineResult<bool> {
        if self.heap.is_watch_proxy(target) {
            return self.proxied_delete(target, key);
        }
        self.ordinary_delete(target, key)
    }

    /// Defines or redefines a property with an explicit descriptor.
    pub fn define_property(
        &mut self,
        target: ObjectHandle,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> EngineResult<bool> {
        if self.heap.is_watch_proxy(target) {
            return self.proxied_define(target, key, desc);
        }
        self.ordinary_define(target, key, desc)
    }

    /// Enumerates own property keys in insertion order.
    pub fn own_keys(&mut self, target: ObjectHandle) -> EngineResult<Vec<PropertyKey>> {
        if self.heap.is_watch_proxy(target) {
            return self.proxied_own_keys(target);
        }
        self.ordinary_own_keys(target)
    }

    /// Invokes a callable object.
    pub fn invoke(
        &mut self,
        target: ObjectHandle,
        this: &Value,
        args: &[Value],
    ) -> EngineResult<Value> {
        if self.heap.is_watch_proxy(target) {
            return self.proxied_invoke(target, this, args);
        }
        self.ordinary_invoke(target, this, args)
    }

    /// Invokes a constructable object with a freshly allocated receiver.
    pub fn construct(&mut self, target: ObjectHandle, args: &[Value]) -> EngineResult<Value> {
        if self.heap.is_watch_proxy(target) {
            return self.proxied_construct(target, args);
        }
        self.ordinary_construct(target, args)
    }

    /// Calls any callable value.
    pub fn call_value(
        &mut self,
        callee: &Value,
        this: &Value,
        args: &[Value],
    ) -> EngineResult<Value> {
        match callee {
            Value::Function(id) => self.call_function(*id, this, args),
            Value::Object(h) => self.invoke(*h, this, args),
            _ => Err(EngineError::NotCallable),
        }
    }

    /// Reads a property and calls it as a method with the target as
    /// receiver.
    pub fn call_method(
        &mut self,
        target: ObjectHandle,
        key: &PropertyKey,
        args: &[Value],
    ) -> EngineResult<Value> {
        let callee = self.get(target, key)?;
        self.call_value(&callee, &Value::Object(target), args)
    }

    // -- Ordinary paths ----------------------------------------------------

    pub(crate) fn ordinary_get(
        &mut self,
        target: ObjectHandle,
        key: &PropertyKey,
    ) -> EngineResult<Value> {
        let desc = self.heap.ordinary(target)?.own(key).cloned();
        match desc {
            None => Ok(Value::Undefined),
            Some(PropertyDescriptor::Data { value, .. }) => Ok(value),
            Some(PropertyDescriptor::Accessor { get: Some(id), .. }) => {
                self.call_function(id, &Value::Object(target), &[])
            }
            Some(PropertyDescriptor::Accessor { get: None, .. }) => Ok(Value::Undefined),
        }
    }

    pub(crate) fn ordinary_set(
        &mut self,
        target: ObjectHandle,
        key: &PropertyKey,
        value: Value,
    ) -> EngineResult<bool> {
        let desc = self.heap.ordinary(target)?.own(key).cloned();
        match desc {
            Some(PropertyDescriptor::Accessor { set: Some(id), .. }) => {
                self.call_function(id, &Value::Object(target), &[value])?;
                Ok(true)
            }
            Some(PropertyDescriptor::Accessor { set: None, .. }) => Ok(false),
            Some(PropertyDescriptor::Data {
                writable,
                enumerable,
                configurable,
                ..
            }) => {
                if !writable {
                    return Ok(false);
                }
                let obj = self.heap.ordinary_mut(target)?;
                obj.properties.insert(
                    key.clone(),
                    PropertyDescriptor::Data {
                        value,
                        writable,
                        enumerable,
                        configurable,
                    },
                );
                Ok(true)
            }
            None => {
                let obj = self.heap.ordinary_mut(target)?;
                if !obj.extensible {
                    return Ok(false);
                }
                obj.properties
                    .insert(key.clone(), PropertyDescriptor::data(value));
                Ok(true)
            }
        }
    }

    pub(crate) fn ordinary_has(
        &self,
        target: ObjectHandle,
        key: &PropertyKey,
    ) -> EngineResult<bool> {
        Ok(self.heap.ordinary(target)?.own(key).is_some())
    }

    pub(crate) fn ordinary_delete(
        &mut self,
        target: ObjectHandle,
        key: &PropertyKey,
    ) -> EngineResult<bool> {
        Ok(self.heap.ordinary_mut(target)?.delete(key))
    }

    pub(crate) fn ordinary_define(
        &mut self,
        target: ObjectHandle,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> EngineResult<bool> {
        Ok(self.heap.ordinary_mut(target)?.define(key.clone(), desc))
    }

    pub(crate) fn ordinary_own_keys(&self, target: ObjectHandle) -> EngineResult<Vec<PropertyKey>> {
        Ok(self.heap.ordinary(target)?.own_keys())
    }

    pub(crate) fn ordinary_invoke(
        &mut self,
        target: ObjectHandle,
        this: &Value,
        args: &[Value],
    ) -> EngineResult<Value> {
        let id = self
            .heap
            .ordinary(target)?
            .function
            .ok_or(EngineError::NotCallable)?;
        self.call_function(id, this, args)
    }

    pub(crate) fn ordinary_construct(
        &mut self,
        target: ObjectHandle,
        args: &[Value],
    ) -> EngineResult<Value> {
        let obj = self.heap.ordinary(target)?;
        let id = obj.function.ok_or(EngineError::NotConstructable)?;
        if !obj.constructable {
            return Err(EngineError::NotConstructable);
        }
        let receiver = self.heap.alloc();
        let result = self.call_function(id, &Value::Object(receiver), args)?;
        // A constructor returning an object overrides the fresh receiver.
        if result.is_object() {
            Ok(result)
        } else {
            Ok(Value::Object(receiver))
        }
    }

    /// Calls an entry of the native-function table.
    pub(crate) fn call_function(
        &mut self,
        id: FunctionId,
        this: &Value,
        args: &[Value],
    ) -> EngineResult<Value> {
        let f = self
            .fns
            .get(id.0 as usize)
            .cloned()
            .ok_or(EngineError::FunctionNotFound(id.0))?;
        f(self, this, args)
    }

    // -- Raw bookkeeping accessors ----------------------------------------
    //
    // These never invoke accessors or traps; the interceptors and the
    // registry use only these so that internal reads can never re-enter a
    // watched path.

    pub(crate) fn raw_descriptor(
        &self,
        target: ObjectHandle,
        key: &PropertyKey,
    ) -> EngineResult<Option<PropertyDescriptor>> {
        Ok(self.heap.ordinary(target)?.own(key).cloned())
    }

    pub(crate) fn raw_install(
        &mut self,
        target: ObjectHandle,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> EngineResult<()> {
        self.heap
            .ordinary_mut(target)?
            .properties
            .insert(key.clone(), desc);
        Ok(())
    }

    pub(crate) fn resolve_wrapper_target(
        &self,
        wrapper: ObjectHandle,
    ) -> EngineResult<ObjectHandle> {
        match self.heap.get(wrapper)? {
            HeapObject::WatchProxy(p) => p.target(),
            HeapObject::Ordinary(_) => Err(EngineError::ObjectNotFound(wrapper)),
        }
    }
}
