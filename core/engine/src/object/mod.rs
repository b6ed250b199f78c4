//! The dynamic object model backing the watch engine.
//!
//! Interception of arbitrary property access is only expressible against a
//! dynamic object system, so the engine hosts a small one: a handle-based
//! arena of objects with property tables, data/accessor descriptors,
//! string-or-symbol keys, and revocable watch-proxy objects.
//!
//! Own-property tables keep insertion order, which is observable through
//! the enumerate capability and through the registration order reported by
//! `get_watched_props`.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Opaque handle addressing an object on the heap.
///
/// Handles are non-owning indices: holding one (in the watch registry or
/// anywhere else) never extends an object's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectHandle(pub(crate) u32);

impl ObjectHandle {
    /// The arena index of this handle.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Identifier of a native function in the engine's function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionId(pub(crate) u32);

/// Unique symbol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolId(pub(crate) u32);

/// A property key: either a string or a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String key.
    String(String),
    /// Symbol key (references the engine's symbol table).
    Symbol(SymbolId),
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Symbol(id) => write!(f, "Symbol(#{})", id.0),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<SymbolId> for PropertyKey {
    fn from(id: SymbolId) -> Self {
        Self::Symbol(id)
    }
}

/// Keys serialize as their display form, so structured log payloads read
/// like the source that triggered them.
impl Serialize for PropertyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A runtime value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
    /// The absent value.
    #[default]
    Undefined,
    /// The null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer number.
    Int(i64),
    /// A string.
    Str(String),
    /// A reference to a heap object.
    Object(ObjectHandle),
    /// A bare native function value.
    Function(FunctionId),
}

impl Value {
    /// Is this value a heap object reference?
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Is this a bare function value?
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "number",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Object(h) => write!(f, "[object#{}]", h.0),
            Self::Function(id) => write!(f, "[function#{}]", id.0),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<ObjectHandle> for Value {
    fn from(h: ObjectHandle) -> Self {
        Self::Object(h)
    }
}

impl From<FunctionId> for Value {
    fn from(id: FunctionId) -> Self {
        Self::Function(id)
    }
}

/// Values serialize as plain JSON scalars where possible; objects and
/// functions fall back to their display form.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Undefined | Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Object(_) | Self::Function(_) => serializer.collect_str(self),
        }
    }
}

/// A property descriptor: data or accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PropertyDescriptor {
    /// Data descriptor: a stored value.
    Data {
        /// The stored value.
        value: Value,
        /// May the value be replaced through the write path?
        writable: bool,
        /// Does the property show up in enumeration?
        enumerable: bool,
        /// May the descriptor be redefined or deleted?
        configurable: bool,
    },
    /// Accessor descriptor: a getter/setter pair.
    Accessor {
        /// Getter, invoked with the owner as receiver.
        get: Option<FunctionId>,
        /// Setter, invoked with the owner as receiver.
        set: Option<FunctionId>,
        /// Does the property show up in enumeration?
        enumerable: bool,
        /// May the descriptor be redefined or deleted?
        configurable: bool,
    },
}

impl PropertyDescriptor {
    /// A default data descriptor (writable, enumerable, configurable).
    pub fn data(value: Value) -> Self {
        Self::Data {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// An enumerable, configurable accessor descriptor.
    pub fn accessor(get: Option<FunctionId>, set: Option<FunctionId>) -> Self {
        Self::Accessor {
            get,
            set,
            enumerable: true,
            configurable: true,
        }
    }

    /// Is the descriptor configurable?
    pub fn is_configurable(&self) -> bool {
        match self {
            Self::Data { configurable, .. } | Self::Accessor { configurable, .. } => *configurable,
        }
    }

    /// Is the property enumerable?
    pub fn is_enumerable(&self) -> bool {
        match self {
            Self::Data { enumerable, .. } | Self::Accessor { enumerable, .. } => *enumerable,
        }
    }

    /// Is this a data descriptor?
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }

    /// The stored value, if this is a data descriptor.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Data { value, .. } => Some(value),
            Self::Accessor { .. } => None,
        }
    }
}

/// An ordinary object: a property table plus internal slots.
#[derive(Debug, Clone, Default)]
pub struct OrdinaryObject {
    /// Own properties in insertion order.
    pub(crate) properties: IndexMap<PropertyKey, PropertyDescriptor>,
    /// May new properties be added?
    pub(crate) extensible: bool,
    /// Native behavior when the object is invoked.
    pub(crate) function: Option<FunctionId>,
    /// May the object be invoked through the construct capability?
    pub(crate) constructable: bool,
}

impl OrdinaryObject {
    fn new() -> Self {
        Self {
            properties: IndexMap::new(),
            extensible: true,
            function: None,
            constructable: false,
        }
    }

    /// The own property descriptor for `key`, if present.
    pub(crate) fn own(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    /// Define or update a property, honoring configurability.
    ///
    /// Returns `false` when the definition is rejected: a non-configurable
    /// existing descriptor, or a new property on a non-extensible object.
    pub(crate) fn define(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        if let Some(current) = self.properties.get(&key) {
            if !current.is_configurable() {
                // The only permitted in-place change is a value update on a
                // writable data property.
                let writable_value_update = matches!(
                    (current, &desc),
                    (
                        PropertyDescriptor::Data { writable: true, .. },
                        PropertyDescriptor::Data { .. }
                    )
                );
                if !writable_value_update {
                    return false;
                }
            }
            self.properties.insert(key, desc);
            true
        } else {
            if !self.extensible {
                return false;
            }
            self.properties.insert(key, desc);
            true
        }
    }

    /// Delete a property. Returns `false` if it exists but is
    /// non-configurable; missing properties delete vacuously.
    pub(crate) fn delete(&mut self, key: &PropertyKey) -> bool {
        match self.properties.get(key) {
            Some(desc) if !desc.is_configurable() => false,
            Some(_) => {
                self.properties.shift_remove(key);
                true
            }
            None => true,
        }
    }

    /// Own keys in insertion order.
    pub(crate) fn own_keys(&self) -> Vec<PropertyKey> {
        self.properties.keys().cloned().collect()
    }
}

/// A revocable forwarding wrapper installed by `watch_obj`.
///
/// The wrapper holds nothing but the target identity; policy and reversal
/// state live in the watch registry so that resolving them never passes
/// through the wrapper's own trapped operations.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WatchProxy {
    /// The wrapped target, `None` once revoked.
    pub(crate) target: Option<ObjectHandle>,
}

impl WatchProxy {
    /// The target, or `WrapperRevoked` once revoked.
    pub(crate) fn target(&self) -> Result<ObjectHandle, crate::error::EngineError> {
        self.target.ok_or(crate::error::EngineError::WrapperRevoked)
    }
}

/// A heap slot: an ordinary object or a watch-proxy wrapper.
#[derive(Debug, Clone)]
pub(crate) enum HeapObject {
    Ordinary(OrdinaryObject),
    WatchProxy(WatchProxy),
}

/// The object heap: an arena of objects plus the symbol table.
#[derive(Debug, Default)]
pub(crate) struct Heap {
    objects: Vec<HeapObject>,
    symbols: Vec<String>,
}

impl Heap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alloc(&mut self) -> ObjectHandle {
        let handle = ObjectHandle(self.objects.len() as u32);
        self.objects.push(HeapObject::Ordinary(OrdinaryObject::new()));
        handle
    }

    pub(crate) fn alloc_callable(
        &mut self,
        function: FunctionId,
        constructable: bool,
    ) -> ObjectHandle {
        let handle = self.alloc();
        if let Some(HeapObject::Ordinary(o)) = self.objects.get_mut(handle.0 as usize) {
            o.function = Some(function);
            o.constructable = constructable;
        }
        handle
    }

    pub(crate) fn alloc_watch_proxy(&mut self, target: ObjectHandle) -> ObjectHandle {
        let handle = ObjectHandle(self.objects.len() as u32);
        self.objects.push(HeapObject::WatchProxy(WatchProxy {
            target: Some(target),
        }));
        handle
    }

    pub(crate) fn alloc_symbol(&mut self, description: &str) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(description.to_string());
        id
    }

    pub(crate) fn symbol_description(&self, id: SymbolId) -> Option<&str> {
        self.symbols.get(id.0 as usize).map(String::as_str)
    }

    /// Render a key the way callers name it: symbols as `Symbol(desc)`.
    pub(crate) fn display_key(&self, key: &PropertyKey) -> String {
        match key {
            PropertyKey::String(s) => s.clone(),
            PropertyKey::Symbol(id) => match self.symbol_description(*id) {
                Some(desc) => format!("Symbol({desc})"),
                None => key.to_string(),
            },
        }
    }

    pub(crate) fn get(
        &self,
        handle: ObjectHandle,
    ) -> Result<&HeapObject, crate::error::EngineError> {
        self.objects
            .get(handle.0 as usize)
            .ok_or(crate::error::EngineError::ObjectNotFound(handle))
    }

    pub(crate) fn get_mut(
        &mut self,
        handle: ObjectHandle,
    ) -> Result<&mut HeapObject, crate::error::EngineError> {
        self.objects
            .get_mut(handle.0 as usize)
            .ok_or(crate::error::EngineError::ObjectNotFound(handle))
    }

    pub(crate) fn ordinary(
        &self,
        handle: ObjectHandle,
    ) -> Result<&OrdinaryObject, crate::error::EngineError> {
        match self.get(handle)? {
            HeapObject::Ordinary(o) => Ok(o),
            HeapObject::WatchProxy(_) => Err(crate::error::EngineError::ObjectNotFound(handle)),
        }
    }

    pub(crate) fn ordinary_mut(
        &mut self,
        handle: ObjectHandle,
    ) -> Result<&mut OrdinaryObject, crate::error::EngineError> {
        match self.get_mut(handle)? {
            HeapObject::Ordinary(o) => Ok(o),
            HeapObject::WatchProxy(_) => Err(crate::error::EngineError::ObjectNotFound(handle)),
        }
    }

    pub(crate) fn is_watch_proxy(&self, handle: ObjectHandle) -> bool {
        matches!(self.get(handle), Ok(HeapObject::WatchProxy(_)))
    }
}
