//! Per-operation context records.
//!
//! An [`OpContext`] describes what is happening, to whom, and with what
//! values. It is built when an intercepted operation starts, completed
//! with the result after forwarding, handed to every hook along the way,
//! and discarded when the operation returns — never persisted.

use crate::object::{ObjectHandle, PropertyKey, Value};
use serde::Serialize;
use std::fmt;

/// The closed set of structural operations the engine can intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OpKind {
    /// Property read.
    Get,
    /// Property write.
    Set,
    /// Own-property existence check.
    Has,
    /// Property deletion.
    Delete,
    /// Explicit descriptor definition.
    DefineProperty,
    /// Own-key enumeration.
    OwnKeys,
    /// Invocation of a callable.
    Call,
    /// Construction.
    Construct,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Has => "has",
            Self::Delete => "deleteProperty",
            Self::DefineProperty => "defineProperty",
            Self::OwnKeys => "ownKeys",
            Self::Call => "call",
            Self::Construct => "construct",
        };
        write!(f, "{name}")
    }
}

/// A transient record describing one intercepted operation.
///
/// Field presence depends on the kind: `key` for property operations,
/// `old_value`/`new_value` for writes and deletions, `arguments` for
/// invocation and construction. `result` and `success` are filled in after
/// the operation has been forwarded to the real target, so the `after`
/// hook (and only it) observes them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpContext {
    /// What is being done.
    pub kind: OpKind,
    /// The identity of the real target.
    pub target: ObjectHandle,
    /// The property key involved, for property operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<PropertyKey>,
    /// The value before the operation, where applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    /// The incoming value, for writes and definitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    /// The argument list, for call and construct.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Value>,
    /// Where in the call stack the operation originated.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub call_site: String,
    /// The forwarded result, present once the operation completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Whether forwarding completed.
    pub success: bool,
}

impl OpContext {
    /// Starts a context for an operation on `target`, resolving the call
    /// site eagerly.
    pub(crate) fn new(kind: OpKind, target: ObjectHandle) -> Self {
        Self {
            kind,
            target,
            key: None,
            old_value: None,
            new_value: None,
            arguments: Vec::new(),
            call_site: super::callsite::call_site(),
            result: None,
            success: false,
        }
    }

    pub(crate) fn with_key(mut self, key: PropertyKey) -> Self {
        self.key = Some(key);
        self
    }

    pub(crate) fn with_old_value(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }

    pub(crate) fn with_new_value(mut self, value: Value) -> Self {
        self.new_value = Some(value);
        self
    }

    pub(crate) fn with_arguments(mut self, args: &[Value]) -> Self {
        self.arguments = args.to_vec();
        self
    }

    /// Records the forwarded result.
    pub(crate) fn complete(&mut self, result: Value) {
        self.result = Some(result);
        self.success = true;
    }

    /// Renders the structured log payload for this context.
    pub(crate) fn log_line(&self) -> String {
        let payload =
            serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"kind\":\"{}\"}}", self.kind));
        if self.call_site.is_empty() {
            format!("[{}] {payload}", self.kind)
        } else {
            format!("[{}] {payload}\nstack:\n{}", self.kind, self.call_site)
        }
    }
}
