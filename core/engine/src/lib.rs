//! Vigil is an object-watch engine written in Rust.
//!
//! It lets a caller observe and intervene in every access, mutation,
//! invocation, deletion, enumeration and construction performed against a
//! chosen value on a dynamic object heap, without the value's other
//! consumers being aware. Interception comes in two flavors:
//!
//! - [`Engine::watch_obj`]: a whole-object forwarding wrapper that
//!   intercepts every structural operation and routes it through a
//!   configurable [`Policy`](watch::Policy) before forwarding to the real
//!   target.
//! - [`Engine::watch_prop`]: a single-property interceptor that rewrites
//!   one named member in place, so every get/set/call on that property
//!   flows through the same policy pipeline.
//!
//! Both share one model: capture a [`OpContext`](watch::OpContext),
//! consult the policy, optionally suspend for an attached debugger,
//! forward to the real behavior, optionally rewrite the result, log, and
//! notify before/after observers.
//!
//! # Example
//!
//! ```
//! use vigil_engine::{Engine, Value, WatchOptions};
//!
//! let mut engine = Engine::new();
//! let target = engine.alloc_object();
//! engine.set(target, &"name".into(), Value::from("a")).unwrap();
//!
//! let wrapper = engine.watch_obj(target, WatchOptions::default().with_log(false));
//! engine.set(wrapper, &"name".into(), Value::from("b")).unwrap();
//!
//! // The wrapper shares the target's backing storage.
//! assert_eq!(engine.get(target, &"name".into()).unwrap(), Value::from("b"));
//! ```

mod engine;
pub mod error;
pub mod object;
pub mod watch;

pub use engine::{Engine, NativeFn};
pub use error::{EngineError, EngineResult, WatchError};
pub use object::{
    FunctionId, ObjectHandle, PropertyDescriptor, PropertyKey, SymbolId, Value,
};
pub use watch::{OpContext, OpKind, Policy, WatchHooks, WatchOptions, WatchRef};
