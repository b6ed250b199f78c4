//! Error types for the object model and the watch surface.
//!
//! [`EngineError`] covers faults raised by structural operations on the
//! heap and propagates with `?` through the engine. [`WatchError`] is the
//! registration-time taxonomy: it is never raised to the caller — watch
//! entry points log it at error or warning severity and return a sentinel
//! failure value instead.

use crate::object::{ObjectHandle, PropertyKey};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from structural operations on the object heap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The handle does not address an object on the heap.
    #[error("object#{} not found", .0.index())]
    ObjectNotFound(ObjectHandle),

    /// The wrapper has been revoked; all operations on it are inert.
    #[error("watch wrapper has been revoked")]
    WrapperRevoked,

    /// The value or object is not callable.
    #[error("value is not callable")]
    NotCallable,

    /// The object is not a constructor.
    #[error("object is not a constructor")]
    NotConstructable,

    /// A native function id does not address an entry in the function table.
    #[error("function#{0} not found")]
    FunctionNotFound(u32),

    /// A property write was rejected (non-writable, non-extensible, or a
    /// non-configurable descriptor conflict).
    #[error("cannot redefine property `{0}`")]
    DefineRejected(PropertyKey),
}

/// Registration-time failure taxonomy for the watch surface.
///
/// All of these are detected synchronously and are non-fatal: they are
/// reported through the logging sink and the call returns a sentinel value
/// (`None` or `false`), never an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    /// The target is not a watchable object.
    #[error("target is not a watchable object")]
    InvalidTarget,

    /// The property key is empty or malformed.
    #[error("property name must be a non-empty string")]
    InvalidProperty,

    /// The target has no own property of that name.
    #[error("property `{0}` does not exist on the target")]
    PropertyNotFound(String),

    /// The property descriptor forbids redefinition.
    #[error("property `{0}` is non-configurable and cannot be watched")]
    NotConfigurable(String),

    /// The property is already registered as watched on this target.
    #[error("property `{0}` is already watched on this target")]
    AlreadyWatched(String),

    /// Removal was requested for an untracked target, property or name.
    #[error("nothing is watched for `{0}`")]
    NotWatched(String),

    /// Teardown raised while reversing an installation.
    #[error("failed to reverse the watch installation: {0}")]
    ReversalFailure(EngineError),
}
