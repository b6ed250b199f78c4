//! Host hooks for debugger integration and log output.
//!
//! The engine itself never blocks and never writes anywhere directly: when
//! a breakpoint predicate fires it *requests* debugger attention through
//! [`WatchHooks::request_break`], and when a policy has logging enabled it
//! hands the formatted line to [`WatchHooks::emit_log`]. A hosting
//! environment may honor either, both, or neither.
//!
//! # Example
//!
//! ```rust,ignore
//! use vigil_engine::{Engine, OpContext, WatchHooks};
//! use std::rc::Rc;
//!
//! struct PausingHooks { /* condvar, channel to a debug session, ... */ }
//!
//! impl WatchHooks for PausingHooks {
//!     fn request_break(&self, ctx: &OpContext) {
//!         // Block here until the attached tool resumes execution.
//!     }
//! }
//!
//! let mut engine = Engine::new();
//! engine.set_watch_hooks(Rc::new(PausingHooks { /* ... */ }));
//! ```

use super::context::OpContext;

/// Host integration points consulted by the watch pipeline.
pub trait WatchHooks {
    /// Called when a watch's breakpoint predicate evaluates to true.
    ///
    /// The default is a no-op, so suspension never blocks execution when no
    /// debugger is attached. An attached tool may pause the thread here and
    /// release it when the user resumes.
    fn request_break(&self, ctx: &OpContext) {
        let _ = ctx;
    }

    /// Receives one formatted line per logged operation.
    ///
    /// The default forwards to the `log` facade at info level.
    fn emit_log(&self, line: &str) {
        log::info!(target: "vigil::watch", "{line}");
    }
}

/// The default host hooks: no debugger, log lines forwarded to `log`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogWatchHooks;

impl WatchHooks for LogWatchHooks {}
