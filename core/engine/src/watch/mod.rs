//! Vigil's interception and hook-dispatch engine.
//!
//! This module implements the two interception mechanisms and everything
//! they share.
//!
//! # Overview
//!
//! - [`Engine::watch_obj`](crate::Engine::watch_obj): wraps a whole object
//!   in a revocable forwarding wrapper intercepting the full capability
//!   set (get, set, has, delete, define, enumerate, invoke, construct).
//! - [`Engine::watch_prop`](crate::Engine::watch_prop): rewrites one named
//!   member of a target in place, preserving the target's identity.
//!
//! Shared machinery:
//!
//! - [`Policy`]: resolved per-watch configuration (breakpoint condition,
//!   logging toggle, lifecycle hooks, result transform).
//! - [`OpContext`]: the per-operation record handed to every hook.
//! - [`WatchHooks`]: the host seam for debugger suspension and log output.
//! - The watch registry: identity-keyed bookkeeping enabling idempotent
//!   registration, lookup by wrapper, and reversible teardown.
//!
//! # The pipeline
//!
//! Every intercepted operation flows through one template, implemented
//! once and parameterized by the variant-specific forward step:
//!
//! 1. Build an [`OpContext`] (kind, target, key/values/arguments,
//!    call-site description).
//! 2. Run the `before` hook, then the kind-specific hook.
//! 3. Evaluate the breakpoint condition; on true, request debugger
//!    attention through [`WatchHooks::request_break`].
//! 4. If logging is enabled, emit the structured line.
//! 5. Forward to the real behavior.
//! 6. Complete the context with the result and run the `after` hook.
//! 7. Return the real result, or the transform's replacement for reads,
//!    calls and construction.

pub mod callsite;
pub mod context;
pub mod hooks;
pub mod policy;
pub mod prop;
pub mod proxy;
pub(crate) mod registry;

pub use callsite::call_site;
pub use context::{OpContext, OpKind};
pub use hooks::{LogWatchHooks, WatchHooks};
pub use policy::{BreakCondition, HookFn, HookSet, Policy, PredicateFn, TransformFn, WatchOptions};
pub use proxy::WatchRef;

use crate::engine::Engine;
use crate::error::EngineResult;
use crate::object::Value;
use std::rc::Rc;

impl Engine {
    /// Runs one intercepted operation through the policy pipeline.
    ///
    /// The forward step receives the context mutably so write-shaped
    /// operations can consult the transform for the value they store; for
    /// reads, calls and construction the transform instead replaces the
    /// returned value after the `after` hook has observed the real one.
    pub(crate) fn run_watched_op<F>(
        &mut self,
        policy: &Rc<Policy>,
        mut ctx: OpContext,
        forward: F,
    ) -> EngineResult<Value>
    where
        F: FnOnce(&mut Engine, &mut OpContext) -> EngineResult<Value>,
    {
        if let Some(hook) = &policy.hooks.before {
            hook(self, &ctx);
        }
        if let Some(hook) = policy.hooks.for_kind(ctx.kind) {
            hook(self, &ctx);
        }

        if policy.breakpoint.should_break(&ctx) {
            let host = Rc::clone(&self.watch_hooks);
            host.request_break(&ctx);
        }

        if policy.log_enabled {
            let host = Rc::clone(&self.watch_hooks);
            host.emit_log(&ctx.log_line());
        }

        let result = forward(self, &mut ctx)?;
        ctx.complete(result.clone());

        if let Some(hook) = &policy.hooks.after {
            hook(self, &ctx);
        }

        if matches!(ctx.kind, OpKind::Get | OpKind::Call | OpKind::Construct) {
            if let Some(transform) = &policy.transform_result {
                return Ok(transform(self, &ctx));
            }
        }
        Ok(result)
    }

    /// The transformed value for a write, when a transform is configured.
    ///
    /// Mirrors the read-side transform: the context is completed with the
    /// proposed value so the hook sees what would be stored.
    pub(crate) fn transformed_write(
        &mut self,
        policy: &Policy,
        ctx: &OpContext,
        proposed: Value,
    ) -> Value {
        match &policy.transform_result {
            Some(transform) => {
                let mut probe = ctx.clone();
                probe.complete(proposed);
                transform(self, &probe)
            }
            None => proposed,
        }
    }
}
