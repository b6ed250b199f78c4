//! Watch configuration and its resolved form.
//!
//! Callers describe a watch with [`WatchOptions`]; registration resolves
//! the options into a fully-defaulted [`Policy`] exactly once. A bare
//! boolean is accepted anywhere options are, as the legacy shorthand for
//! "enable breakpoint suspension" — [`From<bool>`] is the explicit
//! normalization step, so nothing downstream branches on argument shape.
//!
//! Policies are immutable once built and shared behind `Rc`: the registry
//! keeps one per active watch, and installed interceptor closures hold
//! clones of the same one.

use super::context::{OpContext, OpKind};
use crate::engine::Engine;
use crate::object::Value;
use std::fmt;
use std::rc::Rc;

/// A lifecycle hook: observes one operation context.
///
/// Hooks receive the engine mutably so they may themselves touch watched
/// or unwatched targets; registry bookkeeping never flows through a
/// watched path, so such re-entry stays bounded.
pub type HookFn = Rc<dyn Fn(&mut Engine, &OpContext)>;

/// A conditional-breakpoint predicate, evaluated against the context.
pub type PredicateFn = Rc<dyn Fn(&OpContext) -> bool>;

/// A result-rewriting hook: produces the value the caller receives (for
/// reads, calls and construction) or the value actually stored (for
/// writes).
pub type TransformFn = Rc<dyn Fn(&mut Engine, &OpContext) -> Value>;

/// When to request debugger attention for an operation.
#[derive(Clone, Default)]
pub enum BreakCondition {
    /// Never suspend.
    #[default]
    Never,
    /// Suspend on every intercepted operation.
    Always,
    /// Suspend when the predicate returns true for the context.
    When(PredicateFn),
}

impl BreakCondition {
    /// Evaluates the condition against a context.
    pub fn should_break(&self, ctx: &OpContext) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::When(pred) => pred(ctx),
        }
    }
}

impl fmt::Debug for BreakCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => write!(f, "Never"),
            Self::Always => write!(f, "Always"),
            Self::When(_) => write!(f, "When(..)"),
        }
    }
}

/// The ordered set of optional lifecycle hooks.
#[derive(Clone, Default)]
pub struct HookSet {
    /// Runs first for every intercepted operation.
    pub before: Option<HookFn>,
    /// Runs after forwarding, with `result`/`success` filled in.
    pub after: Option<HookFn>,
    /// Kind hook for reads and existence checks.
    pub on_access: Option<HookFn>,
    /// Kind hook for writes.
    pub on_modify: Option<HookFn>,
    /// Kind hook for invocation.
    pub on_call: Option<HookFn>,
    /// Kind hook for descriptor definition.
    pub on_define: Option<HookFn>,
    /// Kind hook for deletion.
    pub on_delete: Option<HookFn>,
    /// Kind hook for construction.
    pub on_construct: Option<HookFn>,
}

impl HookSet {
    /// The kind-specific hook for an operation, if configured.
    ///
    /// Enumeration has no kind-specific hook; existence checks share the
    /// access hook with reads.
    pub fn for_kind(&self, kind: OpKind) -> Option<&HookFn> {
        match kind {
            OpKind::Get | OpKind::Has => self.on_access.as_ref(),
            OpKind::Set => self.on_modify.as_ref(),
            OpKind::Call => self.on_call.as_ref(),
            OpKind::DefineProperty => self.on_define.as_ref(),
            OpKind::Delete => self.on_delete.as_ref(),
            OpKind::Construct => self.on_construct.as_ref(),
            OpKind::OwnKeys => None,
        }
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for (name, hook) in [
            ("before", &self.before),
            ("after", &self.after),
            ("onAccess", &self.on_access),
            ("onModify", &self.on_modify),
            ("onCall", &self.on_call),
            ("onDefine", &self.on_define),
            ("onDelete", &self.on_delete),
            ("onConstruct", &self.on_construct),
        ] {
            if hook.is_some() {
                set.entry(&name);
            }
        }
        set.finish()
    }
}

/// Raw, caller-supplied watch configuration.
///
/// Defaults: breakpoint off, logging on, no hooks, no result transform.
#[derive(Clone)]
pub struct WatchOptions {
    pub(crate) breakpoint: BreakCondition,
    pub(crate) log: bool,
    pub(crate) hooks: HookSet,
    pub(crate) transform_result: Option<TransformFn>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            breakpoint: BreakCondition::Never,
            log: true,
            hooks: HookSet::default(),
            transform_result: None,
        }
    }
}

/// Legacy shorthand: a bare boolean means "enable breakpoint suspension".
impl From<bool> for WatchOptions {
    fn from(debugger: bool) -> Self {
        Self {
            breakpoint: if debugger {
                BreakCondition::Always
            } else {
                BreakCondition::Never
            },
            ..Self::default()
        }
    }
}

impl WatchOptions {
    /// Enables or disables unconditional breakpoint suspension.
    pub fn with_breakpoint(mut self, enabled: bool) -> Self {
        self.breakpoint = if enabled {
            BreakCondition::Always
        } else {
            BreakCondition::Never
        };
        self
    }

    /// Installs a conditional-breakpoint predicate.
    pub fn with_breakpoint_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&OpContext) -> bool + 'static,
    {
        self.breakpoint = BreakCondition::When(Rc::new(predicate));
        self
    }

    /// Enables or disables per-operation logging (default on).
    pub fn with_log(mut self, enabled: bool) -> Self {
        self.log = enabled;
        self
    }

    /// Installs the before hook.
    pub fn on_before<F: Fn(&mut Engine, &OpContext) + 'static>(mut self, hook: F) -> Self {
        self.hooks.before = Some(Rc::new(hook));
        self
    }

    /// Installs the after hook.
    pub fn on_after<F: Fn(&mut Engine, &OpContext) + 'static>(mut self, hook: F) -> Self {
        self.hooks.after = Some(Rc::new(hook));
        self
    }

    /// Installs the access (get/has) hook.
    pub fn on_access<F: Fn(&mut Engine, &OpContext) + 'static>(mut self, hook: F) -> Self {
        self.hooks.on_access = Some(Rc::new(hook));
        self
    }

    /// Installs the modify (set) hook.
    pub fn on_modify<F: Fn(&mut Engine, &OpContext) + 'static>(mut self, hook: F) -> Self {
        self.hooks.on_modify = Some(Rc::new(hook));
        self
    }

    /// Installs the call hook.
    pub fn on_call<F: Fn(&mut Engine, &OpContext) + 'static>(mut self, hook: F) -> Self {
        self.hooks.on_call = Some(Rc::new(hook));
        self
    }

    /// Installs the define hook.
    pub fn on_define<F: Fn(&mut Engine, &OpContext) + 'static>(mut self, hook: F) -> Self {
        self.hooks.on_define = Some(Rc::new(hook));
        self
    }

    /// Installs the delete hook.
    pub fn on_delete<F: Fn(&mut Engine, &OpContext) + 'static>(mut self, hook: F) -> Self {
        self.hooks.on_delete = Some(Rc::new(hook));
        self
    }

    /// Installs the construct hook.
    pub fn on_construct<F: Fn(&mut Engine, &OpContext) + 'static>(mut self, hook: F) -> Self {
        self.hooks.on_construct = Some(Rc::new(hook));
        self
    }

    /// Installs the result-rewriting hook.
    pub fn transform_result<F>(mut self, transform: F) -> Self
    where
        F: Fn(&mut Engine, &OpContext) -> Value + 'static,
    {
        self.transform_result = Some(Rc::new(transform));
        self
    }
}

impl fmt::Debug for WatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchOptions")
            .field("breakpoint", &self.breakpoint)
            .field("log", &self.log)
            .field("hooks", &self.hooks)
            .field("transform_result", &self.transform_result.is_some())
            .finish()
    }
}

/// Resolved, defaulted configuration for one watch.
///
/// Built from [`WatchOptions`] at registration time; construction never
/// fails. Exactly one policy exists per active watch entry, and it is
/// recomputed if the same target is re-registered after removal.
#[derive(Clone)]
pub struct Policy {
    /// When to request debugger attention.
    pub breakpoint: BreakCondition,
    /// Whether to emit a log line per operation.
    pub log_enabled: bool,
    /// The configured lifecycle hooks.
    pub hooks: HookSet,
    /// The configured result-rewriting hook.
    pub transform_result: Option<TransformFn>,
}

impl Policy {
    /// Resolves raw options into a policy.
    pub fn resolve(options: impl Into<WatchOptions>) -> Self {
        let options = options.into();
        Self {
            breakpoint: options.breakpoint,
            log_enabled: options.log,
            hooks: options.hooks,
            transform_result: options.transform_result,
        }
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("breakpoint", &self.breakpoint)
            .field("log_enabled", &self.log_enabled)
            .field("hooks", &self.hooks)
            .field("transform_result", &self.transform_result.is_some())
            .finish()
    }
}
