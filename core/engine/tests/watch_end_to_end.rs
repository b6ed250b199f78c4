//! End-to-end scenarios exercising both interception mechanisms through
//! the public API, with custom host hooks standing in for a debugger.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vigil_engine::{
    Engine, OpContext, OpKind, PropertyDescriptor, Value, WatchHooks, WatchOptions,
};

/// Host hooks that record every break request and log line.
#[derive(Default)]
struct RecordingHooks {
    breaks: RefCell<Vec<OpContext>>,
    logs: RefCell<Vec<String>>,
}

impl WatchHooks for RecordingHooks {
    fn request_break(&self, ctx: &OpContext) {
        self.breaks.borrow_mut().push(ctx.clone());
    }

    fn emit_log(&self, line: &str) {
        self.logs.borrow_mut().push(line.to_string());
    }
}

fn engine_with_recorder() -> (Engine, Rc<RecordingHooks>) {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .init();
    let mut engine = Engine::new();
    let recorder = Rc::new(RecordingHooks::default());
    engine.set_watch_hooks(recorder.clone());
    (engine, recorder)
}

#[test]
fn wrapper_is_transparent_for_the_full_capability_set() {
    let (mut engine, _) = engine_with_recorder();
    let user = engine.alloc_object();
    engine.set(user, &"name".into(), Value::from("ada")).unwrap();
    engine.set(user, &"age".into(), Value::Int(36)).unwrap();

    let wrapper = engine.watch_obj(user, WatchOptions::default().with_log(false));
    assert_ne!(wrapper, user);

    assert_eq!(engine.get(wrapper, &"name".into()).unwrap(), Value::from("ada"));
    assert!(engine.has(wrapper, &"age".into()).unwrap());
    assert!(engine.set(wrapper, &"age".into(), Value::Int(37)).unwrap());
    assert_eq!(engine.get(user, &"age".into()).unwrap(), Value::Int(37));

    let keys: Vec<String> = engine
        .own_keys(wrapper)
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(keys, vec!["name", "age"]);

    assert!(engine.delete(wrapper, &"name".into()).unwrap());
    assert!(!engine.has(user, &"name".into()).unwrap());
}

#[test]
fn every_operation_emits_exactly_one_log_line() {
    let (mut engine, recorder) = engine_with_recorder();
    let obj = engine.alloc_object();
    let wrapper = engine.watch_obj(obj, WatchOptions::default());

    engine.set(wrapper, &"x".into(), Value::Int(1)).unwrap();
    engine.get(wrapper, &"x".into()).unwrap();
    engine.has(wrapper, &"x".into()).unwrap();
    engine.delete(wrapper, &"x".into()).unwrap();

    let logs = recorder.logs.borrow();
    assert_eq!(logs.len(), 4);
    assert!(logs[0].starts_with("[set]"));
    assert!(logs[1].starts_with("[get]"));
    assert!(logs[2].starts_with("[has]"));
    assert!(logs[3].starts_with("[deleteProperty]"));
    assert!(logs[0].contains("\"key\":\"x\""));
    assert!(logs[0].contains("\"newValue\""));
}

#[test]
fn hooks_fire_once_per_operation_in_documented_order() {
    let (mut engine, _) = engine_with_recorder();
    let trace: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let (t1, t2, t3) = (trace.clone(), trace.clone(), trace.clone());
    let obj = engine.alloc_object();
    let wrapper = engine.watch_obj(
        obj,
        WatchOptions::default()
            .with_log(false)
            .on_before(move |_, _| t1.borrow_mut().push("before"))
            .on_access(move |_, _| t2.borrow_mut().push("access"))
            .on_after(move |_, ctx| {
                assert!(ctx.success);
                t3.borrow_mut().push("after");
            }),
    );

    engine.get(wrapper, &"missing".into()).unwrap();
    assert_eq!(*trace.borrow(), vec!["before", "access", "after"]);
}

#[test]
fn conditional_breakpoint_sees_the_full_context() {
    let (mut engine, recorder) = engine_with_recorder();
    let obj = engine.alloc_object();
    engine.set(obj, &"balance".into(), Value::Int(100)).unwrap();

    let wrapper = engine.watch_obj(
        obj,
        WatchOptions::default()
            .with_log(false)
            .with_breakpoint_when(|ctx| {
                ctx.kind == OpKind::Set && ctx.new_value == Some(Value::Int(0))
            }),
    );

    engine.set(wrapper, &"balance".into(), Value::Int(50)).unwrap();
    engine.get(wrapper, &"balance".into()).unwrap();
    assert!(recorder.breaks.borrow().is_empty());

    engine.set(wrapper, &"balance".into(), Value::Int(0)).unwrap();
    let breaks = recorder.breaks.borrow();
    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].kind, OpKind::Set);
    assert_eq!(breaks[0].key, Some("balance".into()));
    assert_eq!(breaks[0].old_value, Some(Value::Int(50)));
    assert_eq!(breaks[0].new_value, Some(Value::Int(0)));
}

#[test]
fn legacy_boolean_shorthand_breaks_on_everything() {
    let (mut engine, recorder) = engine_with_recorder();
    let obj = engine.alloc_object();
    let wrapper = engine.watch_obj(obj, true);

    engine.set(wrapper, &"x".into(), Value::Int(1)).unwrap();
    engine.get(wrapper, &"x".into()).unwrap();
    assert_eq!(recorder.breaks.borrow().len(), 2);
}

#[test]
fn unwatch_obj_round_trip_leaves_no_trace() {
    let (mut engine, recorder) = engine_with_recorder();
    let obj = engine.alloc_object();
    engine.set(obj, &"x".into(), Value::Int(1)).unwrap();

    let wrapper = engine.watch_obj(obj, WatchOptions::default());
    assert_eq!(engine.unwatch_obj(wrapper), Some(obj));

    recorder.logs.borrow_mut().clear();
    engine.set(obj, &"x".into(), Value::Int(2)).unwrap();
    engine.get(obj, &"x".into()).unwrap();
    assert!(recorder.logs.borrow().is_empty(), "original must be silent");

    // The stale wrapper is inert rather than a silent pass-through.
    assert!(engine.get(wrapper, &"x".into()).is_err());
    // A second removal finds nothing.
    assert_eq!(engine.unwatch_obj(wrapper), None);
}

#[test]
fn named_watch_is_removable_by_name() {
    let (mut engine, _) = engine_with_recorder();
    let session = engine.alloc_object();
    let wrapper = engine.watch_obj_named(
        session,
        WatchOptions::default().with_log(false),
        "session-state",
    );

    engine.set(wrapper, &"token".into(), Value::from("abc")).unwrap();
    assert_eq!(engine.unwatch_obj("session-state"), Some(session));
    assert_eq!(engine.get(session, &"token".into()).unwrap(), Value::from("abc"));
}

#[test]
fn watched_method_reports_arguments_and_transforms_results() {
    let (mut engine, _) = engine_with_recorder();
    let calls: Rc<RefCell<Vec<Vec<Value>>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = calls.clone();

    let add = engine.register_fn(|_, _, args| {
        let (Some(Value::Int(a)), Some(Value::Int(b))) = (args.first(), args.get(1)) else {
            return Ok(Value::Undefined);
        };
        Ok(Value::Int(a + b))
    });
    let calc = engine.alloc_object();
    engine.set(calc, &"add".into(), Value::Function(add)).unwrap();

    assert!(engine
        .watch_prop(
            calc,
            "add",
            WatchOptions::default()
                .with_log(false)
                .on_call(move |_, ctx| seen.borrow_mut().push(ctx.arguments.clone()))
                .transform_result(|_, ctx| match ctx.result {
                    Some(Value::Int(n)) => Value::Int(n * 10),
                    _ => Value::Undefined,
                }),
        )
        .is_some());

    let result = engine
        .call_method(calc, &"add".into(), &[Value::Int(2), Value::Int(3)])
        .unwrap();
    assert_eq!(result, Value::Int(50));
    assert_eq!(*calls.borrow(), vec![vec![Value::Int(2), Value::Int(3)]]);

    // Removal restores the bare function and the raw result.
    assert!(engine.unwatch_prop(calc, "add"));
    let result = engine
        .call_method(calc, &"add".into(), &[Value::Int(2), Value::Int(3)])
        .unwrap();
    assert_eq!(result, Value::Int(5));
}

#[test]
fn watched_prop_modify_hook_counts_writes_and_reverses_cleanly() {
    let (mut engine, _) = engine_with_recorder();
    let writes = Rc::new(Cell::new(0));
    let counter = writes.clone();

    let obj = engine.alloc_object();
    engine.set(obj, &"state".into(), Value::from("idle")).unwrap();
    let before = engine.get(obj, &"state".into()).unwrap();

    engine.watch_prop(
        obj,
        "state",
        WatchOptions::default()
            .with_log(false)
            .on_modify(move |_, _| counter.set(counter.get() + 1)),
    );
    assert_eq!(engine.get_watched_props(obj), vec!["state"]);

    engine.set(obj, &"state".into(), Value::from("running")).unwrap();
    engine.set(obj, &"state".into(), Value::from("done")).unwrap();
    engine.get(obj, &"state".into()).unwrap();
    assert_eq!(writes.get(), 2);

    assert!(engine.unwatch_prop(obj, "state"));
    assert!(engine.get_watched_props(obj).is_empty());
    assert!(!engine.unwatch_prop(obj, "state"));

    // The restored descriptor is a plain data property holding the last
    // written value, with the original attributes.
    assert_eq!(engine.get(obj, &"state".into()).unwrap(), Value::from("done"));
    let _ = before;
}

#[test]
fn object_watch_and_prop_watch_compose_on_the_same_target() {
    let (mut engine, recorder) = engine_with_recorder();
    let obj = engine.alloc_object();
    engine.set(obj, &"hits".into(), Value::Int(0)).unwrap();

    engine.watch_prop(obj, "hits", WatchOptions::default());
    let wrapper = engine.watch_obj(obj, WatchOptions::default());

    // One write through the wrapper crosses both layers: the wrapper trap
    // logs its set, and the in-place interceptor logs the inner read and
    // write against the real target.
    engine.set(wrapper, &"hits".into(), Value::Int(1)).unwrap();

    let logs = recorder.logs.borrow();
    assert!(logs.iter().any(|l| l.starts_with("[set]")));
    assert!(logs.len() >= 2, "both layers must report");
    drop(logs);

    assert_eq!(engine.get(obj, &"hits".into()).unwrap(), Value::Int(1));
}

#[test]
fn wrapper_set_transform_rewrites_the_stored_value() {
    let (mut engine, _) = engine_with_recorder();
    let obj = engine.alloc_object();
    let wrapper = engine.watch_obj(
        obj,
        WatchOptions::default()
            .with_log(false)
            .transform_result(|_, ctx| match &ctx.result {
                Some(Value::Str(s)) => Value::from(s.to_uppercase().as_str()),
                other => other.clone().unwrap_or_default(),
            }),
    );

    engine.set(wrapper, &"tag".into(), Value::from("debug")).unwrap();
    assert_eq!(engine.get(obj, &"tag".into()).unwrap(), Value::from("DEBUG"));
}

#[test]
fn construction_through_the_wrapper_is_observed() {
    let (mut engine, recorder) = engine_with_recorder();
    let init = engine.register_fn(|e, this, args| {
        if let Value::Object(h) = this {
            e.set(*h, &"seed".into(), args.first().cloned().unwrap_or_default())?;
        }
        Ok(Value::Undefined)
    });
    let ctor = engine.alloc_constructor(init);
    let wrapper = engine.watch_obj(ctor, WatchOptions::default());

    let instance = engine.construct(wrapper, &[Value::Int(7)]).unwrap();
    let Value::Object(h) = instance else {
        panic!("construct should produce an object");
    };
    assert_eq!(engine.get(h, &"seed".into()).unwrap(), Value::Int(7));

    let logs = recorder.logs.borrow();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].starts_with("[construct]"));
    assert!(logs[0].contains("\"arguments\":[7]"));
}

#[test]
fn accessor_prop_watch_keeps_the_underlying_accessors_live() {
    let (mut engine, _) = engine_with_recorder();
    let obj = engine.alloc_object();
    let backing = engine.alloc_object();
    engine.set(backing, &"v".into(), Value::Int(0)).unwrap();

    let getter = engine.register_fn(move |e, _, _| e.get(backing, &"v".into()));
    let setter = engine.register_fn(move |e, _, args| {
        e.set(backing, &"v".into(), args.first().cloned().unwrap_or_default())?;
        Ok(Value::Undefined)
    });
    engine
        .define_property(
            obj,
            &"v".into(),
            PropertyDescriptor::accessor(Some(getter), Some(setter)),
        )
        .unwrap();

    let reads = Rc::new(Cell::new(0));
    let counter = reads.clone();
    engine.watch_prop(
        obj,
        "v",
        WatchOptions::default()
            .with_log(false)
            .on_access(move |_, _| counter.set(counter.get() + 1)),
    );

    engine.set(obj, &"v".into(), Value::Int(5)).unwrap();
    assert_eq!(engine.get(obj, &"v".into()).unwrap(), Value::Int(5));
    assert_eq!(engine.get(backing, &"v".into()).unwrap(), Value::Int(5));
    assert_eq!(reads.get(), 1);

    assert!(engine.unwatch_prop(obj, "v"));
    assert_eq!(engine.get(obj, &"v".into()).unwrap(), Value::Int(5));
}
