//! `before` hook semantics of the invocation chain.

mod common;

use common::{Controller, services};
use rivet::{
    HandlerCatalog, HandlerDefinition, InvocationChain, InvocationTarget, Outcome,
    ParameterDescriptor, RawParameters, Request, Response, Value, testing::CallRecorder,
};
use std::sync::Arc;

/// A handler whose `before` hook returns whatever `verdict` names.
struct Checkpoint {
    recorder: Arc<CallRecorder>,
}

fn checkpoint() -> HandlerDefinition<Checkpoint> {
    HandlerDefinition::new(
        "Checkpoint",
        vec![ParameterDescriptor::typed::<CallRecorder>("recorder")],
        |recorder: Arc<CallRecorder>| Checkpoint { recorder },
    )
    .method(
        "before",
        vec![ParameterDescriptor::named("verdict").with_default("pass")],
        |this: &mut Checkpoint, verdict: String| {
            this.recorder.record("before");
            match verdict.as_str() {
                "deny" => Value::Bool(false),
                "redirect" => Value::Response(Response::with_status(302, "/login")),
                "zero" => Value::Int(0),
                _ => Value::Bool(true),
            }
        },
    )
    .method("run", vec![], |this: &mut Checkpoint| {
        this.recorder.record("run");
        "ran"
    })
}

fn catalog() -> HandlerCatalog {
    HandlerCatalog::builder()
        .handler::<Controller>()
        .definition(checkpoint())
        .build()
        .unwrap()
}

fn run(verdict: &str) -> (Outcome, Vec<String>) {
    let (services, recorder) = services();
    let handlers = catalog();
    let chain = InvocationChain::new(&services, &handlers, Arc::new(Request::get("/")));

    let outcome = chain
        .invoke(
            &InvocationTarget::new("Checkpoint", "run"),
            &RawParameters::new().with("verdict", verdict),
            true,
        )
        .unwrap();
    (outcome, recorder.calls())
}

#[test]
fn test_false_short_circuits() {
    let (outcome, calls) = run("deny");

    assert!(outcome.is_short_circuited());
    assert_eq!(outcome.into_value(), Value::Bool(false));
    assert_eq!(calls, vec!["before"]);
}

#[test]
fn test_response_short_circuits_with_that_response() {
    let (outcome, calls) = run("redirect");

    assert!(outcome.is_short_circuited());
    let value = outcome.into_value();
    let response = value.as_response().unwrap();
    assert_eq!(response.status(), 302);
    assert_eq!(response.body(), "/login");
    assert_eq!(calls, vec!["before"]);
}

#[test]
fn test_truthy_passes_through() {
    let (outcome, calls) = run("pass");

    assert!(!outcome.is_short_circuited());
    assert_eq!(outcome.value(), &Value::from("ran"));
    assert_eq!(calls, vec!["before", "run"]);
}

#[test]
fn test_falsy_non_false_passes_through() {
    let (outcome, calls) = run("zero");

    assert!(matches!(outcome, Outcome::Completed(_)));
    assert_eq!(calls, vec!["before", "run"]);
}

#[test]
fn test_hook_skipped_when_disabled() {
    let (services, recorder) = services();
    let handlers = catalog();
    let chain = InvocationChain::new(&services, &handlers, Arc::new(Request::get("/")));

    let outcome = chain
        .invoke(
            &InvocationTarget::new("Checkpoint", "run"),
            &RawParameters::new().with("verdict", "deny"),
            false,
        )
        .unwrap();

    assert_eq!(outcome.into_value(), Value::from("ran"));
    assert_eq!(recorder.calls(), vec!["run"]);
}

#[test]
fn test_controller_before_stops_some_action() {
    let (services, _) = services();
    let handlers = catalog();
    let chain = InvocationChain::new(
        &services,
        &handlers,
        Arc::new(Request::get("/blubb/155?some=foo")),
    );
    let target = InvocationTarget::new("Controller", "someAction");

    let open = chain
        .invoke(&target, &RawParameters::new().with("id", 155), true)
        .unwrap();
    assert_eq!(open.into_value(), Value::from("foo"));

    let closed = chain
        .invoke(
            &target,
            &RawParameters::new().with("id", 155).with("ok", false),
            true,
        )
        .unwrap();
    assert_eq!(closed, Outcome::ShortCircuited(Value::Bool(false)));
}

#[test]
fn test_each_invocation_builds_a_fresh_instance() {
    let (services, _) = services();
    let handlers = catalog();
    let chain = InvocationChain::new(&services, &handlers, Arc::new(Request::get("/?some=foo")));

    chain
        .invoke(
            &InvocationTarget::new("Controller", "someAction"),
            &RawParameters::new().with("id", 155),
            true,
        )
        .unwrap();
    let id = chain
        .invoke(
            &InvocationTarget::new("Controller", "getId"),
            &RawParameters::new(),
            true,
        )
        .unwrap();

    assert_eq!(id.into_value(), Value::Int(317));
}
