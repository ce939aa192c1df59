#![allow(dead_code)]

use rivet::{
    Dispatcher, HandlerDefinition, Injectable, ParameterDescriptor, Request, Service,
    ServiceRegistry, StaticRouteResolver, testing::CallRecorder,
};
use std::sync::Arc;

// ============================================================================
// Test Services
// ============================================================================

pub trait HelloService: Send + Sync {
    fn hello_world(&self) -> String;
}

#[derive(Default)]
pub struct ServiceSub;

impl HelloService for ServiceSub {
    fn hello_world(&self) -> String {
        "Hello World Sub".to_string()
    }
}

/// `serviceSub` (also viewable as `dyn HelloService`), a call recorder and
/// the `baseUrl` parameter.
pub fn services() -> (ServiceRegistry, Arc<CallRecorder>) {
    let recorder = Arc::new(CallRecorder::new());
    let registry = ServiceRegistry::builder()
        .register(
            Service::new("serviceSub", |_| ServiceSub)
                .provides::<dyn HelloService>(|sub| sub as Arc<dyn HelloService>),
        )
        .register(Service::from_instance("recorder", recorder.clone()))
        .parameter("baseUrl", "/home")
        .build()
        .unwrap();
    (registry, recorder)
}

// ============================================================================
// Test Handlers
// ============================================================================

pub struct Controller {
    service: Arc<dyn HelloService>,
    id: i64,
    base_url: String,
}

impl Controller {
    pub fn id(&self) -> i64 {
        self.id
    }

    /// `baseUrl` as last bound by `someAction`; empty until then.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns true if the held service is exactly `other`.
    pub fn uses_service(&self, other: &Arc<ServiceSub>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.service), Arc::as_ptr(other))
    }

    pub fn hello_world(&self) -> String {
        self.service.hello_world()
    }
}

impl Injectable for Controller {
    fn definition() -> HandlerDefinition<Self> {
        HandlerDefinition::new(
            "Controller",
            vec![
                ParameterDescriptor::typed::<dyn HelloService>("service"),
                ParameterDescriptor::named("id").with_default(317),
            ],
            |service: Arc<dyn HelloService>, id: i64| Controller {
                service,
                id,
                base_url: String::new(),
            },
        )
        .method(
            "before",
            vec![ParameterDescriptor::named("ok").with_default(true)],
            |_: &mut Controller, ok: bool| ok,
        )
        .method(
            "someAction",
            vec![
                ParameterDescriptor::typed::<Request>("request"),
                ParameterDescriptor::typed::<ServiceSub>("service"),
                ParameterDescriptor::named("id"),
                ParameterDescriptor::named("baseUrl"),
            ],
            |this: &mut Controller,
             request: Arc<Request>,
             service: Arc<ServiceSub>,
             id: i64,
             base_url: String| {
                this.service = service;
                this.id = id;
                this.base_url = base_url;
                request.query("some").map(str::to_string)
            },
        )
        .method("helloWorld", vec![], |this: &mut Controller| {
            this.hello_world()
        })
        .method("getId", vec![], |this: &mut Controller| this.id())
    }
}

/// Application-level gate; records every call.
pub struct Gate {
    recorder: Arc<CallRecorder>,
}

impl Injectable for Gate {
    fn definition() -> HandlerDefinition<Self> {
        HandlerDefinition::new(
            "Gate",
            vec![ParameterDescriptor::typed::<CallRecorder>("recorder")],
            |recorder: Arc<CallRecorder>| Gate { recorder },
        )
        .method(
            "check",
            vec![ParameterDescriptor::named("open").with_default(true)],
            |this: &mut Gate, open: bool| {
                this.recorder.record("Gate::check");
                open
            },
        )
    }
}

// ============================================================================
// Dispatcher Builders
// ============================================================================

pub fn static_routes() -> StaticRouteResolver {
    use rivet::RouteTableBuilder;

    StaticRouteResolver::builder()
        .route("/blubb", "Controller::someAction")
        .unwrap()
        .route("/hello", "Controller::helloWorld")
        .unwrap()
        .build()
        .unwrap()
}

pub fn dispatcher() -> (Dispatcher, Arc<CallRecorder>) {
    let (services, recorder) = services();
    let dispatcher = Dispatcher::builder()
        .services(Arc::new(services))
        .handler::<Controller>()
        .handler::<Gate>()
        .routes(static_routes())
        .build()
        .unwrap();
    (dispatcher, recorder)
}
