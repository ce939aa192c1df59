//! Handlers that register themselves through `inventory`.

#![cfg(all(feature = "macros", feature = "inventory"))]

use rivet::{Dispatcher, Request, RouteTableBuilder, StaticRouteResolver, handler};

#[derive(Default)]
struct Health;

#[handler(register)]
impl Health {
    fn check(&self) -> &'static str {
        "ok"
    }
}

#[derive(Default)]
struct Version;

#[handler(name = "Version", register)]
impl Version {
    fn show(&self) -> i64 {
        1
    }
}

#[test]
fn test_collect_registered() {
    let dispatcher = Dispatcher::builder()
        .collect_registered()
        .routes(
            StaticRouteResolver::builder()
                .route("/health", "Health::check")
                .unwrap()
                .route("/version", "Version::show")
                .unwrap()
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    assert!(dispatcher.handlers().get("Health").is_some());
    assert_eq!(dispatcher.handle(Request::get("/health")).body(), "ok");
    assert_eq!(dispatcher.handle(Request::get("/version")).body(), "1");
}

#[test]
fn test_registrations_are_visible() {
    let names: Vec<_> = rivet::inventory::iter::<rivet::HandlerRegistration>
        .into_iter()
        .map(|registration| registration.name)
        .collect();

    assert!(names.contains(&"Health"));
    assert!(names.contains(&"Version"));
}
