use std::sync::{Arc, Mutex};

use http::Method;
use segrouter::dispatcher::{HandlerRegistry, HandlerResponse, Outcome};
use segrouter::middleware::{
    from_fn, Middleware, MetricsMiddleware, RequestContext, Stage, TracingMiddleware,
};
use segrouter::router::{MethodSet, Router};

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(Stage, String, Method)>>,
}

impl Middleware for Recorder {
    fn call(&self, ctx: &RequestContext) {
        self.seen
            .lock()
            .unwrap()
            .push((ctx.stage, ctx.path.clone(), ctx.method.clone()));
    }
}

#[test]
fn test_context_carries_raw_request() {
    let recorder = Arc::new(Recorder::default());
    let unit: Arc<dyn Middleware> = recorder.clone();

    let mut router = Router::new();
    router.add_prefix_middlewares([Arc::clone(&unit)]);
    router.add_suffix_middlewares([unit]);
    router
        .add_route("/Users/{id}/show", |_| HandlerResponse::text(200, "ok"))
        .unwrap();

    router.handle_request(&Method::GET, "/USERS/1/show").unwrap();
    let seen = recorder.seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            (Stage::Prefix, "/USERS/1/show".to_string(), Method::GET),
            (Stage::Suffix, "/USERS/1/show".to_string(), Method::GET),
        ]
    );
}

#[test]
fn test_metrics_middleware_counts_per_stage() {
    let metrics = Arc::new(MetricsMiddleware::new());
    let unit: Arc<dyn Middleware> = metrics.clone();

    let mut router = Router::new();
    router.add_prefix_middlewares([Arc::clone(&unit)]);
    router.add_suffix_middlewares([Arc::clone(&unit)]);
    router
        .add_route_with(
            "/a",
            |_| HandlerResponse::text(200, "ok"),
            MethodSet::default(),
            vec![unit],
        )
        .unwrap();

    for path in ["/a", "/a", "/b", "/"] {
        router.handle_request(&Method::GET, path).unwrap();
    }
    assert_eq!(metrics.request_count(), 4);
    assert_eq!(metrics.matched_count(), 2);
    assert_eq!(metrics.route_middleware_count(), 2);
}

#[test]
fn test_units_run_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut router = Router::new();
    for label in ["first", "second", "third"] {
        let log = Arc::clone(&log);
        router.add_prefix_middleware(move |_: &RequestContext| {
            log.lock().unwrap().push(label);
        });
    }
    router.add_prefix_middleware(TracingMiddleware);
    router
        .add_route("/a", |_| HandlerResponse::text(200, "ok"))
        .unwrap();

    router.handle_request(&Method::GET, "/a").unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn test_named_route_middleware_from_registry() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    {
        let log = Arc::clone(&log);
        registry.register_middleware(
            "audit",
            from_fn(move |ctx: &RequestContext| {
                log.lock().unwrap().push(ctx.stage);
            }),
        );
    }
    registry.register_handler("report", |_| HandlerResponse::text(200, "report"));

    let mut router = Router::new().with_registry(registry);
    router
        .add_route_named("/report", "report", MethodSet::default(), &["audit"])
        .unwrap();

    let d = router.handle_request(&Method::GET, "/report").unwrap();
    assert_eq!(d.outcome, Outcome::Handled);
    assert_eq!(*log.lock().unwrap(), vec![Stage::Route]);
}
