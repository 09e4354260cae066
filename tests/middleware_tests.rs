use serde_json::json;
use treeroute::{
    tracing_middleware, App, Filter, IncludeOptions, Middleware, Outcome, Reply, Response, Router,
    RouterId,
};

mod common;
use common::{body_json, get, respond, Trail};

fn outer(trail: &Trail, name: &'static str) -> Middleware<Outcome> {
    let trail = trail.clone();
    Middleware::new(move |data, next| {
        trail.push(format!("{}:before", name));
        let result = next(data);
        trail.push(format!("{}:after", name));
        result
    })
    .labelled(name)
}

fn inner(trail: &Trail, name: &'static str) -> Middleware<Reply> {
    let trail = trail.clone();
    Middleware::new(move |data, next| {
        trail.push(format!("{}:before", name));
        let result = next(data);
        trail.push(format!("{}:after", name));
        result
    })
    .labelled(name)
}

#[test]
fn test_onion_order_across_the_chain() {
    let trail = Trail::default();
    let mut app = App::new();
    app.root_mut()
        .outer_middleware(outer(&trail, "root-outer-1"))
        .outer_middleware(outer(&trail, "root-outer-2"))
        .middleware(inner(&trail, "root-inner"));

    let mut child = Router::new("child");
    child
        .outer_middleware(outer(&trail, "child-outer"))
        .middleware(inner(&trail, "child-inner"));
    let t = trail.clone();
    child
        .get("/c/", move |_| {
            t.push("handler");
            "ok"
        })
        .register()
        .unwrap();
    app.include(RouterId::ROOT, child, IncludeOptions::default()).unwrap();

    respond(&app, &get("/c/"));
    assert_eq!(
        trail.events(),
        vec![
            "root-outer-1:before",
            "root-outer-2:before",
            "child-outer:before",
            "root-inner:before",
            "child-inner:before",
            "handler",
            "child-inner:after",
            "root-inner:after",
            "child-outer:after",
            "root-outer-2:after",
            "root-outer-1:after",
        ]
    );
}

#[test]
fn test_outer_middleware_runs_when_root_filter_rejects() {
    let trail = Trail::default();
    let mut app = App::new();
    let mut guarded = Router::new("guarded");
    guarded
        .filter(Filter::new(|_| false))
        .outer_middleware(outer(&trail, "outer"))
        .middleware(inner(&trail, "inner"));
    guarded.get("/g/", |_| "never").register().unwrap();
    app.include(RouterId::ROOT, guarded, IncludeOptions::default()).unwrap();

    assert!(app.propagate(&get("/g/")).unwrap().is_unhandled());
    assert_eq!(trail.events(), vec!["outer:before", "outer:after"]);
}

#[test]
fn test_middleware_mutations_reach_the_handler() {
    let mut app = App::new();
    app.root_mut().middleware(Middleware::new(|data, next| {
        data.insert("tenant", "acme");
        next(data)
    }));
    app.root_mut()
        .get("/t/", |args| args.get::<String>("tenant"))
        .reads(["tenant"])
        .register()
        .unwrap();

    assert_eq!(body_json(&respond(&app, &get("/t/"))), json!("acme"));
}

#[test]
fn test_outer_middleware_can_short_circuit() {
    let mut app = App::new();
    app.root_mut().outer_middleware(Middleware::new(|_, _| {
        Ok(Outcome::Response(Response::text("maintenance").with_status(503)))
    }));
    app.root_mut().get("/", |_| "home").register().unwrap();

    let response = respond(&app, &get("/"));
    assert_eq!(response.status, 503);
    assert_eq!(response.body_text(), Some("maintenance"));
}

#[test]
fn test_inner_middleware_sees_skip() {
    let trail = Trail::default();
    let mut app = App::new();
    let t = trail.clone();
    app.root_mut().middleware(Middleware::new(move |data, next| {
        let reply = next(data)?;
        if matches!(reply, Reply::Skip) {
            t.push("skip");
        }
        Ok(reply)
    }));
    app.root_mut().get("/x/", |_| Reply::Skip).register().unwrap();
    app.root_mut().get("/x/", |_| "fallback").register().unwrap();

    assert_eq!(body_json(&respond(&app, &get("/x/"))), json!("fallback"));
    assert_eq!(trail.events(), vec!["skip"]);
}

#[test]
fn test_removed_middleware_no_longer_runs() {
    let trail = Trail::default();
    let mut app = App::new();
    let mw = inner(&trail, "inner");
    app.root_mut().middleware(mw.clone());
    app.root_mut().get("/", |_| "home").register().unwrap();

    assert!(app.root_mut().remove_middleware(&mw));
    assert!(!app.root_mut().remove_middleware(&mw));
    respond(&app, &get("/"));
    assert!(trail.events().is_empty());
}

#[test]
fn test_tracing_middleware_is_transparent() {
    let mut app = App::new();
    app.root_mut().outer_middleware(tracing_middleware());
    app.root_mut().get("/", |_| "home").register().unwrap();

    let response = respond(&app, &get("/"));
    assert_eq!(response.status, 200);
    assert!(app.propagate(&get("/missing/")).unwrap().is_unhandled());
}

#[test]
fn test_inner_middleware_can_skip_the_candidate() {
    let trail = Trail::default();
    let mut app = App::new();
    let mut gated = Router::new("gated");
    gated.middleware(Middleware::new(|_, _| Ok(Reply::Skip)));
    let t = trail.clone();
    gated
        .get("/x/", move |_| {
            t.push("gated");
            "gated"
        })
        .register()
        .unwrap();
    app.include(RouterId::ROOT, gated, IncludeOptions::default()).unwrap();
    let mut open = Router::new("open");
    open.get("/x/", |_| "open").register().unwrap();
    app.include(RouterId::ROOT, open, IncludeOptions::default()).unwrap();

    assert_eq!(body_json(&respond(&app, &get("/x/"))), json!("open"));
    assert!(trail.events().is_empty());
}
