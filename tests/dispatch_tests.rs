use serde_json::json;
use treeroute::{App, Filter, IncludeOptions, Outcome, Reply, ResponseKind, Router, RouterId};

mod common;
use common::{body_json, get, post, respond, Trail};

#[test]
fn test_root_literal_route() {
    let mut app = App::new();
    app.root_mut().get("/", |_| "home").register().unwrap();

    let response = respond(&app, &get("/"));
    assert_eq!(response.status, 200);
    assert_eq!(body_json(&response), json!("home"));
}

#[test]
fn test_root_literal_route_as_plain_text() {
    let mut app = App::new();
    app.root_mut()
        .get("/", |_| "home")
        .response_kind(ResponseKind::PlainText)
        .register()
        .unwrap();

    let response = respond(&app, &get("/"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), Some("home"));
}

#[test]
fn test_unmatched_request_is_unhandled() {
    let mut app = App::new();
    app.root_mut().get("/a/", |_| "a").register().unwrap();

    assert!(app.propagate(&get("/b/")).unwrap().is_unhandled());
    // Method is part of the match
    assert!(app.propagate(&post("/a/")).unwrap().is_unhandled());
}

#[test]
fn test_filter_mappings_merge_in_order() {
    let mut app = App::new();
    app.root_mut()
        .filter(Filter::new(|_| json!({ "user": "alice", "role": "guest" })));
    app.root_mut()
        .get("/me/", |args| {
            Ok::<_, anyhow::Error>(json!({
                "user": args.get::<String>("user")?,
                "role": args.get::<String>("role")?,
            }))
        })
        .filter(
            Filter::new(|args| {
                let user: String = args.get("user")?;
                Ok::<_, anyhow::Error>(json!({ "role": format!("owner:{}", user) }))
            })
            .reads(["user"]),
        )
        .reads(["user", "role"])
        .register()
        .unwrap();

    let response = respond(&app, &get("/me/"));
    assert_eq!(body_json(&response), json!({ "user": "alice", "role": "owner:alice" }));
}

#[test]
fn test_empty_mapping_rejects() {
    let mut app = App::new();
    app.root_mut()
        .get("/x/", |_| "never")
        .filter(Filter::new(|_| json!({})))
        .register()
        .unwrap();

    assert!(app.propagate(&get("/x/")).unwrap().is_unhandled());
}

#[test]
fn test_handler_sees_only_declared_keys() {
    let mut app = App::new();
    app.set("secret", "s3cr3t");
    app.set("visible", 1);
    app.root_mut()
        .get("/", |args| json!({ "keys": args.bound().keys().cloned().collect::<Vec<_>>() }))
        .reads(["visible"])
        .register()
        .unwrap();

    assert_eq!(body_json(&respond(&app, &get("/"))), json!({ "keys": ["visible"] }));
}

#[test]
fn test_sibling_fallthrough_on_route_filter() {
    let mut app = App::new();
    let mut first = Router::new("first");
    first
        .get("/x/", |_| "first")
        .filter(Filter::new(|_| false))
        .register()
        .unwrap();
    let mut second = Router::new("second");
    second.get("/x/", |_| "second").register().unwrap();
    app.include(RouterId::ROOT, first, IncludeOptions::default()).unwrap();
    app.include(RouterId::ROOT, second, IncludeOptions::default()).unwrap();

    assert_eq!(body_json(&respond(&app, &get("/x/"))), json!("second"));
}

#[test]
fn test_first_found_wins() {
    let trail = Trail::default();
    let mut app = App::new();

    let t = trail.clone();
    app.root_mut()
        .get("/x/", move |_| {
            t.push("root");
            "root"
        })
        .register()
        .unwrap();

    let mut child = Router::new("child");
    let t = trail.clone();
    child
        .get("/x/", move |_| {
            t.push("child");
            "child"
        })
        .register()
        .unwrap();
    app.include(RouterId::ROOT, child, IncludeOptions::default()).unwrap();

    assert_eq!(body_json(&respond(&app, &get("/x/"))), json!("root"));
    assert_eq!(trail.count("root"), 1);
    assert_eq!(trail.count("child"), 0);
}

#[test]
fn test_children_are_searched_depth_first() {
    let mut app = App::new();
    let a = app
        .include(RouterId::ROOT, Router::new("a"), IncludeOptions::default())
        .unwrap();
    let mut nested = Router::new("a.nested");
    nested.get("/x/", |_| "nested").register().unwrap();
    app.include(a, nested, IncludeOptions::default()).unwrap();
    let mut b = Router::new("b");
    b.get("/x/", |_| "b").register().unwrap();
    app.include(RouterId::ROOT, b, IncludeOptions::default()).unwrap();

    assert_eq!(body_json(&respond(&app, &get("/x/"))), json!("nested"));
}

#[test]
fn test_root_filters_are_scoped_to_their_subtree() {
    let mut app = App::new();
    let mut guarded = Router::new("guarded");
    guarded.filter(Filter::new(|_| false));
    guarded.get("/guarded/", |_| "guarded").register().unwrap();
    let guarded = app
        .include(RouterId::ROOT, guarded, IncludeOptions::default())
        .unwrap();

    let mut nested = Router::new("nested");
    nested.get("/nested/", |_| "nested").register().unwrap();
    app.include(guarded, nested, IncludeOptions::default()).unwrap();

    let mut open = Router::new("open");
    open.get("/open/", |_| "open").register().unwrap();
    app.include(RouterId::ROOT, open, IncludeOptions::default()).unwrap();
    app.root_mut().get("/root/", |_| "root").register().unwrap();

    assert!(app.propagate(&get("/guarded/")).unwrap().is_unhandled());
    assert!(app.propagate(&get("/nested/")).unwrap().is_unhandled());
    assert_eq!(body_json(&respond(&app, &get("/open/"))), json!("open"));
    assert_eq!(body_json(&respond(&app, &get("/root/"))), json!("root"));
}

#[test]
fn test_root_filters_run_root_first() {
    let trail = Trail::default();
    let mut app = App::new();
    let t = trail.clone();
    app.root_mut().filter(Filter::new(move |_| {
        t.push("root");
        true
    }));
    let mut child = Router::new("child");
    let t = trail.clone();
    child.filter(Filter::new(move |_| {
        t.push("child");
        true
    }));
    let t = trail.clone();
    child
        .get("/c/", |_| "c")
        .filter(Filter::new(move |_| {
            t.push("route");
            true
        }))
        .register()
        .unwrap();
    app.include(RouterId::ROOT, child, IncludeOptions::default()).unwrap();

    respond(&app, &get("/c/"));
    assert_eq!(trail.events(), vec!["root", "child", "route"]);
}

#[test]
fn test_skip_moves_to_next_candidate() {
    let trail = Trail::default();
    let mut app = App::new();
    let t = trail.clone();
    app.root_mut()
        .get("/x/", move |_| {
            t.push("skipped");
            Reply::Skip
        })
        .register()
        .unwrap();
    app.root_mut().get("/x/", |_| "second").register().unwrap();

    assert_eq!(body_json(&respond(&app, &get("/x/"))), json!("second"));
    assert_eq!(trail.count("skipped"), 1);
}

#[test]
fn test_skip_on_last_candidate_is_unhandled() {
    let mut app = App::new();
    app.root_mut().get("/x/", |_| Reply::Skip).register().unwrap();
    assert!(app.propagate(&get("/x/")).unwrap().is_unhandled());
}

#[test]
fn test_filter_merges_do_not_leak_between_candidates() {
    let mut app = App::new();
    app.root_mut()
        .get("/x/", |_| "first")
        .filter(Filter::new(|_| json!({ "tag": "leaked" })))
        .filter(Filter::new(|_| false))
        .register()
        .unwrap();
    app.root_mut()
        .get("/x/", |args| json!({ "tag": args.value("tag").cloned() }))
        .reads(["tag"])
        .register()
        .unwrap();

    assert_eq!(body_json(&respond(&app, &get("/x/"))), json!({ "tag": null }));
}

#[test]
fn test_response_kind_resolution() {
    let mut app = App::new();
    let mut text = Router::new("text");
    text.get("/plain/", |_| "hello").register().unwrap();
    text.get("/page/", |_| "<p>hi</p>")
        .response_kind(ResponseKind::Html)
        .register()
        .unwrap();
    app.include(
        RouterId::ROOT,
        text,
        IncludeOptions::default().default_response_kind(ResponseKind::PlainText),
    )
    .unwrap();
    app.root_mut().get("/json/", |_| "hello").status(201).register().unwrap();

    let plain = respond(&app, &get("/plain/"));
    assert_eq!(plain.content_type().as_deref(), Some("text/plain; charset=utf-8"));
    assert_eq!(plain.body_text(), Some("hello"));

    let page = respond(&app, &get("/page/"));
    assert_eq!(page.media_type.as_deref(), Some("text/html"));

    let json = respond(&app, &get("/json/"));
    assert_eq!(json.status, 201);
    assert_eq!(json.body_text(), Some("\"hello\""));
}

#[test]
fn test_handler_response_passes_through() {
    let mut app = App::new();
    app.root_mut()
        .get("/go/", |_| treeroute::Response::redirect("/there/"))
        .register()
        .unwrap();

    let response = respond(&app, &get("/go/"));
    assert_eq!(response.status, 307);
    assert_eq!(response.get_header("location"), Some("/there/"));
}

#[test]
fn test_response_model_is_enforced() {
    let mut app = App::new();
    app.root_mut()
        .get("/bad/", |_| json!({ "name": "x" }))
        .response_model(json!({ "type": "object", "required": ["id"] }))
        .register()
        .unwrap();

    let err = app.propagate(&get("/bad/")).unwrap_err();
    assert!(err.is::<treeroute::ResponseValidationError>());
}

#[test]
fn test_outcome_converts_to_not_found() {
    let app = App::new();
    let response = match app.propagate(&get("/missing/")).unwrap() {
        Outcome::Response(r) => r,
        Outcome::Unhandled => App::not_found(),
    };
    assert_eq!(response.status, 404);
}
