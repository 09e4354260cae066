use serde_json::json;
use treeroute::{App, ConfigError, IncludeOptions, NoMatchFound, Router, RouterId};

mod common;
use common::{body_json, get, respond};

fn users() -> Router {
    let mut users = Router::new("users");
    users.get("/users/", |_| "list").name("list_users").register().unwrap();
    users
        .get("/users/{id}/", |args| args.get::<String>("id"))
        .name("get_user")
        .param(treeroute::ParamSpec::path("id"))
        .register()
        .unwrap();
    users
}

#[test]
fn test_include_prefix_rebases_routes() {
    let mut app = App::new();
    let id = app
        .include(RouterId::ROOT, users(), IncludeOptions::default().prefix("/api"))
        .unwrap();

    assert_eq!(app.router(id).unwrap().prefix(), "/api");
    assert_eq!(body_json(&respond(&app, &get("/api/users/9/"))), json!("9"));
    assert!(app.propagate(&get("/users/9/")).unwrap().is_unhandled());
}

#[test]
fn test_prefixes_do_not_compose() {
    let mut app = App::new();
    let v1 = Router::new("v1").with_prefix("/v1").unwrap();
    let v1 = app.include(RouterId::ROOT, v1, IncludeOptions::default()).unwrap();
    app.include(v1, users(), IncludeOptions::default().prefix("/api"))
        .unwrap();

    assert_eq!(respond(&app, &get("/api/users/")).status, 200);
    assert!(app.propagate(&get("/v1/api/users/")).unwrap().is_unhandled());
}

#[test]
fn test_url_path_for_searches_the_tree() {
    let mut app = App::new();
    app.include(RouterId::ROOT, users(), IncludeOptions::default().prefix("/api"))
        .unwrap();

    assert_eq!(app.url_path_for("list_users", &[]).unwrap(), "/api/users/");
    assert_eq!(app.url_path_for("get_user", &[("id", "3")]).unwrap(), "/api/users/3/");
    assert_eq!(
        app.url_path_for("get_user", &[("user", "3")]).unwrap_err(),
        NoMatchFound {
            name: "get_user".to_string()
        }
    );
    assert!(app.url_path_for("nope", &[]).is_err());
}

#[test]
fn test_include_router_attaches_existing_router() {
    let mut app = App::new();
    let id = app.add_router(users());
    assert!(app.propagate(&get("/users/")).unwrap().is_unhandled());

    app.include_router(RouterId::ROOT, id, IncludeOptions::default())
        .unwrap();
    assert_eq!(respond(&app, &get("/users/")).status, 200);

    let err = app
        .include_router(RouterId::ROOT, id, IncludeOptions::default())
        .unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyAttached { .. }));
}

#[test]
fn test_cycles_are_rejected() {
    let mut app = App::new();
    let a = app.add_router(Router::new("a"));
    let b = app.add_router(Router::new("b"));
    app.attach(b, a).unwrap();

    assert!(matches!(app.attach(a, b), Err(ConfigError::CircularAttachment { .. })));
    assert!(matches!(app.attach(a, a), Err(ConfigError::SelfAttachment { .. })));
    assert!(matches!(
        app.attach(RouterId::ROOT, a),
        Err(ConfigError::RootAttachment)
    ));
}

#[test]
fn test_duplicate_explicit_names_are_rejected() {
    let mut router = Router::new("r");
    router.get("/a/", |_| "a").name("same").register().unwrap();
    let err = router.get("/b/", |_| "b").name("same").register().unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateRoute { .. }));
}

#[test]
fn test_invalid_registrations_are_rejected() {
    let mut router = Router::new("r");
    assert!(matches!(
        router.route("PURGE", "/a/", |_| "a").register(),
        Err(ConfigError::InvalidMethod { .. })
    ));
    assert!(matches!(
        router.get("/a", |_| "a").register(),
        Err(ConfigError::InvalidPath { .. })
    ));
    assert!(matches!(
        router.get("/a/", |_| "a").status(1000).register(),
        Err(ConfigError::InvalidStatusCode { status: 1000 })
    ));
    assert!(router.routes().is_empty());
}
