use super::{Router, RouterId, RouterTree};
use crate::error::ConfigError;
use crate::route::ParamSpec;

fn tree_with(names: &[&str]) -> (RouterTree, Vec<RouterId>) {
    let mut tree = RouterTree::new(Router::new("app"));
    let ids = names.iter().map(|n| tree.add(Router::new(*n))).collect();
    (tree, ids)
}

#[test]
fn test_chain_head_walks_to_root() {
    let (mut tree, ids) = tree_with(&["a", "b"]);
    tree.attach(ids[0], RouterId::ROOT).expect("attach a");
    tree.attach(ids[1], ids[0]).expect("attach b");
    let head: Vec<_> = tree.chain_head(ids[1]).collect();
    assert_eq!(head, vec![ids[1], ids[0], RouterId::ROOT]);
}

#[test]
fn test_chain_tail_is_depth_first() {
    let (mut tree, ids) = tree_with(&["a", "a1", "b"]);
    tree.attach(ids[0], RouterId::ROOT).expect("attach a");
    tree.attach(ids[1], ids[0]).expect("attach a1");
    tree.attach(ids[2], RouterId::ROOT).expect("attach b");
    let tail: Vec<_> = tree.chain_tail(RouterId::ROOT).collect();
    assert_eq!(tail, vec![RouterId::ROOT, ids[0], ids[1], ids[2]]);
}

#[test]
fn test_attachment_errors() {
    let (mut tree, ids) = tree_with(&["a", "b"]);
    tree.attach(ids[0], RouterId::ROOT).expect("attach a");
    tree.attach(ids[1], ids[0]).expect("attach b");

    assert!(matches!(
        tree.attach(ids[0], ids[1]),
        Err(ConfigError::AlreadyAttached { .. })
    ));
    assert!(matches!(
        tree.attach(RouterId::ROOT, ids[1]),
        Err(ConfigError::RootAttachment)
    ));

    let c = tree.add(Router::new("c"));
    assert!(matches!(
        tree.attach(c, c),
        Err(ConfigError::SelfAttachment { .. })
    ));
}

#[test]
fn test_cycle_is_rejected() {
    let (mut tree, ids) = tree_with(&["a", "b"]);
    // b under a, then a under b
    tree.attach(ids[1], ids[0]).expect("attach b");
    assert!(matches!(
        tree.attach(ids[0], ids[1]),
        Err(ConfigError::CircularAttachment { .. })
    ));
}

#[test]
fn test_prefix_rules() {
    assert!(Router::new("r").with_prefix("/api").is_ok());
    assert!(Router::new("r").with_prefix("").is_ok());
    assert!(matches!(
        Router::new("r").with_prefix("api"),
        Err(ConfigError::InvalidPrefix { .. })
    ));
    assert!(Router::new("r").with_prefix("/api/").is_err());
}

#[test]
fn test_prefix_change_rebases_routes() {
    let mut router = Router::new("r");
    router.get("/items/", |_args| "items").register().expect("register");
    router.set_prefix("/v1").expect("prefix");
    assert_eq!(router.routes()[0].path().as_str(), "/v1/items/");
}

#[test]
fn test_duplicate_explicit_names_are_rejected() {
    let mut router = Router::new("r");
    router.get("/a/", |_args| "a").name("item").register().expect("first");
    let err = router
        .get("/b/", |_args| "b")
        .name("item")
        .register()
        .expect_err("duplicate");
    assert!(matches!(err, ConfigError::DuplicateRoute { .. }));

    // unnamed routes never collide
    router.get("/c/", |_args| "c").register().expect("unnamed");
    router.get("/d/", |_args| "d").register().expect("unnamed");
}

#[test]
fn test_registration_validates_path_and_method() {
    let mut router = Router::new("r");
    assert!(matches!(
        router.get("items/", |_args| "x").register(),
        Err(ConfigError::InvalidPath { .. })
    ));
    assert!(matches!(
        router.route("BREW", "/pot/", |_args| "x").register(),
        Err(ConfigError::InvalidMethod { .. })
    ));
    assert!(matches!(
        router.get("/x/", |_args| "x").status(1000).register(),
        Err(ConfigError::InvalidStatusCode { status: 1000 })
    ));
}

#[test]
fn test_url_path_for_needs_exact_params() {
    let mut router = Router::new("r");
    router
        .get("/users/{id}/", |_args| "user")
        .name("user")
        .param(ParamSpec::path("id"))
        .register()
        .expect("register");
    assert_eq!(
        router.url_path_for("user", &[("id", "3")]).as_deref(),
        Some("/users/3/")
    );
    assert_eq!(router.url_path_for("user", &[]), None);
    assert_eq!(router.url_path_for("user", &[("uid", "3")]), None);
    assert_eq!(router.url_path_for("other", &[("id", "3")]), None);
}
