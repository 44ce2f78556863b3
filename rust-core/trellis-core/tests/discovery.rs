use std::path::PathBuf;
use trellis_core::{Error, Router, Target, TextLoader};

fn fixtures(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn files(method: &str, path: &str) -> Option<String> {
    let router = Router::new(Target::new(method, path), TextLoader);
    router.files(fixtures("route_files"), "", None).unwrap()
}

fn resource(method: &str, path: &str) -> Option<String> {
    let router = Router::new(Target::new(method, path), TextLoader);
    router
        .resource("/resources", fixtures("route_resources"), None, None)
        .unwrap()
}

#[test]
fn test_files_by_convention() {
    assert_eq!(files("GET", "/").as_deref(), Some("index.get"));
    assert_eq!(files("GET", "/about").as_deref(), Some("about.index.get"));
    assert_eq!(files("GET", "/contact").as_deref(), Some("contact.get"));
    assert_eq!(files("POST", "/contact").as_deref(), Some("contact.post"));
    assert_eq!(files("GET", "/foo/7").as_deref(), Some("foo.$id.get"));
    assert_eq!(files("GET", "/returns").as_deref(), Some("returns.get"));
}

#[test]
fn test_files_optional_segment() {
    assert_eq!(files("GET", "/users").as_deref(), Some("users.@page.get"));
    assert_eq!(files("GET", "/users/2").as_deref(), Some("users.@page.get"));
}

#[test]
fn test_files_skip_hidden_and_foreign() {
    assert_eq!(files("GET", "/_hidden"), None);
    assert_eq!(files("GET", "/notes"), None);
    assert_eq!(files("PUT", "/contact"), None);
}

#[test]
fn test_files_with_prefix() {
    let router = Router::new(Target::new("GET", "/app"), TextLoader);
    let home = router.files(fixtures("route_files"), "/app/", None).unwrap();
    assert_eq!(home.as_deref(), Some("index.get"));

    let contact = router
        .files(
            fixtures("route_files"),
            "/app",
            Some(&Target::new("GET", "/app/contact")),
        )
        .unwrap();
    assert_eq!(contact.as_deref(), Some("contact.get"));
}

#[test]
fn test_files_missing_root() {
    let router: Router<String> = Router::new(Target::new("GET", "/"), TextLoader);
    let result = router.files("path/does/not/exists", "", None);
    assert!(matches!(result, Err(Error::InvalidArgument { .. })));
}

#[test]
fn test_resource_actions() {
    assert_eq!(resource("GET", "/resources").as_deref(), Some("resources.index"));
    assert_eq!(
        resource("GET", "/resources/create").as_deref(),
        Some("resources.create")
    );
    assert_eq!(
        resource("GET", "/resources/1/edit").as_deref(),
        Some("resources.edit")
    );
    assert_eq!(resource("GET", "/resources/1").as_deref(), Some("resources.show"));
    assert_eq!(resource("POST", "/resources").as_deref(), Some("resources.store"));
    assert_eq!(resource("PUT", "/resources/1").as_deref(), Some("resources.update"));
    assert_eq!(
        resource("DELETE", "/resources/1").as_deref(),
        Some("resources.destroy")
    );
    assert_eq!(resource("PATCH", "/resources/1"), None);
}

#[test]
fn test_resource_with_identity() {
    let router = Router::new(Target::new("GET", "/"), TextLoader);
    let show = router
        .resource(
            "slug",
            fixtures("route_resources/slug"),
            Some("slug"),
            Some(&Target::new("GET", "/slug/hello-world")),
        )
        .unwrap();
    assert_eq!(show.as_deref(), Some("slug.show"));

    let update = router
        .resource(
            "slug",
            fixtures("route_resources/slug"),
            Some("slug"),
            Some(&Target::new("PUT", "/slug/hello-world")),
        )
        .unwrap();
    assert_eq!(update.as_deref(), Some("slug.update"));
}
