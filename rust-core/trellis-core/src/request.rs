//! # Request Source
//!
//! The router only needs two facts from the HTTP layer: the request method
//! and the request path. `RequestSource` is that narrow seam.
//!
//! - `Target` is an explicit `(method, path)` pair, used both as the ambient
//!   request in tests and as a per-call override.
//! - `hyper::Request<B>` implements the trait directly.
//!
//! Both hand the router a percent-decoded path, so UTF-8 routes match the
//! encoded form a client actually sends.

use std::borrow::Cow;

/// Supplies the current request method and path to the router
pub trait RequestSource {
    /// HTTP method of the current request (any case)
    fn method(&self) -> String;

    /// Path of the current request, without the query string
    fn path(&self) -> String;
}

/// An explicit request method and path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// HTTP method
    pub method: String,
    /// Request path (query string stripped)
    pub path: String,
}

impl Target {
    /// Create a target; anything after `?` in `path` is discarded and the
    /// rest is percent-decoded
    #[must_use]
    pub fn new(method: impl Into<String>, path: &str) -> Self {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        let path = if path.is_empty() { "/" } else { path };

        Self {
            method: method.into(),
            path: decode_path(path).into_owned(),
        }
    }
}

impl RequestSource for Target {
    fn method(&self) -> String {
        self.method.clone()
    }

    fn path(&self) -> String {
        self.path.clone()
    }
}

impl<B> RequestSource for hyper::Request<B> {
    fn method(&self) -> String {
        self.method().as_str().to_string()
    }

    fn path(&self) -> String {
        decode_path(self.uri().path()).into_owned()
    }
}

/// Percent-decode a request path; paths that do not decode to UTF-8 are kept as sent
#[must_use]
pub fn decode_path(path: &str) -> Cow<'_, str> {
    urlencoding::decode(path).unwrap_or(Cow::Borrowed(path))
}

/// Case-insensitive method comparison; a route method of `any` matches everything
#[must_use]
pub fn method_is(route_method: &str, request_method: &str) -> bool {
    route_method.eq_ignore_ascii_case("any") || route_method.eq_ignore_ascii_case(request_method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_strips_query_string() {
        let target = Target::new("GET", "/bar/baz?filters%5Bstate%5D=2");
        assert_eq!(target.path, "/bar/baz");
    }

    #[test]
    fn test_target_empty_path_is_root() {
        let target = Target::new("GET", "");
        assert_eq!(RequestSource::path(&target), "/");
    }

    #[test]
    fn test_hyper_request_source() {
        let req = hyper::Request::builder()
            .method("POST")
            .uri("http://test:8000/users/42?page=1")
            .body(())
            .unwrap();

        assert_eq!(RequestSource::method(&req), "POST");
        assert_eq!(RequestSource::path(&req), "/users/42");
    }

    #[test]
    fn test_hyper_request_path_is_decoded() {
        let req = hyper::Request::builder()
            .uri("http://test:8000/%D0%B6%D0%BE%D0%BB?q=1")
            .body(())
            .unwrap();

        assert_eq!(RequestSource::path(&req), "/жол");
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/plain/path"), "/plain/path");
        assert_eq!(decode_path("/a%20b"), "/a b");
        assert_eq!(decode_path("/bad%FF"), "/bad%FF");
    }

    #[test]
    fn test_method_is() {
        assert!(method_is("get", "GET"));
        assert!(method_is("any", "ANYTHING"));
        assert!(!method_is("post", "GET"));
    }
}
