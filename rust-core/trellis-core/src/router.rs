//! # Router
//!
//! Sequential, regex based route dispatch. Every call to [`Router::handle`]
//! (or a verb helper) is one route attempt evaluated immediately against
//! the current request; the first attempt that matches runs its handler.
//!
//! ## Features
//!
//! - Path parameter extraction (`/users/{id}`, `/users/{id:[0-9]+}`)
//! - Optional segments (`/users/?{page}?`) and rest-of-path captures (`{path@}`)
//! - Closure handlers and file handlers (see [`crate::loader`])
//! - Cancel / stop-propagation flags shared with handlers through `&self`
//! - Global base prefix applied to every pattern
//!
//! Discovery strategies built on top of `handle` live in [`crate::discovery`]
//! and [`crate::controller`].

use crate::config::RouterConfig;
use crate::error::Result;
use crate::loader::{Loader, RequireCache};
use crate::request::{method_is, RequestSource, Target};
use crate::route::{CompiledPattern, Params};
use crate::state::RouteState;
use std::cell::RefCell;
use std::path::PathBuf;

/// Route handler
pub enum Handler<'a, R> {
    /// A closure receiving the captured parameters
    Func(Box<dyn FnOnce(&Params) -> R + 'a>),
    /// A file to load (once) and invoke when callable
    File(PathBuf),
}

/// File path used as a route handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFile(pub PathBuf);

impl RouteFile {
    /// Wrap a path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

/// Conversion into a [`Handler`]
pub trait IntoHandler<'a, R> {
    /// Perform the conversion
    fn into_handler(self) -> Handler<'a, R>;
}

impl<'a, R> IntoHandler<'a, R> for Handler<'a, R> {
    fn into_handler(self) -> Handler<'a, R> {
        self
    }
}

impl<'a, R> IntoHandler<'a, R> for RouteFile {
    fn into_handler(self) -> Handler<'a, R> {
        Handler::File(self.0)
    }
}

impl<'a, R, F> IntoHandler<'a, R> for F
where
    F: FnOnce(&Params) -> R + 'a,
{
    fn into_handler(self) -> Handler<'a, R> {
        Handler::Func(Box::new(self))
    }
}

/// Per-request router
///
/// Holds the routing flags, the base prefix, the ambient request and the
/// file-handler cache. Not `Sync`; build one per request.
pub struct Router<R> {
    state: RouteState,
    base: RefCell<String>,
    source: Box<dyn RequestSource>,
    files: RequireCache<R>,
    config: RouterConfig,
}

impl<R: Clone> Router<R> {
    /// Create a router reading the ambient request from `source`
    pub fn new(source: impl RequestSource + 'static, loader: impl Loader<R> + 'static) -> Self {
        Self {
            state: RouteState::new(),
            base: RefCell::new(String::new()),
            source: Box::new(source),
            files: RequireCache::new(loader),
            config: RouterConfig::default(),
        }
    }

    /// Replace the discovery configuration
    #[must_use]
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Discovery configuration
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Routing flags
    #[must_use]
    pub fn state(&self) -> &RouteState {
        &self.state
    }

    /// File-handler cache
    #[must_use]
    pub fn require_cache(&self) -> &RequireCache<R> {
        &self.files
    }

    /// Attempt one route
    ///
    /// Returns `Ok(None)` without evaluating the pattern when routing is
    /// canceled, or when a route already matched and propagation is stopped.
    /// Otherwise the pattern is matched against the effective request path
    /// (the override when given, else the ambient request) and the method is
    /// compared case-insensitively (`any` matches every method).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` for a malformed template, or a
    /// loader error from a file handler.
    pub fn handle<'a>(
        &self,
        method: &str,
        path: &str,
        handler: impl IntoHandler<'a, R>,
        request: Option<&Target>,
    ) -> Result<Option<R>> {
        let Some(params) = self.attempt(method, path, request)? else {
            return Ok(None);
        };

        match handler.into_handler() {
            Handler::Func(call) => Ok(Some(call(&params))),
            Handler::File(file) => self.files.require(&file, &params),
        }
    }

    /// Match one route and record the match, without invoking anything
    pub(crate) fn attempt(
        &self,
        method: &str,
        path: &str,
        request: Option<&Target>,
    ) -> Result<Option<Params>> {
        if self.state.is_blocked() {
            return Ok(None);
        }

        let pattern = CompiledPattern::new(path, &self.base.borrow())?;
        let (request_method, request_path) = self.method_path(request);

        if !method_is(method, &request_method) {
            return Ok(None);
        }

        let Some(params) = pattern.captures(&request_path) else {
            return Ok(None);
        };

        tracing::debug!(method, pattern = path, path = %request_path, "route matched");
        self.state.mark_match();

        Ok(Some(params))
    }

    /// Route a GET request
    ///
    /// # Errors
    ///
    /// See [`Router::handle`].
    pub fn get<'a>(
        &self,
        path: &str,
        handler: impl IntoHandler<'a, R>,
        request: Option<&Target>,
    ) -> Result<Option<R>> {
        self.handle("get", path, handler, request)
    }

    /// Route a POST request
    ///
    /// # Errors
    ///
    /// See [`Router::handle`].
    pub fn post<'a>(
        &self,
        path: &str,
        handler: impl IntoHandler<'a, R>,
        request: Option<&Target>,
    ) -> Result<Option<R>> {
        self.handle("post", path, handler, request)
    }

    /// Route a PUT request
    ///
    /// # Errors
    ///
    /// See [`Router::handle`].
    pub fn put<'a>(
        &self,
        path: &str,
        handler: impl IntoHandler<'a, R>,
        request: Option<&Target>,
    ) -> Result<Option<R>> {
        self.handle("put", path, handler, request)
    }

    /// Route a DELETE request
    ///
    /// # Errors
    ///
    /// See [`Router::handle`].
    pub fn delete<'a>(
        &self,
        path: &str,
        handler: impl IntoHandler<'a, R>,
        request: Option<&Target>,
    ) -> Result<Option<R>> {
        self.handle("delete", path, handler, request)
    }

    /// Route an OPTIONS request
    ///
    /// # Errors
    ///
    /// See [`Router::handle`].
    pub fn options<'a>(
        &self,
        path: &str,
        handler: impl IntoHandler<'a, R>,
        request: Option<&Target>,
    ) -> Result<Option<R>> {
        self.handle("options", path, handler, request)
    }

    /// Route a request of any method
    ///
    /// # Errors
    ///
    /// See [`Router::handle`].
    pub fn any<'a>(
        &self,
        path: &str,
        handler: impl IntoHandler<'a, R>,
        request: Option<&Target>,
    ) -> Result<Option<R>> {
        self.handle("any", path, handler, request)
    }

    /// Effective `(method, path)`: the override when given, else the ambient request
    #[must_use]
    pub fn method_path(&self, request: Option<&Target>) -> (String, String) {
        match request {
            Some(target) => (target.method.clone(), target.path.clone()),
            None => (self.source.method(), self.source.path()),
        }
    }

    /// Set the prefix prepended to every compiled pattern
    pub fn base(&self, path: &str) {
        path.clone_into(&mut self.base.borrow_mut());
    }

    /// Current base prefix
    #[must_use]
    pub fn base_path(&self) -> String {
        self.base.borrow().clone()
    }

    /// Suppress every further route attempt
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Clear the cancel and stop-propagation flags
    pub fn resume(&self) {
        self.state.resume();
    }

    /// Forget that a route matched
    pub fn purge_match(&self) {
        self.state.purge_match();
    }

    /// Skip further routes once one has matched
    pub fn stop_propagation(&self) {
        self.state.stop_propagation();
    }

    /// Returns true if routing is canceled
    #[must_use]
    pub fn canceled(&self) -> bool {
        self.state.canceled()
    }

    /// Returns true if a route has matched
    #[must_use]
    pub fn did_match(&self) -> bool {
        self.state.did_match()
    }

    /// Returns true if propagation has stopped
    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.state.is_propagation_stopped()
    }
}
