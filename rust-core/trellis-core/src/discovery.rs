//! # Route Discovery
//!
//! Convention based registration on top of [`Router::handle`]:
//!
//! - [`Router::files`] walks a directory of route files and derives each
//!   route from the file's relative path (see [`routify`])
//! - [`Router::resource`] maps the seven REST actions onto files of one directory
//!
//! Both try their routes in a fixed order and stop at the first match.
//!
//! ## File naming
//!
//! ```text
//! index.get.route          GET  /
//! about/index.get.route    GET  /about
//! users.$id.get.route      GET  /users/{id}
//! users/@page.get.route    GET  /users/?{page}?
//! _partial.get.route       skipped
//! ```

use crate::error::{Error, Result};
use crate::request::Target;
use crate::router::{RouteFile, Router};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Derive `(method, path)` from a route file path relative to the routes root
///
/// Uses `index` as the marker segment that is dropped.
#[must_use]
pub fn routify(filename: &str) -> (String, String) {
    routify_with(filename, "index")
}

/// [`routify`] with a custom index marker
#[must_use]
pub fn routify_with(filename: &str, index_marker: &str) -> (String, String) {
    let filename = filename.replace('\\', "/");
    let filename = filename.trim_matches('/').replace('/', ".");

    let mut tokens: Vec<String> = filename.split('.').map(str::to_string).collect();
    tokens.pop();

    let mut tokens: Vec<String> = tokens
        .into_iter()
        .map(|token| {
            if let Some(name) = token.strip_prefix('$') {
                format!("{{{name}}}")
            } else if let Some(name) = token.strip_prefix('@') {
                format!("?{{{name}}}?")
            } else {
                token
            }
        })
        .collect();

    let method = tokens.pop().unwrap_or_default();
    tokens.retain(|segment| segment != index_marker);

    let path = format!("/{}", tokens.join("/").trim_matches('/'));
    (method, path)
}

impl<R: Clone> Router<R> {
    /// Route every file under `root` by filename convention
    ///
    /// Files are tried in lexicographic order of their full path; files
    /// whose name starts with the hidden prefix are skipped. `prefix` is
    /// prepended to every derived path (and replaces the root path `/`).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` when `root` does not exist, or any
    /// error raised while handling a route.
    pub fn files(
        &self,
        root: impl AsRef<Path>,
        prefix: &str,
        request: Option<&Target>,
    ) -> Result<Option<R>> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|_| Error::InvalidArgument {
            message: format!("{} does not exists", root.display()),
        })?;

        let prefix = prefix.trim_end_matches('/');

        for file in self.route_files(&root) {
            let Ok(relative) = file.strip_prefix(&root) else {
                continue;
            };

            let (method, path) =
                routify_with(&relative.to_string_lossy(), &self.config().index_marker);
            let path = if path == "/" {
                if prefix.is_empty() {
                    path
                } else {
                    prefix.to_string()
                }
            } else {
                format!("{prefix}{path}")
            };

            tracing::debug!(file = %relative.display(), method = %method, path = %path, "discovered route file");

            if let Some(result) = self.handle(&method, &path, RouteFile(file), request)? {
                return Ok(Some(result));
            }
        }

        Ok(None)
    }

    /// Route the seven REST actions of a resource
    ///
    /// | method | path               | file         |
    /// |--------|--------------------|--------------|
    /// | GET    | `base`             | `index`      |
    /// | GET    | `base/create`      | `create`     |
    /// | GET    | `base/{id}/edit`   | `edit`       |
    /// | GET    | `base/{id}`        | `show`       |
    /// | POST   | `base`             | `store`      |
    /// | PUT    | `base/{id}`        | `update`     |
    /// | DELETE | `base/{id}`        | `destroy`    |
    ///
    /// `identity` names the `{id}` placeholder (default from the router config).
    ///
    /// # Errors
    ///
    /// Any error raised while handling a route.
    pub fn resource(
        &self,
        base: &str,
        files: impl AsRef<Path>,
        identity: Option<&str>,
        request: Option<&Target>,
    ) -> Result<Option<R>> {
        let base = format!("/{}", base.trim_matches('/'));
        let files = files.as_ref().to_string_lossy();
        let files = files.trim_end_matches('/');
        let id = identity.unwrap_or(&self.config().default_identity);
        let ext = &self.config().extension;

        let routes = [
            ("get", base.clone(), "index"),
            ("get", format!("{base}/create"), "create"),
            ("get", format!("{base}/{{{id}}}/edit"), "edit"),
            ("get", format!("{base}/{{{id}}}"), "show"),
            ("post", base.clone(), "store"),
            ("put", format!("{base}/{{{id}}}"), "update"),
            ("delete", format!("{base}/{{{id}}}"), "destroy"),
        ];

        for (method, path, action) in routes {
            let file = PathBuf::from(format!("{files}/{action}.{ext}"));
            if let Some(result) = self.handle(method, &path, RouteFile(file), request)? {
                return Ok(Some(result));
            }
        }

        Ok(None)
    }

    /// Route files under `root`, sorted, hidden ones excluded
    fn route_files(&self, root: &Path) -> Vec<PathBuf> {
        let config = self.config();

        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "skipping unreadable route path");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(config.extension.as_str()))
            })
            .filter(|e| {
                config.hidden_prefix.is_empty()
                    || !e.file_name().to_string_lossy().starts_with(&config.hidden_prefix)
            })
            .map(walkdir::DirEntry::into_path)
            .collect();

        files.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(method: &str, path: &str) -> (String, String) {
        (method.to_string(), path.to_string())
    }

    #[test]
    fn test_routify_canonical_paths() {
        assert_eq!(routify("index.get.route"), pair("get", "/"));
        assert_eq!(routify("foo/index.get.route"), pair("get", "/foo"));
        assert_eq!(routify("foo.get.route"), pair("get", "/foo"));
        assert_eq!(routify("foo.$id.get.route"), pair("get", "/foo/{id}"));
        assert_eq!(routify("foo.@id.get.route"), pair("get", "/foo/?{id}?"));
    }

    #[test]
    fn test_routify_separators() {
        assert_eq!(routify("/foo/bar.post.route"), pair("post", "/foo/bar"));
        assert_eq!(routify("foo\\$id\\edit.get.route"), pair("get", "/foo/{id}/edit"));
    }

    #[test]
    fn test_routify_index_is_a_whole_segment() {
        assert_eq!(routify("indexes.get.route"), pair("get", "/indexes"));
        assert_eq!(routify("reindex/index.get.route"), pair("get", "/reindex"));
    }

    #[test]
    fn test_routify_custom_marker() {
        assert_eq!(routify_with("home/main.get.route", "main"), pair("get", "/home"));
    }
}
