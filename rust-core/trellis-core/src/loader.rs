//! # File Handlers
//!
//! A route handler may be a file path. The file is loaded once per path
//! (its top-level code runs once), and when the loaded value is callable it
//! is invoked with the route parameters on every match.
//!
//! Two caches are kept, both keyed by path:
//!
//! - the include cache holds what loading produced (value or callable)
//! - the result cache holds the last value a callable returned
//!
//! Reusing one file across several routes therefore runs its top-level code
//! only for the first route that matches, while the callable still runs for
//! each match.

use crate::error::Result;
use crate::route::Params;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Callable produced by loading a file
pub type Callable<R> = Rc<dyn Fn(&Params) -> R>;

/// What loading a file produced
pub enum Loaded<R> {
    /// A plain value
    Value(R),
    /// A callable to invoke with the route parameters
    Callable(Callable<R>),
}

impl<R: Clone> Clone for Loaded<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(v) => Self::Value(v.clone()),
            Self::Callable(f) => Self::Callable(Rc::clone(f)),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Loaded<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Callable(_) => f.write_str("Callable"),
        }
    }
}

/// Bootstrap-layer primitive: run a file's top-level code
pub trait Loader<R> {
    /// Load `path`
    ///
    /// Returns `Ok(None)` when there is nothing to load at `path`.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the file exists but cannot be loaded.
    fn load(&self, path: &Path) -> Result<Option<Loaded<R>>>;
}

/// Loads a file as its text content
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

impl Loader<String> for TextLoader {
    fn load(&self, path: &Path) -> Result<Option<Loaded<String>>> {
        if !path.is_file() {
            return Ok(None);
        }

        let text = std::fs::read_to_string(path)?;
        Ok(Some(Loaded::Value(text.trim_end().to_string())))
    }
}

type Script<R> = Rc<dyn Fn() -> Loaded<R>>;

/// Host-registered scripts keyed by file path
///
/// The registered closure stands in for the file's top-level code; it runs
/// when the file is loaded, and only if the file exists on disk.
pub struct ScriptTable<R> {
    scripts: HashMap<PathBuf, Script<R>>,
}

impl<R> Default for ScriptTable<R> {
    fn default() -> Self {
        Self {
            scripts: HashMap::new(),
        }
    }
}

impl<R> ScriptTable<R> {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the top-level code for `path`
    #[must_use]
    pub fn script(mut self, path: impl Into<PathBuf>, f: impl Fn() -> Loaded<R> + 'static) -> Self {
        self.scripts.insert(path.into(), Rc::new(f));
        self
    }
}

impl<R> Loader<R> for ScriptTable<R> {
    fn load(&self, path: &Path) -> Result<Option<Loaded<R>>> {
        if !path.exists() {
            return Ok(None);
        }

        Ok(self.scripts.get(path).map(|script| script()))
    }
}

/// Memoizing front of a [`Loader`]
pub struct RequireCache<R> {
    loader: Box<dyn Loader<R>>,
    includes: RefCell<HashMap<PathBuf, Loaded<R>>>,
    results: RefCell<HashMap<PathBuf, R>>,
}

impl<R: Clone> RequireCache<R> {
    /// Wrap a loader
    pub fn new(loader: impl Loader<R> + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            includes: RefCell::new(HashMap::new()),
            results: RefCell::new(HashMap::new()),
        }
    }

    /// Load `path` once and invoke it when callable
    ///
    /// Returns `Ok(None)` when the loader has nothing for `path`.
    ///
    /// # Errors
    ///
    /// Propagates loader errors.
    pub fn require(&self, path: &Path, params: &Params) -> Result<Option<R>> {
        let cached = self.includes.borrow().get(path).cloned();
        let loaded = match cached {
            Some(loaded) => loaded,
            None => {
                let Some(loaded) = self.loader.load(path)? else {
                    return Ok(None);
                };
                tracing::debug!(path = %path.display(), "loaded route file");
                self.includes
                    .borrow_mut()
                    .insert(path.to_path_buf(), loaded.clone());
                loaded
            }
        };

        match loaded {
            Loaded::Value(value) => Ok(Some(value)),
            Loaded::Callable(call) => {
                let value = call(params);
                self.results
                    .borrow_mut()
                    .insert(path.to_path_buf(), value.clone());
                Ok(Some(value))
            }
        }
    }

    /// Last value returned by the callable loaded from `path`
    #[must_use]
    pub fn last_result(&self, path: &Path) -> Option<R> {
        self.results.borrow().get(path).cloned()
    }

    /// Whether `path` has been loaded
    #[must_use]
    pub fn is_loaded(&self, path: &Path) -> bool {
        self.includes.borrow().contains_key(path)
    }
}
