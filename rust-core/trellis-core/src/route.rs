//! # Route Patterns
//!
//! Turns a path template into an anchored regular expression and extracts
//! captured parameters from a matching path.
//!
//! ## Template tokens
//!
//! - `{name}` captures one segment made of `[A-Za-z0-9_-]`
//! - `{name:expr}` captures using `expr` verbatim
//! - `?{name}?` optional capture; the leading `?` makes the delimiter before it optional
//! - `{name@}` captures the rest of the path, slashes included
//!
//! Anything else (literal text, raw regex groups, quantifiers such as `{2,3}`)
//! passes through untouched. The compiled expression is `^{base}{path}/?$`.
//!
//! Legacy revisions used the `[A-z]` range, which also admits six punctuation
//! characters sitting between `Z` and `a`. Segment captures here use the
//! explicit `[A-Za-z0-9_-]` class instead.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;

/// Character class used by plain `{name}` placeholders
pub const SEGMENT_CLASS: &str = "[A-Za-z0-9_-]+";

/// A path template compiled into an anchored matcher
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Original path template (without base prefix)
    pub path_pattern: String,
    /// Regular expression source after token substitution
    pub expression: String,
    regex: Regex,
}

impl CompiledPattern {
    /// Compile a template under the given base prefix
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the substituted expression is not
    /// a valid regular expression (e.g. a broken `{name:expr}` sub-pattern).
    pub fn new(path: &str, base: &str) -> Result<Self> {
        let expression = regexify(path, base);
        let regex = Regex::new(&expression).map_err(|e| Error::InvalidRoutePattern {
            pattern: path.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(pattern = path, expression = %expression, "compiled route pattern");

        Ok(Self {
            path_pattern: path.to_string(),
            expression,
            regex,
        })
    }

    /// Match a request path, returning captured parameters on success
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;

        let mut positional: Vec<Option<String>> = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        while matches!(positional.last(), Some(None)) {
            positional.pop();
        }

        let named = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();

        Some(Params { named, positional })
    }

    /// Check whether a path matches without extracting parameters
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Captured route parameters
///
/// Named captures are available by name, and every group (named or not) is
/// available by position, index `0` being the whole match. Trailing groups
/// that did not participate in the match are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    named: HashMap<String, String>,
    positional: Vec<Option<String>>,
}

impl Params {
    /// Get a named parameter
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Whether a named parameter participated in the match
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Get a capture by group index (`0` is the whole match)
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&str> {
        self.positional.get(index).and_then(Option::as_deref)
    }

    /// All named parameters
    #[must_use]
    pub fn named(&self) -> &HashMap<String, String> {
        &self.named
    }

    /// Positional arguments, i.e. every group after the whole match
    ///
    /// A group that did not participate in the middle of the list is `None`.
    #[must_use]
    pub fn args(&self) -> Vec<Option<&str>> {
        self.positional
            .iter()
            .skip(1)
            .map(Option::as_deref)
            .collect()
    }
}

/// Turn a path template into a regular expression source
///
/// Pure: does not validate the resulting expression.
#[must_use]
pub fn regexify(path: &str, base: &str) -> String {
    let mut out = String::with_capacity(path.len() + base.len() + 16);
    let mut rest = path;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];

        match closing_brace(after) {
            Some(close) => {
                let inner = &after[1..close];
                match placeholder(inner) {
                    Some(group) => out.push_str(&group),
                    None => out.push_str(&after[..=close]),
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(after);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    format!("^{base}{out}/?$")
}

/// Byte offset of the brace closing the one at offset 0
fn closing_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Named group for a `{...}` body, or `None` when it is not a placeholder
fn placeholder(inner: &str) -> Option<String> {
    if let Some(name) = inner.strip_suffix('@') {
        return is_name(name).then(|| format!("(?P<{name}>.+)"));
    }

    match inner.split_once(':') {
        Some((name, expr)) if is_name(name) => Some(format!("(?P<{name}>{expr})")),
        Some(_) => None,
        None => is_name(inner).then(|| format!("(?P<{inner}>{SEGMENT_CLASS})")),
    }
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
