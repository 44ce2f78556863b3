//! # Class-Based Routing
//!
//! A controller exposes a static list of actions. Each action name encodes
//! the HTTP method and the literal path words, its parameters become path
//! placeholders:
//!
//! ```text
//! get_index()                      GET   {base}
//! get_about()                      GET   {base}/about
//! post_user_profile(id)            POST  {base}/user/profile/{id}
//! getPage(page: Option<_>)         GET   {base}/page/?{page}?
//! ```
//!
//! Names split on underscores and before every uppercase letter, so both
//! `snake_case` and `camelCase` action names work. The first word is the
//! method; a word equal to `index` is dropped.
//!
//! The action table is built once, either by the `#[controller]` attribute
//! on an `impl` block or by hand with [`ActionTable`]. Matched actions get
//! the positional captures only, in declaration order.

use crate::error::Result;
use crate::request::Target;
use crate::router::Router;

/// One action parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Placeholder name
    pub name: String,
    /// Whether the path segment may be absent
    pub optional: bool,
}

impl Param {
    /// Required parameter
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    /// Optional parameter
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }

    fn placeholder(&self) -> String {
        if self.optional {
            format!("?{{{}}}?", self.name)
        } else {
            format!("{{{}}}", self.name)
        }
    }
}

/// A routable controller action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Action name, e.g. `get_user` or `getUser`
    pub name: String,
    /// Parameters in declaration order
    pub params: Vec<Param>,
}

impl Action {
    /// Create an action
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Derive `(method, path)` under `base`
    #[must_use]
    pub fn route(&self, base: &str) -> (String, String) {
        let mut words = split_action_name(&self.name).into_iter();
        let method = words.next().unwrap_or_default();

        let mut segments = vec![base.trim_end_matches('/').to_string()];
        segments.extend(
            words
                .map(|w| w.to_lowercase())
                .filter(|w| w != "index"),
        );
        segments.extend(self.params.iter().map(Param::placeholder));

        (method, segments.join("/"))
    }
}

/// Split an action name on underscores and before uppercase letters
#[must_use]
pub fn split_action_name(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();

    for c in name.chars() {
        if c == '_' || c.is_ascii_uppercase() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            if c == '_' {
                continue;
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// A set of routable actions
pub trait Controller<R> {
    /// Actions in routing order
    fn actions(&self) -> Vec<Action>;

    /// Run an action with positional arguments
    ///
    /// Returns `None` when `action` is not one of [`Controller::actions`].
    fn invoke(&self, action: &str, args: &[Option<&str>]) -> Option<R>;
}

type ActionFn<'a, R> = Box<dyn Fn(&[Option<&str>]) -> R + 'a>;

/// Hand-built controller
///
/// ```ignore
/// let table = ActionTable::new()
///     .action("getIndex", vec![], |_| "home".to_string())
///     .action("getUser", vec![Param::required("id")], |args| {
///         format!("user {}", args[0].unwrap_or_default())
///     });
/// ```
pub struct ActionTable<'a, R> {
    entries: Vec<(Action, ActionFn<'a, R>)>,
}

impl<R> Default for ActionTable<'_, R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<'a, R> ActionTable<'a, R> {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action
    #[must_use]
    pub fn action(
        mut self,
        name: impl Into<String>,
        params: Vec<Param>,
        f: impl Fn(&[Option<&str>]) -> R + 'a,
    ) -> Self {
        self.entries.push((Action::new(name, params), Box::new(f)));
        self
    }
}

impl<R> Controller<R> for ActionTable<'_, R> {
    fn actions(&self) -> Vec<Action> {
        self.entries.iter().map(|(action, _)| action.clone()).collect()
    }

    fn invoke(&self, action: &str, args: &[Option<&str>]) -> Option<R> {
        self.entries
            .iter()
            .find(|(a, _)| a.name == action)
            .map(|(_, f)| f(args))
    }
}

impl<R: Clone> Router<R> {
    /// Route every action of a controller under `base`
    ///
    /// Actions are tried in the order the controller lists them; the first
    /// match wins.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if a derived path does not compile.
    pub fn class_name<C>(
        &self,
        base: &str,
        controller: &C,
        request: Option<&Target>,
    ) -> Result<Option<R>>
    where
        C: Controller<R> + ?Sized,
    {
        for action in controller.actions() {
            let (method, path) = action.route(base);
            let Some(params) = self.attempt(&method, &path, request)? else {
                continue;
            };

            if let Some(result) = controller.invoke(&action.name, &params.args()) {
                return Ok(Some(result));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TextLoader;

    #[test]
    fn test_split_action_name() {
        assert_eq!(split_action_name("getIndex"), vec!["get", "Index"]);
        assert_eq!(split_action_name("get_index"), vec!["get", "index"]);
        assert_eq!(
            split_action_name("postUserProfile"),
            vec!["post", "User", "Profile"]
        );
        assert_eq!(split_action_name("delete"), vec!["delete"]);
    }

    #[test]
    fn test_action_route() {
        let index = Action::new("getIndex", vec![]);
        assert_eq!(index.route("/users"), ("get".to_string(), "/users".to_string()));

        let show = Action::new("get_user", vec![Param::required("id")]);
        assert_eq!(
            show.route("/users"),
            ("get".to_string(), "/users/user/{id}".to_string())
        );

        let page = Action::new("getPage", vec![Param::optional("page")]);
        assert_eq!(
            page.route("/"),
            ("get".to_string(), "/page/?{page}?".to_string())
        );
    }

    fn table<'a>() -> ActionTable<'a, String> {
        ActionTable::new()
            .action("getIndex", vec![], |_| "index".to_string())
            .action("getAbout", vec![], |_| "about".to_string())
            .action("getUser", vec![Param::required("id")], |args| {
                format!("user {}", args[0].unwrap_or_default())
            })
            .action("postUser", vec![Param::required("id")], |args| {
                format!("saved {}", args[0].unwrap_or_default())
            })
            .action(
                "getPage",
                vec![Param::required("size"), Param::optional("page")],
                |args| {
                    format!(
                        "page {} of size {}",
                        args.get(1).copied().flatten().unwrap_or("1"),
                        args[0].unwrap_or_default()
                    )
                },
            )
    }

    fn route(method: &str, path: &str) -> Option<String> {
        let router = Router::new(Target::new(method, path), TextLoader);
        router.class_name("/site", &table(), None).unwrap()
    }

    #[test]
    fn test_class_routing() {
        assert_eq!(route("GET", "/site").as_deref(), Some("index"));
        assert_eq!(route("GET", "/site/about").as_deref(), Some("about"));
        assert_eq!(route("GET", "/site/user/7").as_deref(), Some("user 7"));
        assert_eq!(route("POST", "/site/user/7").as_deref(), Some("saved 7"));
        assert_eq!(route("GET", "/site/page/10").as_deref(), Some("page 1 of size 10"));
        assert_eq!(route("GET", "/site/page/10/3").as_deref(), Some("page 3 of size 10"));
        assert!(route("DELETE", "/site/user/7").is_none());
        assert!(route("GET", "/elsewhere").is_none());
    }

    #[test]
    fn test_class_routing_respects_cancel() {
        let router = Router::new(Target::new("GET", "/site"), TextLoader);
        router.cancel();
        assert!(router.class_name("/site", &table(), None).unwrap().is_none());
        assert!(!router.did_match());
    }
}
