use super::reply::{IntoReply, Reply};
use crate::{
    errors::Error,
    http::{request::Request, types::Method},
    middleware::MiddlewareRef,
    BoxFuture,
};
use std::{collections::BTreeMap, fmt, future::Future, sync::Arc};

/// Type-erased closure handler.
pub type HandlerFn = Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Reply, Error>> + Send + Sync>;

/// What a route runs once matched.
#[derive(Clone)]
pub enum Callback {
    Closure(HandlerFn),
    /// An action of the controller bound to `controller` in the container.
    Action { controller: String, action: String },
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closure(_) => f.write_str("Closure"),
            Self::Action { controller, action } => write!(f, "{controller}@{action}"),
        }
    }
}

/// A controller action named by its container identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub controller: String,
    pub action: String,
}

impl Action {
    /// Action name used for single-action controllers.
    pub const INVOKE: &'static str = "invoke";

    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }

    /// The [`INVOKE`](Self::INVOKE) action of `controller`.
    pub fn invokable(controller: impl Into<String>) -> Self {
        Self::new(controller, Self::INVOKE)
    }
}

/// Anything that can be registered as a route handler.
///
/// Implemented for async closures taking a [`Request`] and returning
/// something [`IntoReply`], and for [`Action`]s. The type parameter only
/// keeps the two apart.
pub trait IntoCallback<M> {
    fn into_callback(self) -> Callback;
}

impl<F, Fut, R> IntoCallback<(Fut, R)> for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
    fn into_callback(self) -> Callback {
        Callback::Closure(Arc::new(move |request| {
            let pending = self(request);
            Box::pin(async move { pending.await.into_reply() })
        }))
    }
}

impl IntoCallback<Action> for Action {
    fn into_callback(self) -> Callback {
        Callback::Action {
            controller: self.controller,
            action: self.action,
        }
    }
}

impl IntoCallback<Callback> for Callback {
    fn into_callback(self) -> Callback {
        self
    }
}

/// A registered route: methods, URI pattern, handler, per-route middleware
/// and parameter constraints.
///
/// The URI always starts with exactly one `/` and never ends with one, except
/// for the root route.
#[derive(Clone)]
pub struct Route {
    pub(crate) methods: Vec<Method>,
    pub(crate) uri: String,
    pub(crate) callback: Callback,
    pub(crate) middleware: Vec<MiddlewareRef>,
    pub(crate) constraints: BTreeMap<String, String>,
}

impl Route {
    pub fn new(methods: &[Method], uri: &str, callback: Callback) -> Self {
        Self {
            methods: methods.to_vec(),
            uri: normalize(uri),
            callback,
            middleware: Vec::new(),
            constraints: BTreeMap::new(),
        }
    }

    /// Route running `action` of the controller bound to `controller`.
    pub fn action(methods: &[Method], uri: &str, controller: &str, action: &str) -> Self {
        Self::new(methods, uri, Action::new(controller, action).into_callback())
    }

    /// Route running a single-action controller.
    pub fn controller(methods: &[Method], uri: &str, controller: &str) -> Self {
        Self::new(methods, uri, Action::invokable(controller).into_callback())
    }

    #[inline]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    pub fn controller_id(&self) -> Option<&str> {
        match &self.callback {
            Callback::Action { controller, .. } => Some(controller),
            Callback::Closure(_) => None,
        }
    }

    pub fn action_name(&self) -> Option<&str> {
        match &self.callback {
            Callback::Action { action, .. } => Some(action),
            Callback::Closure(_) => None,
        }
    }

    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    pub fn constraints(&self) -> &BTreeMap<String, String> {
        &self.constraints
    }

    /// Whether this route accepts `method` on exactly `uri`.
    pub fn matches(&self, method: Method, uri: &str) -> bool {
        self.uri == uri && self.methods.iter().any(|allowed| allowed.accepts(method))
    }

    /// Appends per-route middleware after what enclosing scopes installed.
    pub fn with_middleware<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<MiddlewareRef>,
    {
        self.middleware.extend(middleware.into_iter().map(Into::into));
        self
    }

    /// Requires parameter `name` to match `pattern`.
    pub fn constraint(&mut self, name: &str, pattern: &str) -> &mut Self {
        self.constraints.insert(name.to_string(), pattern.to_string());
        self
    }

    /// Adds several constraints; a name already constrained gets the new pattern.
    pub fn with_constraints<'a, I>(&mut self, constraints: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, pattern) in constraints {
            self.constraint(name, pattern);
        }
        self
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("uri", &self.uri)
            .field("callback", &self.callback)
            .field("middleware", &self.middleware)
            .field("constraints", &self.constraints)
            .finish()
    }
}

/// Single leading slash, no trailing slash.
pub(crate) fn normalize(uri: &str) -> String {
    format!("/{}", uri.trim_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uris_are_normalized() {
        #[rustfmt::skip]
        let cases = [
            ("",              "/"),
            ("/",             "/"),
            ("users",         "/users"),
            ("/users/",       "/users"),
            ("//users/:id//", "/users/:id"),
        ];

        for (uri, expected) in cases {
            let route = Route::action(&[Method::Get], uri, "users", "index");
            assert_eq!(route.uri(), expected, "{uri:?}");
        }
    }

    #[test]
    fn callbacks() {
        let route = Route::controller(&[Method::Post], "/hooks", "webhook");
        assert_eq!(route.controller_id(), Some("webhook"));
        assert_eq!(route.action_name(), Some(Action::INVOKE));

        let closure = Route::new(&[Method::Get], "/", (|_: Request| async { "hi" }).into_callback());
        assert_eq!(closure.controller_id(), None);
        assert_eq!(format!("{:?}", route.callback()), "webhook@invoke");
    }

    #[test]
    fn method_and_uri_matching() {
        let route = Route::action(&[Method::Put, Method::Patch], "/users/:id", "users", "update");
        let any = Route::action(&[Method::Any], "/ping", "health", "ping");

        #[rustfmt::skip]
        let cases = [
            (&route, Method::Put,    "/users/:id", true),
            (&route, Method::Patch,  "/users/:id", true),
            (&route, Method::Get,    "/users/:id", false),
            (&route, Method::Put,    "/users/1",   false),
            (&any,   Method::Delete, "/ping",      true),
        ];

        for (route, method, uri, expected) in cases {
            assert_eq!(route.matches(method, uri), expected, "{method} {uri}");
        }
    }

    #[test]
    fn middleware_and_constraints_accumulate() {
        let mut route = Route::action(&[Method::Get], "/users/:id", "users", "show");
        route
            .with_middleware(["auth"])
            .with_middleware(["audit", "throttle"])
            .constraint("id", r"\w+")
            .with_constraints([("id", r"\d+"), ("slug", "[a-z-]+")]);

        let names: Vec<_> = route.middleware().iter().map(|m| format!("{m:?}")).collect();
        assert_eq!(names, [r#"Named("auth")"#, r#"Named("audit")"#, r#"Named("throttle")"#]);
        assert_eq!(route.constraints().len(), 2);
        assert_eq!(route.constraints().get("id").map(String::as_str), Some(r"\d+"));
        assert_eq!(route.constraints().get("slug").map(String::as_str), Some("[a-z-]+"));
    }
}
