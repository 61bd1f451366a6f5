use super::route::Route;
use crate::middleware::MiddlewareRef;

/// Middleware shared by every route of a scope.
#[derive(Debug, Clone, Default)]
pub struct RouteStack {
    middleware: Vec<MiddlewareRef>,
}

impl RouteStack {
    pub fn new<I>(middleware: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<MiddlewareRef>,
    {
        Self {
            middleware: middleware.into_iter().map(Into::into).collect(),
        }
    }

    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }
}

/// URI prefix and middleware applied to the routes registered inside
/// [`Router::scope`](super::Router::scope).
#[derive(Debug, Clone, Default)]
pub struct RouteScope {
    prefix: String,
    stack: RouteStack,
}

impl RouteScope {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_matches('/').to_string(),
            stack: RouteStack::default(),
        }
    }

    pub fn stack(mut self, stack: RouteStack) -> Self {
        self.stack = stack;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefixes `route`'s URI and puts this scope's middleware in front of its own.
    pub(crate) fn apply(&self, route: &mut Route) {
        route.uri = super::route::normalize(&format!("{}{}", self.prefix, route.uri));

        if !self.stack.middleware.is_empty() {
            let own = std::mem::take(&mut route.middleware);
            route.middleware = self.stack.middleware.iter().cloned().chain(own).collect();
        }
    }
}

impl From<&str> for RouteScope {
    fn from(prefix: &str) -> Self {
        Self::new(prefix)
    }
}

impl From<RouteStack> for RouteScope {
    fn from(stack: RouteStack) -> Self {
        Self::new("").stack(stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::types::Method;

    fn names(route: &Route) -> Vec<String> {
        route.middleware().iter().map(|m| format!("{m:?}")).collect()
    }

    #[test]
    fn prefixes_uris() {
        #[rustfmt::skip]
        let cases = [
            ("api",    "/users", "/api/users"),
            ("/api/",  "/users", "/api/users"),
            ("api/v1", "/",      "/api/v1"),
            ("",       "/users", "/users"),
        ];

        for (prefix, uri, expected) in cases {
            let mut route = Route::action(&[Method::Get], uri, "users", "index");
            RouteScope::new(prefix).apply(&mut route);
            assert_eq!(route.uri(), expected, "{prefix:?} {uri:?}");
        }
    }

    #[test]
    fn scope_middleware_goes_first() {
        let mut route = Route::action(&[Method::Get], "/", "users", "index");
        route.with_middleware(["own"]);

        RouteScope::from(RouteStack::new(["inner"])).apply(&mut route);
        RouteScope::new("admin")
            .stack(RouteStack::new(["outer"]))
            .apply(&mut route);

        assert_eq!(route.uri(), "/admin");
        assert_eq!(
            names(&route),
            [r#"Named("outer")"#, r#"Named("inner")"#, r#"Named("own")"#]
        );
    }
}
