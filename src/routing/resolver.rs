use super::route::{Callback, Route};
use crate::http::types::Method;

/// Store of registered routes.
///
/// The [`Router`](super::Router) builds its dispatch table from
/// [`all`](Self::all) on first use.
pub trait RouteResolver: Send + Sync {
    fn all(&self) -> &[Route];

    /// Registers `route` and returns it for further configuration.
    fn add_route(&mut self, route: Route) -> &mut Route;

    fn add(&mut self, methods: &[Method], uri: &str, callback: Callback) -> &mut Route {
        self.add_route(Route::new(methods, uri, callback))
    }

    /// Route registered for `method` on exactly the pattern `uri`.
    fn resolve(&self, method: Method, uri: &str) -> Option<&Route> {
        self.all().iter().find(|route| route.matches(method, uri))
    }

    fn exists(&self, method: Method, uri: &str) -> bool {
        self.resolve(method, uri).is_some()
    }

    /// Forgets every route.
    fn invalidate(&mut self);
}

/// In-memory [`RouteResolver`] keeping registration order.
#[derive(Debug, Default)]
pub struct DefaultRouteResolver {
    routes: Vec<Route>,
}

impl DefaultRouteResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RouteResolver for DefaultRouteResolver {
    fn all(&self) -> &[Route] {
        &self.routes
    }

    fn add_route(&mut self, route: Route) -> &mut Route {
        self.routes.push(route);
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }

    fn invalidate(&mut self) {
        self.routes.clear();
    }
}
