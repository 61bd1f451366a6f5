use super::{
    container::{Container, Instance},
    dispatcher::DispatchTable,
    reply::Reply,
    resolver::{DefaultRouteResolver, RouteResolver},
    route::{Action, Callback, IntoCallback, Route},
    scope::{RouteScope, RouteStack},
};
use crate::{
    errors::Error,
    http::{
        request::{Parameters, Request},
        response::Response,
        types::{ContentType, Method},
    },
    middleware::{builtin, Endpoint, Middleware, MiddlewareRef, Pipeline},
    BoxFuture,
};
use once_cell::sync::OnceCell;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Anything that defines application routes on a router.
pub trait RouteSource {
    fn define(self, router: &mut Router);
}

impl<F: FnOnce(&mut Router)> RouteSource for F {
    fn define(self, router: &mut Router) {
        self(router)
    }
}

/// Path segments used by [`Router::resource_with`] for the form actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub new: String,
    pub edit: String,
}

impl Default for ResourceNames {
    fn default() -> Self {
        Self {
            new: "new".to_string(),
            edit: "edit".to_string(),
        }
    }
}

/// Route registry and request dispatcher.
///
/// Routes are registered up front; the dispatch table is compiled from them
/// on the first [`handle`](Self::handle) and reused afterwards. Routes added
/// later stay unreachable until [`rebuild`](Self::rebuild) is called.
///
/// Every route except the form actions of [`resource`](Self::resource) and
/// routes added with [`route_exact`](Self::route_exact) also answers with a
/// format extension: `GET /users` matches `/users.json` too, and the request
/// format becomes `application/json`.
///
/// # Examples
/// ```
/// use kiln::{routing::RouteScope, Method, Request, Router};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), kiln::Error> {
/// let mut router = Router::new();
/// router.get("/", |_: Request| async { "home" });
/// router.scope("api", |api| {
///     api.get("/users/:id", |request: Request| async move {
///         format!("user {}", request.parameter("id").unwrap())
///     });
/// });
///
/// let response = router.handle(Request::builder(Method::Get, "/api/users/7").build()).await?;
/// assert!(response.is_successful());
/// # Ok(())
/// # }
/// ```
pub struct Router {
    resolver: Box<dyn RouteResolver>,
    container: Container,
    middleware: Pipeline,
    scopes: Vec<RouteScope>,
    fallback: Option<Route>,
    dispatcher: OnceCell<DispatchTable<Arc<Route>>>,
}

macro_rules! verbs {
    ($($(#[$docs:meta])* $name:ident => $method:expr;)*) => {$(
        $(#[$docs])*
        pub fn $name<M>(&mut self, uri: &str, callback: impl IntoCallback<M>) -> &mut Route {
            self.add(&[$method], uri, callback.into_callback(), false)
        }
    )*};
}

impl Router {
    /// Router with the in-memory resolver and the default global middleware.
    pub fn new() -> Self {
        Self::with_resolver(DefaultRouteResolver::new())
    }

    pub fn with_resolver(resolver: impl RouteResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            container: Container::new(),
            middleware: builtin::defaults().into_iter().collect(),
            scopes: Vec::new(),
            fallback: None,
            dispatcher: OnceCell::new(),
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// Global middleware, outermost first.
    pub fn middleware(&self) -> &Pipeline {
        &self.middleware
    }

    pub fn middleware_mut(&mut self) -> &mut Pipeline {
        &mut self.middleware
    }

    pub fn resolver(&self) -> &dyn RouteResolver {
        &*self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut dyn RouteResolver {
        &mut *self.resolver
    }

    /// Every registered route, in registration order.
    pub fn routes(&self) -> &[Route] {
        self.resolver.all()
    }

    verbs! {
        get => Method::Get;
        post => Method::Post;
        put => Method::Put;
        patch => Method::Patch;
        delete => Method::Delete;
        options => Method::Options;
        /// Route answering every method.
        any => Method::Any;
    }

    /// `GET /`.
    pub fn root<M>(&mut self, callback: impl IntoCallback<M>) -> &mut Route {
        self.get("/", callback)
    }

    pub fn route<M>(&mut self, methods: &[Method], uri: &str, callback: impl IntoCallback<M>) -> &mut Route {
        self.add(methods, uri, callback.into_callback(), false)
    }

    /// Like [`route`](Self::route), without the optional format extension.
    pub fn route_exact<M>(
        &mut self,
        methods: &[Method],
        uri: &str,
        callback: impl IntoCallback<M>,
    ) -> &mut Route {
        self.add(methods, uri, callback.into_callback(), true)
    }

    fn add(&mut self, methods: &[Method], uri: &str, callback: Callback, skip_format: bool) -> &mut Route {
        let mut route = Route::new(methods, uri, callback);
        self.apply_scopes(&mut route);

        if !skip_format {
            route.uri = format!("{}:?format", route.uri.trim_end_matches('/'));
            if !route.uri.starts_with('/') {
                route.uri.insert(0, '/');
            }
            route.constraint("format", r"\.\w+");
        }
        self.resolver.add_route(route)
    }

    /// Innermost scope first, so the outermost prefix and middleware end up in front.
    fn apply_scopes(&self, route: &mut Route) {
        for scope in self.scopes.iter().rev() {
            scope.apply(route);
        }
    }

    /// Registers the routes `define` adds with `scope`'s prefix and middleware.
    pub fn scope(&mut self, scope: impl Into<RouteScope>, define: impl FnOnce(&mut Router)) -> &mut Self {
        self.scopes.push(scope.into());
        define(self);
        self.scopes.pop();
        self
    }

    /// A scope without prefix.
    pub fn stack<I>(&mut self, middleware: I, define: impl FnOnce(&mut Router)) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<MiddlewareRef>,
    {
        self.scope(RouteStack::new(middleware), define)
    }

    /// Conventional CRUD routes under `prefix` for the actions `controller` has.
    ///
    /// | Action    | Route                          |
    /// |-----------|--------------------------------|
    /// | `index`   | `GET /prefix`                  |
    /// | `new`     | `GET /prefix/new`              |
    /// | `create`  | `POST /prefix`                 |
    /// | `show`    | `GET /prefix/:id`              |
    /// | `edit`    | `GET /prefix/:id/edit`         |
    /// | `update`  | `PUT`, `PATCH /prefix/:id`     |
    /// | `destroy` | `DELETE /prefix/:id`           |
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedBinding`] or [`Error::NotAController`] when
    /// `controller` is not bound to a controller.
    pub fn resource(&mut self, prefix: &str, controller: &str) -> Result<&mut Self, Error> {
        self.resource_with(prefix, controller, &ResourceNames::default())
    }

    /// [`resource`](Self::resource) with custom `new` and `edit` segments.
    pub fn resource_with(
        &mut self,
        prefix: &str,
        controller: &str,
        names: &ResourceNames,
    ) -> Result<&mut Self, Error> {
        let actions = match self.container.resolve(controller)? {
            Instance::Controller(instance) => instance.actions(),
            _ => return Err(Error::NotAController(controller.to_string())),
        };
        let prefix = prefix.trim_matches('/');

        #[rustfmt::skip]
        let table: [(&str, &[Method], String, bool); 7] = [
            ("index",   &[Method::Get],                 format!("{prefix}/"),                      false),
            ("new",     &[Method::Get],                 format!("{prefix}/{}", names.new),         true),
            ("create",  &[Method::Post],                format!("{prefix}/"),                      false),
            ("show",    &[Method::Get],                 format!("{prefix}/:id"),                   false),
            ("edit",    &[Method::Get],                 format!("{prefix}/:id/{}", names.edit),    true),
            ("update",  &[Method::Put, Method::Patch],  format!("{prefix}/:id"),                   false),
            ("destroy", &[Method::Delete],              format!("{prefix}/:id"),                   false),
        ];

        for (action, methods, uri, skip_format) in table {
            if actions.contains(&action) {
                let callback = Action::new(controller, action).into_callback();
                self.add(methods, &uri, callback, skip_format);
            }
        }
        Ok(self)
    }

    /// [`resource`](Self::resource) for every `(prefix, controller)` pair.
    pub fn resources<'a, I>(&mut self, resources: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (prefix, controller) in resources {
            self.resource(prefix, controller)?;
        }
        Ok(self)
    }

    /// Handler for requests no route matches, in place of `404 Not Found`.
    ///
    /// It sees the request's explicit bindings as its only parameters.
    pub fn fallback<M>(&mut self, callback: impl IntoCallback<M>) -> &mut Route {
        let mut route = Route::new(&[Method::Get], "/{path:.+}", callback.into_callback());
        self.apply_scopes(&mut route);
        self.fallback.insert(route)
    }

    /// Registers the routes defined by `source`.
    pub fn add_application_routes(&mut self, source: impl RouteSource) -> &mut Self {
        source.define(self);
        self
    }

    /// Drops the compiled dispatch table; the next request compiles a new one.
    pub fn rebuild(&mut self) -> &mut Self {
        self.dispatcher = OnceCell::new();
        self
    }

    fn build_table(&self) -> Result<DispatchTable<Arc<Route>>, Error> {
        let mut table = DispatchTable::new();
        for route in self.resolver.all() {
            table.add_route(&route.methods, &route.uri, Arc::new(route.clone()), &route.constraints)?;
        }

        tracing::debug!(routes = table.len(), "dispatch table compiled");
        Ok(table)
    }

    /// Routes `request` through the global middleware, the matched route's
    /// middleware and its handler.
    ///
    /// # Errors
    ///
    /// Errors raised by handlers and middleware propagate unchanged, as do
    /// invalid route patterns and middleware or controllers that do not
    /// resolve.
    pub async fn handle(&self, mut request: Request) -> Result<Response, Error> {
        let table = self.dispatcher.get_or_try_init(|| self.build_table())?;
        let path = percent_decode_str(request.path())
            .decode_utf8_lossy()
            .into_owned();

        let mut layers: Vec<Arc<dyn Middleware>> = self.middleware.iter().cloned().collect();
        let terminal = match table.dispatch(request.method(), &path) {
            Some((route, captured)) => {
                for middleware in route.middleware() {
                    layers.push(middleware.resolve(&self.container)?);
                }
                request.set_route(Arc::clone(route));

                Terminal::Matched {
                    router: self,
                    route: Arc::clone(route),
                    captured,
                }
            }
            None => Terminal::Unmatched { router: self },
        };

        let pipeline: Pipeline = layers.into_iter().collect();
        pipeline.run(request, &terminal).await
    }

    async fn found(&self, mut request: Request, route: &Route, captured: Parameters) -> Result<Response, Error> {
        let mut parameters = request.parameters().clone();
        parameters.extend(captured);
        parameters.extend(request.bindings().clone());
        request.set_parameters(parameters);

        let format = negotiate_format(&request);
        request.set_format(format);

        self.invoke(route, request).await?.into_response()
    }

    async fn unmatched(&self, mut request: Request) -> Result<Response, Error> {
        let Some(route) = &self.fallback else {
            return Ok(Response::not_found());
        };

        let bindings = request.bindings().clone();
        request.set_parameters(bindings);
        self.invoke(route, request).await?.into_response()
    }

    async fn invoke(&self, route: &Route, request: Request) -> Result<Reply, Error> {
        match &route.callback {
            Callback::Closure(handler) => handler(request).await,
            Callback::Action { controller, action } => {
                let instance = match self.container.resolve(controller)? {
                    Instance::Controller(instance) => instance,
                    _ => return Err(Error::NotAController(controller.clone())),
                };
                if !instance.has_action(action) {
                    return Err(Error::UnknownAction {
                        controller: controller.clone(),
                        action: action.clone(),
                    });
                }
                instance.invoke(action, request).await
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.resolver.all())
            .field("middleware", &self.middleware)
            .field("fallback", &self.fallback)
            .field("compiled", &self.dispatcher.get().is_some())
            .finish()
    }
}

/// Explicit `format` extension, else the heaviest `Accept` entry, else HTML.
fn negotiate_format(request: &Request) -> &'static str {
    if let Some(Value::String(extension)) = request.parameter("format") {
        return ContentType::from_extension(&extension.to_ascii_lowercase()).unwrap_or(ContentType::HTML);
    }

    request
        .headers()
        .weighted("accept")
        .first()
        .and_then(|entry| ContentType::from_media_type(&entry.value))
        .unwrap_or(ContentType::HTML)
}

/// Innermost responder of a dispatched request.
enum Terminal<'r> {
    Matched {
        router: &'r Router,
        route: Arc<Route>,
        captured: Parameters,
    },
    Unmatched {
        router: &'r Router,
    },
}

impl Endpoint for Terminal<'_> {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, Error>> {
        match self {
            Terminal::Matched {
                router,
                route,
                captured,
            } => Box::pin(router.found(request, route, captured.clone())),
            Terminal::Unmatched { router } => Box::pin(router.unmatched(request)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{controller, routing::Json, StatusCode};
    use serde_json::json;

    struct Users;

    impl Users {
        async fn index(&self, _: Request) -> Json<Value> {
            Json(json!([{"id": 1}]))
        }

        async fn show(&self, request: Request) -> String {
            format!("user {} as {}", request.parameter("id").unwrap(), request.format())
        }

        async fn new(&self, _: Request) -> &'static str {
            "form"
        }

        async fn update(&self, request: Request) -> String {
            format!("updated {}", request.parameter("id").unwrap())
        }
    }

    controller!(Users { index, show, new, update });

    struct Settings;

    impl Settings {
        async fn edit(&self, _: Request) -> &'static str {
            "settings form"
        }
    }

    controller!(Settings { edit });

    fn router() -> Router {
        let mut router = Router::new();
        router
            .container_mut()
            .bind_controller("users", || Users)
            .bind_controller("settings", || Settings)
            .bind("config", || 1_u8);
        router
    }

    fn request(method: Method, target: &str) -> Request {
        Request::builder(method, target).build()
    }

    async fn call(router: &Router, request: Request) -> (u16, String) {
        let mut response = router.handle(request).await.unwrap();
        let body = response.take_body().collect().await;
        (response.status().as_u16(), String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn dispatches_closures_and_actions() {
        let mut router = router();
        router.root(|_: Request| async { "home" });
        router.get("/users/:id", Action::new("users", "show"));

        #[rustfmt::skip]
        let cases = [
            (request(Method::Get, "/"),               200, "home"),
            (request(Method::Get, "/users/42"),       200, r#"user "42" as text/html"#),
            (request(Method::Get, "/users/42.json"),  200, r#"user "42" as application/json"#),
            (request(Method::Get, "/users/42.XML"),   200, r#"user "42" as application/xml"#),
            (request(Method::Get, "/users/a%20b"),    200, r#"user "a b" as text/html"#),
            (request(Method::Get, "/missing"),        404, ""),
            (request(Method::Delete, "/users/42"),    404, ""),
        ];

        for (request, status, body) in cases {
            let target = request.path().to_string();
            assert_eq!(call(&router, request).await, (status, body.to_string()), "{target}");
        }
    }

    #[tokio::test]
    async fn format_from_accept_header() {
        let mut router = router();
        router.get("/users/:id", Action::new("users", "show"));

        #[rustfmt::skip]
        let cases = [
            (Some("application/json"),                 "application/json"),
            (Some("text/csv;q=0.5, application/xml"),  "application/xml"),
            (Some("image/png"),                        "text/html"),
            (None,                                     "text/html"),
        ];

        for (accept, expected) in cases {
            let builder = Request::builder(Method::Get, "/users/1");
            let request = match accept {
                Some(accept) => builder.header("Accept", accept).build(),
                None => builder.build(),
            };
            let (_, body) = call(&router, request).await;
            assert_eq!(body, format!(r#"user "1" as {expected}"#), "{accept:?}");
        }
    }

    #[tokio::test]
    async fn parameter_precedence() {
        let mut router = router();
        router.post("/items/:id", |request: Request| async move {
            Json(request.parameters().clone())
        });

        let mut request = Request::builder(Method::Post, "/items/7")
            .header("Content-Type", "application/json")
            .body(r#"{"id":"body","name":"lamp","owner":"body"}"#)
            .build();
        request.bind("owner", "bound");

        let (status, body) = call(&router, request).await;
        assert_eq!(status, 200);
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({"id": "7", "name": "lamp", "owner": "bound"})
        );
    }

    #[tokio::test]
    async fn scopes_prefix_routes_and_stack_middleware() {
        let mut router = router();
        router.container_mut().bind_middleware("frame", || crate::middleware::builtin::AddFrameGuard);
        router.scope(RouteScope::new("api").stack(RouteStack::new(["frame"])), |api| {
            api.root(|_: Request| async { "api root" });
            api.scope("v1", |v1| {
                v1.get("/status", |_: Request| async { "ok" });
            });
        });
        router.get("/outside", |_: Request| async { "outside" });

        let uris: Vec<_> = router.routes().iter().map(Route::uri).collect();
        assert_eq!(uris, ["/api:?format", "/api/v1/status:?format", "/outside:?format"]);
        assert_eq!(router.routes()[1].middleware().len(), 1);
        assert!(router.routes()[2].middleware().is_empty());

        #[rustfmt::skip]
        let cases = [
            ("/api",            200, "api root"),
            ("/api.json",       200, "api root"),
            ("/api/v1/status",  200, "ok"),
            ("/v1/status",      404, ""),
            ("/outside",        200, "outside"),
        ];

        for (target, status, body) in cases {
            assert_eq!(call(&router, request(Method::Get, target)).await, (status, body.to_string()), "{target}");
        }
    }

    #[tokio::test]
    async fn resources_register_existing_actions() {
        let mut router = router();
        router
            .resource("users", "users")
            .unwrap()
            .resource_with(
                "/account",
                "settings",
                &ResourceNames {
                    new: "fresh".into(),
                    edit: "change".into(),
                },
            )
            .unwrap();

        let routes: Vec<_> = router
            .routes()
            .iter()
            .map(|route| (route.methods().to_vec(), route.uri().to_string(), route.action_name().unwrap().to_string()))
            .collect();

        #[rustfmt::skip]
        let expected = [
            (vec![Method::Get],                "/users:?format",        "index"),
            (vec![Method::Get],                "/users/new",            "new"),
            (vec![Method::Get],                "/users/:id:?format",    "show"),
            (vec![Method::Put, Method::Patch], "/users/:id:?format",    "update"),
            (vec![Method::Get],                "/account/:id/change",   "edit"),
        ];
        let expected: Vec<_> = expected
            .into_iter()
            .map(|(methods, uri, action)| (methods, uri.to_string(), action.to_string()))
            .collect();
        assert_eq!(routes, expected);

        #[rustfmt::skip]
        let cases = [
            (request(Method::Get,   "/users"),          200, r#"[{"id":1}]"#),
            (request(Method::Get,   "/users/new"),      200, "form"),
            (request(Method::Get,   "/users/new.json"), 200, r#"user "new" as application/json"#),
            (request(Method::Patch, "/users/3"),        200, r#"updated "3""#),
            (request(Method::Get,   "/account/1/change"), 200, "settings form"),
        ];

        for (request, status, body) in cases {
            let target = request.path().to_string();
            assert_eq!(call(&router, request).await, (status, body.to_string()), "{target}");
        }
    }

    #[test]
    fn resources_need_controllers() {
        let mut router = router();

        assert!(matches!(
            router.resources([("settings", "settings"), ("config", "config")]),
            Err(Error::NotAController(id)) if id == "config"
        ));
        assert!(matches!(
            router.resource("ghosts", "ghosts"),
            Err(Error::UnresolvedBinding(id)) if id == "ghosts"
        ));
    }

    #[tokio::test]
    async fn non_controller_actions_fail() {
        let mut router = router();
        router.get("/config", Action::new("config", "show"));
        router.get("/users/:id/secret", Action::new("users", "secret"));

        let result = router.handle(request(Method::Get, "/config")).await;
        assert!(matches!(result, Err(Error::NotAController(id)) if id == "config"));

        let result = router.handle(request(Method::Get, "/users/1/secret")).await;
        assert!(matches!(result, Err(Error::UnknownAction { action, .. }) if action == "secret"));
    }

    #[tokio::test]
    async fn table_is_compiled_once() {
        let mut router = router();
        router.get("/first", |_: Request| async { "first" });
        assert_eq!(call(&router, request(Method::Get, "/first")).await.0, 200);

        router.get("/second", |_: Request| async { "second" });
        assert_eq!(call(&router, request(Method::Get, "/second")).await.0, 404);

        router.rebuild();
        assert_eq!(call(&router, request(Method::Get, "/second")).await.0, 200);

        router.resolver_mut().invalidate();
        assert_eq!(call(&router, request(Method::Get, "/first")).await.0, 200);
        router.rebuild();
        assert_eq!(call(&router, request(Method::Get, "/first")).await.0, 404);
    }

    #[tokio::test]
    async fn fallback_sees_bindings_only() {
        let mut router = router();
        router.get("/known", |_: Request| async { "known" });
        router.fallback(|request: Request| async move {
            let mut response = Response::text(format!("fallback {:?}", request.parameters().keys().collect::<Vec<_>>()));
            response.set_status(StatusCode::NOT_FOUND);
            response
        });

        let mut request = Request::builder(Method::Get, "/nowhere")
            .header("Content-Type", "application/json")
            .body(r#"{"ignored":true}"#)
            .build();
        request.bind("tenant", "acme");

        assert_eq!(call(&router, request).await, (404, r#"fallback ["tenant"]"#.to_string()));
        assert_eq!(call(&router, Request::builder(Method::Get, "/known").build()).await.1, "known");
    }

    #[tokio::test]
    async fn route_middleware_runs_inside_global_middleware() {
        let mut router = router();
        router
            .get("/framed", |_: Request| async {
                let mut response = Response::text("framed");
                response.headers_mut().set("x-frame-options", "DENY");
                response
            })
            .with_middleware([MiddlewareRef::instance(crate::middleware::builtin::AddServerHeader::new("inner"))]);

        let response = router.handle(request(Method::Get, "/framed")).await.unwrap();
        assert_eq!(response.headers().get("server"), Some("kiln"));
        assert_eq!(response.headers().get("x-frame-options"), Some("DENY"));

        let mut router = self::router();
        router
            .get("/guarded", |_: Request| async { "secret" })
            .with_middleware(["auth"]);
        let result = router.handle(request(Method::Get, "/guarded")).await;
        assert!(matches!(result, Err(Error::UnresolvedBinding(id)) if id == "auth"));
    }

    #[test]
    fn route_middleware_keeps_stack_middleware() {
        let mut router = router();
        router.stack(["auth"], |guarded| {
            guarded
                .get("/audited", |_: Request| async { "audited" })
                .with_middleware(["audit"]);
        });

        let names: Vec<_> = router.routes()[0].middleware().iter().map(|m| format!("{m:?}")).collect();
        assert_eq!(names, [r#"Named("auth")"#, r#"Named("audit")"#]);
        assert_eq!(router.routes()[0].constraints().get("format").map(String::as_str), Some(r"\.\w+"));
    }

    #[tokio::test]
    async fn application_routes_and_introspection() {
        let mut router = router();
        router.add_application_routes(|router: &mut Router| {
            router.any("/ping", |_: Request| async { "pong" });
            router.route_exact(&[Method::Get], "/robots.txt", |_: Request| async { "User-agent: *" });
        });

        let listed: Vec<_> = router.routes().iter().map(|route| route.uri().to_string()).collect();
        assert_eq!(listed, ["/ping:?format", "/robots.txt"]);
        assert_eq!(call(&router, request(Method::Options, "/ping")).await, (200, "pong".to_string()));
        assert_eq!(call(&router, request(Method::Get, "/robots.txt")).await.0, 200);
    }
}
