//! Request/response interceptors composed around a terminal endpoint.
//!
//! # Ordering
//!
//! The first middleware in a pipeline is the outermost one: it sees the
//! request first and the response last.
//!
//! ```text
//! Request --> A --> B --> Endpoint
//!                            |
//! Response <-- A <-- B <-----/
//! ```
//!
//! # Examples
//!
//! ```
//! use kiln::{middleware::{Middleware, Next}, BoxFuture, Error, Request, Response};
//!
//! struct RequestId;
//!
//! impl Middleware for RequestId {
//!     fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
//!         Box::pin(async move {
//!             let mut response = next.run(request).await?;
//!             response.headers_mut().set("X-Request-Id", "42");
//!             Ok(response)
//!         })
//!     }
//! }
//! ```

pub mod builtin;

use crate::{
    errors::Error,
    http::{request::Request, response::Response},
    routing::container::{Container, Instance},
    BoxFuture,
};
use std::{fmt, future::Future, sync::Arc};

/// An interceptor that may act before and after the rest of the chain.
///
/// Implementations must be thread-safe: one instance serves every request.
pub trait Middleware: Send + Sync {
    fn handle<'a>(&'a self, request: Request, next: Next<'a>)
        -> BoxFuture<'a, Result<Response, Error>>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The innermost responder of a pipeline.
pub trait Endpoint: Send + Sync {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, Error>>;
}

impl<F, Fut> Endpoint for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, Error>> {
        Box::pin(self(request))
    }
}

/// The rest of the chain, as seen from inside a middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    /// Passes `request` to the next layer.
    pub fn run(self, request: Request) -> BoxFuture<'a, Result<Response, Error>> {
        match self.middleware.split_first() {
            Some((layer, rest)) => layer.handle(
                request,
                Next {
                    middleware: rest,
                    endpoint: self.endpoint,
                },
            ),
            None => self.endpoint.call(request),
        }
    }
}

/// Ordered middleware, outermost first.
#[derive(Clone, Default)]
pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Middleware>> {
        self.middleware.iter()
    }

    /// Runs `request` through every layer and into `endpoint`.
    pub async fn run(&self, request: Request, endpoint: &dyn Endpoint) -> Result<Response, Error> {
        Next {
            middleware: &self.middleware,
            endpoint,
        }
        .run(request)
        .await
    }
}

impl Extend<Arc<dyn Middleware>> for Pipeline {
    fn extend<I: IntoIterator<Item = Arc<dyn Middleware>>>(&mut self, iter: I) {
        self.middleware.extend(iter);
    }
}

impl FromIterator<Arc<dyn Middleware>> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Middleware>>>(iter: I) -> Self {
        Self {
            middleware: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.middleware.iter().map(|layer| layer.name()))
            .finish()
    }
}

/// A middleware given either as an instance or by the identifier it is bound
/// to in the [`Container`].
///
/// Named middleware is resolved when a request reaches its route.
#[derive(Clone)]
pub enum MiddlewareRef {
    Instance(Arc<dyn Middleware>),
    Named(String),
}

impl MiddlewareRef {
    pub fn instance<M: Middleware + 'static>(middleware: M) -> Self {
        Self::Instance(Arc::new(middleware))
    }

    pub fn named(id: impl Into<String>) -> Self {
        Self::Named(id.into())
    }

    /// The middleware itself, constructing named ones through `container`.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedBinding`] when nothing is bound to the identifier,
    /// [`Error::NotAMiddleware`] when something other than a middleware is.
    pub fn resolve(&self, container: &Container) -> Result<Arc<dyn Middleware>, Error> {
        match self {
            Self::Instance(middleware) => Ok(Arc::clone(middleware)),
            Self::Named(id) => match container.resolve(id)? {
                Instance::Middleware(middleware) => Ok(middleware),
                _ => Err(Error::NotAMiddleware(id.clone())),
            },
        }
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareRef {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        Self::Instance(middleware)
    }
}

impl From<&str> for MiddlewareRef {
    fn from(id: &str) -> Self {
        Self::Named(id.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(id: String) -> Self {
        Self::Named(id)
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(middleware) => f.debug_tuple("Instance").field(&middleware.name()).finish(),
            Self::Named(id) => f.debug_tuple("Named").field(id).finish(),
        }
    }
}
