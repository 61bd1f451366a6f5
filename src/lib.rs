//! kiln - HTTP/1.1 processing core for async applications
//!
//! A small server core: a wire transport that turns bytes into requests and
//! responses back into bytes, a middleware pipeline, and a router that
//! dispatches to closures or container-resolved controllers.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1** and **HTTP/1.0**: one request per connection, then close
//! - **Chunked encoding**: de-chunked request bodies, [streamed responses](Response::streamed)
//! - **Upgrades**: websocket handshakes are handed to an [`Upgrader`](server::Upgrader)
//!
//! # Examples
//!
//! Quick start:
//! ```no_run
//! use kiln::{Request, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kiln::Error> {
//!     let mut router = Router::new();
//!     router.get("/", |_: Request| async { "Hello World!" });
//!
//!     Server::builder()
//!         .router(router)
//!         .expose("127.0.0.1:8080")?
//!         .serve()
//!         .await
//! }
//! ```
//! Parameters, scopes and JSON:
//! ```no_run
//! use kiln::{routing::Json, Request, Router, Server};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kiln::Error> {
//!     let mut router = Router::new();
//!     router.scope("/api", |router| {
//!         router.get("/users/:id", |request: Request| async move {
//!             Json(json!({ "id": request.parameter("id") }))
//!         });
//!     });
//!
//!     Server::builder()
//!         .router(router)
//!         .expose("127.0.0.1:8080")?
//!         .serve()
//!         .await
//! }
//! ```
//! Advanced configuration:
//! ```no_run
//! use kiln::{limits::{ServerLimits, TransportLimits}, Router, Server};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kiln::Error> {
//!     Server::builder()
//!         .router(Router::new())
//!         .server_limits(ServerLimits {
//!             max_connections: 5000, // Higher concurrency
//!             shutdown_grace: Duration::from_secs(10),
//!             ..ServerLimits::default()
//!         })
//!         .transport_limits(TransportLimits {
//!             header_size: 8 * 1024,         // Larger heads for complex APIs
//!             body_size: 1024 * 1024,        // 1 MB uploads
//!             ..TransportLimits::default()
//!         })
//!         .expose("127.0.0.1:8080")?
//!         .serve()
//!         .await
//! }
//! ```
//!
//! # Logging
//!
//! Events go through [`tracing`]; install any subscriber to see them.
//! Connection lifecycle events are on `debug`, rejected requests on `warn`,
//! failed handlers on `error`.

use std::{future::Future, pin::Pin};

pub mod http {
    pub mod body;
    pub mod headers;
    pub mod request;
    pub mod response;
    pub mod types;
    pub mod view;
}
pub mod server {
    mod connection;
    #[allow(clippy::module_inception)]
    mod server;

    pub use connection::{is_websocket_upgrade, Upgrader};
    pub use server::{Server, ServerBuilder, Terminator};
}
pub mod client;
pub mod errors;
pub mod limits;
pub mod middleware;
pub mod routing;
pub mod transport;

/// Boxed future used at every dynamic seam: handlers, middleware, upgraders.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use crate::{
    client::HttpClient,
    errors::{ClientError, Error, ErrorKind},
    http::{
        body::Body,
        headers::HeaderBag,
        request::Request,
        response::Response,
        types::{ContentType, Method, StatusCode, Uri, Version},
        view::{Html, ViewRenderer},
    },
    routing::{Controller, Router},
    server::{Server, ServerBuilder},
};
