//! Route registration and dispatch.

pub mod container;
pub mod controller;
pub mod dispatcher;
pub mod reply;
pub mod resolver;
pub mod route;
pub mod router;
pub mod scope;
pub mod statics;

pub use container::{Container, Instance};
pub use controller::Controller;
pub use dispatcher::DispatchTable;
pub use reply::{IntoReply, Json, Reply};
pub use resolver::{DefaultRouteResolver, RouteResolver};
pub use route::{Action, Callback, HandlerFn, IntoCallback, Route};
pub use router::{ResourceNames, RouteSource, Router};
pub use scope::{RouteScope, RouteStack};
pub use statics::StaticFiles;
