use crate::{
    errors::{Error, ErrorKind},
    http::{request::Request, response::Response, types::Method},
    limits::TransportLimits,
    routing::Router,
    transport::{Addresses, Handoff, Io, RequestTransport, ResponseTransport},
    BoxFuture, Version,
};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Takes over connections asking to switch protocols.
///
/// # Examples
/// ```
/// use kiln::{server::Upgrader, BoxFuture, Request, Response};
/// use tokio::io::AsyncWriteExt;
///
/// struct Greeter;
///
/// impl Upgrader for Greeter {
///     fn upgrade<'a>(&'a self, _: &'a Request) -> BoxFuture<'a, Option<Response>> {
///         Box::pin(async {
///             let mut response = Response::default();
///             response.headers_mut().set("Upgrade", "websocket").set("Connection", "Upgrade");
///             response.upgrade(|mut io| async move {
///                 let _ = io.write_all(b"hello").await;
///             });
///             Some(response)
///         })
///     }
/// }
/// ```
pub trait Upgrader: Send + Sync {
    /// Response to an upgrade request, or `None` to let the router answer it.
    ///
    /// A response with an [upgrade handler](Response::upgrade) gets the socket
    /// once it is written; any other response is sent and the connection closed.
    fn upgrade<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Option<Response>>;
}

/// Whether `request` is a `GET` asking to switch to the websocket protocol.
pub fn is_websocket_upgrade(request: &Request) -> bool {
    let headers = request.headers();

    request.method() == Method::Get
        && headers
            .upgrade()
            .is_some_and(|upgrade| upgrade.trim().eq_ignore_ascii_case("websocket"))
        && headers.connection().is_some_and(|connection| {
            connection
                .split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        })
}

/// Serves exactly one request per connection.
#[derive(Clone)]
pub(crate) struct Connection {
    router: Arc<Router>,
    upgrader: Option<Arc<dyn Upgrader>>,
    requests: RequestTransport,
    responses: ResponseTransport,
    json_errors: bool,
}

impl Connection {
    pub(crate) fn new(
        router: Arc<Router>,
        upgrader: Option<Arc<dyn Upgrader>>,
        limits: &TransportLimits,
        json_errors: bool,
    ) -> Self {
        Self {
            router,
            upgrader,
            requests: RequestTransport::new(limits.clone()),
            responses: ResponseTransport::new(limits.clone()),
            json_errors,
        }
    }

    /// Reads one request, answers it and closes `stream`, unless it was
    /// handed to an upgrade handler.
    pub(crate) async fn run<S: Io + 'static>(&self, mut stream: S, addresses: Addresses) {
        tracing::debug!(remote = ?addresses.peer, local = ?addresses.local, "connection accepted");

        let request = match self.requests.receive(&mut stream, addresses).await {
            Ok(request) => request,
            Err(Error::Client(err)) if err.kind == ErrorKind::EmptyStream => {
                return close(stream).await;
            }
            Err(Error::Client(err)) => {
                tracing::warn!(peer = ?err.peer, error = %err, status = err.status().as_u16(), "rejecting request");
                let canned = err.kind.as_http(Version::Http11, self.json_errors);
                if let Err(err) = stream.write_all(canned).await {
                    tracing::debug!(remote = ?addresses.peer, error = %err, "failed to write canned error response");
                }
                return close(stream).await;
            }
            Err(err) => {
                tracing::debug!(remote = ?addresses.peer, error = %err, "connection dropped before a request arrived");
                return close(stream).await;
            }
        };

        let method = request.method();
        let response = match self.respond(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(remote = ?addresses.peer, error = %err, "request failed, closing connection");
                return close(stream).await;
            }
        };

        match self.responses.send(response, stream, method).await {
            Ok(Handoff::Retained(stream)) => close(stream).await,
            Ok(Handoff::Upgraded) => {
                tracing::debug!(remote = ?addresses.peer, "connection upgraded");
            }
            Err(err) if err.is_disconnect() => {
                tracing::debug!(remote = ?addresses.peer, "peer hung up during the response");
            }
            Err(err) => {
                tracing::warn!(remote = ?addresses.peer, error = %err, "failed to send response");
            }
        }
    }

    async fn respond(&self, request: Request) -> Result<Response, Error> {
        if let Some(upgrader) = &self.upgrader {
            if is_websocket_upgrade(&request) {
                if let Some(response) = upgrader.upgrade(&request).await {
                    return Ok(response);
                }
            }
        }

        let mut response = self.router.handle(request).await?;
        response
            .headers_mut()
            .set_with("connection", "close", false);
        Ok(response)
    }
}

async fn close<S: Io>(mut stream: S) {
    let _ = stream.shutdown().await;
}
