use crate::{
    errors::{Error, ErrorKind},
    limits::{ServerLimits, TransportLimits},
    routing::Router,
    server::connection::{Connection, Upgrader},
    transport::Addresses,
    Version,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    io,
    net::{SocketAddr, ToSocketAddrs},
    sync::Arc,
};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    sync::{watch, Semaphore},
    task::JoinSet,
};

const BACKLOG: i32 = 1024;

/// An HTTP server answering one request per connection with a [`Router`].
///
/// # Examples
///
/// ```no_run
/// use kiln::{Request, Router, Server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), kiln::Error> {
///     let mut router = Router::new();
///     router.get("/", |_: Request| async { "Hello World!" });
///
///     Server::builder()
///         .router(router)
///         .expose("127.0.0.1:8080")?
///         .serve()
///         .await
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    connection: Connection,
    limits: ServerLimits,
    shutdown: Arc<watch::Sender<bool>>,
}

/// Stops a [`Server`] from another task.
#[derive(Debug, Clone)]
pub struct Terminator {
    shutdown: Arc<watch::Sender<bool>>,
}

impl Terminator {
    /// See [`Server::terminate`].
    pub fn terminate(&self) {
        self.shutdown.send_replace(true);
    }
}

impl Server {
    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder() -> ServerBuilder {
        ServerBuilder {
            router: None,
            upgrader: None,
            transport_limits: None,
            server_limits: None,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn terminator(&self) -> Terminator {
        Terminator {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Stops accepting connections; a running [`serve`](Self::serve) winds down.
    pub fn terminate(&self) {
        self.shutdown.send_replace(true);
    }

    /// Accepts connections until [`terminate`](Self::terminate) is called.
    ///
    /// Each connection runs in its own task. Past
    /// [`max_connections`](ServerLimits::max_connections) running tasks, new
    /// connections get a canned `503` and are closed. Once terminated, running
    /// connections get [`shutdown_grace`](ServerLimits::shutdown_grace) to
    /// finish before they are aborted.
    pub async fn serve(&self) -> Result<(), Error> {
        let permits = Arc::new(Semaphore::new(self.limits.max_connections));
        let mut tasks = JoinSet::new();
        let mut shutdown = self.shutdown.subscribe();

        tracing::info!(address = ?self.listener.local_addr().ok(), "listening");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.wait_for(|stop| *stop) => break,

                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to accept connection");
                            continue;
                        }
                    };
                    if self.limits.nodelay {
                        let _ = stream.set_nodelay(true);
                    }

                    match Arc::clone(&permits).try_acquire_owned() {
                        Ok(permit) => {
                            let connection = self.connection.clone();
                            let addresses = Addresses {
                                local: stream.local_addr().ok(),
                                peer: Some(peer),
                            };
                            tasks.spawn(async move {
                                connection.run(stream, addresses).await;
                                drop(permit);
                            });
                        }
                        Err(_) => {
                            tracing::warn!(%peer, max_connections = self.limits.max_connections, "connection limit reached");
                            tasks.spawn(reject(stream, self.limits.json_errors));
                        }
                    }
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        tracing::info!(in_flight = tasks.len(), "terminated, draining connections");
        self.drain(&mut tasks).await;
        Ok(())
    }

    async fn drain(&self, tasks: &mut JoinSet<()>) {
        let drained = tokio::time::timeout(self.limits.shutdown_grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(aborted = tasks.len(), "connections outlived the shutdown grace period");
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }
    }
}

async fn reject(mut stream: TcpStream, json: bool) {
    let canned = ErrorKind::ServiceUnavailable.as_http(Version::Http11, json);
    if let Err(err) = stream.write_all(canned).await {
        tracing::debug!(peer = ?stream.peer_addr().ok(), error = %err, "failed to write 503 response");
    }
    let _ = stream.shutdown().await;
}

/// Builder for configuring and creating [`Server`] instances.
pub struct ServerBuilder {
    router: Option<Router>,
    upgrader: Option<Arc<dyn Upgrader>>,
    transport_limits: Option<TransportLimits>,
    server_limits: Option<ServerLimits>,
}

impl ServerBuilder {
    /// Sets the router answering every request.
    ///
    /// **This is a required component.**
    #[inline]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Sets the collaborator consulted for websocket upgrade requests.
    #[inline]
    pub fn upgrader(mut self, upgrader: impl Upgrader + 'static) -> Self {
        self.upgrader = Some(Arc::new(upgrader));
        self
    }

    /// Configures request parsing and response writing limits.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), kiln::Error> {
    /// use kiln::{limits::TransportLimits, Router, Server};
    ///
    /// let server = Server::builder()
    ///     .router(Router::new())
    ///     .transport_limits(TransportLimits {
    ///         header_size: 8 * 1024,
    ///         ..TransportLimits::default()
    ///     })
    ///     .expose("127.0.0.1:8080")?;
    /// # Ok(())
    /// # }
    /// ```
    #[inline]
    pub fn transport_limits(mut self, limits: TransportLimits) -> Self {
        self.transport_limits = Some(limits);
        self
    }

    /// Configures admission and shutdown behavior.
    #[inline]
    pub fn server_limits(mut self, limits: ServerLimits) -> Self {
        self.server_limits = Some(limits);
        self
    }

    /// Binds a listening socket on the first address `address` resolves to
    /// and builds the server.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics with ``The `router` method must be called to create`` when no
    /// router was set.
    ///
    /// # Errors
    ///
    /// Resolution and socket errors, as [`Error::Io`].
    #[track_caller]
    pub fn expose(self, address: impl ToSocketAddrs) -> Result<Server, Error> {
        let address = address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing"))?;

        let listener = TcpListener::from_std(bind(address)?)?;
        Ok(self.listener(listener))
    }

    /// Builds the server around an already bound listener.
    ///
    /// # Panics
    ///
    /// Panics with ``The `router` method must be called to create`` when no
    /// router was set.
    #[track_caller]
    pub fn listener(self, listener: TcpListener) -> Server {
        let router = self
            .router
            .expect("The `router` method must be called to create");
        let transport = self.transport_limits.unwrap_or_default();
        let limits = self.server_limits.unwrap_or_default();
        let (shutdown, _) = watch::channel(false);

        Server {
            listener,
            connection: Connection::new(Arc::new(router), self.upgrader, &transport, limits.json_errors),
            limits,
            shutdown: Arc::new(shutdown),
        }
    }
}

fn bind(address: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&address.into())?;
    socket.listen(BACKLOG)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}
