//! Size ceilings, timeouts and concurrency settings
//!
//! # Defaults
//!
//! Defaults are conservative. They protect against:
//! - header flooding (a `431` once the head outgrows [`TransportLimits::header_size`])
//! - oversized uploads (a `413` once a body outgrows [`TransportLimits::body_size`])
//! - connection storms (a canned `503` past [`ServerLimits::max_connections`])
//!
//! # Memory Consumption
//!
//! Each connection task holds one read buffer that grows by
//! [`read_buffer`](TransportLimits::read_buffer) bytes at a time. It is capped at
//! `header_size + body_size` plus one read, so with defaults a single
//! connection never buffers more than about `143 KB`.
//!
//! # Examples
//!
//! ```no_run
//! use kiln::{limits::{ServerLimits, TransportLimits}, Router, Server};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kiln::Error> {
//!     let server = Server::builder()
//!         .router(Router::new())
//!         .transport_limits(TransportLimits {
//!             body_size: 1024 * 1024,                       // 1 MB uploads
//!             read_timeout: Some(Duration::from_secs(10)),  // drop slow clients
//!             ..TransportLimits::default()
//!         })
//!         .server_limits(ServerLimits {
//!             max_connections: 10_000,
//!             ..ServerLimits::default()
//!         })
//!         .expose("127.0.0.1:8080")?;
//!
//!     server.serve().await
//! }
//! ```

use std::time::Duration;

/// Ceilings applied while a message is read off or written onto a stream.
///
/// Shared by the server side ([`RequestTransport`](crate::transport::RequestTransport))
/// and the client side ([`ResponseTransport`](crate::transport::ResponseTransport)).
///
/// # Reading a message
/// ```text
///  [ read `read_buffer` bytes ]  <================\\
///              ||                                  ||
///              \/                                  ||
///     /-------------------\   No   /------------------------\   No
///     | `\r\n\r\n` found? | =====> | buffer > header_size ? | =====> (loop)
///     \-------------------/        \------------------------/
///              || Yes                          || Yes
///              \/                              \/
///     [ parse start line + headers ]       [ 431 ]
///              ||
///              \/
///     [ body: chunked | Content-Length | empty ]  ==> over body_size ==> [ 413 ]
/// ```
#[derive(Debug, Clone)]
pub struct TransportLimits {
    /// Maximum size of the start line plus headers, in bytes (default: `4096`).
    ///
    /// A head *longer* than this fails with
    /// [`HeaderTooLarge`](crate::errors::ErrorKind::HeaderTooLarge): a head of
    /// exactly `header_size` bytes is accepted. The check runs both while
    /// searching for the blank line and once it is found, so the outcome does
    /// not depend on how the peer split its writes.
    pub header_size: usize,

    /// Maximum body size, in bytes (default: `131072`, 128 KB).
    ///
    /// Applies to `Content-Length` bodies and to the de-chunked size of
    /// `Transfer-Encoding: chunked` bodies. A declared length over this value
    /// fails with [`BodyTooLarge`](crate::errors::ErrorKind::BodyTooLarge) even
    /// when the peer closes before sending it all.
    pub body_size: usize,

    /// Bytes reserved in the buffer before each socket read (default: `8192`).
    pub read_buffer: usize,

    /// Largest piece a buffered body is written in (default: `8192`).
    ///
    /// Streamed bodies are written as their chunks arrive, whatever their size.
    pub write_chunk: usize,

    /// Longest wait for a single socket read (default: `None`).
    ///
    /// With `None` a peer that stalls inside the size ceilings holds its
    /// connection until it sends more data or hangs up. With `Some(duration)`,
    /// a read that stays idle for `duration` fails with
    /// [`Error::Timeout`](crate::Error::Timeout) and the connection is closed.
    pub read_timeout: Option<Duration>,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for TransportLimits {
    #[inline]
    fn default() -> Self {
        Self {
            header_size: 4096,
            body_size: 128 * 1024,
            read_buffer: 8192,
            write_chunk: 8192,
            read_timeout: None,

            _priv: (),
        }
    }
}

/// Server-level admission and shutdown behavior.
///
/// # Connection management
/// ```text
///                       [------------]
///                       [ Tcp accept ]
///                       [------------]
///                             ||
///                             \/
/// [---------------]  Yes  /-----------------\   No   [-------------]
/// [ Spawn a task  ] <==== | Permit for it?  | =====> [ Sending 503 ]
/// [---------------]       \-----------------/        [-------------]
///        ||
///        \/
/// [ read request ] => [ upgrade? | route ] => [ write response ] => [ close ]
/// ```
///
/// Every accepted connection gets its own task; a permit is held for the
/// task's whole life, so at most `max_connections` requests are in flight.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Maximum number of connections handled at once (default: `1024`).
    ///
    /// Connections accepted past this limit immediately receive a
    /// `503 Service Unavailable` and are closed.
    pub max_connections: usize,

    /// How long [`serve`](crate::Server::serve) waits for in-flight
    /// connections after [`terminate`](crate::Server::terminate)
    /// (default: `5 seconds`).
    ///
    /// Tasks still running when the grace period ends are aborted.
    pub shutdown_grace: Duration,

    /// Format for protocol error responses (default: `true`)
    ///
    /// # Examples
    /// If `true`, then on error the server will return:
    /// ```text
    /// HTTP/1.1 400 Bad Request\r
    /// connection: close\r
    /// content-length: 53\r
    /// content-type: application/json\r
    /// \r
    /// {"error":"Missing Host header","code":"MISSING_HOST"}
    /// ```
    /// If `false`, then on error the server will return:
    /// ```text
    /// HTTP/1.1 400 Bad Request\r
    /// connection: close\r
    /// content-length: 0\r
    /// \r
    /// ```
    pub json_errors: bool,

    /// Sets `TCP_NODELAY` on accepted sockets (default: `true`).
    pub nodelay: bool,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_connections: 1024,
            shutdown_grace: Duration::from_secs(5),
            json_errors: true,
            nodelay: true,

            _priv: (),
        }
    }
}

/// Settings of the outgoing [`HttpClient`](crate::client::HttpClient).
#[derive(Debug, Clone)]
pub struct ClientLimits {
    /// Upper bound for one exchange, from connecting to the last body byte
    /// (default: `30 seconds`).
    pub timeout: Duration,

    /// Sets `TCP_NODELAY` on the outgoing socket (default: `false`).
    pub nodelay: bool,

    /// Ceilings applied while reading the response.
    ///
    /// Defaults to [`TransportLimits::default`] with `body_size` raised to 8 MB.
    pub transport: TransportLimits,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ClientLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            nodelay: false,
            transport: TransportLimits {
                body_size: 8 * 1024 * 1024,
                ..TransportLimits::default()
            },

            _priv: (),
        }
    }
}
