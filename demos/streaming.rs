//! `curl -N localhost:8080/countdown`

use bytes::Bytes;
use futures_util::StreamExt;
use kiln::{Request, Response, Router, Server};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), kiln::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut router = Router::new();
    router.get("/countdown", |_: Request| async {
        let ticks = futures_util::stream::iter((0..=5).rev()).then(|tick| async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Bytes::from(format!("{tick}\n"))
        });
        Response::streamed(ticks)
    });

    let server = Server::builder().router(router).expose("127.0.0.1:8080")?;
    let terminator = server.terminator();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            terminator.terminate();
        }
    });

    server.serve().await
}
