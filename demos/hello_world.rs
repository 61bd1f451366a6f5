use kiln::{Request, Router, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), kiln::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut router = Router::new();
    router.root(|_: Request| async { "Hello World!" });
    router.get("/hello/:name", |request: Request| async move {
        let name = request
            .parameter("name")
            .and_then(|name| name.as_str())
            .unwrap_or("stranger")
            .to_string();
        format!("Hello, {name}!")
    });

    Server::builder()
        .router(router)
        .expose("127.0.0.1:8080")?
        .serve()
        .await
}
