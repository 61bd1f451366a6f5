//! `curl -H 'content-type: application/json' -d '{"title":"kiln"}' localhost:8080/api/articles`
//! `curl localhost:8080/api/articles/1.json`

use kiln::{
    controller,
    routing::{Json, RouteScope, RouteStack},
    Request, Response, Router, Server, StatusCode,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

type Store = Arc<RwLock<Vec<Value>>>;

struct Articles {
    store: Store,
}

impl Articles {
    async fn index(&self, _: Request) -> Json<Vec<Value>> {
        Json(self.store.read().await.clone())
    }

    async fn show(&self, request: Request) -> Result<Response, kiln::Error> {
        let store = self.store.read().await;
        match self.find(&request).and_then(|index| store.get(index)) {
            Some(article) => Response::json(article),
            None => Ok(Response::not_found()),
        }
    }

    async fn create(&self, request: Request) -> Result<Response, kiln::Error> {
        let Some(title) = request.parameter("title").and_then(Value::as_str) else {
            return Ok(Response::new("`title` is required", StatusCode::UNPROCESSABLE_ENTITY));
        };

        let mut store = self.store.write().await;
        let article = json!({ "id": store.len() + 1, "title": title });
        store.push(article.clone());

        let mut response = Response::json(&article)?;
        response.set_status(StatusCode::CREATED);
        Ok(response)
    }

    fn find(&self, request: &Request) -> Option<usize> {
        let id: usize = request.parameter("id")?.as_str()?.parse().ok()?;
        id.checked_sub(1)
    }
}

controller!(Articles { index, show, create });

#[tokio::main]
async fn main() -> Result<(), kiln::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kiln=debug")))
        .init();

    let store = Store::default();
    let mut router = Router::new();
    router.container_mut().bind_controller("articles", move || Articles {
        store: Arc::clone(&store),
    });
    router
        .container_mut()
        .bind_middleware("frame", || kiln::middleware::builtin::AddFrameGuard);

    let api = RouteScope::new("api").stack(RouteStack::new(["frame"]));
    let mut registered = Ok(());
    router.scope(api, |api| {
        registered = api.resource("articles", "articles").map(|_| ());
    });
    registered?;

    for route in router.routes() {
        tracing::info!(methods = ?route.methods(), uri = route.uri(), "route");
    }

    Server::builder()
        .router(router)
        .expose("127.0.0.1:8080")?
        .serve()
        .await
}
