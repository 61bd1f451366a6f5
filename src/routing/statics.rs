use super::route::{Callback, IntoCallback};
use crate::{
    errors::Error,
    http::{request::Request, response::Response, types::ContentType},
};
use percent_encoding::percent_decode_str;
use std::{
    io,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

/// Serves files below a directory; meant as the router's fallback.
///
/// ```no_run
/// use kiln::{routing::StaticFiles, Router};
///
/// let mut router = Router::new();
/// router.fallback(StaticFiles::new("public"));
/// ```
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: Arc<PathBuf>,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file addressed by `request`, or `404 Not Found`.
    pub async fn serve(&self, request: &Request) -> Result<Response, Error> {
        let Some(path) = self.resolve(request.path()) else {
            return Ok(Response::not_found());
        };

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => return Ok(Response::not_found()),
        }

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Response::text_with(content, content_type(&path))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Response::not_found()),
            Err(err) => Err(err.into()),
        }
    }

    /// File path for a request path; `None` when it tries to leave the root.
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
        let relative = Path::new(decoded.trim_start_matches('/'));

        let mut path = self.root.to_path_buf();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(path)
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some("js") => ContentType::JS,
        Some("json") => ContentType::JSON,
        Some("css") => ContentType::CSS,
        Some("html") => ContentType::HTML,
        _ => ContentType::TXT,
    }
}

impl IntoCallback<StaticFiles> for StaticFiles {
    fn into_callback(self) -> Callback {
        (move |request: Request| {
            let files = self.clone();
            async move { files.serve(&request).await }
        })
        .into_callback()
    }
}
