//! Bridge to an external view engine.

use crate::{
    errors::Error,
    http::{
        request::Request,
        response::Response,
        types::ContentType,
    },
};
use serde_json::Value;
use thiserror::Error;

/// Something that renders itself into a response body.
///
/// Returned from a handler, a renderable takes precedence over every other
/// kind of result and is rendered as-is.
pub trait Renderable: Send {
    fn render(&self) -> Result<String, Error>;

    fn content_type(&self) -> &'static str {
        ContentType::HTML
    }
}

/// Raw HTML returned from a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Html(pub String);

impl Renderable for Html {
    fn render(&self) -> Result<String, Error> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("view `{0}` not found")]
pub struct ViewNotFound(pub String);

/// View engine collaborator.
pub trait ViewRenderer: Send + Sync {
    /// Renders the view at `path` (alias plus extension) with `data`.
    fn render(&self, path: &str, data: &Value) -> Result<Box<dyn Renderable>, ViewNotFound>;

    /// A view with the same alias but some other extension, if there is one.
    fn find_fallback(&self, alias: &str, data: &Value) -> Option<Box<dyn Renderable>>;
}

impl Response {
    /// Renders the view `alias` in the format `request` asked for.
    ///
    /// Without an extension, `.json` is tried for JSON requests and `.html`
    /// for everything else. When that view is missing, a JSON request gets
    /// `data` back as JSON, with a single-element array unwrapped; any other
    /// request gets a fallback view, or `404 Not Found`.
    pub fn render(
        renderer: &dyn ViewRenderer,
        request: &Request,
        alias: &str,
        data: Value,
    ) -> Result<Response, Error> {
        let wants_json = request.format() == ContentType::JSON;

        let mut path = alias.to_string();
        if !has_extension(alias) {
            path.push_str(if wants_json { ".json" } else { ".html" });
        }

        let view = match renderer.render(&path, &data) {
            Ok(view) => view,
            Err(_) if wants_json => {
                let data = match data {
                    Value::Array(mut items) if items.len() == 1 => items.remove(0),
                    data => data,
                };
                return Response::json(&data);
            }
            Err(ViewNotFound(missing)) => match renderer.find_fallback(alias, &data) {
                Some(view) => view,
                None => {
                    tracing::debug!(view = %missing, "no view or fallback to render");
                    return Ok(Response::not_found());
                }
            },
        };

        Ok(Response::text_with(view.render()?, view.content_type()))
    }
}

fn has_extension(alias: &str) -> bool {
    let file = alias.rsplit('/').next().unwrap_or(alias);
    file.rfind('.').is_some_and(|dot| dot > 0 && dot + 1 < file.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::types::Method;
    use serde_json::json;
    use std::collections::HashMap;

    struct Template {
        source: &'static str,
        content_type: &'static str,
    }

    impl Renderable for Template {
        fn render(&self) -> Result<String, Error> {
            Ok(self.source.to_string())
        }

        fn content_type(&self) -> &'static str {
            self.content_type
        }
    }

    struct Views(HashMap<&'static str, &'static str>);

    impl ViewRenderer for Views {
        fn render(&self, path: &str, _: &Value) -> Result<Box<dyn Renderable>, ViewNotFound> {
            let source = *self.0.get(path).ok_or_else(|| ViewNotFound(path.into()))?;
            let content_type = match path.ends_with(".json") {
                true => ContentType::JSON,
                false => ContentType::HTML,
            };
            Ok(Box::new(Template {
                source,
                content_type,
            }))
        }

        fn find_fallback(&self, alias: &str, data: &Value) -> Option<Box<dyn Renderable>> {
            self.render(&format!("{alias}.txt"), data).ok()
        }
    }

    fn request(format: &'static str) -> Request {
        let mut request = Request::builder(Method::Get, "/").build();
        request.set_format(format);
        request
    }

    #[tokio::test]
    async fn picks_view_by_format() {
        let views = Views(HashMap::from([
            ("users/index.html", "<ul></ul>"),
            ("users/index.json", "[]"),
            ("about.txt", "plain"),
        ]));

        #[rustfmt::skip]
        let cases = [
            (ContentType::HTML, "users/index",       json!(null),         200, "<ul></ul>"),
            (ContentType::JSON, "users/index",       json!(null),         200, "[]"),
            (ContentType::JSON, "users/show",        json!([{"id": 1}]),  200, r#"{"id":1}"#),
            (ContentType::JSON, "users/show",        json!([1, 2]),       200, "[1,2]"),
            (ContentType::HTML, "about",             json!(null),         200, "plain"),
            (ContentType::HTML, "missing",           json!(null),         404, ""),
            (ContentType::JSON, "users/index.html",  json!(null),         200, "<ul></ul>"),
        ];

        for (format, alias, data, status, body) in cases {
            let mut response = Response::render(&views, &request(format), alias, data).unwrap();
            assert_eq!(response.status().as_u16(), status, "{alias}");
            assert_eq!(
                response.take_body().collect().await,
                bytes::Bytes::from(body),
                "{alias}"
            );
        }
    }

    #[test]
    fn content_type_follows_view() {
        let views = Views(HashMap::from([("report.json", "{}")]));
        let response = Response::render(&views, &request(ContentType::JSON), "report", json!({}))
            .unwrap();

        assert_eq!(response.headers().content_type(), Some(ContentType::JSON));
    }

    #[test]
    fn extensions() {
        #[rustfmt::skip]
        let cases = [
            ("users/index",       false),
            ("users/index.html",  true),
            ("v1.2/users",        false),
            (".hidden",           false),
            ("trailing.",         false),
        ];

        for (alias, expected) in cases {
            assert_eq!(has_extension(alias), expected, "{alias}");
        }
    }
}
