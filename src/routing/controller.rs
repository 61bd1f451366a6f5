use super::reply::Reply;
use crate::{errors::Error, http::request::Request, BoxFuture};

/// A group of named actions that routes can point at.
///
/// A fresh controller is constructed from the [`Container`](super::Container)
/// for every request it serves. Implementations are usually generated with
/// [`controller!`](crate::controller).
pub trait Controller: Send + Sync + 'static {
    /// Names of every action [`invoke`](Self::invoke) accepts.
    fn actions(&self) -> &'static [&'static str];

    /// Runs `action` on `request`.
    fn invoke(self: Box<Self>, action: &str, request: Request) -> BoxFuture<'static, Result<Reply, Error>>;

    fn has_action(&self, action: &str) -> bool {
        self.actions().contains(&action)
    }
}

/// Implements [`Controller`] by dispatching each listed action to the async
/// method of the same name.
///
/// Every method takes `&self` and a [`Request`], and returns anything
/// [`IntoReply`](crate::routing::IntoReply).
///
/// # Examples
/// ```
/// use kiln::{controller, routing::Json, Request};
/// use serde_json::json;
///
/// struct Users;
///
/// impl Users {
///     async fn index(&self, _: Request) -> Json<serde_json::Value> {
///         Json(json!([{"id": 1}]))
///     }
///
///     async fn show(&self, request: Request) -> String {
///         format!("user {}", request.parameter("id").unwrap())
///     }
/// }
///
/// controller!(Users { index, show });
/// ```
#[macro_export]
macro_rules! controller {
    ($ty:ty { $($action:ident),* $(,)? }) => {
        impl $crate::routing::Controller for $ty {
            fn actions(&self) -> &'static [&'static str] {
                &[$(stringify!($action)),*]
            }

            fn invoke(
                self: ::std::boxed::Box<Self>,
                action: &str,
                request: $crate::Request,
            ) -> $crate::BoxFuture<'static, ::std::result::Result<$crate::routing::Reply, $crate::Error>> {
                #[allow(unused_imports)]
                use $crate::routing::IntoReply as _;

                #[allow(unused_variables)]
                let this = *self;
                match action {
                    $(
                        stringify!($action) => ::std::boxed::Box::pin(async move {
                            this.$action(request).await.into_reply()
                        }),
                    )*
                    other => {
                        let err = $crate::Error::UnknownAction {
                            controller: stringify!($ty).to_string(),
                            action: other.to_string(),
                        };
                        ::std::boxed::Box::pin(async move { Err(err) })
                    }
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{http::types::Method, routing::Json};
    use serde_json::{json, Value};

    struct Articles {
        prefix: &'static str,
    }

    impl Articles {
        async fn index(&self, _: Request) -> Json<Value> {
            Json(json!(["first", "second"]))
        }

        async fn show(&self, request: Request) -> Result<String, Error> {
            let id = request.parameter("id").ok_or(Error::Closed)?;
            Ok(format!("{}{id}", self.prefix))
        }
    }

    crate::controller!(Articles { index, show });

    fn request() -> Request {
        let mut request = Request::builder(Method::Get, "/").build();
        request.set_parameters([("id".to_string(), json!(7))].into_iter().collect());
        request
    }

    #[test]
    fn lists_actions() {
        let articles = Articles { prefix: "" };
        assert_eq!(articles.actions(), ["index", "show"]);
        assert!(articles.has_action("show"));
        assert!(!articles.has_action("destroy"));
    }

    #[tokio::test]
    async fn invokes_by_name() {
        #[rustfmt::skip]
        let cases = [
            ("index", r#"["first","second"]"#),
            ("show",  "article 7"),
        ];

        for (action, expected) in cases {
            let controller = Box::new(Articles { prefix: "article " });
            let reply = controller.invoke(action, request()).await.unwrap();
            let mut response = reply.into_response().unwrap();
            assert_eq!(response.take_body().collect().await, bytes::Bytes::from(expected), "{action}");
        }
    }

    #[tokio::test]
    async fn unknown_action() {
        let controller = Box::new(Articles { prefix: "" });
        let result = controller.invoke("destroy", request()).await;

        assert!(matches!(
            result,
            Err(Error::UnknownAction { controller, action })
                if controller == "Articles" && action == "destroy"
        ));
    }
}
