//! Conversion of whatever a handler returns into a [`Response`].

use crate::{
    errors::Error,
    http::{
        response::Response,
        view::{Html, Renderable},
    },
};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

/// A handler result, classified by how it becomes a response.
///
/// | Variant        | Response                                   |
/// |----------------|--------------------------------------------|
/// | `Renderable`   | rendered, with the view's content type     |
/// | `Response`     | unchanged                                  |
/// | `Json`         | `application/json`                         |
/// | `Text`         | `text/plain`                               |
/// | `Opaque`       | best-effort `application/json`             |
pub enum Reply {
    Renderable(Box<dyn Renderable>),
    Response(Response),
    Json(Value),
    Text(String),
    Opaque(Value),
}

impl Reply {
    pub fn into_response(self) -> Result<Response, Error> {
        match self {
            Reply::Renderable(view) => Ok(Response::text_with(view.render()?, view.content_type())),
            Reply::Response(response) => Ok(response),
            Reply::Json(value) => Response::json(&value),
            Reply::Text(text) => Ok(Response::text(text)),
            Reply::Opaque(value) => Response::json(&value),
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Renderable(_) => f.write_str("Renderable"),
            Reply::Response(response) => f.debug_tuple("Response").field(response).finish(),
            Reply::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Reply::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Reply::Opaque(value) => f.debug_tuple("Opaque").field(value).finish(),
        }
    }
}

/// Serializes the wrapped value into a JSON reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

/// Values a handler may return.
pub trait IntoReply {
    fn into_reply(self) -> Result<Reply, Error>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(self)
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Response(self))
    }
}

impl IntoReply for Box<dyn Renderable> {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Renderable(self))
    }
}

impl IntoReply for Html {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Renderable(Box::new(self)))
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Json(serde_json::to_value(self.0)?))
    }
}

impl<T: Serialize> IntoReply for Vec<T> {
    fn into_reply(self) -> Result<Reply, Error> {
        Json(self).into_reply()
    }
}

impl<K: Serialize, V: Serialize> IntoReply for HashMap<K, V> {
    fn into_reply(self) -> Result<Reply, Error> {
        Json(self).into_reply()
    }
}

impl<K: Serialize, V: Serialize> IntoReply for BTreeMap<K, V> {
    fn into_reply(self) -> Result<Reply, Error> {
        Json(self).into_reply()
    }
}

/// Scalars become text; arrays and objects become JSON; `null` is encoded as is.
impl IntoReply for Value {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(match self {
            Value::String(text) => Reply::Text(text),
            Value::Bool(flag) => Reply::Text(flag.to_string()),
            Value::Number(number) => Reply::Text(number.to_string()),
            value @ (Value::Array(_) | Value::Object(_)) => Reply::Json(value),
            Value::Null => Reply::Opaque(Value::Null),
        })
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Text(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Text(self.to_string()))
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Opaque(Value::Null))
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Result<Reply, Error> {
        match self {
            Some(value) => value.into_reply(),
            None => Ok(Reply::Opaque(Value::Null)),
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<Error>,
{
    fn into_reply(self) -> Result<Reply, Error> {
        self.map_err(Into::into)?.into_reply()
    }
}

macro_rules! scalar_replies {
    ($($ty:ty),*) => {
        $(
            impl IntoReply for $ty {
                fn into_reply(self) -> Result<Reply, Error> {
                    Ok(Reply::Text(self.to_string()))
                }
            }
        )*
    };
}

scalar_replies!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
