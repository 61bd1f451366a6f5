//! Message body: nothing, a buffered payload, or a lazily produced stream.

use bytes::{Bytes, BytesMut};
use futures_util::stream::{BoxStream, Stream, StreamExt};
use std::fmt;

pub enum Body {
    Empty,
    Full(Bytes),
    Stream(BoxStream<'static, Bytes>),
}

impl Body {
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Bytes> + Send + 'static,
    {
        Body::Stream(stream.boxed())
    }

    /// Known length of a buffered body; streams report `None`.
    pub fn len(&self) -> Option<usize> {
        match self {
            Body::Empty => Some(0),
            Body::Full(bytes) => Some(bytes.len()),
            Body::Stream(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Buffered bytes without consuming the body, if any.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Full(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Drains the whole body into one buffer.
    pub async fn collect(self) -> Bytes {
        match self {
            Body::Empty => Bytes::new(),
            Body::Full(bytes) => bytes,
            Body::Stream(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk);
                }
                buffer.freeze()
            }
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Full(bytes) => f.debug_tuple("Body::Full").field(bytes).finish(),
            Body::Stream(_) => f.write_str("Body::Stream(..)"),
        }
    }
}

macro_rules! impl_from_buffered {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Body {
            fn from(value: $ty) -> Self {
                Body::Full(Bytes::from(value))
            }
        }
    )*};
}

impl_from_buffered!(Bytes, String, Vec<u8>, &'static str, &'static [u8]);
