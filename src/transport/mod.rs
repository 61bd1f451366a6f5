//! Wire-level encode/decode of HTTP/1.1 messages.
//!
//! [`RequestTransport`] and [`ResponseTransport`] are symmetric codecs: each
//! can receive its message kind off a stream and send it onto one. They share
//! the head and body framing implemented here.

pub mod chunked;
pub(crate) mod request;
pub(crate) mod response;

use crate::{
    errors::{Error, ErrorKind},
    http::{body::Body, headers::HeaderBag},
    limits::TransportLimits,
};
use bytes::{Buf, Bytes, BytesMut};
use chunked::{ChunkDecoder, Decoded};
use futures_util::StreamExt;
use memchr::memmem;
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::sleep,
};

pub use request::RequestTransport;
pub use response::{Handoff, ResponseTransport};

/// A bidirectional byte stream a connection runs over.
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

/// Socket addresses of the connection a message arrives on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Addresses {
    pub local: Option<SocketAddr>,
    pub peer: Option<SocketAddr>,
}

/// Incremental reader over a stream with a growing buffer.
pub(crate) struct Reader<'a, R> {
    stream: &'a mut R,
    buffer: BytesMut,
    limits: &'a TransportLimits,
}

impl<'a, R: AsyncRead + Unpin> Reader<'a, R> {
    pub(crate) fn new(stream: &'a mut R, limits: &'a TransportLimits) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(limits.read_buffer),
            limits,
        }
    }

    async fn fill_buffer(&mut self) -> Result<usize, Error> {
        self.buffer.reserve(self.limits.read_buffer);

        match self.limits.read_timeout {
            Some(time) => fill_with_timeout(self.stream, &mut self.buffer, time).await,
            None => Ok(self.stream.read_buf(&mut self.buffer).await?),
        }
    }

    /// Reads up to the blank line ending the head and returns the head without it.
    ///
    /// CR/LF noise in front of the start line is dropped. A head longer than
    /// [`TransportLimits::header_size`] fails with [`ErrorKind::HeaderTooLarge`].
    pub(crate) async fn read_head(&mut self) -> Result<String, Error> {
        if self.fill_buffer().await? == 0 {
            return Err(ErrorKind::EmptyStream.into());
        }

        loop {
            let noise = self
                .buffer
                .iter()
                .take_while(|&&b| b == b'\r' || b == b'\n')
                .count();
            self.buffer.advance(noise);

            if let Some(end) = memmem::find(&self.buffer, b"\r\n\r\n") {
                if end > self.limits.header_size {
                    return Err(ErrorKind::HeaderTooLarge.into());
                }

                let head = self.buffer.split_to(end + 4);
                return simdutf8::basic::from_utf8(&head[..end])
                    .map(str::to_string)
                    .map_err(|_| ErrorKind::InvalidHeader.into());
            }

            if self.buffer.len() > self.limits.header_size {
                return Err(ErrorKind::HeaderTooLarge.into());
            }
            if self.fill_buffer().await? == 0 {
                return Err(Error::Closed);
            }
        }
    }

    /// Reads a body framed by `headers`.
    ///
    /// - more than one `Content-Length` fails with [`ErrorKind::MultipleContentLength`];
    /// - `Transfer-Encoding: chunked` is de-chunked;
    /// - a numeric `Content-Length` over [`TransportLimits::body_size`] fails with
    ///   [`ErrorKind::BodyTooLarge`] before anything is read;
    /// - otherwise the body is empty, or with `until_eof`, read until the peer closes.
    ///
    /// A peer that closes early yields the partial body.
    pub(crate) async fn read_body(
        &mut self,
        headers: &HeaderBag,
        until_eof: bool,
    ) -> Result<Bytes, Error> {
        if headers.get_all("content-length").len() > 1 {
            return Err(ErrorKind::MultipleContentLength.into());
        }
        if is_chunked(headers) {
            return self.read_chunked().await;
        }

        let limit = self.limits.body_size;
        let declared = match headers.content_length() {
            Some(declared) => declared,
            None if until_eof => return self.read_to_end().await,
            None => return Ok(Bytes::new()),
        };
        if declared > limit {
            return Err(ErrorKind::BodyTooLarge.into());
        }

        while self.buffer.len() < declared {
            if self.fill_buffer().await? == 0 {
                break;
            }
        }

        let take = declared.min(self.buffer.len());
        Ok(self.buffer.split_to(take).freeze())
    }

    async fn read_chunked(&mut self) -> Result<Bytes, Error> {
        let limit = self.limits.body_size;
        let mut decoder = ChunkDecoder::new();
        let mut body = BytesMut::new();

        decoder.feed(&self.buffer.split());
        loop {
            match decoder.decode()? {
                Some(Decoded::Data(data)) => {
                    if body.len() + data.len() > limit {
                        return Err(ErrorKind::BodyTooLarge.into());
                    }
                    body.extend_from_slice(&data);
                }
                Some(Decoded::End) => {
                    self.buffer = decoder.into_remaining();
                    return Ok(body.freeze());
                }
                None => {
                    if self.fill_buffer().await? == 0 {
                        return Ok(body.freeze());
                    }
                    decoder.feed(&self.buffer.split());
                }
            }
        }
    }

    async fn read_to_end(&mut self) -> Result<Bytes, Error> {
        while self.fill_buffer().await? != 0 {
            if self.buffer.len() > self.limits.body_size {
                return Err(ErrorKind::BodyTooLarge.into());
            }
        }
        Ok(self.buffer.split().freeze())
    }
}

async fn fill_with_timeout<R: AsyncRead + Unpin>(
    stream: &mut R,
    buffer: &mut BytesMut,
    time: Duration,
) -> Result<usize, Error> {
    tokio::select! {
        biased;

        read_result = stream.read_buf(buffer) => Ok(read_result?),
        _ = sleep(time) => Err(Error::Timeout),
    }
}

pub(crate) fn is_chunked(headers: &HeaderBag) -> bool {
    headers.transfer_encoding().is_some_and(|value| {
        value
            .rsplit(',')
            .next()
            .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
    })
}

/// Writes `head`, the blank line, then every non-empty piece of `body`.
pub(crate) async fn write_message<W>(
    stream: &mut W,
    head: String,
    body: Body,
    limits: &TransportLimits,
) -> Result<(), Error>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut head = head;
    head.push_str("\r\n\r\n");
    stream.write_all(head.as_bytes()).await?;

    match body {
        Body::Empty => {}
        Body::Full(bytes) => {
            for chunk in bytes.chunks(limits.write_chunk.max(1)) {
                stream.write_all(chunk).await?;
            }
        }
        Body::Stream(mut chunks) => {
            while let Some(chunk) = chunks.next().await {
                if !chunk.is_empty() {
                    stream.write_all(&chunk).await?;
                }
            }
        }
    }

    stream.flush().await?;
    Ok(())
}
