//! `Transfer-Encoding: chunked` framing
//! [[RFC7230, Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1)].

use crate::errors::ErrorKind;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use memchr::memmem;

/// The zero-size chunk that ends a chunked body (no trailers).
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

// Longest size or trailer line accepted before the framing is considered broken.
const MAX_LINE: usize = 4096;

/// Frames one chunk as `<HEX-SIZE>\r\n<bytes>\r\n`.
///
/// An empty chunk yields [`LAST_CHUNK`].
pub fn encode_chunk(data: &[u8]) -> Bytes {
    if data.is_empty() {
        return Bytes::from_static(LAST_CHUNK);
    }

    let size = format!("{:X}\r\n", data.len());
    let mut framed = BytesMut::with_capacity(size.len() + data.len() + 2);
    framed.put_slice(size.as_bytes());
    framed.put_slice(data);
    framed.put_slice(b"\r\n");
    framed.freeze()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Data(Bytes),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    Data(usize),
    DataEnd,
    Trailer,
    Done,
}

/// Incremental decoder: [`feed`](Self::feed) bytes as they arrive, then pull
/// [`decode`](Self::decode) until it asks for more input.
#[derive(Debug)]
pub struct ChunkDecoder {
    state: State,
    buffer: BytesMut,
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Size,
            buffer: BytesMut::new(),
        }
    }

    pub fn feed(&mut self, input: &[u8]) {
        self.buffer.extend_from_slice(input);
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Bytes received past the end of the body.
    pub fn into_remaining(self) -> BytesMut {
        self.buffer
    }

    /// Next piece of the body, `Ok(None)` when more input is needed.
    pub fn decode(&mut self) -> Result<Option<Decoded>, ErrorKind> {
        loop {
            match self.state {
                State::Size => {
                    let Some(line) = self.take_line()? else {
                        return Ok(None);
                    };
                    let size = parse_size(&line)?;
                    self.state = if size == 0 { State::Trailer } else { State::Data(size) };
                }
                State::Data(remaining) => {
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                    let take = remaining.min(self.buffer.len());
                    let data = self.buffer.split_to(take).freeze();

                    self.state = match remaining - take {
                        0 => State::DataEnd,
                        left => State::Data(left),
                    };
                    return Ok(Some(Decoded::Data(data)));
                }
                State::DataEnd => {
                    if self.buffer.len() < 2 {
                        return Ok(None);
                    }
                    if &self.buffer[..2] != b"\r\n" {
                        return Err(ErrorKind::InvalidChunk);
                    }
                    self.buffer.advance(2);
                    self.state = State::Size;
                }
                State::Trailer => {
                    let Some(line) = self.take_line()? else {
                        return Ok(None);
                    };
                    if line.is_empty() {
                        self.state = State::Done;
                        return Ok(Some(Decoded::End));
                    }
                }
                State::Done => return Ok(None),
            }
        }
    }

    fn take_line(&mut self) -> Result<Option<BytesMut>, ErrorKind> {
        match memmem::find(&self.buffer, b"\r\n") {
            Some(end) => {
                let line = self.buffer.split_to(end);
                self.buffer.advance(2);
                Ok(Some(line))
            }
            None if self.buffer.len() > MAX_LINE => Err(ErrorKind::InvalidChunk),
            None => Ok(None),
        }
    }
}

fn parse_size(line: &[u8]) -> Result<usize, ErrorKind> {
    let line = simdutf8::basic::from_utf8(line).map_err(|_| ErrorKind::InvalidChunk)?;
    // Chunk extensions (`;name=value`) are ignored.
    let size = line.split(';').next().unwrap_or_default().trim();

    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ErrorKind::InvalidChunk);
    }

    usize::from_str_radix(size, 16).map_err(|_| ErrorKind::InvalidChunk)
}
