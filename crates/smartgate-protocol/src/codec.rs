//! Tokio codec for the raw stream transport.
//!
//! `LineCodec` turns the TCP byte stream into discrete [`Request`] values
//! and encodes [`Response`] values back to wire form. It implements:
//! - [`Decoder`]: splits the stream on the end-of-message byte, decodes
//!   UTF-8, and discards empty or whitespace-only payloads without
//!   surfacing them to the dispatch engine
//! - [`Encoder<Response>`]: appends the encoded response string
//!
//! # DoS Protection
//!
//! A maximum frame size bounds both the scan buffer and encoded
//! responses. Streams that exceed the limit without producing a
//! terminator are rejected with an error, which closes the connection.
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//! use smartgate_protocol::{LineCodec, Response};
//! use futures::{SinkExt, StreamExt};
//!
//! # async fn example() -> smartgate_core::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:5740").await?;
//! let mut framed = Framed::new(stream, LineCodec::new());
//!
//! framed.send(Response::new("INITIALIZATION")).await?;
//! if let Some(Ok(request)) = framed.next().await {
//!     println!("Received: {:?}", request);
//! }
//! # Ok(())
//! # }
//! ```

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::{Request, Response};
use smartgate_core::{
    Error, Result,
    constants::MESSAGE_TERMINATOR,
};

/// Default maximum frame size in bytes (64 KB).
///
/// Generous enough for every legitimate gateway message while bounding
/// memory consumed by a malformed or malicious stream.
const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Tokio codec for line-oriented gateway messages.
#[derive(Debug)]
pub struct LineCodec {
    /// Maximum allowed frame size in bytes.
    max_frame_size: usize,
}

impl LineCodec {
    /// Create a codec with the default maximum frame size.
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Create a codec with a custom maximum frame size.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Get the current maximum frame size.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Request;
    type Error = Error;

    /// Decode the next request from the byte stream.
    ///
    /// Scans for the end-of-message byte and parses the payload before
    /// it. Payloads that parse to nothing (empty/whitespace) are skipped
    /// in place, so a single call keeps scanning until it produces a
    /// request or runs out of complete frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame exceeds the maximum size or the
    /// payload is not valid UTF-8.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let Some(pos) = src.iter().position(|b| *b == MESSAGE_TERMINATOR) else {
                // No complete frame; bound the accumulation.
                if src.len() > self.max_frame_size {
                    return Err(Error::FrameTooLarge {
                        size: src.len(),
                        max_size: self.max_frame_size,
                    });
                }
                return Ok(None);
            };

            let line = src.split_to(pos + 1);
            let payload = &line[..pos];

            if payload.len() > self.max_frame_size {
                return Err(Error::FrameTooLarge {
                    size: payload.len(),
                    max_size: self.max_frame_size,
                });
            }

            let text = std::str::from_utf8(payload).map_err(|e| {
                Error::InvalidMessageFormat(format!("payload is not valid UTF-8: {e}"))
            })?;

            if let Some(request) = Request::parse(text) {
                return Ok(Some(request));
            }
            // Blank payload: discard silently and keep scanning.
        }
    }
}

impl Encoder<Response> for LineCodec {
    type Error = Error;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<()> {
        let encoded = item.encode();

        if encoded.len() > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size: encoded.len(),
                max_size: self.max_frame_size,
            });
        }

        dst.extend_from_slice(encoded.as_bytes());
        Ok(())
    }
}
