//! Length-prefixed message framing.
//!
//! Every message on a request or response body is one frame:
//!
//! ```text
//! +-------------+------------------+-----------------+
//! | compression | length (u32, BE) | payload         |
//! | 1 byte = 0  | 4 bytes          | length bytes    |
//! +-------------+------------------+-----------------+
//! ```
//!
//! Bodies are byte streams, so a frame may arrive split across any number of
//! HTTP data frames; [`FrameReader`] reassembles them.

use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use http_body_util::BodyExt as _;
use hyper::body::Body;
use tracing::warn;

use crate::body::BodySender;
use crate::status::merge_metadata;
use crate::{Error, Metadata, Result, RpcMessage};

pub const HEADER_LEN: usize = 5;

/// Compression flag value for an uncompressed payload, the only one accepted.
pub const NO_COMPRESSION: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub compression: u8,
    pub length: u32,
}

impl FrameHeader {
    /// Parses the 5-byte prefix, rejecting any compressed frame.
    pub fn parse(raw: [u8; HEADER_LEN]) -> Result<Self> {
        let compression = raw[0];
        if compression != NO_COMPRESSION {
            return Err(Error::Compression(compression));
        }
        let length = u32::from_be_bytes([raw[1], raw[2], raw[3], raw[4]]);
        Ok(Self {
            compression,
            length,
        })
    }
}

/// Wraps `payload` in a frame.
pub fn frame(payload: &[u8]) -> Result<Bytes> {
    let length = u32::try_from(payload.len()).map_err(|_| Error::MessageTooLarge(payload.len()))?;

    let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len());
    out.put_u8(NO_COMPRESSION);
    out.put_u32(length);
    out.put_slice(payload);
    Ok(out.freeze())
}

/// Encodes `message` according to its representation and frames it.
pub fn serialize<M: RpcMessage>(message: &M) -> Result<Bytes> {
    let payload = message.encode_message()?;
    frame(&payload)
}

/// Frames `message` and hands it to the body. The write is flushed once this
/// returns.
pub async fn send<M: RpcMessage>(sink: &BodySender, message: &M) -> Result<()> {
    let framed = serialize(message)?;
    sink.send_data(framed).await
}

/// Reads the next message, `None` once the peer has finished sending.
pub async fn receive<M, B>(reader: &mut FrameReader<B>) -> Result<Option<M>>
where
    M: RpcMessage,
    B: Body<Data = Bytes> + Unpin,
    B::Error: Into<Error>,
{
    match reader.next_frame().await? {
        Some(payload) => M::decode_message(payload).map(Some),
        None => Ok(None),
    }
}

/// Reassembles frames from an HTTP body and captures its trailers.
#[derive(Debug)]
pub struct FrameReader<B> {
    body: B,
    buf: BytesMut,
    trailers: Option<Metadata>,
    finished: bool,
}

impl<B> FrameReader<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Into<Error>,
{
    pub fn new(body: B) -> Self {
        Self {
            body,
            buf: BytesMut::new(),
            trailers: None,
            finished: false,
        }
    }

    /// Returns the next frame payload.
    ///
    /// `Ok(None)` is end-of-stream: the body ended with fewer than five header
    /// bytes buffered. A body that ends inside a payload is `Error::Truncated`.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if !self.fill(HEADER_LEN).await? {
            if !self.buf.is_empty() {
                warn!(
                    buffered = self.buf.len(),
                    "body ended inside a frame header; treating as end of stream"
                );
                self.buf.clear();
            }
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&self.buf[..HEADER_LEN]);
        let header = FrameHeader::parse(raw)?;
        let expected = header.length as usize;

        if !self.fill(HEADER_LEN + expected).await? {
            let actual = self.buf.len() - HEADER_LEN;
            self.buf.clear();
            return Err(Error::Truncated { expected, actual });
        }

        self.buf.advance(HEADER_LEN);
        Ok(Some(self.buf.split_to(expected).freeze()))
    }

    /// Consumes whatever is left of the body so its trailers become available.
    pub async fn drain(&mut self) -> Result<()> {
        self.buf.clear();
        while !self.finished {
            self.pull(false).await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn trailers(&self) -> Option<&Metadata> {
        self.trailers.as_ref()
    }

    pub fn take_trailers(&mut self) -> Option<Metadata> {
        self.trailers.take()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Buffers at least `n` bytes; `false` means the body ended first.
    async fn fill(&mut self, n: usize) -> Result<bool> {
        while self.buf.len() < n {
            if self.finished {
                return Ok(false);
            }
            self.pull(true).await?;
        }
        Ok(true)
    }

    async fn pull(&mut self, keep_data: bool) -> Result<()> {
        let Some(frame) = self.body.frame().await else {
            self.finished = true;
            return Ok(());
        };

        match frame.map_err(Into::<Error>::into)?.into_data() {
            Ok(data) => {
                if keep_data {
                    self.buf.extend_from_slice(&data);
                }
            }
            Err(frame) => {
                if let Ok(trailers) = frame.into_trailers() {
                    match self.trailers.as_mut() {
                        Some(existing) => merge_metadata(existing, &trailers),
                        None => self.trailers = Some(trailers),
                    }
                }
            }
        }
        Ok(())
    }
}
