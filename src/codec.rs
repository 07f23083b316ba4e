use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::buffer;
use crate::context::Context;
use crate::error::{Error, ErrorReply};
use crate::frame::{Frame, FrameKind, CRLF};
use crate::transport::Transport;
use crate::Result;

/// Stateful RESP reader/writer bound to one transport for the duration of a
/// single command exchange.
///
/// Bytes `[0, pending)` of the scratch buffer hold the unread suffix of the
/// most recent read, always beginning at a frame or sub-frame boundary. The
/// buffer itself is borrowed from the process-wide free list and handed back
/// on drop.
pub struct Codec<'a> {
    transport: &'a mut dyn Transport,
    buf: Vec<u8>,
    pending: usize,
}

impl<'a> Codec<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Codec<'a> {
        Codec {
            transport,
            buf: buffer::take(),
            pending: 0,
        }
    }

    /// Inspects the discriminator of the next frame without consuming it.
    pub async fn peek_type(&mut self, ctx: &Context) -> Result<FrameKind> {
        if self.pending == 0 {
            let n = self.fill(ctx).await?;
            if n == 0 {
                return Err(self.fail(Error::ConnectionClosed));
            }
            self.pending = n;
        }

        match FrameKind::try_from(self.buf[0]) {
            Ok(kind) => Ok(kind),
            Err(err) => Err(self.fail(err)),
        }
    }

    pub async fn read_simple_string(&mut self, ctx: &Context) -> Result<Bytes> {
        self.read_line(ctx, FrameKind::Simple).await.map(Bytes::from)
    }

    pub async fn read_bulk_string(&mut self, ctx: &Context) -> Result<Option<Bytes>> {
        let header = self.read_line(ctx, FrameKind::Bulk).await?;
        let length = self.parse_decimal(&header, "bulk string length")?;

        if length == -1 {
            return Ok(None);
        }
        if length < 0 {
            return Err(self.fail(Error::Protocol(format!(
                "invalid bulk string length {}",
                length
            ))));
        }

        let payload = self.read_payload(ctx, length as usize).await?;
        Ok(Some(Bytes::from(payload)))
    }

    pub async fn read_integer(&mut self, ctx: &Context) -> Result<i64> {
        let line = self.read_line(ctx, FrameKind::Integer).await?;
        self.parse_decimal(&line, "integer")
    }

    pub async fn read_null(&mut self, ctx: &Context) -> Result<()> {
        let line = self.read_line(ctx, FrameKind::Null).await?;
        if !line.is_empty() {
            return Err(self.fail(Error::Protocol(String::from("malformed null frame"))));
        }
        Ok(())
    }

    /// Reads an error frame. The first space splits the conventional kind
    /// tag from the message; without one the kind is empty.
    pub async fn read_error(&mut self, ctx: &Context) -> Result<ErrorReply> {
        let line = self.read_line(ctx, FrameKind::Error).await?;

        let reply = match line.iter().position(|&byte| byte == b' ') {
            Some(idx) => ErrorReply {
                kind: String::from_utf8_lossy(&line[..idx]).into_owned(),
                message: String::from_utf8_lossy(&line[idx + 1..]).into_owned(),
            },
            None => ErrorReply {
                kind: String::new(),
                message: String::from_utf8_lossy(&line).into_owned(),
            },
        };
        Ok(reply)
    }

    pub async fn read_array(&mut self, ctx: &Context) -> Result<Option<Vec<Frame>>> {
        let header = self.read_line(ctx, FrameKind::Array).await?;
        let length = self.parse_decimal(&header, "array length")?;

        if length == -1 {
            return Ok(None);
        }
        if length < 0 {
            return Err(self.fail(Error::Protocol(format!("invalid array length {}", length))));
        }

        let mut frames = Vec::with_capacity(length as usize);
        for _ in 0..length {
            frames.push(self.read_frame(ctx).await?);
        }
        Ok(Some(frames))
    }

    /// Reads a map frame into its flattened key,value frames.
    pub async fn read_map(&mut self, ctx: &Context) -> Result<Vec<Frame>> {
        let header = self.read_line(ctx, FrameKind::Map).await?;
        let pairs = self.parse_decimal(&header, "map length")?;
        if pairs < 0 {
            return Err(self.fail(Error::Protocol(format!("invalid map length {}", pairs))));
        }

        let mut items = Vec::with_capacity(pairs as usize * 2);
        for _ in 0..pairs * 2 {
            items.push(self.read_frame(ctx).await?);
        }
        Ok(items)
    }

    /// Reads one frame of any kind, dispatching on its discriminator.
    pub fn read_frame<'s>(
        &'s mut self,
        ctx: &'s Context,
    ) -> Pin<Box<dyn Future<Output = Result<Frame>> + Send + 's>> {
        Box::pin(async move {
            match self.peek_type(ctx).await? {
                FrameKind::Simple => {
                    let payload = self.read_simple_string(ctx).await?;
                    match String::from_utf8(payload.to_vec()) {
                        Ok(string) => Ok(Frame::Simple(string)),
                        Err(_) => Err(self.fail(Error::Protocol(String::from(
                            "invalid utf-8 in simple string",
                        )))),
                    }
                }
                FrameKind::Error => self.read_error(ctx).await.map(Frame::Error),
                FrameKind::Integer => self.read_integer(ctx).await.map(Frame::Integer),
                FrameKind::Bulk => self.read_bulk_string(ctx).await.map(Frame::Bulk),
                FrameKind::Array => self.read_array(ctx).await.map(Frame::Array),
                FrameKind::Map => self.read_map(ctx).await.map(Frame::Map),
                FrameKind::Null => self.read_null(ctx).await.map(|_| Frame::Null),
            }
        })
    }

    /// Emits `$<len>CRLF<payload>CRLF` as one socket write.
    pub async fn write_bulk_string(&mut self, ctx: &Context, payload: &[u8]) -> Result<()> {
        let length = payload.len().to_string();
        let mut frame = Vec::with_capacity(1 + length.len() + CRLF.len() * 2 + payload.len());
        frame.push(u8::from(FrameKind::Bulk));
        frame.extend_from_slice(length.as_bytes());
        frame.extend_from_slice(CRLF);
        frame.extend_from_slice(payload);
        frame.extend_from_slice(CRLF);
        self.write(ctx, &frame).await
    }

    /// Emits the request shape: an array of bulk strings.
    pub async fn write_bulk_string_array(&mut self, ctx: &Context, items: &[Bytes]) -> Result<()> {
        let length = items.len().to_string();
        let mut header = Vec::with_capacity(1 + length.len() + CRLF.len());
        header.push(u8::from(FrameKind::Array));
        header.extend_from_slice(length.as_bytes());
        header.extend_from_slice(CRLF);
        self.write(ctx, &header).await?;

        for item in items {
            self.write_bulk_string(ctx, item).await?;
        }
        Ok(())
    }

    /// Returns the bytes before the next CRLF, consuming the CRLF and
    /// stripping the expected discriminator prefix.
    async fn read_line(&mut self, ctx: &Context, kind: FrameKind) -> Result<Vec<u8>> {
        let mut line = self.read_before_terminator(ctx).await?;
        if line.first() != Some(&u8::from(kind)) {
            return Err(self.fail(Error::Protocol(format!(
                "expected `{}` prefix",
                u8::from(kind) as char
            ))));
        }
        Ok(line.split_off(1))
    }

    async fn read_before_terminator(&mut self, ctx: &Context) -> Result<Vec<u8>> {
        let mut rec = self.buf[..self.pending].to_vec();
        self.pending = 0;

        let mut terminator = find_crlf(&rec);
        while terminator.is_none() {
            let n = self.fill(ctx).await?;
            if n == 0 {
                return Err(self.fail(Error::Protocol(String::from(
                    "stream ended before terminator",
                ))));
            }
            rec.extend_from_slice(&self.buf[..n]);
            terminator = find_crlf(&rec);
        }

        let terminator = terminator.expect("terminator found");
        self.stash(&rec[terminator + CRLF.len()..]);
        rec.truncate(terminator);
        Ok(rec)
    }

    /// Reads exactly `length` payload bytes plus the trailing CRLF. The
    /// payload is 8-bit clean and may itself contain CRLF.
    async fn read_payload(&mut self, ctx: &Context, length: usize) -> Result<Vec<u8>> {
        let total = length + CRLF.len();
        let mut rec = self.buf[..self.pending].to_vec();
        self.pending = 0;

        while rec.len() < total {
            let n = self.fill(ctx).await?;
            if n == 0 {
                return Err(self.fail(Error::Protocol(String::from(
                    "stream ended inside bulk string payload",
                ))));
            }
            rec.extend_from_slice(&self.buf[..n]);
        }

        let rest = rec.split_off(total);
        self.stash(&rest);
        if &rec[length..] != CRLF {
            return Err(self.fail(Error::Protocol(String::from(
                "bulk string payload missing terminator",
            ))));
        }
        rec.truncate(length);
        Ok(rec)
    }

    /// One native read into the scratch buffer. Assumes `pending == 0`.
    async fn fill(&mut self, ctx: &Context) -> Result<usize> {
        match self.transport.read(ctx, &mut self.buf).await {
            Ok(n) => Ok(n),
            Err(err) => {
                self.transport.set_broken();
                Err(err)
            }
        }
    }

    async fn write(&mut self, ctx: &Context, payload: &[u8]) -> Result<()> {
        if let Err(err) = self.transport.write(ctx, payload).await {
            self.transport.set_broken();
            return Err(err);
        }
        Ok(())
    }

    /// Carries an unread suffix over to the front of the scratch buffer.
    ///
    /// The suffix is always shorter than one read, so it fits.
    fn stash(&mut self, rest: &[u8]) {
        self.buf[..rest.len()].copy_from_slice(rest);
        self.pending = rest.len();
    }

    fn parse_decimal(&mut self, digits: &[u8], what: &str) -> Result<i64> {
        let parsed = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<i64>().ok());
        match parsed {
            Some(value) => Ok(value),
            None => Err(self.fail(Error::Protocol(format!("invalid {}", what)))),
        }
    }

    /// Fails the exchange, leaving the transport unusable: the framing
    /// cursor is no longer trustworthy relative to the server's stream.
    fn fail(&mut self, err: Error) -> Error {
        self.transport.set_broken();
        err
    }
}

impl Drop for Codec<'_> {
    fn drop(&mut self) {
        buffer::put(std::mem::take(&mut self.buf));
    }
}

fn find_crlf(haystack: &[u8]) -> Option<usize> {
    haystack.windows(2).position(|window| window == CRLF)
}
