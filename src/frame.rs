// https://redis.io/docs/reference/protocol-spec

use bytes::Bytes;

use crate::error::{Error, ErrorReply};

pub(crate) const CRLF: &[u8; 2] = b"\r\n";

/// A single RESP frame.
///
/// `Bulk(None)` is the RESP2 null bulk string (`$-1`), `Array(None)` the
/// RESP2 null array (`*-1`) and `Null` the RESP3 null (`_`). A `Map` holds
/// its entries flattened as alternating key and value frames.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(ErrorReply),
    Integer(i64),
    Bulk(Option<Bytes>),
    Array(Option<Vec<Frame>>),
    Map(Vec<Frame>),
    Null,
}

impl Frame {
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Frame::Simple(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(FrameKind::Simple));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Error(reply) => {
                let mut bytes = Vec::new();
                bytes.push(u8::from(FrameKind::Error));
                if !reply.kind.is_empty() {
                    bytes.extend_from_slice(reply.kind.as_bytes());
                    bytes.push(b' ');
                }
                bytes.extend_from_slice(reply.message.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Integer(i) => {
                let digits = i.to_string();
                let mut bytes = Vec::with_capacity(1 + digits.len() + CRLF.len());
                bytes.push(u8::from(FrameKind::Integer));
                bytes.extend_from_slice(digits.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Bulk(Some(data)) => {
                let length = data.len().to_string();
                let mut bytes =
                    Vec::with_capacity(1 + length.len() + CRLF.len() * 2 + data.len());
                bytes.push(u8::from(FrameKind::Bulk));
                bytes.extend_from_slice(length.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes.extend_from_slice(data);
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Bulk(None) => b"$-1\r\n".to_vec(),
            Frame::Array(Some(frames)) => {
                let length = frames.len().to_string();
                let mut bytes = Vec::with_capacity(1 + length.len() + CRLF.len());
                bytes.push(u8::from(FrameKind::Array));
                bytes.extend_from_slice(length.as_bytes());
                bytes.extend_from_slice(CRLF);
                for frame in frames {
                    bytes.extend(frame.serialize());
                }
                bytes
            }
            Frame::Array(None) => b"*-1\r\n".to_vec(),
            Frame::Map(items) => {
                // Entries are flattened key,value pairs; the header counts pairs.
                let length = (items.len() / 2).to_string();
                let mut bytes = Vec::with_capacity(1 + length.len() + CRLF.len());
                bytes.push(u8::from(FrameKind::Map));
                bytes.extend_from_slice(length.as_bytes());
                bytes.extend_from_slice(CRLF);
                for item in items {
                    bytes.extend(item.serialize());
                }
                bytes
            }
            Frame::Null => b"_\r\n".to_vec(),
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

/// The first-byte discriminator of a RESP frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Simple,  // '+'
    Error,   // '-'
    Integer, // ':'
    Bulk,    // '$'
    Array,   // '*'
    Map,     // '%'
    Null,    // '_'
}

impl TryFrom<u8> for FrameKind {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Error> {
        match byte {
            b'+' => Ok(FrameKind::Simple),
            b'-' => Ok(FrameKind::Error),
            b':' => Ok(FrameKind::Integer),
            b'$' => Ok(FrameKind::Bulk),
            b'*' => Ok(FrameKind::Array),
            b'%' => Ok(FrameKind::Map),
            b'_' => Ok(FrameKind::Null),
            byte => Err(Error::Protocol(format!(
                "invalid frame type byte `{}`",
                byte as char
            ))),
        }
    }
}

impl From<FrameKind> for u8 {
    fn from(kind: FrameKind) -> Self {
        match kind {
            FrameKind::Simple => b'+',
            FrameKind::Error => b'-',
            FrameKind::Integer => b':',
            FrameKind::Bulk => b'$',
            FrameKind::Array => b'*',
            FrameKind::Map => b'%',
            FrameKind::Null => b'_',
        }
    }
}
