pub mod append;
pub mod copy;
pub mod decr;
pub mod decrby;
pub mod get;
pub mod getdel;
pub mod getex;
pub mod getrange;
pub mod getset;
pub mod incr;
pub mod incrby;
pub mod incrbyfloat;
pub mod lcs;
pub mod mget;
pub mod mset;
pub mod msetnx;
pub mod psetex;
pub mod set;
pub mod setex;
pub mod setnx;
pub mod setrange;
pub mod strlen;
pub mod substr;

use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::context::Context;
use crate::error::Error;
use crate::frame::FrameKind;
use crate::value::Value;
use crate::Result;

/// One request/response exchange over a codec.
///
/// `serialize` writes exactly one request frame; `parse` reads and
/// interprets its reply. Commands hold their arguments and are not mutated
/// after construction, so the same command value may be executed repeatedly.
#[async_trait]
pub trait Command: Send + Sync {
    type Output: Send;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()>;

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output>;
}

/// Adapter erasing a typed command result into a [`Value`], the shape
/// pipelines collect.
pub(crate) struct Erased<C>(pub(crate) C);

#[async_trait]
impl<C> Command for Erased<C>
where
    C: Command,
    C::Output: Into<Value>,
{
    type Output = Value;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        self.0.serialize(codec, ctx).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Value> {
        self.0.parse(codec, ctx).await.map(Into::into)
    }
}

/// An optional trailing argument: a fixed token or a token,value pair
/// appended after a command's positional arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    /// `EX <seconds>` relative expiry.
    Ex(u64),
    /// `PX <milliseconds>` relative expiry.
    Px(u64),
    /// `EXAT <unix-time-seconds>` absolute expiry.
    ExAt(u64),
    /// `PXAT <unix-time-milliseconds>` absolute expiry.
    PxAt(u64),
    /// Only set the key if it does not exist yet.
    Nx,
    /// Only set the key if it already exists.
    Xx,
    /// Retain the key's current expiry.
    KeepTtl,
    /// Drop the key's expiry.
    Persist,
    /// Ask LCS for match positions instead of the subsequence.
    Idx,
    /// Restrict LCS matches to at least this length.
    MinMatchLen(u64),
    /// Include the length of each LCS match.
    WithMatchLen,
    /// Overwrite the destination key if it exists.
    Replace,
    /// Destination database index.
    Db(u64),
}

impl Arg {
    pub(crate) fn append_to(&self, out: &mut Vec<Bytes>) {
        match self {
            Arg::Ex(seconds) => {
                out.push(Bytes::from_static(b"EX"));
                out.push(Bytes::from(seconds.to_string()));
            }
            Arg::Px(millis) => {
                out.push(Bytes::from_static(b"PX"));
                out.push(Bytes::from(millis.to_string()));
            }
            Arg::ExAt(timestamp) => {
                out.push(Bytes::from_static(b"EXAT"));
                out.push(Bytes::from(timestamp.to_string()));
            }
            Arg::PxAt(timestamp) => {
                out.push(Bytes::from_static(b"PXAT"));
                out.push(Bytes::from(timestamp.to_string()));
            }
            Arg::Nx => out.push(Bytes::from_static(b"NX")),
            Arg::Xx => out.push(Bytes::from_static(b"XX")),
            Arg::KeepTtl => out.push(Bytes::from_static(b"KEEPTTL")),
            Arg::Persist => out.push(Bytes::from_static(b"PERSIST")),
            Arg::Idx => out.push(Bytes::from_static(b"IDX")),
            Arg::MinMatchLen(len) => {
                out.push(Bytes::from_static(b"MINMATCHLEN"));
                out.push(Bytes::from(len.to_string()));
            }
            Arg::WithMatchLen => out.push(Bytes::from_static(b"WITHMATCHLEN")),
            Arg::Replace => out.push(Bytes::from_static(b"REPLACE")),
            Arg::Db(db) => {
                out.push(Bytes::from_static(b"DB"));
                out.push(Bytes::from(db.to_string()));
            }
        }
    }
}

/// Writes one request: the fixed tokens followed by the optional args.
pub(crate) async fn send_request(
    codec: &mut Codec<'_>,
    ctx: &Context,
    mut tokens: Vec<Bytes>,
    args: &[Arg],
) -> Result<()> {
    for arg in args {
        arg.append_to(&mut tokens);
    }
    codec.write_bulk_string_array(ctx, &tokens).await
}

/// Discriminates the next reply, consuming server error frames into
/// [`Error::Server`] so the connection stays at a frame boundary.
pub(crate) async fn reply_kind(codec: &mut Codec<'_>, ctx: &Context) -> Result<FrameKind> {
    let kind = codec.peek_type(ctx).await?;
    if kind == FrameKind::Error {
        let reply = codec.read_error(ctx).await?;
        return Err(Error::Server(reply));
    }
    Ok(kind)
}

/// Reads a reply that is a bulk string or a null (missing key).
pub(crate) async fn read_bulk_or_null(
    codec: &mut Codec<'_>,
    ctx: &Context,
) -> Result<Option<Bytes>> {
    match reply_kind(codec, ctx).await? {
        FrameKind::Bulk => codec.read_bulk_string(ctx).await,
        FrameKind::Null => {
            codec.read_null(ctx).await?;
            Ok(None)
        }
        _ => Err(Error::UnexpectedResponse),
    }
}

/// Reads a reply that must be a non-null bulk string.
pub(crate) async fn read_bulk(codec: &mut Codec<'_>, ctx: &Context) -> Result<Bytes> {
    match read_bulk_or_null(codec, ctx).await? {
        Some(data) => Ok(data),
        None => Err(Error::UnexpectedResponse),
    }
}

/// Reads a reply that must be an integer.
pub(crate) async fn read_integer(codec: &mut Codec<'_>, ctx: &Context) -> Result<i64> {
    match reply_kind(codec, ctx).await? {
        FrameKind::Integer => codec.read_integer(ctx).await,
        _ => Err(Error::UnexpectedResponse),
    }
}

/// Reads a reply that must be the simple string `OK`.
pub(crate) async fn read_simple_ok(codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
    match reply_kind(codec, ctx).await? {
        FrameKind::Simple => {
            let reply = codec.read_simple_string(ctx).await?;
            if reply.as_ref() != b"OK" {
                return Err(Error::UnexpectedResponse);
            }
            Ok(())
        }
        _ => Err(Error::UnexpectedResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_expand_to_their_tokens() {
        let cases: Vec<(Arg, Vec<&str>)> = vec![
            (Arg::Ex(100), vec!["EX", "100"]),
            (Arg::Px(2500), vec!["PX", "2500"]),
            (Arg::ExAt(1700000000), vec!["EXAT", "1700000000"]),
            (Arg::PxAt(1700000000000), vec!["PXAT", "1700000000000"]),
            (Arg::Nx, vec!["NX"]),
            (Arg::Xx, vec!["XX"]),
            (Arg::KeepTtl, vec!["KEEPTTL"]),
            (Arg::Persist, vec!["PERSIST"]),
            (Arg::Idx, vec!["IDX"]),
            (Arg::MinMatchLen(4), vec!["MINMATCHLEN", "4"]),
            (Arg::WithMatchLen, vec!["WITHMATCHLEN"]),
            (Arg::Replace, vec!["REPLACE"]),
            (Arg::Db(2), vec!["DB", "2"]),
        ];

        for (arg, expected) in cases {
            let mut tokens = Vec::new();
            arg.append_to(&mut tokens);
            let expected: Vec<Bytes> = expected.into_iter().map(Bytes::from).collect();
            assert_eq!(tokens, expected);
        }
    }

    #[tokio::test]
    async fn send_request_appends_args_after_fixed_tokens() {
        use crate::transport::testing::MockTransport;

        let (mut transport, handle) = MockTransport::scripted(&[]);
        let mut codec = Codec::new(&mut transport);

        send_request(
            &mut codec,
            &Context::new(),
            vec![
                Bytes::from_static(b"SET"),
                Bytes::from_static(b"k"),
                Bytes::from_static(b"v"),
            ],
            &[Arg::Ex(100), Arg::Nx],
        )
        .await
        .unwrap();

        assert_eq!(
            handle.written_bytes(),
            b"*6\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n$2\r\nEX\r\n$3\r\n100\r\n$2\r\nNX\r\n"
        );
    }

    #[tokio::test]
    async fn reply_kind_consumes_server_errors() {
        use crate::transport::testing::MockTransport;

        let (mut transport, handle) = MockTransport::scripted(&[b"-ERR boom\r\n"]);
        let mut codec = Codec::new(&mut transport);

        let err = reply_kind(&mut codec, &Context::new()).await.unwrap_err();
        match err {
            Error::Server(reply) => {
                assert_eq!(reply.kind, "ERR");
                assert_eq!(reply.message, "boom");
            }
            other => panic!("expected server error, got {:?}", other),
        }
        // The error frame was fully consumed; the stream is intact.
        assert!(!handle.is_broken());
    }
}
