use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_bulk, read_integer, reply_kind, send_request, Arg, Command};
use crate::context::Context;
use crate::error::Error;
use crate::frame::{Frame, FrameKind};
use crate::value::Value;
use crate::Result;

/// Longest common subsequence of two string keys, as a bulk string.
///
/// Ref: <https://redis.io/docs/latest/commands/lcs/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lcs {
    pub key1: String,
    pub key2: String,
    pub args: Vec<Arg>,
}

#[async_trait]
impl Command for Lcs {
    type Output = Bytes;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"LCS"),
            Bytes::from(self.key1.clone()),
            Bytes::from(self.key2.clone()),
        ];
        send_request(codec, ctx, tokens, &self.args).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_bulk(codec, ctx).await
    }
}

/// `LCS ... LEN`: only the length of the longest common subsequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcsLen {
    pub key1: String,
    pub key2: String,
}

#[async_trait]
impl Command for LcsLen {
    type Output = i64;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"LCS"),
            Bytes::from(self.key1.clone()),
            Bytes::from(self.key2.clone()),
            Bytes::from_static(b"LEN"),
        ];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_integer(codec, ctx).await
    }
}

/// `LCS ... IDX`: match positions instead of the subsequence itself.
/// `MINMATCHLEN` goes in `args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcsIdx {
    pub key1: String,
    pub key2: String,
    pub args: Vec<Arg>,
}

#[async_trait]
impl Command for LcsIdx {
    type Output = LcsIdxResult;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"LCS"),
            Bytes::from(self.key1.clone()),
            Bytes::from(self.key2.clone()),
            Bytes::from_static(b"IDX"),
        ];
        send_request(codec, ctx, tokens, &self.args).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_lcs_idx(codec, ctx).await
    }
}

/// `LCS ... IDX WITHMATCHLEN`: match positions plus each match's length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcsIdxWithMatchLen {
    pub key1: String,
    pub key2: String,
    pub args: Vec<Arg>,
}

#[async_trait]
impl Command for LcsIdxWithMatchLen {
    type Output = LcsIdxResult;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"LCS"),
            Bytes::from(self.key1.clone()),
            Bytes::from(self.key2.clone()),
            Bytes::from_static(b"IDX"),
            Bytes::from_static(b"WITHMATCHLEN"),
        ];
        send_request(codec, ctx, tokens, &self.args).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_lcs_idx(codec, ctx).await
    }
}

/// One match reported by `LCS ... IDX`: the byte ranges in both keys, plus
/// the match length when `WITHMATCHLEN` was requested (0 otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcsIdxMatch {
    pub pos1: [i64; 2],
    pub pos2: [i64; 2],
    pub len: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LcsIdxResult {
    pub matches: Vec<LcsIdxMatch>,
    pub len: i64,
}

/// RESP2 servers answer `IDX` with a labeled array, RESP3 servers with a
/// map; both flatten to `["matches", <matches>, "len", <len>]`.
async fn read_lcs_idx(codec: &mut Codec<'_>, ctx: &Context) -> Result<LcsIdxResult> {
    let frames = match reply_kind(codec, ctx).await? {
        FrameKind::Array => match codec.read_array(ctx).await? {
            Some(frames) => frames,
            None => return Err(Error::UnexpectedResponse),
        },
        FrameKind::Map => codec.read_map(ctx).await?,
        _ => return Err(Error::UnexpectedResponse),
    };
    LcsIdxResult::from_frames(frames)
}

impl LcsIdxResult {
    fn from_frames(frames: Vec<Frame>) -> Result<LcsIdxResult> {
        if frames.len() != 4 {
            return Err(Error::UnexpectedResponse);
        }
        let mut frames = frames.into_iter();
        let _label = frames.next();
        let match_frames = match frames.next() {
            Some(Frame::Array(Some(match_frames))) => match_frames,
            _ => return Err(Error::UnexpectedResponse),
        };
        let _label = frames.next();
        let len = match frames.next() {
            Some(Frame::Integer(len)) => len,
            _ => return Err(Error::UnexpectedResponse),
        };

        let mut matches = Vec::with_capacity(match_frames.len());
        for frame in match_frames {
            matches.push(LcsIdxMatch::from_frame(frame)?);
        }
        Ok(LcsIdxResult { matches, len })
    }
}

impl LcsIdxMatch {
    fn from_frame(frame: Frame) -> Result<LcsIdxMatch> {
        let parts = match frame {
            Frame::Array(Some(parts)) => parts,
            _ => return Err(Error::UnexpectedResponse),
        };
        if parts.len() < 2 {
            return Err(Error::UnexpectedResponse);
        }

        let len = match parts.get(2) {
            Some(Frame::Integer(len)) => *len,
            Some(_) => return Err(Error::UnexpectedResponse),
            None => 0,
        };
        let mut parts = parts.into_iter();
        let pos1 = position(parts.next().expect("length checked"))?;
        let pos2 = position(parts.next().expect("length checked"))?;
        Ok(LcsIdxMatch { pos1, pos2, len })
    }
}

fn position(frame: Frame) -> Result<[i64; 2]> {
    if let Frame::Array(Some(parts)) = frame {
        if let [Frame::Integer(start), Frame::Integer(end)] = parts.as_slice() {
            return Ok([*start, *end]);
        }
    }
    Err(Error::UnexpectedResponse)
}

impl From<LcsIdxResult> for Value {
    fn from(result: LcsIdxResult) -> Value {
        let matches = result
            .matches
            .into_iter()
            .map(|m| {
                Value::Array(vec![
                    Value::Array(vec![Value::Integer(m.pos1[0]), Value::Integer(m.pos1[1])]),
                    Value::Array(vec![Value::Integer(m.pos2[0]), Value::Integer(m.pos2[1])]),
                    Value::Integer(m.len),
                ])
            })
            .collect();
        Value::Array(vec![
            Value::Bulk(Bytes::from_static(b"matches")),
            Value::Array(matches),
            Value::Bulk(Bytes::from_static(b"len")),
            Value::Integer(result.len),
        ])
    }
}

impl TryFrom<Value> for LcsIdxResult {
    type Error = Error;

    fn try_from(value: Value) -> Result<LcsIdxResult> {
        let items = match value {
            Value::Array(items) if items.len() == 4 => items,
            _ => return Err(Error::UnexpectedResponse),
        };
        let mut items = items.into_iter();
        let _label = items.next();
        let match_values = match items.next() {
            Some(Value::Array(match_values)) => match_values,
            _ => return Err(Error::UnexpectedResponse),
        };
        let _label = items.next();
        let len = match items.next() {
            Some(Value::Integer(len)) => len,
            _ => return Err(Error::UnexpectedResponse),
        };

        let mut matches = Vec::with_capacity(match_values.len());
        for value in match_values {
            matches.push(match_from_value(value)?);
        }
        Ok(LcsIdxResult { matches, len })
    }
}

fn match_from_value(value: Value) -> Result<LcsIdxMatch> {
    let parts = match value {
        Value::Array(parts) if parts.len() >= 2 => parts,
        _ => return Err(Error::UnexpectedResponse),
    };
    let len = match parts.get(2) {
        Some(Value::Integer(len)) => *len,
        Some(_) => return Err(Error::UnexpectedResponse),
        None => 0,
    };
    let mut parts = parts.into_iter();
    let pos1 = position_from_value(parts.next().expect("length checked"))?;
    let pos2 = position_from_value(parts.next().expect("length checked"))?;
    Ok(LcsIdxMatch { pos1, pos2, len })
}

fn position_from_value(value: Value) -> Result<[i64; 2]> {
    if let Value::Array(parts) = value {
        if let [Value::Integer(start), Value::Integer(end)] = parts.as_slice() {
            return Ok([*start, *end]);
        }
    }
    Err(Error::UnexpectedResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MockTransport;

    #[tokio::test]
    async fn bare_lcs_requests_the_subsequence() {
        let (mut transport, handle) = MockTransport::scripted(&[b"$6\r\nmytext\r\n"]);
        let mut codec = Codec::new(&mut transport);
        let cmd = Lcs {
            key1: String::from("key1"),
            key2: String::from("key2"),
            args: vec![],
        };
        let ctx = Context::new();

        cmd.serialize(&mut codec, &ctx).await.unwrap();
        assert_eq!(
            handle.written_bytes(),
            b"*3\r\n$3\r\nLCS\r\n$4\r\nkey1\r\n$4\r\nkey2\r\n"
        );

        assert_eq!(cmd.parse(&mut codec, &ctx).await.unwrap(), Bytes::from("mytext"));
    }

    #[tokio::test]
    async fn len_requests_only_the_length() {
        let (mut transport, handle) = MockTransport::scripted(&[b":6\r\n"]);
        let mut codec = Codec::new(&mut transport);
        let cmd = LcsLen {
            key1: String::from("key1"),
            key2: String::from("key2"),
        };
        let ctx = Context::new();

        cmd.serialize(&mut codec, &ctx).await.unwrap();
        assert_eq!(
            handle.written_bytes(),
            b"*4\r\n$3\r\nLCS\r\n$4\r\nkey1\r\n$4\r\nkey2\r\n$3\r\nLEN\r\n"
        );

        assert_eq!(cmd.parse(&mut codec, &ctx).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn idx_parses_the_labeled_array_reply() {
        // LCS key1 key2 IDX for "ohmytext" / "mynewtext".
        let reply = b"*4\r\n$7\r\nmatches\r\n\
            *2\r\n\
            *2\r\n*2\r\n:4\r\n:7\r\n*2\r\n:5\r\n:8\r\n\
            *2\r\n*2\r\n:2\r\n:3\r\n*2\r\n:0\r\n:1\r\n\
            $3\r\nlen\r\n:6\r\n";
        let (mut transport, handle) = MockTransport::scripted(&[reply]);
        let mut codec = Codec::new(&mut transport);
        let cmd = LcsIdx {
            key1: String::from("key1"),
            key2: String::from("key2"),
            args: vec![],
        };
        let ctx = Context::new();

        cmd.serialize(&mut codec, &ctx).await.unwrap();
        assert_eq!(
            handle.written_bytes(),
            b"*4\r\n$3\r\nLCS\r\n$4\r\nkey1\r\n$4\r\nkey2\r\n$3\r\nIDX\r\n"
        );

        let result = cmd.parse(&mut codec, &ctx).await.unwrap();
        assert_eq!(result.len, 6);
        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.matches[1].pos1, [2, 3]);
        assert_eq!(result.matches[1].pos2, [0, 1]);
    }

    #[tokio::test]
    async fn idx_with_match_len_parses_the_map_reply() {
        // A RESP3 server answers IDX with a map instead of a labeled array.
        let reply = b"%2\r\n$7\r\nmatches\r\n\
            *1\r\n*3\r\n*2\r\n:4\r\n:7\r\n*2\r\n:5\r\n:8\r\n:4\r\n\
            $3\r\nlen\r\n:6\r\n";
        let (mut transport, handle) = MockTransport::scripted(&[reply]);
        let mut codec = Codec::new(&mut transport);
        let cmd = LcsIdxWithMatchLen {
            key1: String::from("key1"),
            key2: String::from("key2"),
            args: vec![Arg::MinMatchLen(4)],
        };
        let ctx = Context::new();

        cmd.serialize(&mut codec, &ctx).await.unwrap();
        assert_eq!(
            handle.written_bytes(),
            b"*7\r\n$3\r\nLCS\r\n$4\r\nkey1\r\n$4\r\nkey2\r\n$3\r\nIDX\r\n$12\r\nWITHMATCHLEN\r\n$11\r\nMINMATCHLEN\r\n$1\r\n4\r\n"
                .to_vec()
        );

        let result = cmd.parse(&mut codec, &ctx).await.unwrap();
        assert_eq!(
            result,
            LcsIdxResult {
                matches: vec![LcsIdxMatch {
                    pos1: [4, 7],
                    pos2: [5, 8],
                    len: 4,
                }],
                len: 6,
            }
        );
    }

    #[test]
    fn idx_result_round_trips_through_value() {
        let result = LcsIdxResult {
            matches: vec![LcsIdxMatch {
                pos1: [4, 7],
                pos2: [5, 8],
                len: 4,
            }],
            len: 6,
        };

        let value = Value::from(result.clone());
        assert_eq!(LcsIdxResult::try_from(value).unwrap(), result);
    }
}
