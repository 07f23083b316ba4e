use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{reply_kind, send_request, Command};
use crate::context::Context;
use crate::error::Error;
use crate::frame::{Frame, FrameKind};
use crate::Result;

/// Get the values of several keys in one round trip. Missing keys yield
/// `None` at their position.
///
/// Ref: <https://redis.io/docs/latest/commands/mget/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MGet {
    pub keys: Vec<String>,
}

#[async_trait]
impl Command for MGet {
    type Output = Vec<Option<Bytes>>;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let mut tokens = Vec::with_capacity(self.keys.len() + 1);
        tokens.push(Bytes::from_static(b"MGET"));
        tokens.extend(self.keys.iter().map(|key| Bytes::from(key.clone())));
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        if reply_kind(codec, ctx).await? != FrameKind::Array {
            return Err(Error::UnexpectedResponse);
        }
        let frames = match codec.read_array(ctx).await? {
            Some(frames) => frames,
            None => return Err(Error::UnexpectedResponse),
        };

        let mut values = Vec::with_capacity(frames.len());
        for frame in frames {
            match frame {
                Frame::Bulk(value) => values.push(value),
                Frame::Null => values.push(None),
                _ => return Err(Error::UnexpectedResponse),
            }
        }
        Ok(values)
    }
}
