use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{reply_kind, send_request, Arg, Command};
use crate::context::Context;
use crate::error::Error;
use crate::frame::FrameKind;
use crate::Result;

/// Set a key to a value, with the optional `EX`/`PX`/`EXAT`/`PXAT`,
/// `NX`/`XX` and `KEEPTTL` arguments.
///
/// Resolves to `false` when an `NX`/`XX` condition left the key untouched
/// (the server answers with a null instead of `OK`).
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
    pub args: Vec<Arg>,
}

#[async_trait]
impl Command for Set {
    type Output = bool;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"SET"),
            Bytes::from(self.key.clone()),
            self.value.clone(),
        ];
        send_request(codec, ctx, tokens, &self.args).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        match reply_kind(codec, ctx).await? {
            FrameKind::Simple => {
                let reply = codec.read_simple_string(ctx).await?;
                if reply.as_ref() != b"OK" {
                    return Err(Error::UnexpectedResponse);
                }
                Ok(true)
            }
            FrameKind::Bulk => match codec.read_bulk_string(ctx).await? {
                // Only the null bulk reply means "not set".
                None => Ok(false),
                Some(_) => Err(Error::UnexpectedResponse),
            },
            FrameKind::Null => {
                codec.read_null(ctx).await?;
                Ok(false)
            }
            _ => Err(Error::UnexpectedResponse),
        }
    }
}
