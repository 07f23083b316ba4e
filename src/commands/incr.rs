use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_integer, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Increment the integer value of a key by one.
///
/// Ref: <https://redis.io/docs/latest/commands/incr/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incr {
    pub key: String,
}

#[async_trait]
impl Command for Incr {
    type Output = i64;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![Bytes::from_static(b"INCR"), Bytes::from(self.key.clone())];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_integer(codec, ctx).await
    }
}
