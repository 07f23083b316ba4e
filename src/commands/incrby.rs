use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_integer, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Increment the integer value of a key by a given amount.
///
/// Ref: <https://redis.io/docs/latest/commands/incrby/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrBy {
    pub key: String,
    pub increment: i64,
}

#[async_trait]
impl Command for IncrBy {
    type Output = i64;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"INCRBY"),
            Bytes::from(self.key.clone()),
            Bytes::from(self.increment.to_string()),
        ];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_integer(codec, ctx).await
    }
}
