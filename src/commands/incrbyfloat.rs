use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_bulk, send_request, Command};
use crate::context::Context;
use crate::error::Error;
use crate::Result;

/// Increment the float value of a key by a given amount. The server answers
/// with the new value as a bulk string.
///
/// Ref: <https://redis.io/docs/latest/commands/incrbyfloat/>
#[derive(Debug, Clone, PartialEq)]
pub struct IncrByFloat {
    pub key: String,
    pub increment: f64,
}

#[async_trait]
impl Command for IncrByFloat {
    type Output = f64;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"INCRBYFLOAT"),
            Bytes::from(self.key.clone()),
            Bytes::from(self.increment.to_string()),
        ];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        let reply = read_bulk(codec, ctx).await?;
        std::str::from_utf8(&reply)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or(Error::UnexpectedResponse)
    }
}
