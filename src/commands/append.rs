use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_integer, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Append a value to a key, creating it when missing. Resolves to the
/// length of the string after the append.
///
/// Ref: <https://redis.io/docs/latest/commands/append/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Append {
    pub key: String,
    pub value: Bytes,
}

#[async_trait]
impl Command for Append {
    type Output = i64;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"APPEND"),
            Bytes::from(self.key.clone()),
            self.value.clone(),
        ];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_integer(codec, ctx).await
    }
}
