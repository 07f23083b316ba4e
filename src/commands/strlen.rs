use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_integer, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Get the length of the string stored at a key; 0 when the key is
/// missing.
///
/// Ref: <https://redis.io/docs/latest/commands/strlen/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLen {
    pub key: String,
}

#[async_trait]
impl Command for StrLen {
    type Output = i64;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![Bytes::from_static(b"STRLEN"), Bytes::from(self.key.clone())];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_integer(codec, ctx).await
    }
}
