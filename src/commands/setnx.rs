use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_integer, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Set a key only when it does not exist yet. Resolves to whether the key
/// was set.
///
/// Ref: <https://redis.io/docs/latest/commands/setnx/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetNx {
    pub key: String,
    pub value: Bytes,
}

#[async_trait]
impl Command for SetNx {
    type Output = bool;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"SETNX"),
            Bytes::from(self.key.clone()),
            self.value.clone(),
        ];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        Ok(read_integer(codec, ctx).await? == 1)
    }
}
