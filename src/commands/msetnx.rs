use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_integer, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Set several keys only when none of them exist yet. Resolves to whether
/// the keys were set.
///
/// Ref: <https://redis.io/docs/latest/commands/msetnx/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MSetNx {
    pub pairs: Vec<(String, Bytes)>,
}

#[async_trait]
impl Command for MSetNx {
    type Output = bool;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let mut tokens = Vec::with_capacity(self.pairs.len() * 2 + 1);
        tokens.push(Bytes::from_static(b"MSETNX"));
        for (key, value) in &self.pairs {
            tokens.push(Bytes::from(key.clone()));
            tokens.push(value.clone());
        }
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        Ok(read_integer(codec, ctx).await? == 1)
    }
}
