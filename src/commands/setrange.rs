use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_integer, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Overwrite part of a string at a byte offset, zero-padding when the key
/// is shorter. Resolves to the length of the string after the write.
///
/// Ref: <https://redis.io/docs/latest/commands/setrange/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetRange {
    pub key: String,
    pub offset: u64,
    pub value: Bytes,
}

#[async_trait]
impl Command for SetRange {
    type Output = i64;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"SETRANGE"),
            Bytes::from(self.key.clone()),
            Bytes::from(self.offset.to_string()),
            self.value.clone(),
        ];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_integer(codec, ctx).await
    }
}
