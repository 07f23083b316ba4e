use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_bulk, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Deprecated alias of GETRANGE, kept for servers that still speak it.
///
/// Ref: <https://redis.io/docs/latest/commands/substr/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubStr {
    pub key: String,
    pub start: i64,
    pub end: i64,
}

#[async_trait]
impl Command for SubStr {
    type Output = Bytes;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"SUBSTR"),
            Bytes::from(self.key.clone()),
            Bytes::from(self.start.to_string()),
            Bytes::from(self.end.to_string()),
        ];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_bulk(codec, ctx).await
    }
}
