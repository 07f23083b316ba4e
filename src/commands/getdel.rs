use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_bulk_or_null, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Get the value of a key and delete it. `None` when the key does not
/// exist.
///
/// Ref: <https://redis.io/docs/latest/commands/getdel/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDel {
    pub key: String,
}

#[async_trait]
impl Command for GetDel {
    type Output = Option<Bytes>;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![Bytes::from_static(b"GETDEL"), Bytes::from(self.key.clone())];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_bulk_or_null(codec, ctx).await
    }
}
