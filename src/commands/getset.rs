use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_bulk_or_null, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Atomically set a key and return its previous value. `None` when the key
/// did not exist before.
///
/// Ref: <https://redis.io/docs/latest/commands/getset/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSet {
    pub key: String,
    pub value: Bytes,
}

#[async_trait]
impl Command for GetSet {
    type Output = Option<Bytes>;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"GETSET"),
            Bytes::from(self.key.clone()),
            self.value.clone(),
        ];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_bulk_or_null(codec, ctx).await
    }
}
