use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_simple_ok, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Set a key with an expiry in milliseconds.
///
/// Ref: <https://redis.io/docs/latest/commands/psetex/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PSetEx {
    pub key: String,
    pub value: Bytes,
    pub milliseconds: u64,
}

#[async_trait]
impl Command for PSetEx {
    type Output = ();

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"PSETEX"),
            Bytes::from(self.key.clone()),
            Bytes::from(self.milliseconds.to_string()),
            self.value.clone(),
        ];
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_simple_ok(codec, ctx).await
    }
}
