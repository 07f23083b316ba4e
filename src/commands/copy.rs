use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_integer, send_request, Arg, Command};
use crate::context::Context;
use crate::Result;

/// Copy a key to a destination key, optionally into another database
/// (`Db`) or over an existing key (`Replace`). Resolves to whether the copy
/// happened.
///
/// Ref: <https://redis.io/docs/latest/commands/copy/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Copy {
    pub source: String,
    pub destination: String,
    pub args: Vec<Arg>,
}

#[async_trait]
impl Command for Copy {
    type Output = bool;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"COPY"),
            Bytes::from(self.source.clone()),
            Bytes::from(self.destination.clone()),
        ];
        send_request(codec, ctx, tokens, &self.args).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        Ok(read_integer(codec, ctx).await? == 1)
    }
}
