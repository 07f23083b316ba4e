use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_simple_ok, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Set several keys in one round trip. The server always answers `OK`.
///
/// Ref: <https://redis.io/docs/latest/commands/mset/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MSet {
    pub pairs: Vec<(String, Bytes)>,
}

#[async_trait]
impl Command for MSet {
    type Output = ();

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let mut tokens = Vec::with_capacity(self.pairs.len() * 2 + 1);
        tokens.push(Bytes::from_static(b"MSET"));
        for (key, value) in &self.pairs {
            tokens.push(Bytes::from(key.clone()));
            tokens.push(value.clone());
        }
        send_request(codec, ctx, tokens, &[]).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_simple_ok(codec, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MockTransport;

    #[tokio::test]
    async fn serializes_flattened_pairs_and_parses_ok() {
        let (mut transport, handle) = MockTransport::scripted(&[b"+OK\r\n"]);
        let mut codec = Codec::new(&mut transport);
        let cmd = MSet {
            pairs: vec![
                (String::from("k1"), Bytes::from("v1")),
                (String::from("k2"), Bytes::from("v2")),
            ],
        };
        let ctx = Context::new();

        cmd.serialize(&mut codec, &ctx).await.unwrap();
        assert_eq!(
            handle.written_bytes(),
            b"*5\r\n$4\r\nMSET\r\n$2\r\nk1\r\n$2\r\nv1\r\n$2\r\nk2\r\n$2\r\nv2\r\n"
        );

        cmd.parse(&mut codec, &ctx).await.unwrap();
    }
}
