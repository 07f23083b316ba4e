use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_simple_ok, send_request, Command};
use crate::context::Context;
use crate::Result;

/// Set a key with an expiry in seconds.
///
/// Ref: <https://redis.io/docs/latest/commands/setex/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEx {
    pub key: String,
    pub value: Bytes,
    pub seconds: u64,
}

#[async_trait]
impl Command for SetEx {
    type Output = ();

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![
            Bytes::from_static(b"SETEX"),
            Bytes::from(self.key.clone()),
            Bytes::from(self.seconds.to_string()),
            self.value.clone(),
        ];
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
    async fn ttl_comes_before_the_value() {
        let (mut transport, handle) = MockTransport::scripted(&[]);
        let mut codec = Codec::new(&mut transport);
        let cmd = SetEx {
            key: String::from("k"),
            value: Bytes::from("v"),
            seconds: 10,
        };

        cmd.serialize(&mut codec, &Context::new()).await.unwrap();

        assert_eq!(
            handle.written_bytes(),
            b"*4\r\n$5\r\nSETEX\r\n$1\r\nk\r\n$2\r\n10\r\n$1\r\nv\r\n"
        );
    }
}
