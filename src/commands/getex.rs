use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Codec;
use crate::commands::{read_bulk_or_null, send_request, Arg, Command};
use crate::context::Context;
use crate::Result;

/// Get the value of a key and optionally adjust its expiry with the
/// `EX`/`PX`/`EXAT`/`PXAT`/`PERSIST` arguments.
///
/// Ref: <https://redis.io/docs/latest/commands/getex/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetEx {
    pub key: String,
    pub args: Vec<Arg>,
}

#[async_trait]
impl Command for GetEx {
    type Output = Option<Bytes>;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        let tokens = vec![Bytes::from_static(b"GETEX"), Bytes::from(self.key.clone())];
        send_request(codec, ctx, tokens, &self.args).await
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        read_bulk_or_null(codec, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MockTransport;

    #[tokio::test]
    async fn serializes_expiry_args() {
        let (mut transport, handle) = MockTransport::scripted(&[]);
        let mut codec = Codec::new(&mut transport);
        let cmd = GetEx {
            key: String::from("kk"),
            args: vec![Arg::ExAt(100)],
        };

        cmd.serialize(&mut codec, &Context::new()).await.unwrap();

        assert_eq!(
            handle.written_bytes(),
            b"*4\r\n$5\r\nGETEX\r\n$2\r\nkk\r\n$4\r\nEXAT\r\n$3\r\n100\r\n"
        );
    }
}
