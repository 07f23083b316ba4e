use bytes::Bytes;
use tracing::debug;

use crate::codec::Codec;
use crate::commands::append::Append;
use crate::commands::copy::Copy;
use crate::commands::decr::Decr;
use crate::commands::decrby::DecrBy;
use crate::commands::get::Get;
use crate::commands::getdel::GetDel;
use crate::commands::getex::GetEx;
use crate::commands::getrange::GetRange;
use crate::commands::getset::GetSet;
use crate::commands::incr::Incr;
use crate::commands::incrby::IncrBy;
use crate::commands::incrbyfloat::IncrByFloat;
use crate::commands::lcs::{Lcs, LcsIdx, LcsIdxResult, LcsIdxWithMatchLen, LcsLen};
use crate::commands::mget::MGet;
use crate::commands::mset::MSet;
use crate::commands::msetnx::MSetNx;
use crate::commands::psetex::PSetEx;
use crate::commands::set::Set;
use crate::commands::setex::SetEx;
use crate::commands::setnx::SetNx;
use crate::commands::setrange::SetRange;
use crate::commands::strlen::StrLen;
use crate::commands::substr::SubStr;
use crate::commands::{Arg, Command};
use crate::config::ClientConfig;
use crate::context::Context;
use crate::pipeline::{owned_pairs, Pipeline};
use crate::pool::Pool;
use crate::transport::Transport;
use crate::Result;

/// Client for a Redis-compatible server.
///
/// Commands may be issued from many tasks at once; each execution borrows
/// one pooled connection from acquire to release and runs its exchange
/// sequentially on it.
pub struct Client {
    pool: Pool,
}

impl Client {
    /// Builds a client. Connections are dialed lazily on first use.
    pub fn connect(config: ClientConfig) -> Result<Client> {
        config.validate()?;
        Ok(Client {
            pool: Pool::new(config.pool_config()),
        })
    }

    /// Closes the pool. In-flight executions finish their exchange but
    /// cannot return their connections.
    pub async fn close(&self) -> Result<()> {
        self.pool.close().await
    }

    /// Starts an empty pipeline bound to this client.
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(self)
    }

    /// Runs one command: acquire a connection, bind a codec, write the
    /// request, read the reply.
    ///
    /// The connection is released on every exit path; any failure other
    /// than a server error reply marks it broken first, since the stream
    /// offset is no longer trustworthy.
    pub async fn exec<C: Command>(&self, ctx: &Context, cmd: &C) -> Result<C::Output> {
        ctx.ensure_active()?;

        let mut transport = self.pool.acquire().await?;
        let result = exchange(transport.as_mut(), ctx, cmd).await;

        if let Err(err) = &result {
            if err.poisons_connection() {
                transport.set_broken();
            }
        }
        if let Err(err) = self.pool.release(transport).await {
            // Never overwrites the command's own outcome.
            debug!(error = %err, "failed to release connection");
        }
        result
    }

    pub async fn get(&self, ctx: &Context, key: &str) -> Result<Option<Bytes>> {
        self.exec(
            ctx,
            &Get {
                key: key.to_string(),
            },
        )
        .await
    }

    /// `false` means an `NX`/`XX` condition left the key untouched.
    pub async fn set(
        &self,
        ctx: &Context,
        key: &str,
        value: impl Into<Bytes> + Send,
        args: &[Arg],
    ) -> Result<bool> {
        self.exec(
            ctx,
            &Set {
                key: key.to_string(),
                value: value.into(),
                args: args.to_vec(),
            },
        )
        .await
    }

    pub async fn append(
        &self,
        ctx: &Context,
        key: &str,
        value: impl Into<Bytes> + Send,
    ) -> Result<i64> {
        self.exec(
            ctx,
            &Append {
                key: key.to_string(),
                value: value.into(),
            },
        )
        .await
    }

    pub async fn decr(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.exec(
            ctx,
            &Decr {
                key: key.to_string(),
            },
        )
        .await
    }

    pub async fn decr_by(&self, ctx: &Context, key: &str, decrement: i64) -> Result<i64> {
        self.exec(
            ctx,
            &DecrBy {
                key: key.to_string(),
                decrement,
            },
        )
        .await
    }

    pub async fn incr(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.exec(
            ctx,
            &Incr {
                key: key.to_string(),
            },
        )
        .await
    }

    pub async fn incr_by(&self, ctx: &Context, key: &str, increment: i64) -> Result<i64> {
        self.exec(
            ctx,
            &IncrBy {
                key: key.to_string(),
                increment,
            },
        )
        .await
    }

    pub async fn incr_by_float(&self, ctx: &Context, key: &str, increment: f64) -> Result<f64> {
        self.exec(
            ctx,
            &IncrByFloat {
                key: key.to_string(),
                increment,
            },
        )
        .await
    }

    pub async fn get_del(&self, ctx: &Context, key: &str) -> Result<Option<Bytes>> {
        self.exec(
            ctx,
            &GetDel {
                key: key.to_string(),
            },
        )
        .await
    }

    pub async fn get_ex(&self, ctx: &Context, key: &str, args: &[Arg]) -> Result<Option<Bytes>> {
        self.exec(
            ctx,
            &GetEx {
                key: key.to_string(),
                args: args.to_vec(),
            },
        )
        .await
    }

    pub async fn get_range(&self, ctx: &Context, key: &str, start: i64, end: i64) -> Result<Bytes> {
        self.exec(
            ctx,
            &GetRange {
                key: key.to_string(),
                start,
                end,
            },
        )
        .await
    }

    pub async fn get_set(
        &self,
        ctx: &Context,
        key: &str,
        value: impl Into<Bytes> + Send,
    ) -> Result<Option<Bytes>> {
        self.exec(
            ctx,
            &GetSet {
                key: key.to_string(),
                value: value.into(),
            },
        )
        .await
    }

    pub async fn lcs(&self, ctx: &Context, key1: &str, key2: &str, args: &[Arg]) -> Result<Bytes> {
        self.exec(
            ctx,
            &Lcs {
                key1: key1.to_string(),
                key2: key2.to_string(),
                args: args.to_vec(),
            },
        )
        .await
    }

    pub async fn lcs_len(&self, ctx: &Context, key1: &str, key2: &str) -> Result<i64> {
        self.exec(
            ctx,
            &LcsLen {
                key1: key1.to_string(),
                key2: key2.to_string(),
            },
        )
        .await
    }

    pub async fn lcs_idx(
        &self,
        ctx: &Context,
        key1: &str,
        key2: &str,
        args: &[Arg],
    ) -> Result<LcsIdxResult> {
        self.exec(
            ctx,
            &LcsIdx {
                key1: key1.to_string(),
                key2: key2.to_string(),
                args: args.to_vec(),
            },
        )
        .await
    }

    pub async fn lcs_idx_with_match_len(
        &self,
        ctx: &Context,
        key1: &str,
        key2: &str,
        args: &[Arg],
    ) -> Result<LcsIdxResult> {
        self.exec(
            ctx,
            &LcsIdxWithMatchLen {
                key1: key1.to_string(),
                key2: key2.to_string(),
                args: args.to_vec(),
            },
        )
        .await
    }

    pub async fn mget(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<Option<Bytes>>> {
        self.exec(
            ctx,
            &MGet {
                keys: keys.iter().map(|key| key.to_string()).collect(),
            },
        )
        .await
    }

    pub async fn mset(&self, ctx: &Context, pairs: &[(&str, &[u8])]) -> Result<()> {
        self.exec(
            ctx,
            &MSet {
                pairs: owned_pairs(pairs),
            },
        )
        .await
    }

    pub async fn mset_nx(&self, ctx: &Context, pairs: &[(&str, &[u8])]) -> Result<bool> {
        self.exec(
            ctx,
            &MSetNx {
                pairs: owned_pairs(pairs),
            },
        )
        .await
    }

    pub async fn pset_ex(
        &self,
        ctx: &Context,
        key: &str,
        value: impl Into<Bytes> + Send,
        milliseconds: u64,
    ) -> Result<()> {
        self.exec(
            ctx,
            &PSetEx {
                key: key.to_string(),
                value: value.into(),
                milliseconds,
            },
        )
        .await
    }

    pub async fn set_ex(
        &self,
        ctx: &Context,
        key: &str,
        value: impl Into<Bytes> + Send,
        seconds: u64,
    ) -> Result<()> {
        self.exec(
            ctx,
            &SetEx {
                key: key.to_string(),
                value: value.into(),
                seconds,
            },
        )
        .await
    }

    pub async fn set_nx(
        &self,
        ctx: &Context,
        key: &str,
        value: impl Into<Bytes> + Send,
    ) -> Result<bool> {
        self.exec(
            ctx,
            &SetNx {
                key: key.to_string(),
                value: value.into(),
            },
        )
        .await
    }

    pub async fn set_range(
        &self,
        ctx: &Context,
        key: &str,
        offset: u64,
        value: impl Into<Bytes> + Send,
    ) -> Result<i64> {
        self.exec(
            ctx,
            &SetRange {
                key: key.to_string(),
                offset,
                value: value.into(),
            },
        )
        .await
    }

    pub async fn str_len(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.exec(
            ctx,
            &StrLen {
                key: key.to_string(),
            },
        )
        .await
    }

    pub async fn sub_str(&self, ctx: &Context, key: &str, start: i64, end: i64) -> Result<Bytes> {
        self.exec(
            ctx,
            &SubStr {
                key: key.to_string(),
                start,
                end,
            },
        )
        .await
    }

    pub async fn copy(
        &self,
        ctx: &Context,
        source: &str,
        destination: &str,
        args: &[Arg],
    ) -> Result<bool> {
        self.exec(
            ctx,
            &Copy {
                source: source.to_string(),
                destination: destination.to_string(),
                args: args.to_vec(),
            },
        )
        .await
    }
}

async fn exchange<C: Command>(
    transport: &mut dyn Transport,
    ctx: &Context,
    cmd: &C,
) -> Result<C::Output> {
    let mut codec = Codec::new(transport);
    cmd.serialize(&mut codec, ctx).await?;
    cmd.parse(&mut codec, ctx).await
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::error::Error;
    use crate::pool::PoolConfig;
    use crate::transport::testing::{MockHandle, MockTransport};
    use crate::transport::TransportConfig;
    use crate::value::Value;

    fn mock_client(replies: Vec<Vec<&'static [u8]>>) -> (Client, Arc<Mutex<Vec<MockHandle>>>) {
        let handles = Arc::new(Mutex::new(Vec::new()));
        let factory_handles = handles.clone();
        let scripts = Arc::new(Mutex::new(replies));

        let pool = Pool::with_factory(
            PoolConfig {
                max_conns: 4,
                max_idle_conns: 0,
                con_idle_time: Duration::from_secs(1800),
                transport: TransportConfig {
                    address: String::from("127.0.0.1:6379"),
                    dial_timeout: Duration::from_secs(1),
                    tls: false,
                    tls_cert_path: None,
                    tls_ca_cert_path: None,
                    tls_key_path: None,
                },
            },
            Box::new(move || {
                let script = {
                    let mut scripts = scripts.lock().unwrap();
                    if scripts.is_empty() {
                        Vec::new()
                    } else {
                        scripts.remove(0)
                    }
                };
                let (transport, handle) = MockTransport::scripted(&script);
                factory_handles.lock().unwrap().push(handle);
                Box::new(transport)
            }),
        );
        (Client { pool }, handles)
    }

    async fn pool_stats(client: &Client) -> (usize, usize, usize) {
        client.pool.stats().await
    }

    #[tokio::test]
    async fn exec_sends_the_request_and_recycles_the_connection() {
        let (client, handles) = mock_client(vec![vec![b"$5\r\nworld\r\n"]]);
        let ctx = Context::new();

        let value = client.get(&ctx, "hello").await.unwrap();

        assert_eq!(value, Some(Bytes::from("world")));
        let handle = handles.lock().unwrap()[0].clone();
        assert_eq!(handle.written_bytes(), b"*2\r\n$3\r\nGET\r\n$5\r\nhello\r\n");
        assert!(!handle.is_broken());
        assert_eq!(pool_stats(&client).await, (1, 0, 1));
    }

    #[tokio::test]
    async fn a_server_error_reply_keeps_the_connection() {
        let (client, handles) = mock_client(vec![vec![b"-ERR boom\r\n"]]);
        let ctx = Context::new();

        let err = client.get(&ctx, "hello").await.unwrap_err();

        match err {
            Error::Server(reply) => {
                assert_eq!(reply.kind, "ERR");
                assert_eq!(reply.message, "boom");
            }
            other => panic!("expected server error, got {:?}", other),
        }
        assert!(!handles.lock().unwrap()[0].is_broken());
        // The connection went back to the idle stack.
        assert_eq!(pool_stats(&client).await, (1, 0, 1));
    }

    #[tokio::test]
    async fn a_protocol_error_poisons_the_connection() {
        let (client, handles) = mock_client(vec![vec![b"?junk\r\n"]]);
        let ctx = Context::new();

        let err = client.get(&ctx, "hello").await.unwrap_err();

        assert!(matches!(err, Error::Protocol(_)));
        assert!(handles.lock().unwrap()[0].is_broken());
        assert_eq!(pool_stats(&client).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn an_unexpected_reply_shape_poisons_the_connection() {
        let (client, handles) = mock_client(vec![vec![b":1\r\n"]]);
        let ctx = Context::new();

        let err = client.get(&ctx, "hello").await.unwrap_err();

        assert!(matches!(err, Error::UnexpectedResponse));
        assert!(handles.lock().unwrap()[0].is_broken());
        assert_eq!(pool_stats(&client).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn a_cancelled_context_never_acquires_a_connection() {
        let (client, handles) = mock_client(vec![vec![b"+OK\r\n"]]);
        let ctx = Context::new();
        ctx.cancel();

        let err = client.get(&ctx, "hello").await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(handles.lock().unwrap().is_empty());
        assert_eq!(pool_stats(&client).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn sequential_commands_share_one_connection() {
        let (client, handles) = mock_client(vec![vec![b"+OK\r\n", b"$5\r\nworld\r\n"]]);
        let ctx = Context::new();

        assert!(client.set(&ctx, "hello", "world", &[]).await.unwrap());
        let value = client.get(&ctx, "hello").await.unwrap();

        assert_eq!(value, Some(Bytes::from("world")));
        assert_eq!(handles.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pipeline_collects_per_command_errors_as_elements() {
        let (client, handles) = mock_client(vec![vec![
            b"+OK\r\n$1\r\nv\r\n-ERR wrong kind\r\n$2\r\nv1\r\n",
        ]]);
        let ctx = Context::new();

        let mut pipeline = client.pipeline();
        pipeline
            .set("k", "v", &[])
            .get("k")
            .append("k", "1")
            .get_del("k");
        let results = pipeline.exec(&ctx).await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0], Value::Bool(true));
        assert_eq!(results[1], Value::Bulk(Bytes::from("v")));
        assert!(results[2].is_error());
        assert_eq!(results[3], Value::Bulk(Bytes::from("v1")));
        assert!(!handles.lock().unwrap()[0].is_broken());
        assert_eq!(pool_stats(&client).await, (1, 0, 1));
    }

    #[tokio::test]
    async fn exec_after_close_reports_a_closed_pool() {
        let (client, _handles) = mock_client(vec![]);
        client.close().await.unwrap();

        let err = client.get(&Context::new(), "hello").await.unwrap_err();

        assert!(matches!(err, Error::PoolClosed));
    }
}
