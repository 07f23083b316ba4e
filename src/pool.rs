use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use crate::error::Error;
use crate::transport::{NetTransport, Transport, TransportConfig};
use crate::Result;

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound on total connections (idle + in use).
    pub max_conns: usize,
    /// Upper bound on the idle stack; 0 means "same as max_conns".
    pub max_idle_conns: usize,
    /// Idle connections unused for longer than this are evicted on the next
    /// acquisition.
    pub con_idle_time: Duration,
    pub transport: TransportConfig,
}

type TransportFactory = Box<dyn Fn() -> Box<dyn Transport> + Send + Sync>;

/// Bounded LIFO cache of connections.
///
/// The mutex is held across stack and counter updates, and across the
/// connect of a brand new transport (which the dial timeout bounds); actual
/// closing happens on a dedicated worker fed through an unbounded channel so
/// neither acquire nor release blocks on a socket shutdown.
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: PoolConfig,
    factory: TransportFactory,
    state: Mutex<PoolState>,
}

struct PoolState {
    idle: Vec<Box<dyn Transport>>,
    total: usize,
    in_use: usize,
    closed: bool,
    destroy_tx: Option<mpsc::UnboundedSender<Box<dyn Transport>>>,
}

impl PoolState {
    fn enqueue_destroy(&self, transport: Box<dyn Transport>) {
        if let Some(tx) = &self.destroy_tx {
            // A send failure means the worker is gone; dropping the
            // transport closes the socket anyway.
            let _ = tx.send(transport);
        }
    }
}

impl Pool {
    pub fn new(config: PoolConfig) -> Pool {
        let transport = config.transport.clone();
        Pool::with_factory(
            config,
            Box::new(move || Box::new(NetTransport::new(transport.clone()))),
        )
    }

    pub(crate) fn with_factory(config: PoolConfig, factory: TransportFactory) -> Pool {
        let (destroy_tx, destroy_rx) = mpsc::unbounded_channel();
        spawn_destructor(destroy_rx);

        Pool {
            inner: Arc::new(PoolInner {
                config,
                factory,
                state: Mutex::new(PoolState {
                    idle: Vec::new(),
                    total: 0,
                    in_use: 0,
                    closed: false,
                    destroy_tx: Some(destroy_tx),
                }),
            }),
        }
    }

    /// Hands out a connection, preferring the most recently released one.
    ///
    /// Idle connections past their idle time are evicted on the way. When
    /// nothing reusable is left and the pool is under its bound, a new
    /// transport is connected while the pool mutex is held.
    pub async fn acquire(&self) -> Result<Box<dyn Transport>> {
        let mut state = self.inner.state.lock().await;
        if state.closed {
            return Err(Error::PoolClosed);
        }

        while let Some(transport) = state.idle.pop() {
            if transport.last_used_at().elapsed() > self.inner.config.con_idle_time {
                state.total -= 1;
                state.enqueue_destroy(transport);
                continue;
            }
            state.in_use += 1;
            return Ok(transport);
        }

        if state.total >= self.inner.config.max_conns {
            return Err(Error::PoolFull);
        }

        let mut transport = (self.inner.factory)();
        transport.connect().await?;
        state.total += 1;
        state.in_use += 1;
        Ok(transport)
    }

    /// Returns a connection to the pool. Broken connections are destroyed
    /// instead; a healthy return that overflows `max_idle_conns` evicts one
    /// idle connection.
    pub async fn release(&self, transport: Box<dyn Transport>) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if state.closed {
            // The destructor worker is gone; dropping closes the socket.
            return Err(Error::PoolClosed);
        }

        state.in_use -= 1;
        if transport.is_broken() {
            state.total -= 1;
            state.enqueue_destroy(transport);
            return Ok(());
        }
        state.idle.push(transport);

        let max_idle = self.inner.config.max_idle_conns;
        if max_idle > 0 && state.idle.len() > max_idle {
            if let Some(evicted) = state.idle.pop() {
                state.total -= 1;
                state.enqueue_destroy(evicted);
            }
        }
        Ok(())
    }

    /// Closes the pool. Idle connections are handed to the destructor
    /// worker, which drains and terminates. Idempotent.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if state.closed {
            return Ok(());
        }

        while let Some(transport) = state.idle.pop() {
            state.enqueue_destroy(transport);
        }
        state.destroy_tx = None;
        state.closed = true;
        state.total = 0;
        state.in_use = 0;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn stats(&self) -> (usize, usize, usize) {
        let state = self.inner.state.lock().await;
        (state.total, state.in_use, state.idle.len())
    }
}

fn spawn_destructor(mut destroy_rx: mpsc::UnboundedReceiver<Box<dyn Transport>>) {
    tokio::spawn(async move {
        while let Some(mut transport) = destroy_rx.recv().await {
            if let Err(err) = transport.close().await {
                warn!(error = %err, "failed to close evicted connection");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::transport::testing::{MockHandle, MockTransport};

    fn pool_config(max_conns: usize, max_idle_conns: usize) -> PoolConfig {
        PoolConfig {
            max_conns,
            max_idle_conns,
            con_idle_time: Duration::from_secs(1800),
            transport: TransportConfig {
                address: String::from("127.0.0.1:6379"),
                dial_timeout: Duration::from_secs(1),
                tls: false,
                tls_cert_path: None,
                tls_ca_cert_path: None,
                tls_key_path: None,
            },
        }
    }

    fn mock_pool(config: PoolConfig) -> (Pool, Arc<std::sync::Mutex<Vec<MockHandle>>>) {
        let handles = Arc::new(std::sync::Mutex::new(Vec::new()));
        let factory_handles = handles.clone();
        let pool = Pool::with_factory(
            config,
            Box::new(move || {
                let (transport, handle) = MockTransport::scripted(&[]);
                factory_handles.lock().unwrap().push(handle);
                Box::new(transport)
            }),
        );
        (pool, handles)
    }

    async fn drain_destructor() {
        // Give the destructor worker a chance to run.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn acquire_creates_and_release_recycles() {
        let (pool, handles) = mock_pool(pool_config(10, 0));

        let transport = pool.acquire().await.unwrap();
        assert_eq!(pool.stats().await, (1, 1, 0));
        assert_eq!(handles.lock().unwrap().len(), 1);

        pool.release(transport).await.unwrap();
        assert_eq!(pool.stats().await, (1, 0, 1));

        // The idle transport is reused instead of dialing a new one.
        let transport = pool.acquire().await.unwrap();
        assert_eq!(pool.stats().await, (1, 1, 0));
        assert_eq!(handles.lock().unwrap().len(), 1);
        pool.release(transport).await.unwrap();
    }

    #[tokio::test]
    async fn acquire_rejects_when_full() {
        let (pool, _handles) = mock_pool(pool_config(2, 0));

        let t1 = pool.acquire().await.unwrap();
        let t2 = pool.acquire().await.unwrap();

        assert!(matches!(pool.acquire().await, Err(Error::PoolFull)));

        pool.release(t1).await.unwrap();
        pool.release(t2).await.unwrap();
        assert_eq!(pool.stats().await, (2, 0, 2));
    }

    #[tokio::test]
    async fn lifo_reuse_returns_most_recently_released() {
        let counter = Arc::new(AtomicUsize::new(0));
        let factory_counter = counter.clone();
        let pool = Pool::with_factory(
            pool_config(10, 0),
            Box::new(move || {
                factory_counter.fetch_add(1, Ordering::SeqCst);
                let (transport, _handle) = MockTransport::scripted(&[]);
                Box::new(transport)
            }),
        );

        let t1 = pool.acquire().await.unwrap();
        let t2 = pool.acquire().await.unwrap();
        pool.release(t1).await.unwrap();
        pool.release(t2).await.unwrap();

        // Both connections idle; two more acquisitions must not dial again.
        let _t = pool.acquire().await.unwrap();
        let _t = pool.acquire().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broken_transports_are_destroyed_not_recycled() {
        let (pool, handles) = mock_pool(pool_config(10, 0));

        let mut transport = pool.acquire().await.unwrap();
        transport.set_broken();
        pool.release(transport).await.unwrap();

        assert_eq!(pool.stats().await, (0, 0, 0));
        drain_destructor().await;
        assert_eq!(handles.lock().unwrap()[0].close_count(), 1);
    }

    #[tokio::test]
    async fn idle_transports_past_their_ttl_are_evicted() {
        let mut config = pool_config(10, 0);
        config.con_idle_time = Duration::from_millis(10);
        let (pool, handles) = mock_pool(config);

        let transport = pool.acquire().await.unwrap();
        pool.release(transport).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        // The stale idle transport is destroyed and a fresh one dialed.
        let transport = pool.acquire().await.unwrap();
        assert_eq!(pool.stats().await, (1, 1, 0));
        assert_eq!(handles.lock().unwrap().len(), 2);
        drain_destructor().await;
        assert_eq!(handles.lock().unwrap()[0].close_count(), 1);
        pool.release(transport).await.unwrap();
    }

    #[tokio::test]
    async fn max_idle_bound_is_enforced_on_release() {
        let (pool, handles) = mock_pool(pool_config(10, 1));

        let t1 = pool.acquire().await.unwrap();
        let t2 = pool.acquire().await.unwrap();
        pool.release(t1).await.unwrap();
        pool.release(t2).await.unwrap();

        assert_eq!(pool.stats().await, (1, 0, 1));
        drain_destructor().await;
        let closed: usize = handles
            .lock()
            .unwrap()
            .iter()
            .map(|handle| handle.close_count())
            .sum();
        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn connect_failure_does_not_leak_a_slot() {
        let pool = Pool::with_factory(
            pool_config(1, 0),
            Box::new(|| {
                let (transport, _handle) = MockTransport::scripted(&[]);
                Box::new(FailingConnect(transport))
            }),
        );

        assert!(matches!(
            pool.acquire().await,
            Err(Error::Connect { .. })
        ));
        assert_eq!(pool.stats().await, (0, 0, 0));
    }

    struct FailingConnect(MockTransport);

    #[async_trait::async_trait]
    impl Transport for FailingConnect {
        async fn connect(&mut self) -> Result<()> {
            Err(Error::Connect {
                address: String::from("127.0.0.1:6379"),
                source: Box::new(std::io::Error::from(std::io::ErrorKind::ConnectionRefused)),
            })
        }

        async fn read(&mut self, ctx: &crate::Context, buf: &mut [u8]) -> Result<usize> {
            self.0.read(ctx, buf).await
        }

        async fn write(&mut self, ctx: &crate::Context, buf: &[u8]) -> Result<usize> {
            self.0.write(ctx, buf).await
        }

        fn last_used_at(&self) -> tokio::time::Instant {
            self.0.last_used_at()
        }

        fn is_broken(&self) -> bool {
            self.0.is_broken()
        }

        fn set_broken(&mut self) {
            self.0.set_broken()
        }

        async fn close(&mut self) -> Result<()> {
            self.0.close().await
        }
    }

    #[tokio::test]
    async fn closed_pool_rejects_acquire_and_release() {
        let (pool, handles) = mock_pool(pool_config(10, 0));

        let transport = pool.acquire().await.unwrap();
        let idle = pool.acquire().await.unwrap();
        pool.release(idle).await.unwrap();

        pool.close().await.unwrap();
        assert_eq!(pool.stats().await, (0, 0, 0));

        assert!(matches!(pool.acquire().await, Err(Error::PoolClosed)));
        assert!(matches!(
            pool.release(transport).await,
            Err(Error::PoolClosed)
        ));

        // Closing again is a no-op.
        pool.close().await.unwrap();

        drain_destructor().await;
        let closed: usize = handles
            .lock()
            .unwrap()
            .iter()
            .map(|handle| handle.close_count())
            .sum();
        assert_eq!(closed, 1);
    }
}
