use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_native_tls::TlsStream;
use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::Result;

/// Configuration for a single connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub address: String,
    pub dial_timeout: Duration,

    pub tls: bool,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_ca_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

/// One logical client connection.
///
/// A transport is owned by exactly one command execution between pool
/// acquisition and release. Once marked broken its stream offset is no
/// longer trusted and the pool destroys it instead of recycling it.
#[async_trait]
pub trait Transport: Send {
    /// Establishes the connection. A no-op when already connected.
    async fn connect(&mut self) -> Result<()>;

    /// One native read, honouring the context's cancellation and deadline.
    async fn read(&mut self, ctx: &Context, buf: &mut [u8]) -> Result<usize>;

    /// Writes the whole buffer, honouring cancellation and deadline.
    async fn write(&mut self, ctx: &Context, buf: &[u8]) -> Result<usize>;

    fn last_used_at(&self) -> Instant;

    fn is_broken(&self) -> bool;

    fn set_broken(&mut self);

    async fn close(&mut self) -> Result<()>;
}

enum Stream {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Tcp(stream) => stream.read(buf).await,
            Stream::Tls(stream) => stream.read(buf).await,
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Stream::Tcp(stream) => stream.write_all(buf).await,
            Stream::Tls(stream) => stream.write_all(buf).await,
        }
    }

    async fn shutdown(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Tcp(stream) => stream.shutdown().await,
            Stream::Tls(stream) => stream.shutdown().await,
        }
    }
}

/// TCP (optionally TLS) transport.
pub struct NetTransport {
    stream: Option<Stream>,
    last_used_at: Instant,
    broken: bool,
    config: TransportConfig,
}

impl NetTransport {
    pub fn new(config: TransportConfig) -> NetTransport {
        NetTransport {
            stream: None,
            last_used_at: Instant::now(),
            broken: false,
            config,
        }
    }

    async fn dial(&self) -> Result<Stream> {
        let address = &self.config.address;
        let tcp = match timeout(self.config.dial_timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return Err(connect_error(address, err)),
            Err(_) => {
                return Err(connect_error(
                    address,
                    std::io::Error::from(std::io::ErrorKind::TimedOut),
                ))
            }
        };

        if !self.config.tls {
            return Ok(Stream::Tcp(tcp));
        }

        let connector = self.tls_connector()?;
        // SNI uses the host part of `host:port`.
        let host = address.rsplit_once(':').map_or(address.as_str(), |(h, _)| h);
        match timeout(self.config.dial_timeout, connector.connect(host, tcp)).await {
            Ok(Ok(stream)) => Ok(Stream::Tls(Box::new(stream))),
            Ok(Err(err)) => Err(connect_error(address, err)),
            Err(_) => Err(connect_error(
                address,
                std::io::Error::from(std::io::ErrorKind::TimedOut),
            )),
        }
    }

    fn tls_connector(&self) -> Result<tokio_native_tls::TlsConnector> {
        let address = &self.config.address;
        let cert_path = self.config.tls_cert_path.as_ref().expect("validated");
        let key_path = self.config.tls_key_path.as_ref().expect("validated");
        let ca_path = self.config.tls_ca_cert_path.as_ref().expect("validated");

        let cert = std::fs::read(cert_path).map_err(|err| connect_error(address, err))?;
        let key = std::fs::read(key_path).map_err(|err| connect_error(address, err))?;
        let identity = native_tls::Identity::from_pkcs8(&cert, &key)
            .map_err(|err| connect_error(address, err))?;

        let ca_pem = std::fs::read(ca_path).map_err(|err| connect_error(address, err))?;
        let ca = native_tls::Certificate::from_pem(&ca_pem)
            .map_err(|err| connect_error(address, err))?;

        let connector = native_tls::TlsConnector::builder()
            .identity(identity)
            .add_root_certificate(ca)
            .build()
            .map_err(|err| connect_error(address, err))?;

        Ok(tokio_native_tls::TlsConnector::from(connector))
    }
}

fn connect_error(
    address: &str,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> Error {
    Error::Connect {
        address: address.to_string(),
        source: source.into(),
    }
}

#[async_trait]
impl Transport for NetTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = self.dial().await?;
        self.stream = Some(stream);
        self.last_used_at = Instant::now();
        debug!(address = %self.config.address, "connected");
        Ok(())
    }

    async fn read(&mut self, ctx: &Context, buf: &mut [u8]) -> Result<usize> {
        ctx.ensure_active()?;

        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
        let n = match ctx.deadline() {
            Some(deadline) => match timeout_at(deadline, stream.read(buf)).await {
                Ok(result) => result?,
                Err(_) => return Err(Error::Io(std::io::ErrorKind::TimedOut.into())),
            },
            None => stream.read(buf).await?,
        };
        self.last_used_at = Instant::now();
        Ok(n)
    }

    async fn write(&mut self, ctx: &Context, buf: &[u8]) -> Result<usize> {
        ctx.ensure_active()?;

        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
        match ctx.deadline() {
            Some(deadline) => match timeout_at(deadline, stream.write_all(buf)).await {
                Ok(result) => result?,
                Err(_) => return Err(Error::Io(std::io::ErrorKind::TimedOut.into())),
            },
            None => stream.write_all(buf).await?,
        }
        self.last_used_at = Instant::now();
        Ok(buf.len())
    }

    fn last_used_at(&self) -> Instant {
        self.last_used_at
    }

    fn is_broken(&self) -> bool {
        self.broken
    }

    fn set_broken(&mut self) {
        self.broken = true;
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}
