use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;
use crate::pool::PoolConfig;
use crate::transport::TransportConfig;
use crate::Result;

const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_CON_IDLE_TIME: Duration = Duration::from_secs(30 * 60);

/// Client configuration.
///
/// `address` is the only required field; everything else has a usable
/// default. With `tls` enabled, the three certificate paths must all be set.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Target `host:port`.
    pub address: String,
    /// Upper bound on total connections (idle + in use).
    pub pool_max_conns: usize,
    /// Upper bound on the idle stack; 0 means "same as pool_max_conns".
    pub max_idle_conns: usize,
    /// Per-connect deadline, covering the TCP dial and the TLS handshake.
    pub dial_timeout: Duration,
    /// Idle connections unused for longer than this are evicted.
    pub con_idle_time: Duration,

    pub tls: bool,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_ca_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> ClientConfig {
        ClientConfig {
            address: address.into(),
            ..ClientConfig::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(Error::Config(String::from("address must not be empty")));
        }
        if self.tls
            && (self.tls_cert_path.is_none()
                || self.tls_ca_cert_path.is_none()
                || self.tls_key_path.is_none())
        {
            return Err(Error::Config(String::from(
                "tls requires cert, key and ca cert paths",
            )));
        }
        Ok(())
    }

    pub(crate) fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_conns: self.pool_max_conns,
            max_idle_conns: self.max_idle_conns,
            con_idle_time: self.con_idle_time,
            transport: TransportConfig {
                address: self.address.clone(),
                dial_timeout: self.dial_timeout,
                tls: self.tls,
                tls_cert_path: self.tls_cert_path.clone(),
                tls_ca_cert_path: self.tls_ca_cert_path.clone(),
                tls_key_path: self.tls_key_path.clone(),
            },
        }
    }
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            address: String::new(),
            pool_max_conns: usize::MAX,
            max_idle_conns: 0,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            con_idle_time: DEFAULT_CON_IDLE_TIME,
            tls: false,
            tls_cert_path: None,
            tls_ca_cert_path: None,
            tls_key_path: None,
        }
    }
}
