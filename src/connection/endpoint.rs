//! Opening the byte stream: resolve, TCP connect, TLS.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::error::ConnectError;

/// A bidirectional byte stream the connection tasks can own.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

/// Open a plain or TLS stream to the configured server within the
/// configured connect timeout.
pub async fn open(config: &NetworkConfig) -> Result<Box<dyn AsyncStream>, ConnectError> {
    let host = config.hostname.as_str();
    let port = config.port();

    let attempt = async {
        let tcp = connect_tcp(host, port).await?;
        if let Err(e) = enable_keepalive(&tcp) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        if config.secure {
            let tls = upgrade_to_tls(tcp, host).await?;
            Ok(Box::new(tls) as Box<dyn AsyncStream>)
        } else {
            Ok(Box::new(tcp) as Box<dyn AsyncStream>)
        }
    };

    tokio::time::timeout(config.connect_timeout(), attempt)
        .await
        .map_err(|_| ConnectError::Timeout(format!("{}:{}", host, port)))?
}

async fn connect_tcp(host: &str, port: u16) -> Result<TcpStream, ConnectError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| ConnectError::Resolve {
            host: host.to_owned(),
            source,
        })?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                debug!(%addr, "TCP connected");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "TCP connect failed");
                last_error = Some((addr, e));
            }
        }
    }

    match last_error {
        Some((addr, source)) => Err(ConnectError::Refused {
            addr: addr.to_string(),
            source,
        }),
        None => Err(ConnectError::Resolve {
            host: host.to_owned(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
        }),
    }
}

fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    sock.set_tcp_keepalive(&keepalive)
}

fn tls_connector() -> TlsConnector {
    static CONNECTOR: OnceLock<TlsConnector> = OnceLock::new();
    CONNECTOR
        .get_or_init(|| {
            let mut roots = RootCertStore::empty();
            let certs = rustls_native_certs::load_native_certs();
            for cert in certs.certs {
                if let Err(e) = roots.add(cert) {
                    warn!("failed to add root cert: {}", e);
                }
            }
            for e in &certs.errors {
                warn!("error loading native certs: {}", e);
            }
            debug!(roots = roots.len(), "loaded platform trust roots");

            let config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            TlsConnector::from(Arc::new(config))
        })
        .clone()
}

async fn upgrade_to_tls(
    tcp: TcpStream,
    host: &str,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, ConnectError> {
    let server_name = ServerName::try_from(host.to_owned())
        .map_err(|_| ConnectError::InvalidServerName(host.to_owned()))?;
    tls_connector()
        .connect(server_name, tcp)
        .await
        .map_err(|source| ConnectError::Tls {
            host: host.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect_tcp("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, ConnectError::Refused { .. }));
    }

    #[tokio::test]
    async fn opens_plain_stream() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = NetworkConfig::new("127.0.0.1", "mk");
        config.port = Some(listener.local_addr().unwrap().port());

        let (accepted, opened) = tokio::join!(listener.accept(), open(&config));
        assert!(accepted.is_ok());
        assert!(opened.is_ok());
    }
}
