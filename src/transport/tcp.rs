//! TCP client session to the local pose data source

use super::Transport;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use std::io::{ErrorKind, Read};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Single outbound TCP connection to a fixed endpoint
pub struct TcpSession {
    address: String,
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
    stream: Option<TcpStream>,
}

impl TcpSession {
    /// Create an unconnected session for `address` (`host:port`)
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
            read_timeout: None,
            stream: None,
        }
    }

    /// Create an unconnected session from the `[connection]` config section
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(config.address(), config.connect_timeout()).with_read_timeout(config.read_timeout())
    }

    /// Bound each receive; a timed-out read returns [`Error::ReceiveTimeout`]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = self
            .address
            .to_socket_addrs()
            .map_err(|e| Error::TransportInit(format!("cannot resolve {}: {}", self.address, e)))?
            .collect();

        if addrs.is_empty() {
            return Err(Error::TransportInit(format!(
                "{} resolved to no addresses",
                self.address
            )));
        }
        Ok(addrs)
    }

    /// Connection-phase failure, including socket setup after the handshake
    fn connect_error(&self, source: std::io::Error) -> Error {
        Error::Connect {
            addr: self.address.clone(),
            source,
        }
    }

    fn configure(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.read_timeout)?;
        Ok(())
    }
}

/// Errors raised before the connection attempt itself, while creating the socket
fn is_socket_create_error(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Unsupported | ErrorKind::PermissionDenied | ErrorKind::OutOfMemory
    )
}

impl Transport for TcpSession {
    fn open(&mut self) -> Result<()> {
        // At most one open connection per session
        self.close();

        let addrs = self.resolve()?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    if let Err(e) = self.configure(&stream) {
                        let _ = stream.shutdown(Shutdown::Both);
                        return Err(self.connect_error(e));
                    }
                    tracing::info!("Connected to pose source at {}", addr);
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) if is_socket_create_error(e.kind()) => {
                    return Err(Error::SocketCreate(e));
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(self.connect_error(last_error.unwrap_or_else(|| {
            std::io::Error::new(ErrorKind::NotConnected, "no address tried")
        })))
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        match stream.read(buffer) {
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Err(Error::ReceiveTimeout)
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            tracing::debug!("Closed connection to {}", self.address);
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for TcpSession {
    fn drop(&mut self) {
        self.close();
    }
}
