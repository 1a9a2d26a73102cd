//! TCP transport for the parameter service.
//!
//! Provides name resolution restricted to IPv4, a blocking connect with a
//! timeout, per-socket I/O timeouts and a graceful close. This layer knows
//! nothing about the protocol that runs on top of it.

use std::fmt;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{ParamError, ParamResult};

/// Upper bound on read attempts while draining a socket during close.
const CLOSE_DRAIN_ATTEMPTS: usize = 10;

/// A resolved IPv4 stream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint(SocketAddrV4);

impl Endpoint {
    /// Wrap an already known IPv4 socket address.
    pub fn new(addr: SocketAddrV4) -> Self {
        Self(addr)
    }

    /// The socket address this endpoint points at.
    pub fn addr(&self) -> SocketAddrV4 {
        self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Resolve `address` and `service` to the first IPv4 endpoint.
///
/// Hostnames go through the system resolver; IPv6 results are ignored.
///
/// Service names are not looked up: `service` must be a decimal port such
/// as `"7683"`. A named service like `"http"` fails with
/// [`ParamError::Resolution`]. The parameter service has no registered
/// service name, so callers always pass its port.
pub fn resolve(address: &str, service: &str) -> ParamResult<Endpoint> {
    let resolution_error = |reason: String| ParamError::Resolution {
        address: address.to_string(),
        service: service.to_string(),
        reason,
    };

    let port: u16 = service
        .trim()
        .parse()
        .map_err(|_| resolution_error(format!("unknown service '{service}'")))?;

    let candidates = (address, port)
        .to_socket_addrs()
        .map_err(|e| resolution_error(e.to_string()))?;

    candidates
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(Endpoint(v4)),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| resolution_error("no IPv4 address found".to_string()))
}

/// An owned, connected TCP socket.
///
/// The socket is released exactly once, either through [`close`](Self::close)
/// or on drop. The raw stream is never handed out.
#[derive(Debug)]
pub struct TcpConnection {
    stream: Option<TcpStream>,
    endpoint: Endpoint,
}

impl TcpConnection {
    /// Open a TCP connection to `endpoint`, giving up after `connect_timeout`.
    pub fn connect(endpoint: Endpoint, connect_timeout: Duration) -> ParamResult<Self> {
        let addr = SocketAddr::V4(endpoint.addr());
        let stream = TcpStream::connect_timeout(&addr, connect_timeout).map_err(|source| {
            ParamError::Connection {
                endpoint: endpoint.to_string(),
                source,
            }
        })?;

        // Requests are tiny and latency-bound
        stream
            .set_nodelay(true)
            .map_err(|source| ParamError::Connection {
                endpoint: endpoint.to_string(),
                source,
            })?;

        debug!(%endpoint, "TCP connection established");
        Ok(Self {
            stream: Some(stream),
            endpoint,
        })
    }

    /// The remote endpoint of this connection.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Whether the socket is still held.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Apply `timeout` to both reads and writes so blocking calls fail
    /// instead of hanging.
    pub fn set_timeout(&self, timeout: Duration) -> ParamResult<()> {
        let stream = self.stream()?;
        stream
            .set_read_timeout(Some(timeout))
            .and_then(|_| stream.set_write_timeout(Some(timeout)))
            .map_err(|e| ParamError::transfer("set socket timeout", e))
    }

    /// Send `buf` with a single write. Anything less than a full write is an
    /// error.
    pub fn send(&mut self, buf: &[u8]) -> ParamResult<()> {
        let stream = self.stream_mut()?;
        let written = stream
            .write(buf)
            .map_err(|e| ParamError::transfer("send request", e))?;
        if written != buf.len() {
            return Err(ParamError::Transfer(format!(
                "short write: sent {written} of {} bytes",
                buf.len()
            )));
        }
        trace!(bytes = written, "sent");
        Ok(())
    }

    /// Fill `buf` completely, looping over partial receives.
    ///
    /// A zero-length receive (peer closed) or a timeout before the buffer is
    /// full fails the call.
    pub fn receive_exact(&mut self, buf: &mut [u8]) -> ParamResult<()> {
        let stream = self.stream_mut()?;
        let mut filled = 0;
        while filled < buf.len() {
            match stream.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(ParamError::Transfer(format!(
                        "connection closed after {filled} of {} bytes",
                        buf.len()
                    )))
                }
                Ok(n) => {
                    trace!(bytes = n, "received");
                    filled += n;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ParamError::Transfer(format!(
                        "receive failed after {filled} of {} bytes: {e}",
                        buf.len()
                    )))
                }
            }
        }
        Ok(())
    }

    /// Shut the connection down and release the socket.
    ///
    /// Switches to non-blocking mode, half-closes the sending side, drains a
    /// bounded number of pending reads and drops the socket. Errors along the
    /// way are ignored.
    pub fn close(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };

        let _ = stream.set_nonblocking(true);
        let _ = stream.shutdown(Shutdown::Write);

        let mut scratch = [0u8; 256];
        for _ in 0..CLOSE_DRAIN_ATTEMPTS {
            match stream.read(&mut scratch) {
                Ok(n) if n > 0 => continue,
                _ => break,
            }
        }

        debug!(endpoint = %self.endpoint, "TCP connection closed");
    }

    fn stream(&self) -> ParamResult<&TcpStream> {
        self.stream
            .as_ref()
            .ok_or_else(|| ParamError::Transfer("connection already closed".to_string()))
    }

    fn stream_mut(&mut self) -> ParamResult<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| ParamError::Transfer("connection already closed".to_string()))
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.close();
    }
}
