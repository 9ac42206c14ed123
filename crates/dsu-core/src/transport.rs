//! TCP transport: one connection per request.
//!
//! Every exchange is connect, write one CRLF-terminated frame, read one line,
//! close. The stream is dropped on every exit path, so repeated polling never
//! accumulates sockets.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::client::SessionError;
use crate::protocol::CodecError;

/// Default cap on a single response line, terminator included.
pub const MAX_FRAME_BYTES: u64 = 16 * 1024 * 1024;

/// Server host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Parse a server address as stored in a profile.
    ///
    /// Accepts `host` or `host:port`; an explicit port wins over
    /// `default_port`. Bracketed IPv6 literals (`[::1]:3021`) are supported.
    pub fn parse(address: &str, default_port: u16) -> Result<Self, SessionError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(SessionError::InvalidEndpoint(
                "server address is empty".to_string(),
            ));
        }

        let (host, port) = match split_host_port(address) {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    SessionError::InvalidEndpoint(format!("invalid port in '{}'", address))
                })?;
                (host, port)
            }
            None => (address.trim_start_matches('[').trim_end_matches(']'), default_port),
        };

        if port == 0 {
            return Err(SessionError::InvalidEndpoint(format!(
                "no usable port for '{}'",
                address
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>, SessionError> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| SessionError::InvalidEndpoint(format!("{}: {}", self, e)))?
            .collect();
        if addrs.is_empty() {
            return Err(SessionError::InvalidEndpoint(format!(
                "{} did not resolve to any address",
                self
            )));
        }
        Ok(addrs)
    }
}

fn split_host_port(address: &str) -> Option<(&str, &str)> {
    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        return tail.strip_prefix(':').map(|port| (host, port));
    }
    // A bare IPv6 literal has several colons and no port.
    if address.matches(':').count() != 1 {
        return None;
    }
    address.split_once(':')
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A request/response byte stream to the server.
pub trait Transport {
    /// Send one frame and return the single response line.
    fn exchange(&self, endpoint: &Endpoint, frame: &str) -> Result<String, SessionError>;
}

/// Blocking TCP transport with connect and I/O timeouts.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    timeout: Duration,
    max_frame: u64,
}

impl TcpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_frame: MAX_FRAME_BYTES,
        }
    }

    /// Limit how many bytes a response line may take.
    pub fn with_max_frame(mut self, bytes: u64) -> Self {
        self.max_frame = bytes;
        self
    }

    fn connect(&self, endpoint: &Endpoint) -> Result<TcpStream, SessionError> {
        let mut last_err = None;
        for addr in endpoint.resolve()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(SessionError::Unreachable(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "no address to connect to")
        })))
    }
}

impl Transport for TcpTransport {
    fn exchange(&self, endpoint: &Endpoint, frame: &str) -> Result<String, SessionError> {
        let stream = self.connect(endpoint)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let mut writer = &stream;
        writer.write_all(frame.as_bytes())?;
        writer.write_all(b"\r\n")?;
        writer.flush()?;

        let mut reader = BufReader::new(&stream).take(self.max_frame);
        let mut buf = Vec::new();
        reader.read_until(b'\n', &mut buf)?;
        if buf.len() as u64 >= self.max_frame && !buf.ends_with(b"\n") {
            return Err(CodecError::FrameTooLarge(self.max_frame).into());
        }

        let line = String::from_utf8(buf).map_err(CodecError::InvalidUtf8)?;
        Ok(line)
    }
}
