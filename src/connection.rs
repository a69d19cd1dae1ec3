//! Blocking TCP session for SCPI instruments.
//!
//! Siglent scopes expose a raw socket SCPI service (port 5025 by default).
//! Commands are newline-terminated text; responses are either a text line or
//! raw binary data, which is why [`ScpiConnection::query`] returns the tagged
//! [`QueryResponse`] instead of a bare buffer.

use crate::error::ScopeError;
use crate::transport::{QueryResponse, ScpiTransport};
use log::{debug, warn};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Default Siglent raw-socket SCPI port.
pub const DEFAULT_SCPI_PORT: u16 = 5025;

const RESPONSE_CHUNK_SIZE: usize = 4096;

/// Timeout settings for the TCP connection lifecycle.
///
/// All timeouts have defaults suited to a scope on the local network; slow
/// links or large hardcopy transfers may need a longer read timeout. The
/// read timeout is also the backstop for the capture engine: a bogus
/// declared payload length dies here rather than in the decoder.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing the initial TCP connection
    pub connect_timeout: Duration,
    /// Timeout for reading data from the instrument
    pub read_timeout: Duration,
    /// Timeout for writing data to the instrument
    pub write_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Builder for [`ScpiConnection`] instances.
///
/// # Examples
///
/// ```no_run
/// use siglent_scope::ScpiConnection;
/// use std::time::Duration;
///
/// let conn = ScpiConnection::builder()
///     .address("192.168.1.100")
///     .port(5025)
///     .read_timeout(Duration::from_secs(30))
///     .build()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Default)]
pub struct ScpiConnectionBuilder {
    address: Option<String>,
    port: Option<u16>,
    config: ConnectionConfig,
}

impl ScpiConnectionBuilder {
    pub fn address(mut self, addr: &str) -> Self {
        self.address = Some(addr.to_string());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the full connection configuration
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Build the connection, establishing the TCP session.
    pub fn build(self) -> Result<ScpiConnection, ScopeError> {
        let address = self
            .address
            .ok_or_else(|| ScopeError::InvalidCommand("Address must be specified".to_string()))?;
        let port = self.port.unwrap_or(DEFAULT_SCPI_PORT);

        let socket_addr: SocketAddr = format!("{address}:{port}")
            .to_socket_addrs()
            .map_err(|_| ScopeError::InvalidAddress(address.clone()))?
            .next()
            .ok_or_else(|| ScopeError::InvalidAddress(address.clone()))?;

        debug!("Connecting to instrument at {address}:{port}");

        let stream = TcpStream::connect_timeout(&socket_addr, self.config.connect_timeout)
            .map_err(|e| {
                warn!("Failed to connect to {address}:{port}: {e}");
                if e.kind() == ErrorKind::TimedOut {
                    ScopeError::Timeout
                } else {
                    ScopeError::Io(e)
                }
            })?;

        stream.set_read_timeout(Some(self.config.read_timeout))?;
        stream.set_write_timeout(Some(self.config.write_timeout))?;

        debug!("Connected to instrument at {address}:{port}");

        Ok(ScpiConnection {
            stream,
            config: self.config,
        })
    }
}

/// A live SCPI session over TCP.
///
/// Implements [`ScpiTransport`], so it can be handed to the capture engine.
/// The session owns the socket; dropping the connection closes it.
#[derive(Debug)]
pub struct ScpiConnection {
    stream: TcpStream,
    config: ConnectionConfig,
}

impl ScpiConnection {
    /// Connect with default configuration.
    pub fn connect(addr: &str, port: u16) -> Result<Self, ScopeError> {
        Self::builder().address(addr).port(port).build()
    }

    pub fn builder() -> ScpiConnectionBuilder {
        ScpiConnectionBuilder::default()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Read one logical response: everything available up to the read
    /// timeout or a short read marking the end of the instrument's answer.
    fn read_response(&mut self) -> Result<Vec<u8>, ScopeError> {
        let mut response = Vec::new();
        let mut chunk = [0u8; RESPONSE_CHUNK_SIZE];

        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    response.extend_from_slice(&chunk[..n]);
                    // A partial chunk usually means the instrument is done
                    // talking; text replies also end at the terminator.
                    if n < RESPONSE_CHUNK_SIZE || response.ends_with(b"\n") {
                        break;
                    }
                }
                Err(e) if is_timeout(&e) => {
                    if response.is_empty() {
                        return Err(ScopeError::Timeout);
                    }
                    break;
                }
                Err(e) => return Err(ScopeError::Io(e)),
            }
        }

        Ok(response)
    }
}

/// A response counts as text only when it is valid UTF-8, carries no NUL
/// bytes, and ends with the SCPI line terminator. Image payloads start with
/// non-UTF-8 magic bytes (PNG, JPEG) or embed NULs (BMP), so they always
/// classify as binary.
fn classify_response(raw: Vec<u8>) -> QueryResponse {
    if raw.ends_with(b"\n") && !raw.contains(&0) {
        if let Ok(text) = std::str::from_utf8(&raw) {
            return QueryResponse::Text(text.trim_end_matches(['\r', '\n']).to_string());
        }
    }
    QueryResponse::Binary(raw)
}

impl ScpiTransport for ScpiConnection {
    fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        debug!("-> {command}");
        self.stream.write_all(command.as_bytes())?;
        self.stream.write_all(b"\n")?;
        self.stream.flush()?;
        Ok(())
    }

    fn query(&mut self, command: &str) -> Result<QueryResponse, ScopeError> {
        self.write(command)?;
        let raw = self.read_response()?;
        let response = classify_response(raw);
        match &response {
            QueryResponse::Text(text) => debug!("<- {text}"),
            QueryResponse::Binary(data) => debug!("<- {} binary bytes", data.len()),
        }
        Ok(response)
    }

    fn read_raw(&mut self, n: usize) -> Result<Vec<u8>, ScopeError> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;

        while filled < n {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(k) => filled += k,
                Err(e) if is_timeout(&e) => {
                    if filled == 0 {
                        return Err(ScopeError::Timeout);
                    }
                    break;
                }
                Err(e) => return Err(ScopeError::Io(e)),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// Spawn a one-shot server that reads a line and replies with `reply`.
    fn one_shot_server(reply: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).unwrap();
            socket.write_all(reply).unwrap();
        });
        port
    }

    fn test_config() -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(200),
            write_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_query_text_response() {
        let port = one_shot_server(b"Siglent Technologies,SDS824X HD,0123,1.6.2R3\n");
        let mut conn = ScpiConnection::builder()
            .address("127.0.0.1")
            .port(port)
            .config(test_config())
            .build()
            .unwrap();

        let response = conn.query("*IDN?").unwrap();
        assert_eq!(
            response,
            QueryResponse::Text("Siglent Technologies,SDS824X HD,0123,1.6.2R3".to_string())
        );
    }

    #[test]
    fn test_query_binary_response() {
        // PNG magic is not valid UTF-8, so this must classify as binary.
        let port = one_shot_server(b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR");
        let mut conn = ScpiConnection::builder()
            .address("127.0.0.1")
            .port(port)
            .config(test_config())
            .build()
            .unwrap();

        let response = conn.query("HCSU?").unwrap();
        match response {
            QueryResponse::Binary(data) => assert_eq!(&data[..4], b"\x89PNG"),
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_read_raw_exact_count() {
        let port = one_shot_server(b"#18imgbytes");
        let mut conn = ScpiConnection::builder()
            .address("127.0.0.1")
            .port(port)
            .config(test_config())
            .build()
            .unwrap();

        conn.write("SCDP").unwrap();
        assert_eq!(conn.read_raw(2).unwrap(), b"#1");
        assert_eq!(conn.read_raw(1).unwrap(), b"8");
        assert_eq!(conn.read_raw(8).unwrap(), b"imgbytes");
    }

    #[test]
    fn test_missing_address_rejected() {
        let err = ScpiConnection::builder().port(5025).build().unwrap_err();
        assert!(matches!(err, ScopeError::InvalidCommand(_)));
    }
}
