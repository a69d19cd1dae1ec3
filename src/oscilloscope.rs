//! High-level oscilloscope session.

use crate::config::AppConfig;
use crate::connection::{ConnectionConfig, ScpiConnection};
use crate::error::ScopeError;
use crate::format::ImageFormat;
use crate::screen_capture::{CaptureConfig, ScreenCapture};
use crate::transport::{QueryResponse, ScpiTransport};
use log::info;
use std::path::Path;

/// A connected Siglent oscilloscope.
///
/// Owns the SCPI session and hands out the screen capture engine on demand.
/// The capture engine borrows the connection for one capture at a time, so
/// captures can never interleave on the same instrument.
///
/// # Examples
///
/// ```no_run
/// use siglent_scope::Oscilloscope;
///
/// let mut scope = Oscilloscope::connect("192.168.1.100")?;
/// println!("{}", scope.identify()?);
/// scope.save_screenshot("capture.png", None)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Oscilloscope {
    connection: ScpiConnection,
    capture_config: CaptureConfig,
}

impl Oscilloscope {
    /// Connect on the default SCPI port with default timeouts.
    pub fn connect(host: &str) -> Result<Self, ScopeError> {
        let connection = ScpiConnection::builder().address(host).build()?;
        Ok(Self {
            connection,
            capture_config: CaptureConfig::default(),
        })
    }

    /// Connect with explicit port and connection settings.
    pub fn connect_with(
        host: &str,
        port: u16,
        connection_config: ConnectionConfig,
        capture_config: CaptureConfig,
    ) -> Result<Self, ScopeError> {
        let connection = ScpiConnection::builder()
            .address(host)
            .port(port)
            .config(connection_config)
            .build()?;
        Ok(Self {
            connection,
            capture_config,
        })
    }

    /// Connect using a loaded [`AppConfig`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ScopeError> {
        info!("Connecting to {}:{}", config.scope.host, config.scope.port);
        Self::connect_with(
            &config.scope.host,
            config.scope.port,
            config.connection(),
            config.capture_config(),
        )
    }

    /// Query the instrument identification string (`*IDN?`).
    pub fn identify(&mut self) -> Result<String, ScopeError> {
        match self.connection.query("*IDN?")? {
            QueryResponse::Text(idn) => Ok(idn),
            QueryResponse::Binary(data) => Err(ScopeError::Protocol(format!(
                "binary response to *IDN? ({} bytes)",
                data.len()
            ))),
        }
    }

    /// Send a raw SCPI command.
    pub fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        self.connection.write(command)
    }

    /// Send a raw SCPI query and return the response.
    pub fn query(&mut self, command: &str) -> Result<QueryResponse, ScopeError> {
        self.connection.query(command)
    }

    /// Screen capture engine borrowing this session's connection.
    pub fn screen_capture(&mut self) -> ScreenCapture<'_, ScpiConnection> {
        ScreenCapture::with_config(&mut self.connection, self.capture_config.clone())
    }

    /// Capture the display and return the raw image bytes.
    pub fn capture_screenshot(&mut self, format: ImageFormat) -> Result<Vec<u8>, ScopeError> {
        self.screen_capture().capture_screenshot(format)
    }

    /// Capture the display and save it to `path`, inferring the format from
    /// the extension when none is given.
    pub fn save_screenshot<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: Option<ImageFormat>,
    ) -> Result<(), ScopeError> {
        self.screen_capture().save_screenshot(path, format)
    }
}
