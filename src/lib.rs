pub mod config;
pub mod connection;
pub mod error;
pub mod format;
pub mod oscilloscope;
pub mod protocol;
pub mod screen_capture;
pub mod transport;

pub use config::{load_config, load_config_or_default, AppConfig};
pub use connection::{ConnectionConfig, ScpiConnection, ScpiConnectionBuilder, DEFAULT_SCPI_PORT};
pub use error::ScopeError;
pub use format::ImageFormat;
pub use oscilloscope::Oscilloscope;
pub use screen_capture::{CaptureConfig, CaptureResult, ScreenCapture};
pub use transport::{QueryResponse, ScpiTransport};
