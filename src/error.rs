use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection timeout")]
    Timeout,
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),
}
