use crate::error::ScopeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Image formats supported by the oscilloscope's hardcopy output.
///
/// The set is closed: the instrument only understands PNG, BMP and JPEG.
/// "JPG" is accepted as an input token and folded to [`ImageFormat::Jpeg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageFormat {
    Png,
    Bmp,
    Jpeg,
}

impl ImageFormat {
    /// Parse a format token, case-insensitively.
    ///
    /// Accepts "PNG", "BMP", "JPEG" and "JPG" (normalized to JPEG) in any
    /// case. Anything else is [`ScopeError::UnsupportedFormat`].
    pub fn parse(token: &str) -> Result<Self, ScopeError> {
        match token.to_ascii_uppercase().as_str() {
            "PNG" => Ok(ImageFormat::Png),
            "BMP" => Ok(ImageFormat::Bmp),
            "JPEG" | "JPG" => Ok(ImageFormat::Jpeg),
            _ => Err(ScopeError::UnsupportedFormat(format!(
                "{token}. Supported: PNG, BMP, JPEG, JPG"
            ))),
        }
    }

    /// Infer a format from a filename extension.
    ///
    /// Unknown or missing extensions default to PNG rather than failing, so
    /// callers can always get a usable format out of a target path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_uppercase())
            .as_deref()
        {
            Some("PNG") => ImageFormat::Png,
            Some("BMP") => ImageFormat::Bmp,
            Some("JPG") | Some("JPEG") => ImageFormat::Jpeg,
            _ => ImageFormat::Png,
        }
    }

    /// The token used in SCPI hardcopy commands for this format.
    pub fn as_scpi(&self) -> &'static str {
        match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Bmp => "BMP",
            ImageFormat::Jpeg => "JPEG",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_scpi())
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageFormat::parse(s)
    }
}
