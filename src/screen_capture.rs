//! Screenshot capture from the oscilloscope display.
//!
//! Different Siglent firmware families expose different hardcopy verbs: the
//! HD series answers `SCDP` with an IEEE-488.2 definite-length block, while
//! some X series models only support the `HCSU PRINT` / `HCSU?` pair. The
//! engine cannot know in advance which dialect the connected instrument
//! speaks, so it tries the methods in order and takes the first one that
//! yields a payload.

use crate::error::ScopeError;
use crate::format::ImageFormat;
use crate::protocol::read_definite_block;
use crate::transport::{QueryResponse, ScpiTransport};
use log::{debug, info};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Settling delays for the capture sequence.
///
/// The instrument offers no readiness signal on the wire: both the format
/// switch and the print trigger complete asynchronously relative to the
/// command acknowledgment, so the engine has to wait a fixed time. Firmware
/// revisions differ in how long they need, hence these are configurable
/// rather than baked in.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Wait after `HCSU DEV,FORMAT,...` before requesting the hardcopy.
    pub format_settle: Duration,
    /// Wait after `HCSU PRINT` before querying for the prepared data. Longer
    /// than the format settle since the print trigger is a full round trip
    /// inside the instrument.
    pub print_settle: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            format_settle: Duration::from_millis(100),
            print_settle: Duration::from_millis(200),
        }
    }
}

/// A completed screen capture: the raw image bytes and the format they were
/// requested in. The bytes are opaque to this layer; no image decoding or
/// validation happens here.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

/// Hardcopy transfer methods, tried in declaration order.
///
/// Adding support for a third firmware dialect means adding a variant here
/// and an arm in [`ScreenCapture::attempt`]; the orchestration loop stays
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureMethod {
    /// `SCDP` screen dump, answered with a definite-length block.
    Scdp,
    /// `HCSU PRINT` trigger followed by an `HCSU?` query.
    HcsuPrint,
}

impl CaptureMethod {
    const ALL: [CaptureMethod; 2] = [CaptureMethod::Scdp, CaptureMethod::HcsuPrint];

    fn label(&self) -> &'static str {
        match self {
            CaptureMethod::Scdp => "SCDP",
            CaptureMethod::HcsuPrint => "HCSU?",
        }
    }
}

/// Screen capture engine over a borrowed transport.
///
/// The engine holds the transport exclusively for its lifetime and keeps no
/// state between captures; each call is independent. Note that the
/// instrument's hardcopy format setting is left as configured by the last
/// capture call, it is not restored afterwards.
///
/// # Examples
///
/// ```no_run
/// use siglent_scope::{ImageFormat, ScpiConnection, ScreenCapture};
///
/// let mut conn = ScpiConnection::connect("192.168.1.100", 5025)?;
/// let mut capture = ScreenCapture::new(&mut conn);
/// let image = capture.capture_screenshot(ImageFormat::Png)?;
/// std::fs::write("screen.png", &image)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ScreenCapture<'a, T: ScpiTransport> {
    transport: &'a mut T,
    config: CaptureConfig,
}

impl<'a, T: ScpiTransport> ScreenCapture<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            config: CaptureConfig::default(),
        }
    }

    pub fn with_config(transport: &'a mut T, config: CaptureConfig) -> Self {
        Self { transport, config }
    }

    /// Capture the instrument display in the given format.
    ///
    /// Sets the hardcopy format, waits for the format switch to settle, then
    /// tries each transfer method in order until one returns a payload. A
    /// method failure is soft: it is logged and the next method is tried.
    /// Only when every method has failed does the call return
    /// [`ScopeError::CaptureFailed`], naming each method's failure.
    pub fn capture(&mut self, format: ImageFormat) -> Result<CaptureResult, ScopeError> {
        info!("Capturing screenshot in {format} format");

        self.transport
            .write(&format!("HCSU DEV,FORMAT,{}", format.as_scpi()))?;
        // The format switch completes asynchronously on the instrument.
        thread::sleep(self.config.format_settle);

        let mut failures = Vec::with_capacity(CaptureMethod::ALL.len());
        for method in CaptureMethod::ALL {
            debug!("Attempting {} method", method.label());
            match self.attempt(method) {
                Ok(data) if !data.is_empty() => {
                    info!("Screenshot captured via {} ({} bytes)", method.label(), data.len());
                    return Ok(CaptureResult { data, format });
                }
                Ok(_) => {
                    debug!("{} method returned an empty payload", method.label());
                    failures.push(format!("{}: empty payload", method.label()));
                }
                Err(e) => {
                    debug!("{} method failed: {e}", method.label());
                    failures.push(format!("{}: {e}", method.label()));
                }
            }
        }

        Err(ScopeError::CaptureFailed(format!(
            "no transfer method succeeded ({})",
            failures.join("; ")
        )))
    }

    fn attempt(&mut self, method: CaptureMethod) -> Result<Vec<u8>, ScopeError> {
        match method {
            CaptureMethod::Scdp => self.capture_with_scdp(),
            CaptureMethod::HcsuPrint => self.capture_with_hcsu(),
        }
    }

    /// `SCDP` screen dump: one command, answered in place with a
    /// definite-length block. Any framing violation aborts the attempt.
    fn capture_with_scdp(&mut self) -> Result<Vec<u8>, ScopeError> {
        self.transport.write("SCDP")?;
        read_definite_block(self.transport)
    }

    /// `HCSU PRINT` trigger, settle, then query the prepared output. No
    /// block framing is assumed; the whole binary response is the payload.
    /// A text response always signals an instrument-side error.
    fn capture_with_hcsu(&mut self) -> Result<Vec<u8>, ScopeError> {
        self.transport.write("HCSU PRINT")?;
        thread::sleep(self.config.print_settle);

        match self.transport.query("HCSU?")? {
            QueryResponse::Binary(data) => Ok(data),
            QueryResponse::Text(text) => Err(ScopeError::Protocol(format!(
                "unexpected string response: {text}"
            ))),
        }
    }

    /// Capture and return the raw image bytes.
    pub fn capture_screenshot(&mut self, format: ImageFormat) -> Result<Vec<u8>, ScopeError> {
        Ok(self.capture(format)?.data)
    }

    /// Capture and save to `path`.
    ///
    /// When `format` is `None` it is inferred from the filename extension,
    /// defaulting to PNG for unknown extensions.
    pub fn save_screenshot<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: Option<ImageFormat>,
    ) -> Result<(), ScopeError> {
        let path = path.as_ref();
        let format = format.unwrap_or_else(|| {
            let inferred = ImageFormat::from_path(path);
            debug!("Auto-detected format {inferred} from {}", path.display());
            inferred
        });

        let result = self.capture(format)?;
        fs::write(path, &result.data)?;
        info!("Screenshot saved to {}", path.display());
        Ok(())
    }

    /// Capture and decode into an [`image::DynamicImage`] for in-process
    /// inspection or conversion.
    pub fn to_image(&mut self, format: ImageFormat) -> Result<image::DynamicImage, ScopeError> {
        let result = self.capture(format)?;
        Ok(image::load_from_memory(&result.data)?)
    }
}
