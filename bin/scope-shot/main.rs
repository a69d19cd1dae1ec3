use chrono::Local;
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use siglent_scope::{load_config_or_default, ImageFormat, Oscilloscope};
use std::path::PathBuf;

/// Siglent oscilloscope screenshot tool
#[derive(Parser, Debug)]
#[command(name = "scope-shot")]
#[command(about = "Capture a screenshot from a Siglent oscilloscope over LAN", long_about = None)]
struct Args {
    /// Instrument host address (overrides config)
    #[arg(short = 'H', long, value_name = "HOST")]
    host: Option<String>,

    /// Instrument SCPI port (overrides config)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Output file; format is inferred from the extension unless --format
    /// is given. Defaults to a timestamped PNG in the current directory.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Image format (png, bmp, jpeg)
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Print the instrument identification and exit
    #[arg(long)]
    identify: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = load_config_or_default(args.config.as_deref());

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.log_level.clone());
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    if let Some(host) = args.host {
        config.scope.host = host;
    }
    if let Some(port) = args.port {
        config.scope.port = port;
    }

    let mut scope = match Oscilloscope::from_config(&config) {
        Ok(scope) => scope,
        Err(e) => {
            error!("Could not connect to {}:{}: {e}", config.scope.host, config.scope.port);
            return Err(e.into());
        }
    };

    info!("Connected: {}", scope.identify()?);
    if args.identify {
        return Ok(());
    }

    let format = args.format.as_deref().map(ImageFormat::parse).transpose()?;

    let output = args.output.unwrap_or_else(|| {
        let ext = format.unwrap_or(ImageFormat::Png).as_scpi().to_lowercase();
        PathBuf::from(format!(
            "screenshot_{}.{ext}",
            Local::now().format("%Y%m%d_%H%M%S")
        ))
    });

    match scope.save_screenshot(&output, format) {
        Ok(()) => {
            info!("Saved {}", output.display());
            Ok(())
        }
        Err(e) => {
            error!("Capture failed: {e}");
            Err(e.into())
        }
    }
}
