use std::path::PathBuf;
use clap::Parser;
use log::{error, info};
use bluetooth_picker::{init_logging, run};
use bluetooth_picker::config::io::ConfigIO;
use bluetooth_picker::error::{AppRunError, ConfigError};

/// Pick a Bluetooth device to connect or disconnect, through rofi-blocks.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log debug messages
    #[arg(short, long)]
    debug: bool,

    /// Ignore the configured remote peers
    #[arg(long)]
    no_remote: bool,
}

async fn start(cli: &Cli) -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync(cli.config.as_deref())?;
    let mut config_locker = config_io.locker()?;
    let _lock_guard = config_locker.lock()?;

    let config = config_io.read().await?;
    run(config, !cli.no_remote).await
}

#[tokio::main]
async fn main() -> Result<(), AppRunError> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    info!(concat!("bluetooth-picker ", env!("CARGO_PKG_VERSION")));

    match start(&cli).await {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            info!("The picker has already been started");
            Ok(())
        },
        Err(err) => {
            error!("{}", err);
            Err(err)
        },
        Ok(()) => Ok(()),
    }
}
