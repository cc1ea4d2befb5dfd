mod camera;
mod console;
mod data_provider;
mod error;
mod mesh;
mod parse;
mod renderer;
mod rotation;
mod serial_data_provider;
mod settings;
mod tilt;
mod ui;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use serial_data_provider::{available_candidates, detect_device, SerialDataProvider};
use settings::Settings;
use std::path::PathBuf;
use tokio::time::Duration;

#[derive(Parser)]
#[command(name = "IMU Tilt View")]
#[command(bin_name = "imu-tilt-view")]
struct Cli {
    /// Serial port, auto-detected when omitted
    #[arg(long, short)]
    port: Option<String>,

    #[arg(long, short)]
    baud: Option<u32>,

    /// JSON settings file
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List the serial ports connected to the host")]
    Detect,
    #[command(about = "Live 3D cup tilted by pitch, roll and yaw")]
    Cup,
    #[command(about = "Pitch and roll time series with a tilt bar")]
    Tilt,
    #[command(about = "Print labelled roll and pitch readings")]
    Console,
}

fn main() -> Result<()> {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let args = Cli::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(baud) = args.baud {
        settings.baud_rate = baud;
    }
    settings.validate()?;

    match args.command {
        Commands::Detect => {
            for port in available_candidates()? {
                println!("{port}");
            }
            Ok(())
        }
        Commands::Console => {
            let port_name = resolve_port(args.port, &settings)?;
            let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
            rt.block_on(console::run(&port_name, &settings))?;
            Ok(())
        }
        Commands::Cup | Commands::Tilt => {
            let port_name = resolve_port(args.port, &settings)?;
            let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
            let handle = rt.handle().clone();
            let _enter = handle.enter();

            std::thread::spawn(move || {
                rt.block_on(async {
                    loop {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                    }
                })
            });

            let provider = SerialDataProvider::open(&port_name, &settings)
                .with_context(|| format!("opening {port_name}"))?;

            let result = if matches!(args.command, Commands::Cup) {
                ui::run_cup(provider, &settings)
            } else {
                ui::run_tilt(provider, &settings)
            };
            result.map_err(|e| anyhow!("display error: {e}"))
        }
    }
}

/// Explicit `--port`, otherwise the first port matching a device signature.
/// Exits with status 1 after listing the candidates when nothing matches.
fn resolve_port(port: Option<String>, settings: &Settings) -> Result<String> {
    if let Some(port) = port {
        return Ok(port);
    }

    match detect_device(&settings.device_signatures) {
        Ok(port) => {
            println!("Using device on port: {}", port.name);
            Ok(port.name)
        }
        Err(error::Error::DeviceNotFound { available, .. }) => {
            println!("Device not found! Available ports:");
            for port in available {
                println!("{port}");
            }
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
