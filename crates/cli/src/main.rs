//! remapper-config CLI: read and write remapper configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use remapper_config_core::device::{self, DeviceId};
use remapper_config_core::document::{ConfigDocument, UsageCode};
use remapper_config_core::error::Error as CoreError;
use remapper_config_core::records::UsageSource;
use remapper_config_core::transport::FeatureTransport;
use remapper_config_core::{protocol, REMAPPER_VID};
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

struct CliHidTransport {
    device: hidapi::HidDevice,
}

impl CliHidTransport {
    fn open(id: DeviceId) -> Result<Self> {
        if device::discover_devices(id)?.is_empty() {
            return Err(CoreError::DeviceNotFound(id.to_string()).into());
        }

        let api = hidapi::HidApi::new().map_err(|e| anyhow::anyhow!("hidapi init: {e}"))?;
        let device = api
            .open(id.vid, id.pid)
            .map_err(|e| anyhow::anyhow!("open HID device ({id}): {e}"))?;
        debug!(%id, "Opened device");
        Ok(Self { device })
    }
}

/// Zeroed buffer for `get_feature_report`, with the report ID in byte 0.
fn report_buffer(report_id: u8, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    if let Some(first) = buf.first_mut() {
        *first = report_id;
    }
    buf
}

impl FeatureTransport for CliHidTransport {
    fn write_feature_report(&self, data: &[u8]) -> remapper_config_core::error::Result<()> {
        self.device
            .send_feature_report(data)
            .map_err(|e| CoreError::Hid(format!("send_feature_report: {e}")))
    }

    fn read_feature_report(
        &self,
        report_id: u8,
        len: usize,
    ) -> remapper_config_core::error::Result<Vec<u8>> {
        let mut buf = report_buffer(report_id, len);
        let n = self
            .device
            .get_feature_report(&mut buf)
            .map_err(|e| CoreError::Hid(format!("get_feature_report: {e}")))?;
        buf.truncate(n);
        Ok(buf)
    }
}

fn parse_id(text: &str) -> std::result::Result<u16, String> {
    device::parse_usb_id(text).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(
    name = "remapper-config",
    version,
    about = "Read and write HID remapper configuration"
)]
struct Cli {
    /// USB vendor ID (hex with 0x prefix, or decimal).
    #[arg(long, global = true, value_parser = parse_id, default_value_t = REMAPPER_VID)]
    vid: u16,
    /// USB product ID (hex with 0x prefix, or decimal).
    #[arg(long, global = true, value_parser = parse_id, default_value_t = remapper_config_core::pids::REMAPPER)]
    pid: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected remapper interfaces.
    ListDevices,
    /// Read the configuration and print it as JSON.
    Get {
        /// Write the JSON to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a JSON configuration to the device and persist it.
    Set {
        /// Configuration file; reads stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Check a JSON configuration without touching the device.
    Validate {
        /// Configuration file; reads stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Print the usage ranges the device exposes and sees.
    Usages,
    /// Reboot the device into its USB bootloader.
    Bootsel,
}

fn read_document(file: Option<&PathBuf>) -> Result<ConfigDocument> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("read configuration from stdin")?;
            text
        }
    };
    Ok(ConfigDocument::from_json(&text)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let id = DeviceId {
        vid: cli.vid,
        pid: cli.pid,
    };

    match cli.command {
        Commands::ListDevices => {
            let devices = device::discover_devices(id)?;
            if devices.is_empty() {
                println!("No remapper found ({id}).");
                println!("Ensure the device is connected and you have access to its hidraw node.");
            } else {
                for dev in &devices {
                    println!(
                        "{} (VID: 0x{:04X}, PID: 0x{:04X}, interface: {}, path: {})",
                        dev.product.as_deref().unwrap_or("HID remapper"),
                        dev.vid,
                        dev.pid,
                        dev.interface_number,
                        dev.path
                    );
                }
            }
        }
        Commands::Get { output } => {
            let transport = CliHidTransport::open(id)?;
            let snapshot = protocol::read_config(&transport)?;
            let json = ConfigDocument::from(&snapshot).to_json_pretty()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, format!("{json}\n"))
                        .with_context(|| format!("write {}", path.display()))?;
                    println!("Configuration saved to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Set { file } => {
            let config = read_document(file.as_ref())?.to_device_config()?;
            let transport = CliHidTransport::open(id)?;
            protocol::write_config(&transport, &config)?;
            println!(
                "Wrote {} mapping(s) and {} screen(s)",
                config.mappings.len(),
                config.screens.len()
            );
        }
        Commands::Validate { file } => {
            let config = read_document(file.as_ref())?.to_device_config()?;
            let plan = protocol::plan_write(&config)?;
            println!(
                "Configuration OK: {} mapping(s), {} screen(s), {} frames",
                config.mappings.len(),
                config.screens.len(),
                plan.len()
            );
        }
        Commands::Usages => {
            let transport = CliHidTransport::open(id)?;
            let report = protocol::read_report(&transport)?;
            for (source, count) in [
                (UsageSource::Ours, report.our_usage_count),
                (UsageSource::Theirs, report.their_usage_count),
            ] {
                let runs = protocol::read_usage_runs(&transport, source, count)?;
                println!("{} usages ({} ranges):", source.label(), runs.len());
                for run in &runs {
                    println!("  {} x{}", UsageCode(run.usage), run.count);
                }
            }
        }
        Commands::Bootsel => {
            let transport = CliHidTransport::open(id)?;
            protocol::reset_into_bootsel(&transport)?;
            println!("Device is rebooting into the bootloader");
        }
    }

    Ok(())
}
