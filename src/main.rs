//! CLI entry point for the device parameter client.
//!
//! # Usage
//!
//! List all parameters the device reports:
//! ```bash
//! param-ctl --host 192.168.10.10 list
//! ```
//!
//! Read and write a single parameter:
//! ```bash
//! param-ctl get manual_exposure_time
//! param-ctl set manual_exposure_time 4000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use param_transfer::config::{Settings, DEFAULT_CONFIG_PATH};
use param_transfer::{logging, ParameterDescriptor, ParameterTransfer, ParameterValue};

#[derive(Parser)]
#[command(name = "param-ctl")]
#[command(about = "Read, write and list device parameters", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Device host (overrides configuration)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Parameter service port (overrides configuration)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// I/O timeout in milliseconds (overrides configuration)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Log level (overrides configuration)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate and print every parameter the device reports
    List,

    /// Read one parameter
    Get {
        /// Parameter name, e.g. manual_gain
        name: String,
    },

    /// Write one parameter
    Set {
        /// Parameter name, e.g. manual_gain
        name: String,
        /// New value, parsed according to the parameter type
        value: String,
    },

    /// Show session information
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(host) = &cli.host {
        settings.device.host = host.clone();
    }
    if let Some(port) = cli.port {
        settings.device.port = port;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        settings.device.timeout_ms = timeout_ms;
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    settings.validate().context("Invalid configuration")?;

    logging::init_from_settings(&settings).map_err(anyhow::Error::msg)?;

    let device = &settings.device;
    let mut client =
        ParameterTransfer::connect_with(&device.host, &device.service(), device.client_options())
            .with_context(|| format!("Failed to connect to {}:{}", device.host, device.port))?;

    let outcome = match &cli.command {
        Commands::List => list(&mut client, cli.json),
        Commands::Get { name } => get(&mut client, name, cli.json),
        Commands::Set { name, value } => set(&mut client, name, value),
        Commands::Info => info(&mut client, cli.json),
    };

    client.close();
    outcome
}

fn list(client: &mut ParameterTransfer, json: bool) -> Result<()> {
    let catalog = client.catalog().context("Enumeration failed")?;
    let descriptors = catalog.sorted();

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    println!(
        "{:<32} {:<7} {:<3} {:>14} {:>14} {:>14} {:>10}",
        "NAME", "TYPE", "RW", "VALUE", "MIN", "MAX", "STEP"
    );
    for descriptor in descriptors {
        println!("{}", format_row(descriptor));
    }
    Ok(())
}

fn format_row(d: &ParameterDescriptor) -> String {
    let bound = |v: Option<ParameterValue>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
    format!(
        "{:<32} {:<7} {:<3} {:>14} {:>14} {:>14} {:>10}",
        d.name(),
        d.ty().to_string(),
        if d.is_writable() { "rw" } else { "r" },
        d.value().to_string(),
        bound(d.min()),
        bound(d.max()),
        bound(d.increment()),
    )
}

fn get(client: &mut ParameterTransfer, name: &str, json: bool) -> Result<()> {
    let value = client
        .read_value(name)
        .with_context(|| format!("Failed to read '{name}'"))?;
    if json {
        println!("{}", serde_json::json!({ "name": name, "value": value }));
    } else {
        println!("{name} = {value}");
    }
    Ok(())
}

fn set(client: &mut ParameterTransfer, name: &str, raw: &str) -> Result<()> {
    let descriptor = client
        .descriptor(name)
        .with_context(|| format!("Failed to resolve '{name}'"))?;
    let value = ParameterValue::parse(raw, descriptor.ty()).map_err(anyhow::Error::msg)?;
    if let Some(problem) = write_warning(&descriptor, value) {
        tracing::warn!(parameter = name, %value, "{problem}; sending anyway");
    }
    client
        .write_value(name, value)
        .with_context(|| format!("Failed to write '{name}'"))?;
    println!("{name} <- {value}");
    Ok(())
}

/// Why the device is likely to reject `value`, if it is.
fn write_warning(descriptor: &ParameterDescriptor, value: ParameterValue) -> Option<&'static str> {
    if !descriptor.is_writable() {
        Some("Parameter is reported as read-only")
    } else if !descriptor.accepts(value) {
        Some("Value is outside the reported bounds")
    } else {
        None
    }
}

fn info(client: &mut ParameterTransfer, json: bool) -> Result<()> {
    let endpoint = client.endpoint();
    let version = client.device_version();
    let timeout: Duration = client.options().timeout;
    let count = client.catalog().context("Enumeration failed")?.len();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "endpoint": endpoint.to_string(),
                "protocol_version": version,
                "timeout_ms": timeout.as_millis() as u64,
                "parameters": count,
            })
        );
    } else {
        println!("Endpoint:         {endpoint}");
        println!("Protocol version: {version}");
        println!("Timeout:          {} ms", timeout.as_millis());
        println!("Parameters:       {count}");
    }
    Ok(())
}
