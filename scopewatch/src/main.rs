/*!
# Scopewatch

Command-line poller for a NexStar-style telescope mount. Reads the mount's
location, clock and pointing over serial (or a serial-over-TCP bridge) and
reports which bright star it is pointing at.

## Usage

### One-shot status
```bash
scopewatch --device /dev/ttyUSB1 status
```

### Continuous polling, JSON lines on stdout
```bash
scopewatch --json watch --interval-ms 1000
```

### Sync the hand controller
```bash
scopewatch set-location --lat 51.4769 --lon -0.0005
scopewatch set-time --at "2026-10-19 21:00:00"
```

### Try it without hardware
```bash
scopewatch --device sim:// status
```
*/

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use nexstar::{locate_target, Angle, GeoLocation, NexStar, Precision};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::Level;

mod config;
mod monitor;

use config::AppConfig;
use monitor::{Monitor, OutputFormat};

#[derive(Parser)]
#[command(name = "scopewatch")]
#[command(about = "Poll a NexStar telescope mount and identify its target")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "scopewatch.toml")]
    config: PathBuf,

    /// Device override: serial path, tcp://host:port, or sim://
    #[arg(short, long)]
    device: Option<String>,

    /// Position precision override (low or high)
    #[arg(short, long)]
    precision: Option<Precision>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the mount once and print everything it reports
    Status,

    /// Poll the mount repeatedly until Ctrl+C
    Watch {
        /// Delay between polls in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Stop after this many polls
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Identify the star the mount is pointing at
    Target,

    /// Store a location in the hand controller
    SetLocation {
        /// Latitude in degrees, north positive
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees, east positive
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },

    /// Set the hand controller clock
    SetTime {
        /// Date and time to set, RFC 3339 or "YYYY-MM-DD HH:MM:SS"; defaults to now (UTC)
        #[arg(long)]
        at: Option<String>,
    },

    /// Generate configuration file
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "scopewatch.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr to keep stdout clean for JSON output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    if let Commands::Config { output } = &cli.command {
        return generate_config_file(output);
    }

    let mut config = AppConfig::load_or_default(&cli.config)?;
    if let Some(device) = &cli.device {
        config.link.device = device.clone();
    }
    if let Some(precision) = cli.precision {
        config.watch.precision = precision;
    }
    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Human };

    match cli.command {
        Commands::Status => run_status(&config, format),
        Commands::Watch { interval_ms, count } => {
            if let Some(ms) = interval_ms {
                config.watch.interval_ms = ms;
            }
            run_watch(&config, count, format)
        }
        Commands::Target => run_target(&config, format),
        Commands::SetLocation { lat, lon } => run_set_location(&config, lat, lon),
        Commands::SetTime { at } => run_set_time(&config, at.as_deref()),
        Commands::Config { .. } => Ok(()),
    }
}

fn connect(config: &AppConfig) -> Result<NexStar<Box<dyn nexstar::Link + Send>>> {
    let address = config.link.address();
    NexStar::connect(&address, config.link.read_timeout())
        .with_context(|| format!("Could not connect to telescope on {}", address))
}

/// Poll once and print the snapshot
fn run_status(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let scope = connect(config)?;
    let identifier = config.target.identifier()?;
    let mut monitor = Monitor::new(scope, identifier, config.watch.precision, config.observer.elevation_m);

    let mut stdout = std::io::stdout().lock();
    monitor.run(Duration::ZERO, Some(1), format, &mut stdout)?;
    Ok(())
}

/// Poll until Ctrl+C or `count` polls
fn run_watch(config: &AppConfig, count: Option<u64>, format: OutputFormat) -> Result<()> {
    let scope = connect(config)?;
    let identifier = config.target.identifier()?;
    let mut monitor = Monitor::new(scope, identifier, config.watch.precision, config.observer.elevation_m);

    // Set up Ctrl+C handler
    let running = monitor.get_running_flag();
    ctrlc::set_handler(move || {
        eprintln!("\n🛑 Received Ctrl+C, shutting down gracefully...");
        running.store(false, Ordering::SeqCst);
    })?;

    let mut stdout = std::io::stdout().lock();
    let stats = monitor.run(Duration::from_millis(config.watch.interval_ms), count, format, &mut stdout)?;

    eprintln!("✅ Watch completed after {} polls", stats.polls);
    Ok(())
}

/// Identify the current target once
fn run_target(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let mut scope = connect(config)?;
    let identifier = config.target.identifier()?;

    let target = locate_target(&mut scope, &identifier, config.observer.elevation_m, Utc::now())?;
    let name = target.map(|star| star.name.as_str());

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "target": name })),
        OutputFormat::Human => println!("🎯 Target: {}", name.unwrap_or("none")),
    }
    Ok(())
}

fn run_set_location(config: &AppConfig, lat: f64, lon: f64) -> Result<()> {
    let location = GeoLocation::new(Angle::from_degrees(lat), Angle::from_degrees(lon))?;
    let mut scope = connect(config)?;

    scope.set_location(&location).context("Failed to set location")?;
    let stored = scope.get_location().context("Failed to read back location")?;

    println!("📍 Location set: {} {}", stored.latitude, stored.longitude);
    Ok(())
}

fn run_set_time(config: &AppConfig, at: Option<&str>) -> Result<()> {
    let datetime = match at {
        Some(text) => parse_datetime(text)?,
        None => Utc::now().naive_utc(),
    };
    let mut scope = connect(config)?;

    scope.set_time(&datetime).context("Failed to set time")?;
    let stored = scope.get_time().context("Failed to read back time")?;

    println!("🕒 Time set: {}", stored.datetime.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

/// Accept RFC 3339 (converted to UTC) or a bare `YYYY-MM-DD HH:MM:SS`
fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc).naive_utc());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("Unrecognised date/time: {}", text))
}

/// Generate a default configuration file
fn generate_config_file(output_path: &PathBuf) -> Result<()> {
    let config = AppConfig::new();
    config.save_to_file(output_path)?;

    println!("✅ Generated configuration file: {}", output_path.display());
    println!("📝 Edit the file to customize settings, then run:");
    println!("   scopewatch --config {} watch", output_path.display());

    Ok(())
}
