/*!
Mount polling.

A [`Monitor`] owns the client and repeatedly collects a [`Snapshot`] of
everything the mount reports, plus the identified target. Failed exchanges
are recorded in the snapshot and logged; the loop simply polls again on the
next tick.
*/

use chrono::{DateTime, Utc};
use nexstar::{
    AltAz, DeviceTime, GeoLocation, Link, NexStar, NexStarError, Observer, Precision, RaDec,
    TargetIdentifier,
};
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Everything learned from the mount in one poll
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub polled_at: DateTime<Utc>,
    pub location: Option<GeoLocation>,
    pub device_time: Option<DeviceTime>,
    pub alt_az: Option<AltAz>,
    pub ra_dec: Option<RaDec>,
    pub target: Option<String>,
    pub errors: Vec<String>,
}

impl Snapshot {
    fn new(polled_at: DateTime<Utc>) -> Self {
        Self {
            polled_at,
            location: None,
            device_time: None,
            alt_az: None,
            ra_dec: None,
            target: None,
            errors: Vec::new(),
        }
    }

    /// Keep the value, or record the failure
    fn record<T>(&mut self, what: &str, result: Result<T, NexStarError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("⚠️ {} failed: {}", what, e);
                self.errors.push(format!("{}: {}", what, e));
                None
            }
        }
    }

    /// Multi-line human readable rendering
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Polled  {}", self.polled_at.format("%Y-%m-%d %H:%M:%S UTC")));

        if let Some(loc) = &self.location {
            lines.push(format!("Lat     {}", loc.latitude));
            lines.push(format!("Long    {}", loc.longitude));
        }
        if let Some(time) = &self.device_time {
            lines.push(format!("Time    {}", time.datetime.format("%Y-%m-%d %H:%M:%S")));
        }
        lines.push(format!(
            "Target  {}",
            self.target.as_deref().unwrap_or("-")
        ));
        if let Some(pos) = &self.alt_az {
            lines.push(format!("Alt     {}", pos.altitude.signed()));
            lines.push(format!("Azm     {}", pos.azimuth));
        }
        if let Some(pos) = &self.ra_dec {
            lines.push(format!("RA      {:.4}h", pos.right_ascension.degrees() / 15.0));
            lines.push(format!("Dec     {}", pos.declination.signed()));
        }
        for err in &self.errors {
            lines.push(format!("Error   {}", err));
        }

        lines.join("\n")
    }
}

/// Output style for snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Counters reported when a watch loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub polls: u64,
    pub failed_exchanges: u64,
    pub targets_found: u64,
}

/// Polls a mount until told to stop
pub struct Monitor<L> {
    scope: NexStar<L>,
    identifier: TargetIdentifier,
    precision: Precision,
    elevation_m: f64,
    running: Arc<AtomicBool>,
}

impl<L: Link> Monitor<L> {
    pub fn new(scope: NexStar<L>, identifier: TargetIdentifier, precision: Precision, elevation_m: f64) -> Self {
        Self {
            scope,
            identifier,
            precision,
            elevation_m,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get a reference to the running flag for external control
    pub fn get_running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Query location, time and pointing once and identify the target
    pub fn poll(&mut self) -> Snapshot {
        let now = Utc::now();
        let mut snapshot = Snapshot::new(now);

        snapshot.location = snapshot.record("get_location", self.scope.get_location());
        snapshot.device_time = snapshot.record("get_time", self.scope.get_time());
        snapshot.alt_az = snapshot.record("get_alt_az", self.scope.get_alt_az(self.precision));
        snapshot.ra_dec = snapshot.record("get_ra_dec", self.scope.get_ra_dec(self.precision));

        if let (Some(loc), Some(pos)) = (&snapshot.location, &snapshot.alt_az) {
            let observer = Observer::new(loc.latitude.degrees(), loc.longitude.degrees(), self.elevation_m);
            snapshot.target = self
                .identifier
                .identify(pos, &observer, now)
                .map(|star| star.name.clone());
        }

        snapshot
    }

    /// Poll every `interval` and write each snapshot to `out`, until the
    /// running flag is cleared or `max_polls` is reached
    pub fn run<W: Write>(
        &mut self,
        interval: Duration,
        max_polls: Option<u64>,
        format: OutputFormat,
        out: &mut W,
    ) -> anyhow::Result<MonitorStats> {
        let mut stats = MonitorStats::default();
        let start_time = Instant::now();

        info!("🔭 Watching mount every {} ms", interval.as_millis());

        while self.running.load(Ordering::SeqCst) {
            let snapshot = self.poll();
            stats.polls += 1;
            stats.failed_exchanges += snapshot.errors.len() as u64;
            if snapshot.target.is_some() {
                stats.targets_found += 1;
            }

            match format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&snapshot)?)?,
                OutputFormat::Human => writeln!(out, "{}\n", snapshot.render())?,
            }
            out.flush()?;

            if max_polls.is_some_and(|max| stats.polls >= max) {
                break;
            }
            self.sleep_while_running(interval);
        }

        info!("📈 Watch final stats:");
        info!("   Polls: {}", stats.polls);
        info!("   Failed exchanges: {}", stats.failed_exchanges);
        info!("   Polls with a target: {}", stats.targets_found);
        info!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());

        Ok(stats)
    }

    /// Sleep in short slices so a cleared running flag is noticed promptly
    fn sleep_while_running(&self, interval: Duration) {
        let deadline = Instant::now() + interval;
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(Duration::from_millis(100)));
        }
    }
}
