/*!
Identify the catalog star the mount is pointing at.
*/

use crate::angle::Precision;
use crate::astro::{Horizontal, Observer};
use crate::catalog::{CatalogEntry, Star, StarCatalog};
use crate::client::{AltAz, NexStar};
use crate::error::Result;
use crate::link::Link;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Maximum altitude and azimuth difference for a match, in radians
pub const DEFAULT_TOLERANCE_RAD: f64 = 0.025;

/// Observer elevation assumed when the mount does not report one, in metres
pub const DEFAULT_ELEVATION_M: f64 = 63.0;

/// First-match lookup of the pointed-at catalog entry
#[derive(Debug, Clone)]
pub struct TargetIdentifier<E = Star> {
    entries: Vec<E>,
    tolerance_rad: f64,
}

impl TargetIdentifier<Star> {
    /// Identifier over a star catalog with the default tolerance
    pub fn from_catalog(catalog: StarCatalog) -> Self {
        Self::new(catalog.into_stars())
    }
}

impl<E: CatalogEntry> TargetIdentifier<E> {
    pub fn new(entries: Vec<E>) -> Self {
        Self {
            entries,
            tolerance_rad: DEFAULT_TOLERANCE_RAD,
        }
    }

    pub fn with_tolerance(mut self, tolerance_rad: f64) -> Self {
        self.tolerance_rad = tolerance_rad;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance_rad
    }

    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    /// The first entry, in catalog order, whose altitude and azimuth are both
    /// within tolerance of `reading`.
    ///
    /// Closer entries later in the catalog never displace an earlier match.
    pub fn identify(&self, reading: &AltAz, observer: &Observer, at: DateTime<Utc>) -> Option<&E> {
        let live = Horizontal {
            altitude: reading.altitude_radians(),
            azimuth: reading.azimuth_radians(),
        };

        self.entries.iter().find(|entry| {
            let (d_alt, d_az) = entry.horizontal(observer, at).separation(&live);
            d_alt <= self.tolerance_rad && d_az <= self.tolerance_rad
        })
    }
}

/// Poll the mount for its pointing and location, then identify the target
pub fn locate_target<'a, L: Link, E: CatalogEntry>(
    scope: &mut NexStar<L>,
    identifier: &'a TargetIdentifier<E>,
    elevation_m: f64,
    at: DateTime<Utc>,
) -> Result<Option<&'a E>> {
    let reading = scope.get_alt_az(Precision::High)?;
    let location = scope.get_location()?;
    let observer = Observer::new(location.latitude.degrees(), location.longitude.degrees(), elevation_m);

    let target = identifier.identify(&reading, &observer, at);
    debug!("Target: {}", target.map(|t| t.name()).unwrap_or("none"));
    Ok(target)
}
