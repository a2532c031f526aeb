/*!
Star catalogs.

Entries keep J2000 positions and compute where they stand on the observer's
sky at a given instant. Catalog order is significant: target identification
reports the first entry that matches.
*/

use crate::astro::{equatorial_to_horizontal, julian_date, precess_from_j2000, Horizontal, Observer};
use crate::error::{NexStarError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Anything that can be placed on the observer's sky
pub trait CatalogEntry {
    fn name(&self) -> &str;

    /// Altitude and azimuth for `observer` at `at`
    fn horizontal(&self, observer: &Observer, at: DateTime<Utc>) -> Horizontal;
}

/// A fixed star with J2000 coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub name: String,
    /// Right ascension in degrees, J2000
    pub ra_deg: f64,
    /// Declination in degrees, J2000
    pub dec_deg: f64,
}

impl Star {
    pub fn new(name: impl Into<String>, ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            name: name.into(),
            ra_deg,
            dec_deg,
        }
    }
}

impl CatalogEntry for Star {
    fn name(&self) -> &str {
        &self.name
    }

    fn horizontal(&self, observer: &Observer, at: DateTime<Utc>) -> Horizontal {
        let jd = julian_date(at);
        let (ra, dec) = precess_from_j2000(self.ra_deg.to_radians(), self.dec_deg.to_radians(), jd);
        equatorial_to_horizontal(ra, dec, observer, jd)
    }
}

/// Bright named stars: (name, RA J2000 degrees, Dec J2000 degrees)
const BRIGHT_STARS: &[(&str, f64, f64)] = &[
    ("Achernar", 24.4285, -57.2368),
    ("Acrux", 186.6496, -63.0991),
    ("Adhara", 104.6565, -28.9721),
    ("Albireo", 292.6804, 27.9597),
    ("Alcyone", 56.8712, 24.1051),
    ("Aldebaran", 68.9802, 16.5093),
    ("Alderamin", 319.6449, 62.5856),
    ("Algieba", 154.9931, 19.8415),
    ("Algol", 47.0422, 40.9556),
    ("Alhena", 99.4280, 16.3993),
    ("Alioth", 193.5073, 55.9598),
    ("Alkaid", 206.8852, 49.3133),
    ("Almach", 30.9748, 42.3297),
    ("Alnair", 332.0583, -46.9610),
    ("Alnilam", 84.0534, -1.2019),
    ("Alnitak", 85.1897, -1.9426),
    ("Alphard", 141.8968, -8.6586),
    ("Alphecca", 233.6720, 26.7147),
    ("Alpheratz", 2.0969, 29.0904),
    ("Altair", 297.6958, 8.8683),
    ("Antares", 247.3519, -26.4320),
    ("Arcturus", 213.9153, 19.1824),
    ("Atria", 252.1662, -69.0277),
    ("Avior", 125.6285, -59.5095),
    ("Bellatrix", 81.2828, 6.3497),
    ("Betelgeuse", 88.7929, 7.4071),
    ("Canopus", 95.9880, -52.6957),
    ("Capella", 79.1723, 45.9980),
    ("Caph", 2.2945, 59.1498),
    ("Castor", 113.6495, 31.8883),
    ("Deneb", 310.3580, 45.2803),
    ("Denebola", 177.2649, 14.5721),
    ("Diphda", 10.8974, -17.9866),
    ("Dubhe", 165.9320, 61.7510),
    ("Elnath", 81.5730, 28.6075),
    ("Eltanin", 269.1516, 51.4889),
    ("Enif", 326.0465, 9.8750),
    ("Fomalhaut", 344.4127, -29.6222),
    ("Gacrux", 187.7915, -57.1132),
    ("Hadar", 210.9559, -60.3730),
    ("Hamal", 31.7934, 23.4624),
    ("Izar", 221.2468, 27.0742),
    ("Kaus Australis", 276.0430, -34.3846),
    ("Kochab", 222.6764, 74.1555),
    ("Markab", 346.1902, 15.2053),
    ("Menkalinan", 89.8822, 44.9474),
    ("Menkar", 45.5699, 4.0897),
    ("Miaplacidus", 138.3000, -69.7172),
    ("Mimosa", 191.9303, -59.6888),
    ("Mintaka", 83.0017, -0.2991),
    ("Mirach", 17.4330, 35.6206),
    ("Mirfak", 51.0807, 49.8612),
    ("Mizar", 200.9814, 54.9254),
    ("Nunki", 283.8164, -26.2967),
    ("Peacock", 306.4119, -56.7351),
    ("Polaris", 37.9546, 89.2641),
    ("Pollux", 116.3290, 28.0262),
    ("Procyon", 114.8255, 5.2250),
    ("Rasalhague", 263.7336, 12.5600),
    ("Regulus", 152.0930, 11.9672),
    ("Rigel", 78.6345, -8.2016),
    ("Rigil Kentaurus", 219.9021, -60.8340),
    ("Sabik", 257.5945, -15.7249),
    ("Sadr", 305.5571, 40.2567),
    ("Saiph", 86.9391, -9.6696),
    ("Scheat", 345.9436, 28.0828),
    ("Schedar", 10.1268, 56.5373),
    ("Shaula", 263.4022, -37.1038),
    ("Sirius", 101.2872, -16.7161),
    ("Spica", 201.2983, -11.1613),
    ("Unukalhai", 236.0670, 6.4256),
    ("Vega", 279.2347, 38.7837),
    ("Wezen", 107.0979, -26.3932),
];

/// On-disk catalog layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(rename = "star", default)]
    stars: Vec<Star>,
}

/// An ordered, read-only collection of stars
#[derive(Debug, Clone, Default)]
pub struct StarCatalog {
    stars: Vec<Star>,
}

impl StarCatalog {
    pub fn new(stars: Vec<Star>) -> Self {
        Self { stars }
    }

    /// Built-in list of bright named stars in alphabetical order
    pub fn bright_stars() -> Self {
        let stars = BRIGHT_STARS
            .iter()
            .map(|&(name, ra, dec)| Star::new(name, ra, dec))
            .collect();
        Self { stars }
    }

    /// Parse a TOML catalog made of `[[star]]` tables
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| NexStarError::catalog(format!("failed to parse catalog: {}", e)))?;

        for star in &file.stars {
            if !(-90.0..=90.0).contains(&star.dec_deg) {
                return Err(NexStarError::catalog(format!(
                    "{}: declination {} outside [-90, 90]",
                    star.name, star.dec_deg
                )));
            }
        }

        Ok(Self { stars: file.stars })
    }

    /// Load a TOML catalog from disk
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NexStarError::catalog(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize to the `[[star]]` TOML layout
    pub fn to_toml_string(&self) -> Result<String> {
        let file = CatalogFile {
            stars: self.stars.clone(),
        };
        toml::to_string_pretty(&file)
            .map_err(|e| NexStarError::catalog(format!("failed to serialize catalog: {}", e)))
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Look up a star by name, case-insensitively
    pub fn find(&self, name: &str) -> Option<&Star> {
        self.stars.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn into_stars(self) -> Vec<Star> {
        self.stars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    #[test]
    fn test_bright_stars_are_sorted_and_valid() {
        let catalog = StarCatalog::bright_stars();
        assert!(catalog.len() > 50);

        let names: Vec<&str> = catalog.stars().iter().map(|s| s.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        for star in catalog.stars() {
            assert!((0.0..360.0).contains(&star.ra_deg), "{}", star.name);
            assert!((-90.0..=90.0).contains(&star.dec_deg), "{}", star.name);
        }
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let catalog = StarCatalog::bright_stars();
        assert_eq!(catalog.find("vega").unwrap().name, "Vega");
        assert!(catalog.find("Nibiru").is_none());
    }

    #[test]
    fn test_polaris_stays_near_latitude() {
        let polaris = StarCatalog::bright_stars().find("Polaris").unwrap().clone();
        let observer = Observer::new(45.0, -75.0, 63.0);
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 3, 0, 0).unwrap();

        let pos = polaris.horizontal(&observer, at);
        assert!((pos.altitude.to_degrees() - 45.0).abs() < 1.0);
    }

    #[test]
    fn test_toml_roundtrip() {
        let catalog = StarCatalog::new(vec![
            Star::new("Vega", 279.2347, 38.7837),
            Star::new("Deneb", 310.3580, 45.2803),
        ]);

        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), catalog.to_toml_string().unwrap()).unwrap();
        let loaded = StarCatalog::load_from_file(temp_file.path()).unwrap();

        assert_eq!(loaded.stars(), catalog.stars());
    }

    #[test]
    fn test_rejects_bad_declination() {
        let content = r#"
            [[star]]
            name = "Nowhere"
            ra_deg = 10.0
            dec_deg = 95.0
        "#;
        assert!(matches!(StarCatalog::from_toml_str(content), Err(NexStarError::Catalog(_))));
    }

    #[test]
    fn test_missing_file_is_catalog_error() {
        let err = StarCatalog::load_from_file("/nonexistent/catalog.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/catalog.toml"));
    }
}
