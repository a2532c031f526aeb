/*!
Positional astronomy needed to place catalog stars on the observer's sky.

Low-precision formulas (Meeus): mean sidereal time, rigorous precession from
J2000, and the equatorial to horizontal rotation. Nutation, aberration and
refraction are ignored; together they stay well under the target tolerance.
*/

use crate::angle::wrap_pm_pi;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Julian date of the J2000.0 epoch
pub const J2000: f64 = 2451545.0;

/// Julian date of the Unix epoch
const UNIX_EPOCH_JD: f64 = 2440587.5;

const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Observer on the Earth's surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    /// Geodetic latitude in degrees, north positive
    pub latitude_deg: f64,
    /// Longitude in degrees, east positive
    pub longitude_deg: f64,
    /// Height above sea level in metres
    pub elevation_m: f64,
}

impl Observer {
    pub fn new(latitude_deg: f64, longitude_deg: f64, elevation_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            elevation_m,
        }
    }
}

/// Position on the observer's sky, in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Horizontal {
    pub altitude: f64,
    /// Measured from north through east, in [0, 2pi)
    pub azimuth: f64,
}

impl Horizontal {
    /// Absolute altitude and azimuth differences, each wrapped to [0, pi]
    pub fn separation(&self, other: &Horizontal) -> (f64, f64) {
        (
            wrap_pm_pi(self.altitude - other.altitude).abs(),
            wrap_pm_pi(self.azimuth - other.azimuth).abs(),
        )
    }
}

/// Julian date for a UTC instant
pub fn julian_date(at: DateTime<Utc>) -> f64 {
    let seconds = at.timestamp() as f64 + f64::from(at.timestamp_subsec_nanos()) * 1e-9;
    seconds / 86400.0 + UNIX_EPOCH_JD
}

/// Greenwich mean sidereal time in radians, [0, 2pi)
pub fn greenwich_mean_sidereal_time(jd: f64) -> f64 {
    let d = jd - J2000;
    let t = d / 36525.0;
    let degrees = 280.46061837 + 360.98564736629 * d + 0.000387933 * t * t - t * t * t / 38710000.0;
    degrees.to_radians().rem_euclid(TAU)
}

/// Local mean sidereal time in radians, [0, 2pi)
pub fn local_sidereal_time(jd: f64, longitude_deg: f64) -> f64 {
    (greenwich_mean_sidereal_time(jd) + longitude_deg.to_radians()).rem_euclid(TAU)
}

/// Precess J2000 equatorial coordinates (radians) to the mean equator of `jd`
pub fn precess_from_j2000(ra: f64, dec: f64, jd: f64) -> (f64, f64) {
    let t = (jd - J2000) / 36525.0;
    let zeta = (2306.2181 * t + 0.30188 * t * t + 0.017998 * t * t * t) * ARCSEC_TO_RAD;
    let z = (2306.2181 * t + 1.09468 * t * t + 0.018203 * t * t * t) * ARCSEC_TO_RAD;
    let theta = (2004.3109 * t - 0.42665 * t * t - 0.041833 * t * t * t) * ARCSEC_TO_RAD;

    let (sin_dec, cos_dec) = dec.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_a, cos_a) = (ra + zeta).sin_cos();

    let a = cos_dec * sin_a;
    let b = cos_theta * cos_dec * cos_a - sin_theta * sin_dec;
    let c = sin_theta * cos_dec * cos_a + cos_theta * sin_dec;

    let ra_out = (a.atan2(b) + z).rem_euclid(TAU);
    let dec_out = c.clamp(-1.0, 1.0).asin();
    (ra_out, dec_out)
}

/// Rotate equatorial coordinates of date (radians) into the observer's
/// horizontal frame
pub fn equatorial_to_horizontal(ra: f64, dec: f64, observer: &Observer, jd: f64) -> Horizontal {
    let hour_angle = local_sidereal_time(jd, observer.longitude_deg) - ra;
    let (sin_ha, cos_ha) = hour_angle.sin_cos();
    let (sin_dec, cos_dec) = dec.sin_cos();
    let (sin_lat, cos_lat) = observer.latitude_deg.to_radians().sin_cos();

    let sin_alt = (sin_lat * sin_dec + cos_lat * cos_dec * cos_ha).clamp(-1.0, 1.0);
    let altitude = sin_alt.asin();

    let y = -cos_dec * sin_ha;
    let x = sin_dec * cos_lat - cos_dec * sin_lat * cos_ha;
    let azimuth = if x == 0.0 && y == 0.0 {
        0.0
    } else {
        y.atan2(x).rem_euclid(TAU)
    };

    Horizontal { altitude, azimuth }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_julian_date_of_j2000() {
        let at = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert!((julian_date(at) - J2000).abs() < 1e-9);
    }

    #[test]
    fn test_gmst_meeus_example() {
        // Meeus example 12.b: 1987 April 10, 19:21:00 UT -> 8h34m57.0896s
        let at = Utc.with_ymd_and_hms(1987, 4, 10, 19, 21, 0).unwrap();
        let gmst_hours = greenwich_mean_sidereal_time(julian_date(at)).to_degrees() / 15.0;
        let expected = 8.0 + 34.0 / 60.0 + 57.0896 / 3600.0;
        assert!((gmst_hours - expected).abs() < 1e-5);
    }

    #[test]
    fn test_precession_meeus_example() {
        // Meeus example 21.b: theta Persei, J2000 -> 2028 Nov 13.19 TD
        let ra: f64 = (2.0 + 44.0 / 60.0 + 11.986 / 3600.0) * 15.0;
        let dec: f64 = 49.0 + 13.0 / 60.0 + 42.48 / 3600.0;
        let jd = 2462088.69;

        let (ra_out, dec_out) = precess_from_j2000(ra.to_radians(), dec.to_radians(), jd);
        let expected_ra = 41.547214_f64;
        let expected_dec = 49.348483_f64;

        // Proper motion is not applied, so allow a few arc-seconds
        assert!((ra_out.to_degrees() - expected_ra).abs() < 0.01);
        assert!((dec_out.to_degrees() - expected_dec).abs() < 0.01);
    }

    #[test]
    fn test_object_on_meridian() {
        let observer = Observer::new(40.0, 0.0, 0.0);
        let jd = J2000;
        let lst = local_sidereal_time(jd, observer.longitude_deg);

        // Transiting, 10 degrees south of zenith
        let pos = equatorial_to_horizontal(lst, 30f64.to_radians(), &observer, jd);
        assert!((pos.altitude.to_degrees() - 80.0).abs() < 1e-9);
        assert!((pos.azimuth - PI).abs() < 1e-9);
    }

    #[test]
    fn test_pole_star_altitude_equals_latitude() {
        let observer = Observer::new(52.0, 13.4, 34.0);
        let pos = equatorial_to_horizontal(1.0, FRAC_PI_2, &observer, J2000 + 1234.5);
        assert!((pos.altitude.to_degrees() - 52.0).abs() < 1e-9);
        assert!(pos.azimuth.abs() < 1e-6 || (pos.azimuth - TAU).abs() < 1e-6);
    }

    #[test]
    fn test_rising_in_the_east() {
        let observer = Observer::new(0.0, 0.0, 0.0);
        let jd = J2000;
        let lst = local_sidereal_time(jd, 0.0);

        // Hour angle of -6h on the equator: on the eastern horizon
        let pos = equatorial_to_horizontal(lst + FRAC_PI_2, 0.0, &observer, jd);
        assert!(pos.altitude.abs() < 1e-9);
        assert!((pos.azimuth - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_separation_wraps_azimuth() {
        let a = Horizontal { altitude: 0.5, azimuth: 0.01 };
        let b = Horizontal { altitude: 0.49, azimuth: TAU - 0.01 };
        let (dalt, daz) = a.separation(&b);
        assert!((dalt - 0.01).abs() < 1e-12);
        assert!((daz - 0.02).abs() < 1e-12);
    }
}
