/*!
NexStar protocol client.

One client per link; every operation is a single blocking exchange. Position
replies come in two fixed-point formats and are decoded by reply length, not
by which command variant was sent.
*/

use crate::angle::{fraction_to_degrees, Angle, Precision, Sexagesimal};
use crate::error::{NexStarError, Result};
use crate::framer::{DeviceResponse, Framer};
use crate::link::{Link, LinkAddress};
use crate::protocol::{command, POSITION_REPLY_LENGTHS, RAW_REPLY_LEN, TERMINATOR, YEAR_OFFSET};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Equatorial pointing reported by the mount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaDec {
    pub right_ascension: Angle,
    pub declination: Angle,
    /// Format the reply arrived in
    pub precision: Precision,
}

/// Horizontal pointing reported by the mount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltAz {
    pub altitude: Angle,
    pub azimuth: Angle,
    /// Format the reply arrived in
    pub precision: Precision,
}

impl AltAz {
    /// Altitude in radians, wrapped into (-pi, pi]
    pub fn altitude_radians(&self) -> f64 {
        self.altitude.signed().radians()
    }

    /// Azimuth in radians, wrapped into [0, 2pi)
    pub fn azimuth_radians(&self) -> f64 {
        self.azimuth.normalized().radians()
    }
}

/// Observer location as stored in the hand controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: Angle,
    pub longitude: Angle,
}

impl GeoLocation {
    /// Create a location, rejecting latitudes outside [-90, 90]
    pub fn new(latitude: Angle, longitude: Angle) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude.degrees()) {
            return Err(NexStarError::out_of_range(format!(
                "latitude {} outside [-90, 90]",
                latitude.degrees()
            )));
        }
        Ok(Self { latitude, longitude })
    }

    /// Decode `[lat d, m, s, dir, lon d, m, s, dir]`
    pub fn from_wire(raw: [u8; 8]) -> Self {
        let (latitude, longitude) = split_location(raw);
        Self {
            latitude: latitude.to_angle(),
            longitude: longitude.to_angle(),
        }
    }

    /// Encode as truncated sexagesimal bytes, latitude first
    pub fn to_wire(&self) -> Result<[u8; 8]> {
        let lat = self.latitude.to_sexagesimal().to_wire()?;
        let lon = self.longitude.to_sexagesimal().to_wire()?;
        let mut raw = [0u8; 8];
        raw[..4].copy_from_slice(&lat);
        raw[4..].copy_from_slice(&lon);
        Ok(raw)
    }
}

/// Date and time held by the hand controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTime {
    pub datetime: NaiveDateTime,
    /// Offset from GMT in hours as reported by the device
    pub utc_offset_hours: i8,
    pub daylight_saving: bool,
}

impl DeviceTime {
    /// Decode `[hour, minute, second, month, day, year-2000, zone, dst]`
    pub fn from_wire(raw: [u8; 8]) -> Result<Self> {
        let [hour, minute, second, month, day, year, zone, dst] = raw;
        let datetime = NaiveDate::from_ymd_opt(YEAR_OFFSET + i32::from(year), u32::from(month), u32::from(day))
            .and_then(|date| date.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)))
            .ok_or(NexStarError::InvalidTimeEncoding { raw })?;

        Ok(Self {
            datetime,
            utc_offset_hours: zone as i8,
            daylight_saving: dst != 0,
        })
    }

    /// Encode a date/time; zone and DST bytes are always zero
    pub fn encode(datetime: &NaiveDateTime) -> Result<[u8; 8]> {
        let year = u8::try_from(datetime.year() - YEAR_OFFSET).map_err(|_| {
            NexStarError::out_of_range(format!("year {} outside 2000..=2255", datetime.year()))
        })?;

        Ok([
            datetime.hour() as u8,
            datetime.minute() as u8,
            datetime.second() as u8,
            datetime.month() as u8,
            datetime.day() as u8,
            year,
            0,
            0,
        ])
    }
}

/// Client for a NexStar hand controller
pub struct NexStar<L> {
    framer: Framer<L>,
}

impl NexStar<Box<dyn Link + Send>> {
    /// Open `address` and wrap it in a client
    pub fn connect(address: &LinkAddress, read_timeout: Duration) -> Result<Self> {
        let link = address.open(read_timeout)?;
        Ok(Self::new(link))
    }
}

impl<L: Link> NexStar<L> {
    pub fn new(link: L) -> Self {
        Self {
            framer: Framer::new(link),
        }
    }

    pub fn link(&self) -> &L {
        self.framer.link()
    }

    pub fn into_link(self) -> L {
        self.framer.into_link()
    }

    /// Current right ascension and declination in degrees
    pub fn get_ra_dec(&mut self, precision: Precision) -> Result<RaDec> {
        let cmd = match precision {
            Precision::Low => command::GET_RA_DEC,
            Precision::High => command::GET_RA_DEC_PRECISE,
        };
        let response = self.framer.send_command(&[cmd])?;
        let (right_ascension, declination, precision) = decode_position(cmd, response)?;
        debug!("RA {:.5} Dec {:.5} ({})", right_ascension.degrees(), declination.degrees(), precision.as_str());

        Ok(RaDec {
            right_ascension,
            declination,
            precision,
        })
    }

    /// Current altitude and azimuth in degrees
    pub fn get_alt_az(&mut self, precision: Precision) -> Result<AltAz> {
        let cmd = match precision {
            Precision::Low => command::GET_AZM_ALT,
            Precision::High => command::GET_AZM_ALT_PRECISE,
        };
        let response = self.framer.send_command(&[cmd])?;
        // The device reports azimuth first
        let (azimuth, altitude, precision) = decode_position(cmd, response)?;
        debug!("Alt {:.5} Az {:.5} ({})", altitude.degrees(), azimuth.degrees(), precision.as_str());

        Ok(AltAz {
            altitude,
            azimuth,
            precision,
        })
    }

    /// Location stored in the hand controller, in signed degrees
    pub fn get_location(&mut self) -> Result<GeoLocation> {
        let raw = self.read_raw(command::GET_LOCATION)?;
        Ok(GeoLocation::from_wire(raw))
    }

    /// Location stored in the hand controller, as raw sexagesimal components
    pub fn get_location_sexagesimal(&mut self) -> Result<(Sexagesimal, Sexagesimal)> {
        let raw = self.read_raw(command::GET_LOCATION)?;
        Ok(split_location(raw))
    }

    /// Store a new location in the hand controller
    pub fn set_location(&mut self, location: &GeoLocation) -> Result<()> {
        let mut buf = Vec::with_capacity(10);
        buf.push(command::SET_LOCATION);
        buf.extend_from_slice(&location.to_wire()?);
        buf.push(TERMINATOR);

        let ack = self.framer.send_command(&buf)?;
        log_ack(command::SET_LOCATION, &ack);
        Ok(())
    }

    /// Date and time held by the hand controller
    pub fn get_time(&mut self) -> Result<DeviceTime> {
        let raw = self.read_raw(command::GET_TIME)?;
        DeviceTime::from_wire(raw)
    }

    /// Set the hand controller clock; zone and DST are written as zero
    pub fn set_time(&mut self, datetime: &NaiveDateTime) -> Result<()> {
        let mut buf = Vec::with_capacity(9);
        buf.push(command::SET_TIME);
        buf.extend_from_slice(&DeviceTime::encode(datetime)?);

        let ack = self.framer.send_command(&buf)?;
        log_ack(command::SET_TIME, &ack);
        Ok(())
    }

    fn read_raw(&mut self, cmd: u8) -> Result<[u8; RAW_REPLY_LEN]> {
        let response = self.framer.send_fixed(&[cmd], RAW_REPLY_LEN)?;
        let payload = require_terminated(cmd, response)?;
        <[u8; RAW_REPLY_LEN]>::try_from(payload.as_slice()).map_err(|_| {
            NexStarError::UnexpectedResponseLength {
                command: cmd as char,
                length: payload.len(),
                expected: &[RAW_REPLY_LEN],
            }
        })
    }
}

fn split_location(raw: [u8; 8]) -> (Sexagesimal, Sexagesimal) {
    let [a, b, c, d, e, f, g, h] = raw;
    (
        Sexagesimal::from_wire([a, b, c, d]),
        Sexagesimal::from_wire([e, f, g, h]),
    )
}

fn require_terminated(cmd: u8, response: DeviceResponse) -> Result<Vec<u8>> {
    if !response.is_terminated() {
        return Err(NexStarError::IncompleteResponse {
            command: cmd as char,
            received: response.len(),
        });
    }
    Ok(response.into_payload())
}

/// Decode a two-field fixed-point reply, choosing the format by length
fn decode_position(cmd: u8, response: DeviceResponse) -> Result<(Angle, Angle, Precision)> {
    let payload = require_terminated(cmd, response)?;
    let precision = Precision::from_reply_len(payload.len()).ok_or(
        NexStarError::UnexpectedResponseLength {
            command: cmd as char,
            length: payload.len(),
            expected: POSITION_REPLY_LENGTHS,
        },
    )?;

    let width = precision.hex_digits();
    let first = parse_hex_field(&payload[..width])?;
    let second = parse_hex_field(&payload[width + 1..])?;

    Ok((
        fraction_to_degrees(first, precision),
        fraction_to_degrees(second, precision),
        precision,
    ))
}

/// Parse 4 or 8 ASCII hex digits as a big-endian unsigned integer
fn parse_hex_field(field: &[u8]) -> Result<u32> {
    let bytes = hex::decode(field)?;
    Ok(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}

fn log_ack(cmd: u8, ack: &DeviceResponse) {
    if ack.is_terminated() {
        debug!("'{}' acknowledged ({} extra bytes)", cmd as char, ack.len());
    } else {
        warn!("'{}' not acknowledged: {}", cmd as char, hex::encode(ack.payload()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ScriptedLink, SimulatedMount};

    fn client(reply: &[u8]) -> NexStar<ScriptedLink> {
        NexStar::new(ScriptedLink::new(reply.to_vec()))
    }

    #[test]
    fn test_get_ra_dec_low_precision() {
        let mut scope = client(b"4000,2000#");
        let pos = scope.get_ra_dec(Precision::Low).unwrap();

        assert_eq!(scope.link().written(), b"E");
        assert_eq!(pos.right_ascension.degrees(), 90.0);
        assert_eq!(pos.declination.degrees(), 45.0);
        assert_eq!(pos.precision, Precision::Low);
    }

    #[test]
    fn test_get_ra_dec_high_precision_sends_lowercase() {
        let mut scope = client(b"80000000,C0000000#");
        let pos = scope.get_ra_dec(Precision::High).unwrap();

        assert_eq!(scope.link().written(), b"e");
        assert_eq!(pos.right_ascension.degrees(), 180.0);
        assert_eq!(pos.declination.degrees(), 270.0);
        assert_eq!(pos.declination.signed().degrees(), -90.0);
    }

    #[test]
    fn test_both_formats_decode_to_same_angles() {
        let low = client(b"1234,5678#").get_ra_dec(Precision::Low).unwrap();
        let high = client(b"12340000,56780000#").get_ra_dec(Precision::High).unwrap();

        assert!((low.right_ascension.degrees() - high.right_ascension.degrees()).abs() < 1e-9);
        assert!((low.declination.degrees() - high.declination.degrees()).abs() < 1e-9);
    }

    #[test]
    fn test_dispatch_is_by_length_not_command() {
        // Asked for low precision, device answered in the long format
        let pos = client(b"40000000,20000000#").get_alt_az(Precision::Low).unwrap();
        assert_eq!(pos.precision, Precision::High);
        assert_eq!(pos.azimuth.degrees(), 90.0);
        assert_eq!(pos.altitude.degrees(), 45.0);
    }

    #[test]
    fn test_alt_az_field_order() {
        let mut scope = client(b"2000,0AAA#");
        let pos = scope.get_alt_az(Precision::Low).unwrap();

        assert_eq!(scope.link().written(), b"Z");
        assert_eq!(pos.azimuth.degrees(), 45.0);
        assert!((pos.altitude.degrees() - 0x0AAA as f64 / 65536.0 * 360.0).abs() < 1e-12);
        assert!((pos.azimuth_radians() - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn test_unexpected_length_is_error() {
        let err = client(b"12,34#").get_ra_dec(Precision::Low).unwrap_err();
        match err {
            NexStarError::UnexpectedResponseLength { command, length, expected } => {
                assert_eq!(command, 'E');
                assert_eq!(length, 5);
                assert_eq!(expected, &[9, 17]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_silence_is_incomplete_not_zero() {
        let err = client(b"").get_alt_az(Precision::High).unwrap_err();
        assert!(matches!(err, NexStarError::IncompleteResponse { command: 'z', received: 0 }));
    }

    #[test]
    fn test_bad_hex_is_error() {
        let err = client(b"12G4,5678#").get_ra_dec(Precision::Low).unwrap_err();
        assert!(matches!(err, NexStarError::InvalidHex(_)));
    }

    #[test]
    fn test_get_location_degrees_and_sexagesimal() {
        let reply = [35, 30, 0, 0, 120, 15, 36, 1, b'#'];
        let mut scope = client(&reply);
        let loc = scope.get_location().unwrap();
        assert_eq!(scope.link().written(), b"w");
        assert!((loc.latitude.degrees() - 35.5).abs() < 1e-12);
        assert!((loc.longitude.degrees() + 120.26).abs() < 1e-12);

        let mut scope = client(&reply);
        let (lat, lon) = scope.get_location_sexagesimal().unwrap();
        assert_eq!(lat.degrees, 35);
        assert_eq!(lat.minutes, 30);
        assert_eq!(lon.seconds, 36);
        assert_eq!(lon.direction, crate::angle::Direction::Negative);
    }

    #[test]
    fn test_get_location_wrong_length() {
        let err = client(&[1, 2, 3, 4, 5, 6, 7, b'#']).get_location().unwrap_err();
        assert!(matches!(
            err,
            NexStarError::UnexpectedResponseLength { command: 'w', length: 7, .. }
        ));

        let err = client(&[1, 2, 3, 4, 5, 6, b'#']).get_time().unwrap_err();
        assert!(matches!(
            err,
            NexStarError::UnexpectedResponseLength { command: 'h', length: 6, .. }
        ));

        // No terminator at all
        let err = client(&[1, 2, 3]).get_location().unwrap_err();
        assert!(matches!(err, NexStarError::IncompleteResponse { command: 'w', received: 3 }));

        let err = client(&[1, 2, 3, 4, 5, 6, 7, 8, 9, b'#']).get_location().unwrap_err();
        assert!(matches!(err, NexStarError::UnexpectedResponseLength { length: 9, .. }));
    }

    #[test]
    fn test_set_location_wire_format() {
        let mut scope = client(b"#");
        let loc = GeoLocation::new(Angle::from_degrees(-33.868), Angle::from_degrees(151.2093)).unwrap();
        scope.set_location(&loc).unwrap();

        assert_eq!(
            scope.link().written(),
            &[b'W', 33, 52, 4, 1, 151, 12, 33, 0, b'#']
        );
    }

    #[test]
    fn test_set_location_rejects_bad_latitude() {
        assert!(GeoLocation::new(Angle::from_degrees(91.0), Angle::ZERO).is_err());
    }

    #[test]
    fn test_location_roundtrip_through_mount() {
        let mut scope = NexStar::new(SimulatedMount::new());
        let loc = GeoLocation::new(Angle::from_degrees(35.25), Angle::from_degrees(-80.5)).unwrap();
        scope.set_location(&loc).unwrap();

        let back = scope.get_location().unwrap();
        assert_eq!(back, loc);
    }

    #[test]
    fn test_get_time() {
        let mut scope = client(&[21, 4, 9, 10, 19, 26, 0, 0, b'#']);
        let time = scope.get_time().unwrap();

        assert_eq!(scope.link().written(), b"h");
        assert_eq!(
            time.datetime,
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(21, 4, 9).unwrap()
        );
        assert_eq!(time.utc_offset_hours, 0);
        assert!(!time.daylight_saving);
    }

    #[test]
    fn test_get_time_negative_zone() {
        let time = client(&[1, 2, 3, 4, 5, 6, 251, 1, b'#']).get_time().unwrap();
        assert_eq!(time.utc_offset_hours, -5);
        assert!(time.daylight_saving);
    }

    #[test]
    fn test_invalid_calendar_date_is_error() {
        // February 30th
        let err = client(&[12, 0, 0, 2, 30, 24, 0, 0, b'#']).get_time().unwrap_err();
        assert!(matches!(err, NexStarError::InvalidTimeEncoding { raw } if raw[4] == 30));

        let err = client(&[24, 0, 0, 1, 1, 24, 0, 0, b'#']).get_time().unwrap_err();
        assert!(matches!(err, NexStarError::InvalidTimeEncoding { .. }));
    }

    #[test]
    fn test_set_time_wire_format() {
        let mut scope = client(b"#");
        let when = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap().and_hms_opt(15, 9, 26).unwrap();
        scope.set_time(&when).unwrap();

        assert_eq!(scope.link().written(), &[b'H', 15, 9, 26, 3, 14, 25, 0, 0]);
    }

    #[test]
    fn test_set_time_rejects_unencodable_year() {
        let when = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(matches!(client(b"#").set_time(&when), Err(NexStarError::OutOfRange(_))));
    }

    #[test]
    fn test_time_roundtrip_through_mount() {
        let mount = SimulatedMount::new().with_time_bytes([0, 0, 0, 1, 1, 24, 7, 1]);
        let mut scope = NexStar::new(mount);
        // 35 seconds collides with the '#' byte
        let when = NaiveDate::from_ymd_opt(2031, 12, 25).unwrap().and_hms_opt(23, 59, 35).unwrap();
        scope.set_time(&when).unwrap();

        let back = scope.get_time().unwrap();
        assert_eq!(back.datetime, when);
        assert_eq!(back.utc_offset_hours, 0);
        assert!(!back.daylight_saving);
    }

    #[test]
    fn test_unacknowledged_setter_is_not_an_error() {
        let mut scope = client(b"");
        let loc = GeoLocation::new(Angle::from_degrees(10.0), Angle::from_degrees(20.0)).unwrap();
        assert!(scope.set_location(&loc).is_ok());
    }
}
