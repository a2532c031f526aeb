/*!
Angle codec.

Conversions between the device's native angle representations and signed
decimal degrees:

- sexagesimal degrees/minutes/seconds plus a sign flag (location payloads)
- fixed-point fractions of a full turn in 16-bit or 32-bit precision
  (position replies)
*/

use crate::error::{NexStarError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;

/// A signed angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn from_degrees(degrees: f64) -> Self {
        Self(degrees)
    }

    pub fn from_radians(radians: f64) -> Self {
        Self(radians.to_degrees())
    }

    pub fn degrees(self) -> f64 {
        self.0
    }

    pub fn radians(self) -> f64 {
        self.0.to_radians()
    }

    /// The same direction expressed in [0, 360)
    pub fn normalized(self) -> Self {
        let wrapped = self.0.rem_euclid(360.0);
        // rem_euclid can return 360.0 for tiny negative inputs
        if wrapped >= 360.0 {
            Self(0.0)
        } else {
            Self(wrapped)
        }
    }

    /// The same direction expressed in (-180, 180]
    pub fn signed(self) -> Self {
        let wrapped = self.normalized().0;
        if wrapped > 180.0 {
            Self(wrapped - 360.0)
        } else {
            Self(wrapped)
        }
    }

    /// Split into truncated degrees/minutes/seconds
    pub fn to_sexagesimal(self) -> Sexagesimal {
        degrees_to_sexagesimal(self)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dms = self.to_sexagesimal();
        let sign = match dms.direction {
            Direction::Positive => '+',
            Direction::Negative => '-',
        };
        write!(f, "{}{}°{:02}'{:02}\"", sign, dms.degrees, dms.minutes, dms.seconds)
    }
}

/// Sign flag transmitted alongside an unsigned sexagesimal magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    /// Decode the wire flag; only `1` means negative
    pub fn from_wire(byte: u8) -> Self {
        if byte == 1 {
            Self::Negative
        } else {
            Self::Positive
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Self::Positive => 0,
            Self::Negative => 1,
        }
    }
}

/// Degrees, minutes, seconds and direction as the device exchanges them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sexagesimal {
    pub degrees: u32,
    pub minutes: u8,
    pub seconds: u8,
    pub direction: Direction,
}

impl Sexagesimal {
    pub fn new(degrees: u32, minutes: u8, seconds: u8, direction: Direction) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
            direction,
        }
    }

    /// Decode four raw wire bytes `[degrees, minutes, seconds, direction]`
    pub fn from_wire(bytes: [u8; 4]) -> Self {
        Self::new(
            u32::from(bytes[0]),
            bytes[1],
            bytes[2],
            Direction::from_wire(bytes[3]),
        )
    }

    /// Encode as four raw wire bytes; degrees must fit in one byte
    pub fn to_wire(&self) -> Result<[u8; 4]> {
        let degrees = u8::try_from(self.degrees).map_err(|_| {
            NexStarError::out_of_range(format!("{} degrees does not fit in one byte", self.degrees))
        })?;
        Ok([degrees, self.minutes, self.seconds, self.direction.to_wire()])
    }

    pub fn to_angle(&self) -> Angle {
        sexagesimal_to_degrees(
            self.degrees,
            u32::from(self.minutes),
            u32::from(self.seconds),
            self.direction,
        )
    }
}

/// Fixed-point width used by a position command variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 16-bit fractions, 4 hex digits per field
    Low,
    /// 32-bit fractions, 8 hex digits per field
    High,
}

impl Precision {
    /// Number of steps in a full turn
    pub fn denominator(self) -> f64 {
        match self {
            Self::Low => 65536.0,
            Self::High => 4294967296.0,
        }
    }

    /// ASCII hex digits per field on the wire
    pub fn hex_digits(self) -> usize {
        match self {
            Self::Low => 4,
            Self::High => 8,
        }
    }

    /// Length of a two-field reply: two fields and one delimiter
    pub fn reply_len(self) -> usize {
        self.hex_digits() * 2 + 1
    }

    /// Infer the precision of a two-field position reply from its length
    pub fn from_reply_len(len: usize) -> Option<Self> {
        match len {
            9 => Some(Self::Low),
            17 => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for Precision {
    type Err = NexStarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" | "16" | "16-bit" => Ok(Self::Low),
            "high" | "32" | "32-bit" => Ok(Self::High),
            other => Err(NexStarError::out_of_range(format!("unknown precision '{}'", other))),
        }
    }
}

/// `degrees + minutes/60 + seconds/3600`, negated for a negative direction
pub fn sexagesimal_to_degrees(degrees: u32, minutes: u32, seconds: u32, direction: Direction) -> Angle {
    let magnitude = f64::from(degrees) + f64::from(minutes) / 60.0 + f64::from(seconds) / 3600.0;
    match direction {
        Direction::Positive => Angle(magnitude),
        Direction::Negative => Angle(-magnitude),
    }
}

/// Split an angle into truncated (never rounded) degrees, minutes and seconds.
///
/// The device expects truncated components, so this conversion is lossy: any
/// fraction of an arc-second is dropped.
pub fn degrees_to_sexagesimal(angle: Angle) -> Sexagesimal {
    let value = angle.degrees();
    let magnitude = value.abs();

    let degrees = magnitude.trunc();
    let minutes_full = (magnitude - degrees) * 60.0;
    let minutes = minutes_full.trunc();
    let seconds = ((minutes_full - minutes) * 60.0).trunc();

    let direction = if value < 0.0 {
        Direction::Negative
    } else {
        Direction::Positive
    };

    Sexagesimal {
        degrees: degrees as u32,
        minutes: minutes as u8,
        seconds: seconds as u8,
        direction,
    }
}

/// Decode a fraction of a full turn into degrees in [0, 360)
pub fn fraction_to_degrees(raw: u32, precision: Precision) -> Angle {
    Angle(f64::from(raw) / precision.denominator() * 360.0)
}

/// Encode an angle as the nearest fraction of a full turn
pub fn degrees_to_fraction(angle: Angle, precision: Precision) -> u32 {
    let denominator = precision.denominator();
    let steps = (angle.normalized().degrees() / 360.0 * denominator).round();
    // 359.99999... can round up to a full turn
    (steps % denominator) as u32
}

/// Wrap an angle in radians into [-pi, pi)
pub fn wrap_pm_pi(radians: f64) -> f64 {
    (radians + PI).rem_euclid(TAU) - PI
}
