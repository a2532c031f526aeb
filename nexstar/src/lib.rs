/*!
# NexStar Mount Protocol Client

Client for the serial command protocol spoken by NexStar-style telescope
hand controllers, plus the bits of positional astronomy needed to tell which
catalog star the mount is pointing at.

## Core Types

- [`NexStar`] - protocol client over any [`Link`]
- [`Angle`], [`Sexagesimal`], [`Precision`] - angle codec
- [`RaDec`], [`AltAz`], [`GeoLocation`], [`DeviceTime`] - decoded replies
- [`TargetIdentifier`] - first-match star lookup

## Modules

- [`angle`] - sexagesimal and fixed-point angle conversions
- [`link`] - byte links (serial, TCP) and address parsing
- [`framer`] - request/response framing on the `#` terminator
- [`client`] - the command set
- [`mock`] - scripted and simulated links for tests
- [`astro`] - sidereal time, precession, horizontal coordinates
- [`catalog`] - star catalogs
- [`target`] - target identification
- [`error`] - error types

## Example

```
use nexstar::{NexStar, Precision, SimulatedMount};

let mut scope = NexStar::new(SimulatedMount::new());
let pointing = scope.get_alt_az(Precision::High)?;
let location = scope.get_location()?;
println!("alt {} az {} at {}", pointing.altitude, pointing.azimuth, location.latitude);
# Ok::<(), nexstar::NexStarError>(())
```
*/

pub mod angle;
pub mod astro;
pub mod catalog;
pub mod client;
pub mod error;
pub mod framer;
pub mod link;
pub mod mock;
pub mod target;

// Re-export commonly used types
pub use angle::{Angle, Direction, Precision, Sexagesimal};
pub use astro::{Horizontal, Observer};
pub use catalog::{CatalogEntry, Star, StarCatalog};
pub use client::{AltAz, DeviceTime, GeoLocation, NexStar, RaDec};
pub use error::{NexStarError, Result};
pub use framer::{DeviceResponse, Framer};
pub use link::{Link, LinkAddress, StreamLink};
pub use mock::{ScriptedLink, SimulatedMount};
pub use target::{locate_target, TargetIdentifier};

/// Version information for the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol constants
pub mod protocol {
    /// End-of-reply sentinel
    pub const TERMINATOR: u8 = b'#';

    /// Valid lengths of a two-field position reply (16-bit, 32-bit)
    pub const POSITION_REPLY_LENGTHS: &[usize] = &[9, 17];

    /// Length of the raw location and time payloads
    pub const RAW_REPLY_LEN: usize = 8;

    /// Years are sent as an offset from this one
    pub const YEAR_OFFSET: i32 = 2000;

    /// Command bytes
    pub mod command {
        pub const GET_RA_DEC: u8 = b'E';
        pub const GET_RA_DEC_PRECISE: u8 = b'e';
        pub const GET_AZM_ALT: u8 = b'Z';
        pub const GET_AZM_ALT_PRECISE: u8 = b'z';
        pub const GET_LOCATION: u8 = b'w';
        pub const SET_LOCATION: u8 = b'W';
        pub const GET_TIME: u8 = b'h';
        pub const SET_TIME: u8 = b'H';
    }
}
