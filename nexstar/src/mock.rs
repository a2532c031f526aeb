/*!
In-memory links for testing and development.

- [`ScriptedLink`] replays a fixed byte stream and records what was written.
- [`SimulatedMount`] interprets the command set and keeps position, location
  and time state, so setters and getters round-trip like on real hardware.
*/

use crate::angle::{degrees_to_fraction, Angle, Precision};
use crate::link::Link;
use crate::protocol::{command, TERMINATOR};
use std::collections::VecDeque;
use std::io;

/// Link that replays scripted bytes and records everything written
#[derive(Debug, Default)]
pub struct ScriptedLink {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
}

impl ScriptedLink {
    /// Create a link that will emit `incoming` and then go silent
    pub fn new(incoming: Vec<u8>) -> Self {
        Self {
            incoming: incoming.into(),
            written: Vec::new(),
        }
    }

    /// Append more bytes for the device to "send"
    pub fn push_reply(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    /// All bytes written so far
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Bytes not yet consumed by reads
    pub fn remaining(&self) -> usize {
        self.incoming.len()
    }
}

impl Link for ScriptedLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.incoming.pop_front())
    }
}

/// A mount simulator speaking the NexStar command set
#[derive(Debug, Clone)]
pub struct SimulatedMount {
    right_ascension: u32,
    declination: u32,
    azimuth: u32,
    altitude: u32,
    location: [u8; 8],
    time: [u8; 8],
    pending: Vec<u8>,
    outgoing: VecDeque<u8>,
    commands_seen: usize,
}

impl SimulatedMount {
    /// A mount at Greenwich, pointing north at the horizon, on 2024-01-01
    pub fn new() -> Self {
        Self {
            right_ascension: 0,
            declination: 0,
            azimuth: 0,
            altitude: 0,
            location: [51, 28, 38, 0, 0, 0, 5, 1],
            time: [0, 0, 0, 1, 1, 24, 0, 0],
            pending: Vec::new(),
            outgoing: VecDeque::new(),
            commands_seen: 0,
        }
    }

    pub fn with_ra_dec(mut self, right_ascension: Angle, declination: Angle) -> Self {
        self.right_ascension = degrees_to_fraction(right_ascension, Precision::High);
        self.declination = degrees_to_fraction(declination, Precision::High);
        self
    }

    pub fn with_alt_az(mut self, altitude: Angle, azimuth: Angle) -> Self {
        self.altitude = degrees_to_fraction(altitude, Precision::High);
        self.azimuth = degrees_to_fraction(azimuth, Precision::High);
        self
    }

    /// Raw location bytes `[lat d, m, s, dir, lon d, m, s, dir]`
    pub fn with_location_bytes(mut self, location: [u8; 8]) -> Self {
        self.location = location;
        self
    }

    /// Raw time bytes `[hour, minute, second, month, day, year-2000, zone, dst]`
    pub fn with_time_bytes(mut self, time: [u8; 8]) -> Self {
        self.time = time;
        self
    }

    pub fn location_bytes(&self) -> [u8; 8] {
        self.location
    }

    pub fn time_bytes(&self) -> [u8; 8] {
        self.time
    }

    /// Number of complete commands handled
    pub fn commands_seen(&self) -> usize {
        self.commands_seen
    }

    fn process_pending(&mut self) {
        while let Some(&cmd) = self.pending.first() {
            let needed = match cmd {
                command::SET_LOCATION | command::SET_TIME => 9,
                _ => 1,
            };
            if self.pending.len() < needed {
                break;
            }
            let frame: Vec<u8> = self.pending.drain(..needed).collect();
            self.handle(&frame);
        }
    }

    fn handle(&mut self, frame: &[u8]) {
        match frame[0] {
            command::GET_RA_DEC => self.reply_pair(self.right_ascension, self.declination, Precision::Low),
            command::GET_RA_DEC_PRECISE => {
                self.reply_pair(self.right_ascension, self.declination, Precision::High)
            }
            command::GET_AZM_ALT => self.reply_pair(self.azimuth, self.altitude, Precision::Low),
            command::GET_AZM_ALT_PRECISE => self.reply_pair(self.azimuth, self.altitude, Precision::High),
            command::GET_LOCATION => {
                let location = self.location;
                self.reply_raw(&location);
            }
            command::SET_LOCATION => {
                self.location.copy_from_slice(&frame[1..9]);
                self.reply_raw(&[]);
            }
            command::GET_TIME => {
                let time = self.time;
                self.reply_raw(&time);
            }
            command::SET_TIME => {
                self.time.copy_from_slice(&frame[1..9]);
                self.reply_raw(&[]);
            }
            // Unknown bytes get no reply, including the trailing terminator
            // some clients append to setters
            _ => return,
        }
        self.commands_seen += 1;
    }

    fn reply_pair(&mut self, first: u32, second: u32, precision: Precision) {
        let text = match precision {
            Precision::Low => format!("{:04X},{:04X}#", first >> 16, second >> 16),
            Precision::High => format!("{:08X},{:08X}#", first, second),
        };
        self.outgoing.extend(text.into_bytes());
    }

    fn reply_raw(&mut self, bytes: &[u8]) {
        self.outgoing.extend(bytes.iter().copied());
        self.outgoing.push_back(TERMINATOR);
    }
}

impl Default for SimulatedMount {
    fn default() -> Self {
        Self::new()
    }
}

impl Link for SimulatedMount {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.pending.extend_from_slice(bytes);
        self.process_pending();
        Ok(())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.outgoing.pop_front())
    }
}
