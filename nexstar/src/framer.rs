/*!
Request/response framing over a [`Link`].

Every exchange is one write followed by a drain of the reply up to the `#`
terminator. Nothing is pipelined: the framer borrows the link mutably for the
whole exchange.
*/

use crate::error::Result;
use crate::link::Link;
use crate::protocol::TERMINATOR;
use tracing::trace;

/// The bytes received for one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceResponse {
    payload: Vec<u8>,
    terminated: bool,
}

impl DeviceResponse {
    pub fn new(payload: Vec<u8>, terminated: bool) -> Self {
        Self { payload, terminated }
    }

    /// Payload bytes, terminator excluded
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Whether the `#` terminator was seen before data stopped arriving
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Turns a byte link into a request/response primitive
pub struct Framer<L> {
    link: L,
}

impl<L: Link> Framer<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_link(self) -> L {
        self.link
    }

    /// Write `command`, then collect bytes until `#` or until a read yields
    /// nothing.
    ///
    /// An unterminated response (possibly empty) is returned as-is; the
    /// caller decides whether that is a failure.
    pub fn send_command(&mut self, command: &[u8]) -> Result<DeviceResponse> {
        self.write(command)?;

        let mut payload = Vec::new();
        while let Some(byte) = self.link.read_byte()? {
            if byte == TERMINATOR {
                trace!("rx {}", hex::encode(&payload));
                return Ok(DeviceResponse::new(payload, true));
            }
            payload.push(byte);
        }

        trace!("rx {} (unterminated)", hex::encode(&payload));
        Ok(DeviceResponse::new(payload, false))
    }

    /// Write `command`, then read exactly `len` raw payload bytes followed by
    /// the terminator.
    ///
    /// Raw binary replies can contain the terminator value as data, so they
    /// are framed by count instead of by scanning for `#`. A reply that goes
    /// quiet before `len` bytes is terminated if its last byte was `#`; only
    /// then is that byte known not to be data.
    pub fn send_fixed(&mut self, command: &[u8], len: usize) -> Result<DeviceResponse> {
        self.write(command)?;

        let mut payload = Vec::with_capacity(len);
        while payload.len() < len {
            match self.link.read_byte()? {
                Some(byte) => payload.push(byte),
                None => {
                    let terminated = payload.last() == Some(&TERMINATOR);
                    if terminated {
                        payload.pop();
                    }
                    trace!("rx {} (short)", hex::encode(&payload));
                    return Ok(DeviceResponse::new(payload, terminated));
                }
            }
        }

        let terminated = match self.link.read_byte()? {
            Some(TERMINATOR) => true,
            Some(extra) => {
                // Longer than expected; keep draining so the length check
                // upstream sees the real size
                payload.push(extra);
                loop {
                    match self.link.read_byte()? {
                        Some(TERMINATOR) => break true,
                        Some(byte) => payload.push(byte),
                        None => break false,
                    }
                }
            }
            None => false,
        };

        trace!("rx {}", hex::encode(&payload));
        Ok(DeviceResponse::new(payload, terminated))
    }

    fn write(&mut self, command: &[u8]) -> Result<()> {
        trace!("tx {}", hex::encode(command));
        self.link.write_bytes(command)?;
        Ok(())
    }
}
