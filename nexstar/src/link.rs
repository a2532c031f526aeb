/*!
Byte links to the mount.

The protocol only needs two primitives from a link: write a buffer, and read
the next byte with a bounded wait. [`StreamLink`] adapts any blocking
`Read + Write` stream whose reads time out (serial ports, TCP sockets) to
that contract.
*/

use crate::error::{NexStarError, Result};
use crate::mock::SimulatedMount;
use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::info;

/// Default per-read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Default serial baud rate for NexStar hand controllers
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// A byte-oriented connection to the mount
pub trait Link {
    /// Write the whole buffer to the device
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read the next byte, or `None` if nothing arrived before the deadline
    /// or the stream has ended
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_bytes(bytes)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }
}

/// Adapter from a blocking stream with read timeouts to [`Link`]
pub struct StreamLink<S> {
    stream: S,
}

impl<S: Read + Write> StreamLink<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write> Link for StreamLink<S> {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(None)
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Where the mount is reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAddress {
    /// Serial device path such as `/dev/ttyUSB0` or `COM3`
    Serial { path: String, baud_rate: u32 },
    /// Serial-over-TCP bridge, written `tcp://host:port`
    Tcp { addr: String },
    /// In-memory simulated mount, written `sim://`
    Simulated,
}

impl LinkAddress {
    /// Parse a device string, using `baud_rate` for serial paths
    pub fn parse(device: &str, baud_rate: u32) -> Self {
        if let Some(addr) = device.strip_prefix("tcp://") {
            Self::Tcp { addr: addr.to_string() }
        } else if device.starts_with("sim://") {
            Self::Simulated
        } else {
            Self::Serial {
                path: device.to_string(),
                baud_rate,
            }
        }
    }

    /// Open the link with the given per-read timeout.
    ///
    /// Any failure to open is reported as [`NexStarError::DeviceNotFound`].
    pub fn open(&self, read_timeout: Duration) -> Result<Box<dyn Link + Send>> {
        match self {
            Self::Serial { path, baud_rate } => {
                let port = serialport::new(path.as_str(), *baud_rate)
                    .timeout(read_timeout)
                    .open()
                    .map_err(|e| NexStarError::device_not_found(path.as_str(), e))?;
                info!("Opened serial port {} at {} baud", path, baud_rate);
                Ok(Box::new(StreamLink::new(port)))
            }
            Self::Tcp { addr } => {
                let stream = connect_tcp(addr, read_timeout)
                    .map_err(|e| NexStarError::device_not_found(addr.as_str(), e))?;
                info!("Connected to {}", addr);
                Ok(Box::new(StreamLink::new(stream)))
            }
            Self::Simulated => {
                info!("Using simulated mount");
                Ok(Box::new(SimulatedMount::new()))
            }
        }
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { path, baud_rate } => write!(f, "{} @ {} baud", path, baud_rate),
            Self::Tcp { addr } => write!(f, "tcp://{}", addr),
            Self::Simulated => write!(f, "sim://"),
        }
    }
}

fn connect_tcp(addr: &str, read_timeout: Duration) -> io::Result<TcpStream> {
    let socket_addr = addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "address resolved to nothing"))?;
    let stream = TcpStream::connect_timeout(&socket_addr, read_timeout)?;
    stream.set_read_timeout(Some(read_timeout))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}
