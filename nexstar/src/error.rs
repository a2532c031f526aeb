/*!
Error types for the NexStar protocol client.
*/

use thiserror::Error;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, NexStarError>;

/// Every failure the client can surface to its caller
#[derive(Error, Debug)]
pub enum NexStarError {
    /// The link to the mount could not be opened
    #[error("Device not found at {address}: {reason}")]
    DeviceNotFound { address: String, reason: String },

    /// Data stopped arriving before the `#` terminator was seen
    #[error("Incomplete response to '{command}': {received} bytes before timeout")]
    IncompleteResponse { command: char, received: usize },

    /// The reply length matches none of the documented formats
    #[error("Unexpected response length for '{command}': got {length} bytes, expected {expected:?}")]
    UnexpectedResponseLength {
        command: char,
        length: usize,
        expected: &'static [usize],
    },

    /// Time fields do not form a valid calendar date/time
    #[error("Invalid time encoding: {raw:?}")]
    InvalidTimeEncoding { raw: [u8; 8] },

    /// A fixed-point field is not valid ASCII hex
    #[error("Invalid hex field: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A value cannot be represented on the wire
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Star catalog could not be loaded
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// I/O errors on the underlying link
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NexStarError {
    /// Create a device-not-found error for the given address
    pub fn device_not_found(address: impl Into<String>, reason: impl ToString) -> Self {
        Self::DeviceNotFound {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an out-of-range error
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// True for failures where the exchange itself went wrong and a caller
    /// may reasonably poll again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::IncompleteResponse { .. }
                | Self::UnexpectedResponseLength { .. }
                | Self::InvalidHex(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_carries_address() {
        let err = NexStarError::device_not_found("/dev/ttyUSB9", "No such file or directory");
        let msg = err.to_string();
        assert!(msg.contains("/dev/ttyUSB9"));
        assert!(msg.contains("No such file"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        let err = NexStarError::IncompleteResponse { command: 'e', received: 3 };
        assert!(err.is_transient());

        let err = NexStarError::InvalidTimeEncoding { raw: [0; 8] };
        assert!(!err.is_transient());
    }
}
