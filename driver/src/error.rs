//! Error types for driver operations.

use core::fmt;

/// Result type for driver operations.
pub type DriverResult<T> = core::result::Result<T, DriverError>;

/// Errors surfaced by the driver stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The status register was non-zero at poll time. The only error the
    /// register protocol itself detects; it aborts the whole multi-sector
    /// request. No retry happens at this layer.
    DeviceBusy,

    /// The request is not a plain read or write (or is malformed at the
    /// adapter boundary) and never reaches the protocol core.
    UnsupportedRequest,

    /// The register window could not be claimed at startup. Fatal to driver
    /// initialization, never a per-request condition.
    ResourceUnavailable,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceBusy => write!(f, "device busy"),
            Self::UnsupportedRequest => write!(f, "unsupported request"),
            Self::ResourceUnavailable => write!(f, "register window unavailable"),
        }
    }
}
