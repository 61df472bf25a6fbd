//! Errors reported by board capabilities

use core::fmt;

/// Failure of a radio, flood or pin operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Argument outside what the hardware accepts
    InvalidParameter,
    /// Frame longer than the transceiver buffer
    PayloadTooLong { len: usize, max: usize },
    /// Capability used before it was configured
    NotConfigured,
    /// Operation not supported by this board
    NotSupported,
    /// Transceiver is executing another command
    Busy,
    Timeout,
    /// Transceiver did not respond or reported a fault
    HardwareError,
    /// Driver-specific status code
    VendorError(i32),
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::PayloadTooLong { len, max } => {
                write!(f, "payload of {len} bytes exceeds {max} bytes")
            }
            Self::NotConfigured => write!(f, "not configured"),
            Self::NotSupported => write!(f, "operation not supported"),
            Self::Busy => write!(f, "radio busy"),
            Self::Timeout => write!(f, "operation timeout"),
            Self::HardwareError => write!(f, "hardware error"),
            Self::VendorError(code) => write!(f, "vendor error code: {code}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

#[cfg(feature = "defmt")]
impl defmt::Format for HalError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InvalidParameter => defmt::write!(fmt, "InvalidParameter"),
            Self::PayloadTooLong { len, max } => {
                defmt::write!(fmt, "PayloadTooLong({=usize} > {=usize})", len, max)
            }
            Self::NotConfigured => defmt::write!(fmt, "NotConfigured"),
            Self::NotSupported => defmt::write!(fmt, "NotSupported"),
            Self::Busy => defmt::write!(fmt, "Busy"),
            Self::Timeout => defmt::write!(fmt, "Timeout"),
            Self::HardwareError => defmt::write!(fmt, "HardwareError"),
            Self::VendorError(code) => defmt::write!(fmt, "VendorError({=i32})", code),
        }
    }
}

/// Result of a capability operation
pub type HalResult<T> = Result<T, HalError>;
