//! Error types and numeric error codes.

use thiserror::Error;

/// Errors produced while writing or parsing the device list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The destination buffer cannot hold the next field.
    #[error("Device list buffer too small: field needs {needed} bytes, {available} left")]
    BufferTooSmall { needed: usize, available: usize },

    /// The list does not split into whole (name, path, type) triples.
    #[error("Incomplete device record: {0} trailing field(s)")]
    IncompleteRecord(usize),

    /// The type field is not a number.
    #[error("Invalid delivery system type: {0:?}")]
    InvalidDeliveryType(String),
}

/// Stable numeric code for every failure kind of the tuner library.
///
/// Host bindings report these alongside the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// Operation succeeded.
    Success = 0x0000,
    /// The resource is not open.
    NotOpen = 0x0001,
    /// Auto-discovery found no terrestrial frontend.
    NoDeviceFound = 0x0002,
    /// The requested frontend is not a terrestrial one.
    UnsupportedDeviceType = 0x0003,
    /// Frontend configuration was rejected.
    TuningFailed = 0x0004,
    /// Demultiplexer could not be opened or configured.
    FilterSetupFailed = 0x0005,
    /// The transport stream device could not be opened.
    StreamOpenFailed = 0x0006,
    /// The pre-read buffer could not be allocated.
    AllocationFailed = 0x0007,
    /// Reading the transport stream failed.
    DeviceReadError = 0x0008,
    /// A frontend status query failed.
    StatusReadError = 0x0009,
    /// The device list does not fit the destination.
    BufferTooSmall = 0x000A,
    /// Close was called on a resource that is not open.
    AlreadyClosed = 0x000B,
    /// The registry has no resource under this id.
    InvalidHandle = 0x000C,
    /// Open was called on a resource that is already open.
    AlreadyOpen = 0x000D,
    /// The frontend device could not be opened.
    FrontendOpenFailed = 0x000E,
    /// The frontend capability query failed.
    FrontendInfoFailed = 0x000F,
    /// The frequency does not fit the device parameter.
    InvalidFrequency = 0x0010,
    /// A blocking wait was cancelled.
    Cancelled = 0x0011,
    /// The registry is at capacity.
    RegistryFull = 0x0012,
    /// Unknown error.
    Unknown = 0xFFFF,
}

impl From<u16> for ErrorCode {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => ErrorCode::Success,
            0x0001 => ErrorCode::NotOpen,
            0x0002 => ErrorCode::NoDeviceFound,
            0x0003 => ErrorCode::UnsupportedDeviceType,
            0x0004 => ErrorCode::TuningFailed,
            0x0005 => ErrorCode::FilterSetupFailed,
            0x0006 => ErrorCode::StreamOpenFailed,
            0x0007 => ErrorCode::AllocationFailed,
            0x0008 => ErrorCode::DeviceReadError,
            0x0009 => ErrorCode::StatusReadError,
            0x000A => ErrorCode::BufferTooSmall,
            0x000B => ErrorCode::AlreadyClosed,
            0x000C => ErrorCode::InvalidHandle,
            0x000D => ErrorCode::AlreadyOpen,
            0x000E => ErrorCode::FrontendOpenFailed,
            0x000F => ErrorCode::FrontendInfoFailed,
            0x0010 => ErrorCode::InvalidFrequency,
            0x0011 => ErrorCode::Cancelled,
            0x0012 => ErrorCode::RegistryFull,
            _ => ErrorCode::Unknown,
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(value: ErrorCode) -> Self {
        value as u16
    }
}

impl ErrorCode {
    /// Returns true if this error code indicates success.
    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }
}
