//! Error type of the tuner library.

use std::io;
use std::path::PathBuf;

use dvbio_protocol::{DeliverySystem, ErrorCode, ProtocolError};
use thiserror::Error;

use crate::registry::ResourceId;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while tuning or reading.
///
/// Every variant maps to a stable [`ErrorCode`]; variants wrapping an OS
/// failure also expose its error number through [`Error::os_code`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Resource not open")]
    NotOpen,

    #[error("Resource already open")]
    AlreadyOpen,

    #[error("No open device (already closed?)")]
    AlreadyClosed,

    #[error("No DVB-T frontend found among {probed} adapter(s)")]
    NoDeviceFound { probed: usize },

    #[error("Device is not a DVB-T frontend: {} is {delivery}", path.display())]
    UnsupportedDeviceType {
        path: PathBuf,
        delivery: DeliverySystem,
    },

    #[error("Opening frontend of {}: {source}", path.display())]
    FrontendOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Reading frontend info: {0}")]
    FrontendInfoFailed(#[source] io::Error),

    #[error("Frequency {0} does not fit the frontend parameters")]
    InvalidFrequency(u64),

    #[error("Tuning: {0}")]
    TuningFailed(#[source] io::Error),

    #[error("Setting up PES filter: {0}")]
    FilterSetupFailed(#[source] io::Error),

    #[error("Opening DVR: {0}")]
    StreamOpenFailed(#[source] io::Error),

    #[error("Allocating pre-read buffer of {0} bytes")]
    AllocationFailed(usize),

    #[error("Reading from device: {0}")]
    DeviceReadError(#[source] io::Error),

    #[error("Reading status: {0}")]
    StatusReadError(#[source] io::Error),

    #[error("Device enum buffer too small: {0}")]
    BufferTooSmall(#[source] ProtocolError),

    #[error("Invalid resource handle {0}")]
    InvalidHandle(ResourceId),

    #[error("Resource registry full ({0} entries)")]
    RegistryFull(usize),

    #[error("Blocking read cancelled")]
    Cancelled,
}

impl Error {
    /// Numeric code reported to host bindings.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotOpen => ErrorCode::NotOpen,
            Error::AlreadyOpen => ErrorCode::AlreadyOpen,
            Error::AlreadyClosed => ErrorCode::AlreadyClosed,
            Error::NoDeviceFound { .. } => ErrorCode::NoDeviceFound,
            Error::UnsupportedDeviceType { .. } => ErrorCode::UnsupportedDeviceType,
            Error::FrontendOpenFailed { .. } => ErrorCode::FrontendOpenFailed,
            Error::FrontendInfoFailed(_) => ErrorCode::FrontendInfoFailed,
            Error::InvalidFrequency(_) => ErrorCode::InvalidFrequency,
            Error::TuningFailed(_) => ErrorCode::TuningFailed,
            Error::FilterSetupFailed(_) => ErrorCode::FilterSetupFailed,
            Error::StreamOpenFailed(_) => ErrorCode::StreamOpenFailed,
            Error::AllocationFailed(_) => ErrorCode::AllocationFailed,
            Error::DeviceReadError(_) => ErrorCode::DeviceReadError,
            Error::StatusReadError(_) => ErrorCode::StatusReadError,
            Error::BufferTooSmall(_) => ErrorCode::BufferTooSmall,
            Error::InvalidHandle(_) => ErrorCode::InvalidHandle,
            Error::RegistryFull(_) => ErrorCode::RegistryFull,
            Error::Cancelled => ErrorCode::Cancelled,
        }
    }

    /// Underlying OS error number, if the failure came from a device call.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Error::FrontendOpenFailed { source, .. } => source.raw_os_error(),
            Error::FrontendInfoFailed(e)
            | Error::TuningFailed(e)
            | Error::FilterSetupFailed(e)
            | Error::StreamOpenFailed(e)
            | Error::DeviceReadError(e)
            | Error::StatusReadError(e) => e.raw_os_error(),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::DeviceReadError(e) => e,
            Error::NotOpen => io::Error::new(io::ErrorKind::NotConnected, err),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
