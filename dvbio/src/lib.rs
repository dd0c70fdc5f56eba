//! dvbio library - DVB-T tuner access on Linux
//!
//! This library opens a terrestrial frontend through the Linux DVB API,
//! routes the full multiplex to the DVR device and reads it through a
//! fixed-size pre-read buffer, so callers can ask how many bytes are ready
//! without blocking.

pub mod backend;
pub mod buffer;
pub mod config;
pub mod error;
pub mod registry;
pub mod resource;
pub mod tuner;

// Re-export commonly used types
pub use backend::{DvbBackend, FrontendInfo, FrontendStatus, LinuxDvb};
pub use buffer::{PreReadBuffer, BUFFER_CAPACITY};
pub use config::DvbConfig;
pub use dvbio_protocol::{DeliverySystem, DeviceRecord, ErrorCode};
pub use error::{Error, Result};
pub use registry::{Registry, ResourceId, REGISTRY_CAPACITY};
pub use resource::{ReadCanceller, Resource};
pub use tuner::{enumerate_devices, list_devices_into};
