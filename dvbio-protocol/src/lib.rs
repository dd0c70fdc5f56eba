//! Shared definitions for the dvbio tuner library.
//!
//! This crate holds the pieces that both the tuner library and its consumers
//! (command-line tools, host language bindings) need to agree on:
//!
//! - [`DeliverySystem`] / [`DeviceRecord`]: what a frontend is and where it lives
//! - [`codec`]: the tab-separated device list text format
//! - [`ErrorCode`]: stable numeric codes for every failure kind
//!
//! # Device list format
//!
//! ```text
//! <name> TAB <adapter path> TAB <type digit> [TAB <name> TAB ...]
//! ```
//!
//! The list is a flat token stream, not newline delimited. Consumers split on
//! tabs and group the tokens in triples.
//!
//! ```rust
//! use dvbio_protocol::{encode_device_list, parse_device_list, DeliverySystem, DeviceRecord};
//!
//! let records = vec![
//!     DeviceRecord::new("Afatech AF9013", "/dev/dvb/adapter0", DeliverySystem::Terrestrial),
//!     DeviceRecord::new("STV0299 DVB-S", "/dev/dvb/adapter1", DeliverySystem::Satellite),
//! ];
//!
//! let text = encode_device_list(&records);
//! assert_eq!(
//!     text,
//!     "Afatech AF9013\t/dev/dvb/adapter0\t2\tSTV0299 DVB-S\t/dev/dvb/adapter1\t0"
//! );
//!
//! let decoded = parse_device_list(&text).unwrap();
//! assert_eq!(decoded, records);
//! ```

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{encode_device_list, parse_device_list, DeviceListWriter};
pub use error::{ErrorCode, ProtocolError};
pub use types::{DeliverySystem, DeviceRecord, FIELD_SEPARATOR, TS_PACKET_SIZE};
