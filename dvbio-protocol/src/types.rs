//! Device description types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Size of a single MPEG-2 transport stream packet.
pub const TS_PACKET_SIZE: usize = 188;

/// Separator between fields and between records of the device list.
pub const FIELD_SEPARATOR: char = '\t';

/// Broadcast technology family a frontend demodulates.
///
/// The numeric values are the kernel's frontend type numbers, which are also
/// the type digits written into the device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliverySystem {
    /// DVB-S (QPSK).
    Satellite,
    /// DVB-C (QAM).
    Cable,
    /// DVB-T (OFDM).
    Terrestrial,
    /// ATSC (VSB).
    Atsc,
    /// A type number this crate does not know about.
    Unknown(u32),
}

impl DeliverySystem {
    /// Classify a kernel frontend type number.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => DeliverySystem::Satellite,
            1 => DeliverySystem::Cable,
            2 => DeliverySystem::Terrestrial,
            3 => DeliverySystem::Atsc,
            other => DeliverySystem::Unknown(other),
        }
    }

    /// Kernel frontend type number.
    pub fn raw(self) -> u32 {
        match self {
            DeliverySystem::Satellite => 0,
            DeliverySystem::Cable => 1,
            DeliverySystem::Terrestrial => 2,
            DeliverySystem::Atsc => 3,
            DeliverySystem::Unknown(other) => other,
        }
    }

    /// Satellite frontends take their frequency in kHz instead of Hz.
    pub fn uses_khz(self) -> bool {
        self == DeliverySystem::Satellite
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeliverySystem::Satellite => "DVB-S",
            DeliverySystem::Cable => "DVB-C",
            DeliverySystem::Terrestrial => "DVB-T",
            DeliverySystem::Atsc => "ATSC",
            DeliverySystem::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for DeliverySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliverySystem::Unknown(raw) => write!(f, "unknown ({})", raw),
            other => f.write_str(other.name()),
        }
    }
}

/// One entry of the device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Name reported by the frontend driver.
    pub name: String,
    /// Adapter root directory, e.g. `/dev/dvb/adapter0`.
    pub path: String,
    pub delivery: DeliverySystem,
}

impl DeviceRecord {
    pub fn new(name: impl Into<String>, path: impl Into<String>, delivery: DeliverySystem) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            delivery,
        }
    }

    /// Whether this device can be opened for reception.
    pub fn is_terrestrial(&self) -> bool {
        self.delivery == DeliverySystem::Terrestrial
    }
}
