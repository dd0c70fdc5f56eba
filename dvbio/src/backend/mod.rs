//! Access to the kernel's broadcast device nodes.
//!
//! Every adapter directory (`/dev/dvb/adapterN`) exposes three character
//! devices that the tuner needs:
//! - `frontend0`: the tuner/demodulator, configured and queried with ioctls
//! - `demux0`: selects which packet identifiers reach the output
//! - `dvr0`: the transport stream tap the data is read from
//!
//! [`DvbBackend`] is the seam between the tuning logic and the operating
//! system. Handles are owning values; dropping one closes the device.

use std::io;
use std::path::Path;
use std::time::Duration;

use dvbio_protocol::DeliverySystem;

#[cfg(target_os = "linux")]
pub use self::linux::LinuxDvb;
#[cfg(not(target_os = "linux"))]
pub use self::unsupported::LinuxDvb;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod unsupported;

#[cfg(test)]
pub(crate) mod fake;

/// Packet identifier that makes the demultiplexer pass every packet.
pub const PID_ALL: u16 = 0x2000;

/// Kernel enum values used by the frontend and demux parameter blocks.
pub mod consts {
    pub const INVERSION_AUTO: u32 = 2;
    pub const FEC_AUTO: u32 = 9;
    pub const QAM_AUTO: u32 = 6;
    pub const BANDWIDTH_AUTO: u32 = 3;
    pub const TRANSMISSION_MODE_AUTO: u32 = 2;
    pub const GUARD_INTERVAL_AUTO: u32 = 4;
    pub const HIERARCHY_AUTO: u32 = 4;

    pub const DMX_IN_FRONTEND: u32 = 0;
    pub const DMX_OUT_TS_TAP: u32 = 2;
    pub const DMX_PES_OTHER: u32 = 20;
    pub const DMX_IMMEDIATE_START: u32 = 4;

    pub const FE_HAS_SIGNAL: u32 = 0x01;
    pub const FE_HAS_CARRIER: u32 = 0x02;
    pub const FE_HAS_VITERBI: u32 = 0x04;
    pub const FE_HAS_SYNC: u32 = 0x08;
    pub const FE_HAS_LOCK: u32 = 0x10;
    pub const FE_TIMEDOUT: u32 = 0x20;
}

/// How a frontend is opened.
///
/// Tuning needs write access; reading the device description does not, and
/// a read-only open also succeeds while another process holds the tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Description returned by a frontend's capability query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendInfo {
    pub name: String,
    pub delivery: DeliverySystem,
    pub frequency_min: u32,
    pub frequency_max: u32,
}

/// Frontend status bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrontendStatus(pub u32);

impl FrontendStatus {
    /// Something above the noise level was found.
    pub fn has_signal(self) -> bool {
        self.0 & consts::FE_HAS_SIGNAL != 0
    }

    pub fn has_carrier(self) -> bool {
        self.0 & consts::FE_HAS_CARRIER != 0
    }

    pub fn has_viterbi(self) -> bool {
        self.0 & consts::FE_HAS_VITERBI != 0
    }

    pub fn has_sync(self) -> bool {
        self.0 & consts::FE_HAS_SYNC != 0
    }

    /// Everything is working.
    pub fn has_lock(self) -> bool {
        self.0 & consts::FE_HAS_LOCK != 0
    }

    pub fn timed_out(self) -> bool {
        self.0 & consts::FE_TIMEDOUT != 0
    }
}

/// Terrestrial (OFDM) modulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfdmParameters {
    pub bandwidth: u32,
    pub code_rate_hp: u32,
    pub code_rate_lp: u32,
    pub constellation: u32,
    pub transmission_mode: u32,
    pub guard_interval: u32,
    pub hierarchy_information: u32,
}

impl OfdmParameters {
    /// Let the demodulator detect everything.
    pub fn auto() -> Self {
        Self {
            bandwidth: consts::BANDWIDTH_AUTO,
            code_rate_hp: consts::FEC_AUTO,
            code_rate_lp: consts::FEC_AUTO,
            constellation: consts::QAM_AUTO,
            transmission_mode: consts::TRANSMISSION_MODE_AUTO,
            guard_interval: consts::GUARD_INTERVAL_AUTO,
            hierarchy_information: consts::HIERARCHY_AUTO,
        }
    }
}

/// Delivery-system specific part of the frontend parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    Qpsk { symbol_rate: u32, fec_inner: u32 },
    Qam { symbol_rate: u32, fec_inner: u32, modulation: u32 },
    Ofdm(OfdmParameters),
    Vsb { modulation: u32 },
}

/// Parameters applied by a single frontend configuration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontendParameters {
    /// Hz, or kHz for satellite frontends.
    pub frequency: u32,
    pub inversion: u32,
    pub modulation: Modulation,
}

impl FrontendParameters {
    /// Build an "auto everything" parameter block for `delivery`.
    ///
    /// Returns `None` if the frequency does not fit the 32-bit device field
    /// after unit adjustment.
    pub fn auto(delivery: DeliverySystem, frequency_hz: u64) -> Option<Self> {
        let frequency = if delivery.uses_khz() {
            frequency_hz / 1000
        } else {
            frequency_hz
        };
        let frequency = u32::try_from(frequency).ok()?;

        let modulation = match delivery {
            DeliverySystem::Satellite => Modulation::Qpsk {
                symbol_rate: 0,
                fec_inner: consts::FEC_AUTO,
            },
            DeliverySystem::Cable => Modulation::Qam {
                symbol_rate: 0,
                fec_inner: consts::FEC_AUTO,
                modulation: consts::QAM_AUTO,
            },
            DeliverySystem::Terrestrial => Modulation::Ofdm(OfdmParameters::auto()),
            DeliverySystem::Atsc | DeliverySystem::Unknown(_) => Modulation::Vsb {
                modulation: consts::QAM_AUTO,
            },
        };

        Some(Self {
            frequency,
            inversion: consts::INVERSION_AUTO,
            modulation,
        })
    }
}

/// Demultiplexer filter description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PesFilter {
    pub pid: u16,
    pub input: u32,
    pub output: u32,
    pub pes_type: u32,
    pub flags: u32,
}

impl PesFilter {
    /// Route every packet from the frontend to the DVR device, starting now.
    pub fn full_transport_stream() -> Self {
        Self {
            pid: PID_ALL,
            input: consts::DMX_IN_FRONTEND,
            output: consts::DMX_OUT_TS_TAP,
            pes_type: consts::DMX_PES_OTHER,
            flags: consts::DMX_IMMEDIATE_START,
        }
    }
}

/// Operating system primitives the tuner is built on.
///
/// `adapter` arguments are adapter root directories such as
/// `/dev/dvb/adapter0`; the backend knows the sub-device names.
pub trait DvbBackend {
    type Frontend;
    type Demux;
    type Stream;

    fn open_frontend(&self, adapter: &Path, access: Access) -> io::Result<Self::Frontend>;

    fn frontend_info(&self, frontend: &Self::Frontend) -> io::Result<FrontendInfo>;

    /// Apply tuning parameters. Blocks until the driver accepted them.
    fn set_frontend(&self, frontend: &Self::Frontend, params: &FrontendParameters) -> io::Result<()>;

    fn read_status(&self, frontend: &Self::Frontend) -> io::Result<FrontendStatus>;

    fn read_signal_strength(&self, frontend: &Self::Frontend) -> io::Result<u16>;

    fn read_snr(&self, frontend: &Self::Frontend) -> io::Result<u16>;

    fn open_demux(&self, adapter: &Path) -> io::Result<Self::Demux>;

    fn set_pes_filter(&self, demux: &Self::Demux, filter: &PesFilter) -> io::Result<()>;

    /// Open the transport stream tap read-only and non-blocking.
    fn open_stream(&self, adapter: &Path) -> io::Result<Self::Stream>;

    /// Non-blocking read. "No data yet" is reported as
    /// [`io::ErrorKind::WouldBlock`], end of stream as `Ok(0)`.
    fn read_stream(&self, stream: &mut Self::Stream, buf: &mut [u8]) -> io::Result<usize>;

    /// Wait until the stream is readable, has an error or hung up.
    ///
    /// Returns `false` if `timeout` elapsed first.
    fn wait_readable(&self, stream: &Self::Stream, timeout: Duration) -> io::Result<bool>;
}
