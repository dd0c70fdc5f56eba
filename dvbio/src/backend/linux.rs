use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

use log::trace;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use dvbio_protocol::DeliverySystem;

use super::{Access, DvbBackend, FrontendInfo, FrontendParameters, FrontendStatus, Modulation, PesFilter};

const FRONTEND: &str = "frontend0";
const DEMUX: &str = "demux0";
const DVR: &str = "dvr0";

#[allow(dead_code)]
mod ffi {
    use nix::{ioctl_read, ioctl_write_ptr};

    // linux/dvb/frontend.h
    #[repr(C)]
    pub struct DvbFrontendInfo {
        pub name: [u8; 128],
        pub fe_type: u32,
        pub frequency_min: u32,
        pub frequency_max: u32,
        pub frequency_stepsize: u32,
        pub frequency_tolerance: u32,
        pub symbol_rate_min: u32,
        pub symbol_rate_max: u32,
        pub symbol_rate_tolerance: u32,
        pub notifier_delay: u32,
        pub caps: u32,
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct DvbQpskParameters {
        pub symbol_rate: u32,
        pub fec_inner: u32,
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct DvbQamParameters {
        pub symbol_rate: u32,
        pub fec_inner: u32,
        pub modulation: u32,
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct DvbVsbParameters {
        pub modulation: u32,
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct DvbOfdmParameters {
        pub bandwidth: u32,
        pub code_rate_hp: u32,
        pub code_rate_lp: u32,
        pub constellation: u32,
        pub transmission_mode: u32,
        pub guard_interval: u32,
        pub hierarchy_information: u32,
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub union DvbModulationParameters {
        pub qpsk: DvbQpskParameters,
        pub qam: DvbQamParameters,
        pub ofdm: DvbOfdmParameters,
        pub vsb: DvbVsbParameters,
    }

    #[repr(C)]
    pub struct DvbFrontendParameters {
        pub frequency: u32,
        pub inversion: u32,
        pub u: DvbModulationParameters,
    }

    // linux/dvb/dmx.h
    #[repr(C)]
    pub struct DmxPesFilterParams {
        pub pid: u16,
        pub input: u32,
        pub output: u32,
        pub pes_type: u32,
        pub flags: u32,
    }

    ioctl_write_ptr!(dmx_set_pes_filter, b'o', 44, DmxPesFilterParams);
    ioctl_read!(fe_get_info, b'o', 61, DvbFrontendInfo);
    ioctl_read!(fe_read_status, b'o', 69, u32);
    ioctl_read!(fe_read_signal_strength, b'o', 71, u16);
    ioctl_read!(fe_read_snr, b'o', 72, u16);
    ioctl_write_ptr!(fe_set_frontend, b'o', 76, DvbFrontendParameters);
}

/// The Linux DVB API (`/dev/dvb/adapterN/{frontend0,demux0,dvr0}`).
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxDvb;

impl LinuxDvb {
    pub fn new() -> Self {
        LinuxDvb
    }
}

impl From<&FrontendParameters> for ffi::DvbFrontendParameters {
    fn from(params: &FrontendParameters) -> Self {
        // Zeroed so the unused tail of the union is well defined.
        let mut cval: ffi::DvbFrontendParameters = unsafe { std::mem::zeroed() };
        cval.frequency = params.frequency;
        cval.inversion = params.inversion;
        match params.modulation {
            Modulation::Qpsk {
                symbol_rate,
                fec_inner,
            } => {
                cval.u.qpsk = ffi::DvbQpskParameters {
                    symbol_rate,
                    fec_inner,
                }
            }
            Modulation::Qam {
                symbol_rate,
                fec_inner,
                modulation,
            } => {
                cval.u.qam = ffi::DvbQamParameters {
                    symbol_rate,
                    fec_inner,
                    modulation,
                }
            }
            Modulation::Ofdm(ofdm) => {
                cval.u.ofdm = ffi::DvbOfdmParameters {
                    bandwidth: ofdm.bandwidth,
                    code_rate_hp: ofdm.code_rate_hp,
                    code_rate_lp: ofdm.code_rate_lp,
                    constellation: ofdm.constellation,
                    transmission_mode: ofdm.transmission_mode,
                    guard_interval: ofdm.guard_interval,
                    hierarchy_information: ofdm.hierarchy_information,
                }
            }
            Modulation::Vsb { modulation } => cval.u.vsb = ffi::DvbVsbParameters { modulation },
        }
        cval
    }
}

impl DvbBackend for LinuxDvb {
    type Frontend = File;
    type Demux = File;
    type Stream = File;

    fn open_frontend(&self, adapter: &Path, access: Access) -> io::Result<File> {
        let path = adapter.join(FRONTEND);
        trace!("open {} ({:?})", path.display(), access);
        OpenOptions::new()
            .read(true)
            .write(access == Access::ReadWrite)
            .open(path)
    }

    fn frontend_info(&self, frontend: &File) -> io::Result<FrontendInfo> {
        let mut cval: ffi::DvbFrontendInfo = unsafe { std::mem::zeroed() };
        unsafe { ffi::fe_get_info(frontend.as_raw_fd(), &mut cval) }?;

        let name = CStr::from_bytes_until_nul(&cval.name)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&cval.name).into_owned());

        Ok(FrontendInfo {
            name,
            delivery: DeliverySystem::from_raw(cval.fe_type),
            frequency_min: cval.frequency_min,
            frequency_max: cval.frequency_max,
        })
    }

    fn set_frontend(&self, frontend: &File, params: &FrontendParameters) -> io::Result<()> {
        let cval = ffi::DvbFrontendParameters::from(params);
        unsafe { ffi::fe_set_frontend(frontend.as_raw_fd(), &cval) }?;
        Ok(())
    }

    fn read_status(&self, frontend: &File) -> io::Result<FrontendStatus> {
        let mut status = 0u32;
        unsafe { ffi::fe_read_status(frontend.as_raw_fd(), &mut status) }?;
        Ok(FrontendStatus(status))
    }

    fn read_signal_strength(&self, frontend: &File) -> io::Result<u16> {
        let mut strength = 0u16;
        unsafe { ffi::fe_read_signal_strength(frontend.as_raw_fd(), &mut strength) }?;
        Ok(strength)
    }

    fn read_snr(&self, frontend: &File) -> io::Result<u16> {
        let mut snr = 0u16;
        unsafe { ffi::fe_read_snr(frontend.as_raw_fd(), &mut snr) }?;
        Ok(snr)
    }

    fn open_demux(&self, adapter: &Path) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(adapter.join(DEMUX))
    }

    fn set_pes_filter(&self, demux: &File, filter: &PesFilter) -> io::Result<()> {
        let cval = ffi::DmxPesFilterParams {
            pid: filter.pid,
            input: filter.input,
            output: filter.output,
            pes_type: filter.pes_type,
            flags: filter.flags,
        };
        unsafe { ffi::dmx_set_pes_filter(demux.as_raw_fd(), &cval) }?;
        Ok(())
    }

    fn open_stream(&self, adapter: &Path) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .custom_flags(nix::libc::O_NONBLOCK)
            .open(adapter.join(DVR))
    }

    fn read_stream(&self, stream: &mut File, buf: &mut [u8]) -> io::Result<usize> {
        stream.read(buf)
    }

    fn wait_readable(&self, stream: &File, timeout: Duration) -> io::Result<bool> {
        let mut fds = [PollFd::new(
            stream.as_fd(),
            PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP,
        )];
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);

        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(ready) => Ok(ready > 0),
            // A signal is not readiness; the caller simply waits again.
            Err(Errno::EINTR) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
