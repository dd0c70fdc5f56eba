use std::convert::Infallible;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::Duration;

use super::{Access, DvbBackend, FrontendInfo, FrontendParameters, FrontendStatus, PesFilter};

const UNSUPPORTED_MSG: &str = "DVB device access is not supported on this platform (supported: Linux)";

fn unsupported<T>() -> io::Result<T> {
    Err(io::Error::new(ErrorKind::Unsupported, UNSUPPORTED_MSG))
}

/// Placeholder for platforms without the Linux DVB API. Nothing can be opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxDvb;

impl LinuxDvb {
    pub fn new() -> Self {
        LinuxDvb
    }
}

impl DvbBackend for LinuxDvb {
    type Frontend = Infallible;
    type Demux = Infallible;
    type Stream = Infallible;

    fn open_frontend(&self, _adapter: &Path, _access: Access) -> io::Result<Infallible> {
        unsupported()
    }

    fn frontend_info(&self, frontend: &Infallible) -> io::Result<FrontendInfo> {
        match *frontend {}
    }

    fn set_frontend(&self, frontend: &Infallible, _params: &FrontendParameters) -> io::Result<()> {
        match *frontend {}
    }

    fn read_status(&self, frontend: &Infallible) -> io::Result<FrontendStatus> {
        match *frontend {}
    }

    fn read_signal_strength(&self, frontend: &Infallible) -> io::Result<u16> {
        match *frontend {}
    }

    fn read_snr(&self, frontend: &Infallible) -> io::Result<u16> {
        match *frontend {}
    }

    fn open_demux(&self, _adapter: &Path) -> io::Result<Infallible> {
        unsupported()
    }

    fn set_pes_filter(&self, demux: &Infallible, _filter: &PesFilter) -> io::Result<()> {
        match *demux {}
    }

    fn open_stream(&self, _adapter: &Path) -> io::Result<Infallible> {
        unsupported()
    }

    fn read_stream(&self, stream: &mut Infallible, _buf: &mut [u8]) -> io::Result<usize> {
        match *stream {}
    }

    fn wait_readable(&self, stream: &Infallible, _timeout: Duration) -> io::Result<bool> {
        match *stream {}
    }
}
