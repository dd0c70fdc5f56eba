//! In-memory backend for tests.
//!
//! Adapters are registered by path, every opened handle is tracked until it
//! is dropped, and the stream device serves bytes queued with
//! [`FakeDvb::push_stream`].

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dvbio_protocol::DeliverySystem;

use super::{Access, DvbBackend, FrontendInfo, FrontendParameters, FrontendStatus, PesFilter};

const EBUSY: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Frontend,
    Demux,
    Stream,
}

struct FakeAdapter {
    name: String,
    delivery: DeliverySystem,
}

#[derive(Default)]
pub struct FakeState {
    adapters: BTreeMap<PathBuf, FakeAdapter>,
    open: BTreeMap<u64, (PathBuf, HandleKind)>,
    next_id: u64,

    /// Bytes the stream device will hand out, in order.
    pub pending: VecDeque<u8>,
    /// Upper bound on bytes returned by a single stream read.
    pub max_chunk: Option<usize>,
    /// Report end of stream once `pending` is empty.
    pub eof: bool,
    /// Fail the next stream read with this OS error.
    pub read_error: Option<i32>,
    /// Fail the stream read numbered `.0` (counting from 1) with OS error `.1`.
    pub read_error_at: Option<(usize, i32)>,
    /// Readiness reported by `wait_readable`; `None` means "ready iff data".
    pub ready: Option<bool>,

    pub busy: Vec<PathBuf>,
    pub info_fails: Vec<PathBuf>,
    pub fail_tune: bool,
    pub fail_demux_open: bool,
    pub fail_filter: bool,
    pub fail_stream_open: bool,
    pub fail_status: bool,

    pub status: u32,
    pub strength: u16,
    pub snr: u16,

    pub tuned: Option<FrontendParameters>,
    pub filter: Option<PesFilter>,
    pub stream_reads: usize,
    pub waits: usize,
}

#[derive(Clone, Default)]
pub struct FakeDvb {
    state: Arc<Mutex<FakeState>>,
}

pub struct FakeHandle {
    id: u64,
    state: Arc<Mutex<FakeState>>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.open.remove(&self.id);
        }
    }
}

impl FakeDvb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_adapter(&self, path: impl Into<PathBuf>, name: &str, delivery: DeliverySystem) {
        self.state().adapters.insert(
            path.into(),
            FakeAdapter {
                name: name.to_string(),
                delivery,
            },
        );
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn push_stream(&self, bytes: &[u8]) {
        self.state().pending.extend(bytes.iter().copied());
    }

    /// Number of handles that have been opened and not yet dropped.
    pub fn open_handles(&self) -> usize {
        self.state().open.len()
    }

    pub fn open_kinds(&self) -> Vec<HandleKind> {
        self.state().open.values().map(|(_, kind)| *kind).collect()
    }

    fn open(&self, adapter: &Path, kind: HandleKind) -> io::Result<FakeHandle> {
        let mut state = self.state();
        if !state.adapters.contains_key(adapter) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", adapter.display()),
            ));
        }
        if kind == HandleKind::Frontend && state.busy.iter().any(|p| p == adapter) {
            return Err(io::Error::from_raw_os_error(EBUSY));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.open.insert(id, (adapter.to_path_buf(), kind));
        Ok(FakeHandle {
            id,
            state: Arc::clone(&self.state),
        })
    }

    fn adapter_of(&self, handle: &FakeHandle) -> PathBuf {
        self.state().open[&handle.id].0.clone()
    }
}

fn injected() -> io::Error {
    io::Error::from_raw_os_error(5)
}

impl DvbBackend for FakeDvb {
    type Frontend = FakeHandle;
    type Demux = FakeHandle;
    type Stream = FakeHandle;

    fn open_frontend(&self, adapter: &Path, _access: Access) -> io::Result<FakeHandle> {
        self.open(adapter, HandleKind::Frontend)
    }

    fn frontend_info(&self, frontend: &FakeHandle) -> io::Result<FrontendInfo> {
        let path = self.adapter_of(frontend);
        let state = self.state();
        if state.info_fails.contains(&path) {
            return Err(injected());
        }
        let adapter = &state.adapters[&path];
        Ok(FrontendInfo {
            name: adapter.name.clone(),
            delivery: adapter.delivery,
            frequency_min: 174_000_000,
            frequency_max: 862_000_000,
        })
    }

    fn set_frontend(&self, _frontend: &FakeHandle, params: &FrontendParameters) -> io::Result<()> {
        let mut state = self.state();
        if state.fail_tune {
            return Err(injected());
        }
        state.tuned = Some(*params);
        Ok(())
    }

    fn read_status(&self, _frontend: &FakeHandle) -> io::Result<FrontendStatus> {
        let state = self.state();
        if state.fail_status {
            return Err(injected());
        }
        Ok(FrontendStatus(state.status))
    }

    fn read_signal_strength(&self, _frontend: &FakeHandle) -> io::Result<u16> {
        let state = self.state();
        if state.fail_status {
            return Err(injected());
        }
        Ok(state.strength)
    }

    fn read_snr(&self, _frontend: &FakeHandle) -> io::Result<u16> {
        let state = self.state();
        if state.fail_status {
            return Err(injected());
        }
        Ok(state.snr)
    }

    fn open_demux(&self, adapter: &Path) -> io::Result<FakeHandle> {
        if self.state().fail_demux_open {
            return Err(injected());
        }
        self.open(adapter, HandleKind::Demux)
    }

    fn set_pes_filter(&self, _demux: &FakeHandle, filter: &PesFilter) -> io::Result<()> {
        let mut state = self.state();
        if state.fail_filter {
            return Err(injected());
        }
        state.filter = Some(*filter);
        Ok(())
    }

    fn open_stream(&self, adapter: &Path) -> io::Result<FakeHandle> {
        if self.state().fail_stream_open {
            return Err(injected());
        }
        self.open(adapter, HandleKind::Stream)
    }

    fn read_stream(&self, _stream: &mut FakeHandle, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        state.stream_reads += 1;
        if let Some(code) = state.read_error.take() {
            return Err(io::Error::from_raw_os_error(code));
        }
        if let Some((at, code)) = state.read_error_at {
            if state.stream_reads == at {
                return Err(io::Error::from_raw_os_error(code));
            }
        }
        if state.pending.is_empty() {
            if state.eof {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let limit = state.max_chunk.unwrap_or(usize::MAX);
        let n = buf.len().min(state.pending.len()).min(limit);
        for (dst, src) in buf[..n].iter_mut().zip(state.pending.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn wait_readable(&self, _stream: &FakeHandle, timeout: Duration) -> io::Result<bool> {
        let ready = {
            let mut state = self.state();
            state.waits += 1;
            state
                .ready
                .unwrap_or(!state.pending.is_empty() || state.eof || state.read_error.is_some())
        };
        if !ready {
            std::thread::sleep(timeout.min(Duration::from_millis(5)));
        }
        Ok(ready)
    }
}
