//! One tunable reception unit.
//!
//! A [`Resource`] is `Unopened` until [`open`](Resource::open) acquires the
//! frontend, demux and DVR handles, `Opened` while it owns them and
//! `Closed` after [`close`](Resource::close). The pre-read buffer only
//! exists while the resource is open.

use std::io;
use std::mem;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, trace, warn};

use crate::backend::{DvbBackend, FrontendInfo, FrontendStatus, LinuxDvb};
use crate::buffer::{is_no_progress, PreReadBuffer, BUFFER_CAPACITY};
use crate::config::DvbConfig;
use crate::error::{Error, Result};
use crate::tuner::{self, DeviceHandles};

/// Cancels a blocked [`Resource::read`] from another thread.
///
/// Once cancelled, every read that has to wait fails with
/// [`Error::Cancelled`] until the resource is opened again.
#[derive(Debug, Clone, Default)]
pub struct ReadCanceller(Arc<AtomicBool>);

impl ReadCanceller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum State<B: DvbBackend> {
    Unopened,
    Opened(DeviceHandles<B>),
    Closed,
}

/// A DVB-T tuner with a pre-read buffer in front of its DVR device.
///
/// Not internally synchronized: callers sharing a resource must serialize
/// access themselves. Only [`ReadCanceller`] is meant to cross threads.
pub struct Resource<B: DvbBackend = LinuxDvb> {
    backend: B,
    config: DvbConfig,
    state: State<B>,
    buffer: Option<PreReadBuffer>,
    canceller: ReadCanceller,
}

/// Rescale a raw 16-bit frontend metric to 0..=100, truncating.
fn percent(raw: u16) -> u32 {
    raw as u32 * 100 / 65535
}

impl<B: DvbBackend> Resource<B> {
    pub fn new(backend: B, config: DvbConfig) -> Self {
        Self {
            backend,
            config,
            state: State::Unopened,
            buffer: None,
            canceller: ReadCanceller::new(),
        }
    }

    /// Tune to `frequency` (Hz) on `adapter`, or on the first terrestrial
    /// adapter found when `adapter` is `None`.
    ///
    /// On failure the resource is left exactly as it was.
    pub fn open(&mut self, frequency: u64, adapter: Option<&Path>) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let handles = tuner::open_handles(&self.backend, &self.config, frequency, adapter)?;
        info!(
            "Opened {} ({}) at {} Hz",
            handles.adapter.display(),
            handles.info.name,
            frequency
        );

        self.state = State::Opened(handles);
        self.buffer = None;
        self.canceller.reset();
        Ok(())
    }

    /// Release all handles and the pre-read buffer.
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Opened(handles) => {
                info!("Closing {}", handles.adapter.display());
                drop(handles);
                self.buffer = None;
                Ok(())
            }
            previous => {
                self.state = previous;
                Err(Error::AlreadyClosed)
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Opened(_))
    }

    /// Adapter directory of the open device.
    pub fn adapter(&self) -> Option<&Path> {
        match &self.state {
            State::Opened(handles) => Some(&handles.adapter),
            _ => None,
        }
    }

    /// Description of the open frontend.
    pub fn frontend_info(&self) -> Option<&FrontendInfo> {
        match &self.state {
            State::Opened(handles) => Some(&handles.info),
            _ => None,
        }
    }

    pub fn canceller(&self) -> ReadCanceller {
        self.canceller.clone()
    }

    fn handles(&self) -> Result<&DeviceHandles<B>> {
        match &self.state {
            State::Opened(handles) => Ok(handles),
            _ => Err(Error::NotOpen),
        }
    }

    /// Number of bytes the next [`read`](Self::read) can return without
    /// blocking.
    ///
    /// Pulls whatever the DVR device has ready into the pre-read buffer
    /// first. The count never decreases between reads.
    pub fn available(&mut self) -> Result<usize> {
        let handles = match &mut self.state {
            State::Opened(handles) => handles,
            _ => return Err(Error::NotOpen),
        };

        let buffer = match self.buffer.take() {
            Some(buffer) => buffer,
            None => PreReadBuffer::allocate().map_err(|_| Error::AllocationFailed(BUFFER_CAPACITY))?,
        };
        let buffer = self.buffer.insert(buffer);

        let backend = &self.backend;
        let stream = &mut handles.stream;
        let added = buffer
            .fill_from(|dest| backend.read_stream(stream, dest))
            .map_err(Error::DeviceReadError)?;
        if added > 0 {
            trace!("Pre-read {} byte(s), {} buffered", added, buffer.len());
        }

        Ok(buffer.len())
    }

    /// Read up to `dest.len()` bytes.
    ///
    /// Buffered bytes are handed out first. If nothing was buffered the
    /// call waits for the device, then issues one device read for the
    /// rest; a short result is not an error. A failed call consumes
    /// nothing.
    pub fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        let handles = match &mut self.state {
            State::Opened(handles) => handles,
            _ => return Err(Error::NotOpen),
        };
        if dest.is_empty() {
            return Ok(0);
        }

        let drained = match &mut self.buffer {
            Some(buffer) => buffer.drain_into(dest),
            None => 0,
        };
        if drained == dest.len() {
            return Ok(drained);
        }

        if drained == 0 {
            loop {
                if self.canceller.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let ready = self
                    .backend
                    .wait_readable(&handles.stream, self.config.wait_slice)
                    .map_err(Error::DeviceReadError)?;
                if ready {
                    break;
                }
            }
        }

        match self.backend.read_stream(&mut handles.stream, &mut dest[drained..]) {
            Ok(n) => Ok(drained + n),
            Err(e) if is_no_progress(&e) => Ok(drained),
            Err(e) => {
                if let Some(buffer) = &mut self.buffer {
                    buffer.unconsume(drained);
                }
                Err(Error::DeviceReadError(e))
            }
        }
    }

    fn status(&self) -> Result<FrontendStatus> {
        let handles = self.handles()?;
        self.backend
            .read_status(&handles.frontend)
            .map_err(Error::StatusReadError)
    }

    pub fn signal_present(&self) -> Result<bool> {
        Ok(self.status()?.has_signal())
    }

    pub fn signal_locked(&self) -> Result<bool> {
        Ok(self.status()?.has_lock())
    }

    /// Signal strength, 0 to 100.
    pub fn signal_strength(&self) -> Result<u32> {
        let handles = self.handles()?;
        let raw = self
            .backend
            .read_signal_strength(&handles.frontend)
            .map_err(Error::StatusReadError)?;
        Ok(percent(raw))
    }

    /// Signal quality (SNR), 0 to 100.
    pub fn signal_quality(&self) -> Result<u32> {
        let handles = self.handles()?;
        let raw = self
            .backend
            .read_snr(&handles.frontend)
            .map_err(Error::StatusReadError)?;
        Ok(percent(raw))
    }
}

impl<B: DvbBackend> io::Read for Resource<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Resource::read(self, buf).map_err(io::Error::from)
    }
}

impl<B: DvbBackend> Drop for Resource<B> {
    fn drop(&mut self) {
        if let State::Opened(handles) = &self.state {
            warn!("{} dropped while open, closing", handles.adapter.display());
        }
    }
}
