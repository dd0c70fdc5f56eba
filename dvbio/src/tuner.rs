//! Device discovery, tuning and enumeration.
//!
//! Opening a tuner acquires three handles in order: frontend, demux and
//! the DVR stream. Each handle closes itself when dropped, so a failure at
//! any step releases everything acquired before it.

use std::path::{Path, PathBuf};

use dvbio_protocol::{DeliverySystem, DeviceListWriter, DeviceRecord};
use log::{debug, info, warn};

use crate::backend::{Access, DvbBackend, FrontendInfo, FrontendParameters, PesFilter};
use crate::config::DvbConfig;
use crate::error::{Error, Result};

/// The only delivery system that can be opened.
pub const SUPPORTED_DELIVERY: DeliverySystem = DeliverySystem::Terrestrial;

/// The three handles of a tuned adapter.
///
/// Fields drop in declaration order: stream, demux, then frontend.
pub(crate) struct DeviceHandles<B: DvbBackend> {
    pub stream: B::Stream,
    pub demux: B::Demux,
    pub frontend: B::Frontend,
    pub adapter: PathBuf,
    pub info: FrontendInfo,
}

/// Find (or open) a terrestrial frontend, tune it to `frequency` and start
/// routing the full multiplex to the DVR device.
pub(crate) fn open_handles<B: DvbBackend>(
    backend: &B,
    config: &DvbConfig,
    frequency: u64,
    adapter: Option<&Path>,
) -> Result<DeviceHandles<B>> {
    let (adapter, frontend, info) = match adapter {
        Some(path) => open_explicit(backend, path)?,
        None => discover(backend, config)?,
    };

    let params = FrontendParameters::auto(info.delivery, frequency)
        .ok_or(Error::InvalidFrequency(frequency))?;
    backend
        .set_frontend(&frontend, &params)
        .map_err(Error::TuningFailed)?;
    debug!("{} tuned to {}", adapter.display(), params.frequency);

    let demux = backend
        .open_demux(&adapter)
        .map_err(Error::FilterSetupFailed)?;
    backend
        .set_pes_filter(&demux, &PesFilter::full_transport_stream())
        .map_err(Error::FilterSetupFailed)?;
    debug!("{} demux passes all PIDs", adapter.display());

    let stream = backend
        .open_stream(&adapter)
        .map_err(Error::StreamOpenFailed)?;

    Ok(DeviceHandles {
        stream,
        demux,
        frontend,
        adapter,
        info,
    })
}

fn open_explicit<B: DvbBackend>(
    backend: &B,
    adapter: &Path,
) -> Result<(PathBuf, B::Frontend, FrontendInfo)> {
    let frontend = backend
        .open_frontend(adapter, Access::ReadWrite)
        .map_err(|source| Error::FrontendOpenFailed {
            path: adapter.to_path_buf(),
            source,
        })?;
    let info = backend
        .frontend_info(&frontend)
        .map_err(Error::FrontendInfoFailed)?;

    if info.delivery != SUPPORTED_DELIVERY {
        return Err(Error::UnsupportedDeviceType {
            path: adapter.to_path_buf(),
            delivery: info.delivery,
        });
    }

    Ok((adapter.to_path_buf(), frontend, info))
}

/// Probe `adapter0`, `adapter1`, ... and keep the first terrestrial frontend.
///
/// Adapters that cannot be opened or described are skipped; numbering may
/// have gaps and a busy tuner should not end the search.
fn discover<B: DvbBackend>(
    backend: &B,
    config: &DvbConfig,
) -> Result<(PathBuf, B::Frontend, FrontendInfo)> {
    for index in 0..config.max_adapters {
        let adapter = config.adapter_path(index);

        let frontend = match backend.open_frontend(&adapter, Access::ReadWrite) {
            Ok(frontend) => frontend,
            Err(e) => {
                debug!("Skipping {}: {}", adapter.display(), e);
                continue;
            }
        };
        let info = match backend.frontend_info(&frontend) {
            Ok(info) => info,
            Err(e) => {
                warn!("Skipping {}: reading frontend info: {}", adapter.display(), e);
                continue;
            }
        };

        if info.delivery != SUPPORTED_DELIVERY {
            debug!("Skipping {}: {} is {}", adapter.display(), info.name, info.delivery);
            continue;
        }

        info!("Using {} ({})", adapter.display(), info.name);
        return Ok((adapter, frontend, info));
    }

    Err(Error::NoDeviceFound {
        probed: config.max_adapters,
    })
}

/// Read the description of one adapter's frontend.
///
/// `Ok(None)` means the adapter cannot be opened, which ends the list.
fn probe<B: DvbBackend>(backend: &B, adapter: &Path) -> Result<Option<FrontendInfo>> {
    let frontend = match backend.open_frontend(adapter, Access::ReadOnly) {
        Ok(frontend) => frontend,
        Err(e) => {
            debug!("End of adapter list at {}: {}", adapter.display(), e);
            return Ok(None);
        }
    };
    let info = backend
        .frontend_info(&frontend)
        .map_err(Error::FrontendInfoFailed)?;
    Ok(Some(info))
}

/// List all adapters as records.
pub fn enumerate_devices<B: DvbBackend>(backend: &B, config: &DvbConfig) -> Result<Vec<DeviceRecord>> {
    let mut records = Vec::new();
    for index in 0..config.max_adapters {
        let adapter = config.adapter_path(index);
        match probe(backend, &adapter)? {
            Some(info) => records.push(DeviceRecord::new(
                info.name,
                adapter.display().to_string(),
                info.delivery,
            )),
            None => break,
        }
    }
    Ok(records)
}

/// Write the tab-separated device list into `dest` and return its length.
///
/// If a field does not fit, the call fails with [`Error::BufferTooSmall`]
/// and the partial text is wiped.
pub fn list_devices_into<B: DvbBackend>(backend: &B, config: &DvbConfig, dest: &mut [u8]) -> Result<usize> {
    let mut writer = DeviceListWriter::new(dest);

    for index in 0..config.max_adapters {
        let adapter = config.adapter_path(index);
        let info = match probe(backend, &adapter) {
            Ok(Some(info)) => info,
            Ok(None) => break,
            Err(e) => {
                writer.discard();
                return Err(e);
            }
        };

        let record = DeviceRecord::new(info.name, adapter.display().to_string(), info.delivery);
        if let Err(e) = writer.push(&record) {
            writer.discard();
            return Err(Error::BufferTooSmall(e));
        }
    }

    Ok(writer.finish())
}
