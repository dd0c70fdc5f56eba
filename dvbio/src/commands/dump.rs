//! `dvbio dump`

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use dvbio::{DvbBackend, Error, LinuxDvb, Resource};

use super::CommandResult;
use crate::settings::Settings;

/// Read size: a whole number of TS packets.
const CHUNK_SIZE: usize = 188 * 256;

/// Consecutive empty reads treated as end of stream.
const MAX_EMPTY_READS: usize = 16;

pub(crate) fn run(
    settings: &Settings,
    frequency: u64,
    adapter: Option<&Path>,
    limit: Option<u64>,
    wait: Duration,
    output: &str,
) -> CommandResult {
    let mut resource = Resource::new(LinuxDvb::new(), settings.dvb.clone());
    resource.open(frequency, adapter)?;

    let canceller = resource.canceller();
    ctrlc::set_handler(move || canceller.cancel())?;

    if !wait.is_zero() {
        thread::sleep(wait);
    }
    info!("{} byte(s) ready", resource.available()?);

    let mut out: Box<dyn Write> = if output == "-" {
        Box::new(io::stdout().lock())
    } else {
        Box::new(BufWriter::new(File::create(output)?))
    };

    let result = copy_stream(&mut resource, &mut out, limit);
    out.flush()?;
    resource.close()?;

    let written = result?;
    info!("Wrote {} byte(s) to {}", written, output);
    Ok(())
}

/// Copy until `limit` bytes, end of stream or cancellation.
fn copy_stream<B: DvbBackend>(
    resource: &mut Resource<B>,
    out: &mut dyn Write,
    limit: Option<u64>,
) -> Result<u64, Box<dyn std::error::Error>> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    let mut empty_reads = 0;

    loop {
        let want = match limit {
            Some(limit) if written >= limit => break,
            Some(limit) => (limit - written).min(buf.len() as u64) as usize,
            None => buf.len(),
        };

        let n = match resource.read(&mut buf[..want]) {
            Ok(n) => n,
            Err(Error::Cancelled) => {
                info!("Interrupted");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if n == 0 {
            empty_reads += 1;
            if empty_reads >= MAX_EMPTY_READS {
                warn!("Stream ended");
                break;
            }
            continue;
        }
        empty_reads = 0;

        out.write_all(&buf[..n])?;
        written += n as u64;
        debug!("{} byte(s) written", written);
    }

    Ok(written)
}
