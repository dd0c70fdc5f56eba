//! `dvbio checksignal`

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use colored::Colorize;
use log::info;

use dvbio::{DvbBackend, LinuxDvb, Resource};

use super::CommandResult;
use crate::settings::Settings;

/// One line of signal telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SignalReport {
    present: bool,
    locked: bool,
    strength: u32,
    quality: u32,
}

impl SignalReport {
    fn query<B: DvbBackend>(resource: &Resource<B>) -> dvbio::Result<Self> {
        Ok(Self {
            present: resource.signal_present()?,
            locked: resource.signal_locked()?,
            strength: resource.signal_strength()?,
            quality: resource.signal_quality()?,
        })
    }
}

impl fmt::Display for SignalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signal: {:<3} lock: {:<3} strength: {:>3}%  quality: {:>3}%",
            if self.present { "yes" } else { "no" },
            if self.locked { "yes" } else { "no" },
            self.strength,
            self.quality
        )
    }
}

pub(crate) fn run(
    settings: &Settings,
    frequency: u64,
    adapter: Option<&Path>,
    interval: Duration,
    count: u64,
) -> CommandResult {
    let mut resource = Resource::new(LinuxDvb::new(), settings.dvb.clone());
    resource.open(frequency, adapter)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let mut reports = 0u64;
    while running.load(Ordering::SeqCst) {
        let report = SignalReport::query(&resource)?;
        let line = report.to_string();
        if report.locked {
            println!("{}", line.green());
        } else if report.present {
            println!("{}", line.yellow());
        } else {
            println!("{}", line.red());
        }

        reports += 1;
        if count != 0 && reports >= count {
            break;
        }
        thread::sleep(interval);
    }

    resource.close()?;
    info!("{} report(s)", reports);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_line() {
        let report = SignalReport {
            present: true,
            locked: false,
            strength: 49,
            quality: 100,
        };
        assert_eq!(
            report.to_string(),
            "signal: yes lock: no  strength:  49%  quality: 100%"
        );
    }
}
