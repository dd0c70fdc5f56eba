//! `dvbio list`

use std::io::Write;

use colored::Colorize;
use log::info;

use dvbio::{enumerate_devices, list_devices_into, DeviceRecord, DvbConfig, LinuxDvb};

use super::CommandResult;
use crate::context::OutputFormat;

/// Room for the tab-separated list; a record is well under 200 bytes.
const LIST_BUFFER_SIZE: usize = 4096;

pub(crate) fn run(config: &DvbConfig, format: OutputFormat) -> CommandResult {
    let backend = LinuxDvb::new();
    info!("Probing adapters under {}", config.device_root.display());

    match format {
        OutputFormat::Tsv => {
            let mut buf = vec![0u8; LIST_BUFFER_SIZE];
            let len = list_devices_into(&backend, config, &mut buf)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&buf[..len])?;
            writeln!(stdout)?;
        }
        OutputFormat::Json => {
            let records = enumerate_devices(&backend, config)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Table => {
            let records = enumerate_devices(&backend, config)?;
            print_table(&records);
        }
    }
    Ok(())
}

fn format_row(record: &DeviceRecord) -> String {
    format!(
        "{:<24} {:<8} {}",
        record.path,
        record.delivery.name(),
        record.name
    )
}

fn print_table(records: &[DeviceRecord]) {
    if records.is_empty() {
        println!("No DVB adapters found.");
        return;
    }

    println!("{:<24} {:<8} {}", "ADAPTER", "TYPE", "NAME");
    println!("{}", "-".repeat(60));
    for record in records {
        let row = format_row(record);
        if record.is_terrestrial() {
            println!("{}", row.green());
        } else {
            println!("{}", row.dimmed());
        }
    }
    println!("\nTotal: {} adapter(s)", records.len());
}
