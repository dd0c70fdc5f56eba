//! Encoding and decoding of the tab-separated device list.
//!
//! The producer side writes into a caller-supplied, fixed-size byte buffer
//! through [`DeviceListWriter`]; the consumer side splits the text with
//! [`parse_device_list`].

use crate::error::ProtocolError;
use crate::types::{DeliverySystem, DeviceRecord, FIELD_SEPARATOR};

/// Writes device records into a bounded byte buffer.
///
/// Every field is checked against the remaining space before it is copied;
/// nothing is ever truncated. When a push fails the caller is expected to
/// [`discard`](Self::discard) the writer, since the text written so far is no
/// longer a valid list.
pub struct DeviceListWriter<'a> {
    dest: &'a mut [u8],
    pos: usize,
    records: usize,
}

impl<'a> DeviceListWriter<'a> {
    pub fn new(dest: &'a mut [u8]) -> Self {
        Self {
            dest,
            pos: 0,
            records: 0,
        }
    }

    /// Append one record, preceded by a separator unless it is the first.
    ///
    /// The type field is the kernel frontend type as a decimal number. Known
    /// types are a single digit; an unknown type is written as is and may
    /// take several characters.
    pub fn push(&mut self, record: &DeviceRecord) -> Result<(), ProtocolError> {
        if self.records > 0 {
            self.put(&[FIELD_SEPARATOR as u8])?;
        }
        let name = sanitize_name(&record.name);
        self.put(name.as_bytes())?;
        self.put(&[FIELD_SEPARATOR as u8])?;
        self.put(record.path.as_bytes())?;
        self.put(&[FIELD_SEPARATOR as u8])?;
        self.put(record.delivery.raw().to_string().as_bytes())?;
        self.records += 1;
        Ok(())
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Number of complete records written.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Finish the list and return its length in bytes.
    pub fn finish(self) -> usize {
        self.pos
    }

    /// Wipe everything written so far.
    pub fn discard(self) {
        self.dest[..self.pos].fill(0);
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let available = self.dest.len() - self.pos;
        if bytes.len() > available {
            return Err(ProtocolError::BufferTooSmall {
                needed: bytes.len(),
                available,
            });
        }
        self.dest[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }
}

/// Tabs inside a device name would break the field structure.
fn sanitize_name(name: &str) -> String {
    name.replace(FIELD_SEPARATOR, " ")
}

/// Encode records into an unbounded string.
pub fn encode_device_list(records: &[DeviceRecord]) -> String {
    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_SEPARATOR);
        }
        out.push_str(&sanitize_name(&record.name));
        out.push(FIELD_SEPARATOR);
        out.push_str(&record.path);
        out.push(FIELD_SEPARATOR);
        out.push_str(&record.delivery.raw().to_string());
    }
    out
}

/// Split a device list into records.
///
/// An empty string is an empty list.
pub fn parse_device_list(text: &str) -> Result<Vec<DeviceRecord>, ProtocolError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
    let trailing = fields.len() % 3;
    if trailing != 0 {
        return Err(ProtocolError::IncompleteRecord(trailing));
    }

    fields
        .chunks_exact(3)
        .map(|chunk| {
            let raw: u32 = chunk[2]
                .parse()
                .map_err(|_| ProtocolError::InvalidDeliveryType(chunk[2].to_string()))?;
            Ok(DeviceRecord::new(
                chunk[0],
                chunk[1],
                DeliverySystem::from_raw(raw),
            ))
        })
        .collect()
}
