//! Fixed-capacity circular pre-read buffer.
//!
//! The buffer exists so the caller can learn how many bytes are readable
//! without blocking: data is pulled opportunistically from the non-blocking
//! stream device and handed out again by the next reads, in arrival order.
//! Being full is not an overflow; it only means nothing more can be
//! buffered until the caller reads.

use std::collections::TryReserveError;
use std::io;

use dvbio_protocol::TS_PACKET_SIZE;
use log::debug;

/// Capacity of the pre-read buffer: a whole number of TS packets.
pub const BUFFER_CAPACITY: usize = 400 * TS_PACKET_SIZE;

/// Outcomes of a non-blocking read that mean "nothing this time".
pub(crate) fn is_no_progress(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Circular byte buffer addressed by a start offset and a length.
///
/// Invariants: `len <= capacity` and `start < capacity`.
pub struct PreReadBuffer {
    data: Box<[u8]>,
    start: usize,
    len: usize,
}

impl PreReadBuffer {
    /// Allocate a buffer of [`BUFFER_CAPACITY`] bytes.
    pub fn allocate() -> Result<Self, TryReserveError> {
        Self::with_capacity(BUFFER_CAPACITY)
    }

    /// Allocate a buffer of `capacity` bytes, reporting allocation failure
    /// instead of aborting.
    pub fn with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        data.resize(capacity, 0);
        Ok(Self {
            data: data.into_boxed_slice(),
            start: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.capacity()
    }

    /// Offset of the oldest buffered byte.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Top the buffer up with non-blocking reads, returning the bytes added.
    ///
    /// At most two reads are issued: one for the contiguous free region
    /// after the write position, and, if that one filled up to the physical
    /// end of the buffer, one for the wrapped region in front of the
    /// buffered data. `WouldBlock`, `Interrupted` and end of stream add
    /// nothing and are not errors. An error on the first read is returned
    /// with the buffer untouched. Once the first read added bytes, a failing
    /// second read only ends this top-up: the call succeeds with the bytes
    /// already added and a persistent fault surfaces on the next call.
    pub fn fill_from<F>(&mut self, mut read: F) -> io::Result<usize>
    where
        F: FnMut(&mut [u8]) -> io::Result<usize>,
    {
        let capacity = self.capacity();
        if self.len >= capacity {
            return Ok(0);
        }

        let write = (self.start + self.len) % capacity;
        let end = if write >= self.start { capacity } else { self.start };

        let first = match read(&mut self.data[write..end]) {
            Ok(n) => n,
            Err(e) if is_no_progress(&e) => return Ok(0),
            Err(e) => return Err(e),
        };
        self.len += first;

        if first == 0 || end != capacity || write + first < capacity || self.start == 0 {
            return Ok(first);
        }

        let second = match read(&mut self.data[..self.start]) {
            Ok(n) => n,
            Err(e) => {
                if !is_no_progress(&e) {
                    debug!("Wrapped pre-read failed after {} byte(s): {}", first, e);
                }
                0
            }
        };
        self.len += second;

        Ok(first + second)
    }

    /// Move as many buffered bytes as fit into `dest`. Never blocks.
    pub fn drain_into(&mut self, dest: &mut [u8]) -> usize {
        let capacity = self.capacity();
        let mut copied = 0;

        while copied < dest.len() && self.len > 0 {
            let chunk = (dest.len() - copied)
                .min(self.len)
                .min(capacity - self.start);
            dest[copied..copied + chunk].copy_from_slice(&self.data[self.start..self.start + chunk]);

            copied += chunk;
            self.len -= chunk;
            self.start = (self.start + chunk) % capacity;
        }

        copied
    }

    /// Give back the last `count` drained bytes.
    ///
    /// Only valid directly after [`drain_into`](Self::drain_into), before
    /// anything was filled in again: the bytes are still in place and only
    /// the cursor moves.
    pub fn unconsume(&mut self, count: usize) {
        let capacity = self.capacity();
        debug_assert!(count <= capacity - self.len);
        self.start = (self.start + capacity - count % capacity) % capacity;
        self.len += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves `source` in order, at most `chunk` bytes per read.
    struct Feeder {
        source: Vec<u8>,
        pos: usize,
        chunk: usize,
        reads: usize,
    }

    impl Feeder {
        fn new(len: usize, chunk: usize) -> Self {
            Self {
                source: (0..len).map(|i| (i % 251) as u8).collect(),
                pos: 0,
                chunk,
                reads: 0,
            }
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            if self.pos == self.source.len() {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.chunk).min(self.source.len() - self.pos);
            buf[..n].copy_from_slice(&self.source[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_capacity_is_whole_packets() {
        assert_eq!(BUFFER_CAPACITY, 75_200);
        assert_eq!(BUFFER_CAPACITY % TS_PACKET_SIZE, 0);
        let buffer = PreReadBuffer::allocate().unwrap();
        assert_eq!(buffer.capacity(), BUFFER_CAPACITY);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fill_then_drain() {
        let mut buffer = PreReadBuffer::with_capacity(16).unwrap();
        let mut feeder = Feeder::new(10, 100);

        assert_eq!(buffer.fill_from(|b| feeder.read(b)).unwrap(), 10);
        assert_eq!(buffer.len(), 10);

        let mut out = [0u8; 4];
        assert_eq!(buffer.drain_into(&mut out), 4);
        assert_eq!(out, [0, 1, 2, 3]);
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.start(), 4);
    }

    #[test]
    fn test_would_block_and_eof_add_nothing() {
        let mut buffer = PreReadBuffer::with_capacity(16).unwrap();
        let added = buffer
            .fill_from(|_| Err(io::ErrorKind::WouldBlock.into()))
            .unwrap();
        assert_eq!(added, 0);

        let added = buffer.fill_from(|_| Ok(0)).unwrap();
        assert_eq!(added, 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fatal_error_is_returned() {
        let mut buffer = PreReadBuffer::with_capacity(16).unwrap();
        let err = buffer
            .fill_from(|_| Err(io::Error::from_raw_os_error(75)))
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(75));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_interrupted_adds_nothing() {
        let mut buffer = PreReadBuffer::with_capacity(16).unwrap();
        let added = buffer
            .fill_from(|_| Err(io::ErrorKind::Interrupted.into()))
            .unwrap();
        assert_eq!(added, 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_wrapped_read_error_keeps_first_read() {
        let mut buffer = PreReadBuffer::with_capacity(10).unwrap();
        let mut feeder = Feeder::new(6, 100);
        buffer.fill_from(|b| feeder.read(b)).unwrap();
        let mut out = [0u8; 4];
        buffer.drain_into(&mut out); // start = 4, len = 2

        let mut calls = 0;
        let added = buffer
            .fill_from(|b| {
                calls += 1;
                if calls == 1 {
                    b.fill(0xEE);
                    Ok(b.len())
                } else {
                    Err(io::Error::from_raw_os_error(75))
                }
            })
            .unwrap();
        assert_eq!(added, 4);
        assert_eq!(calls, 2);
        assert_eq!(buffer.len(), 6);

        let mut all = [0u8; 6];
        assert_eq!(buffer.drain_into(&mut all), 6);
        assert_eq!(all, [4, 5, 0xEE, 0xEE, 0xEE, 0xEE]);

        // a persistent fault is reported by the next top-up
        let err = buffer
            .fill_from(|_| Err(io::Error::from_raw_os_error(75)))
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(75));
    }

    #[test]
    fn test_full_buffer_does_not_read() {
        let mut buffer = PreReadBuffer::with_capacity(8).unwrap();
        let mut feeder = Feeder::new(100, 100);
        buffer.fill_from(|b| feeder.read(b)).unwrap();
        assert!(buffer.is_full());

        let reads = feeder.reads;
        assert_eq!(buffer.fill_from(|b| feeder.read(b)).unwrap(), 0);
        assert_eq!(feeder.reads, reads);
    }

    #[test]
    fn test_second_read_fills_wrapped_region() {
        let mut buffer = PreReadBuffer::with_capacity(10).unwrap();
        let mut feeder = Feeder::new(100, 100);

        buffer.fill_from(|b| feeder.read(b)).unwrap();
        let mut out = [0u8; 6];
        buffer.drain_into(&mut out);
        assert_eq!(buffer.start(), 6);
        assert_eq!(buffer.len(), 4);

        // write position is 0 < start: one read into [0..6]
        let before = feeder.reads;
        assert_eq!(buffer.fill_from(|b| feeder.read(b)).unwrap(), 6);
        assert_eq!(feeder.reads, before + 1);
        assert!(buffer.is_full());
    }

    #[test]
    fn test_forward_then_wrap_reads() {
        let mut buffer = PreReadBuffer::with_capacity(10).unwrap();
        let mut feeder = Feeder::new(100, 4);

        buffer.fill_from(|b| feeder.read(b)).unwrap(); // [0..4]
        let mut out = [0u8; 3];
        buffer.drain_into(&mut out); // start = 3, len = 1
        feeder.chunk = 100;

        let before = feeder.reads;
        // forward region [4..10] then wrapped region [0..3]
        assert_eq!(buffer.fill_from(|b| feeder.read(b)).unwrap(), 9);
        assert_eq!(feeder.reads, before + 2);
        assert!(buffer.is_full());

        let mut all = [0u8; 10];
        assert_eq!(buffer.drain_into(&mut all), 10);
        let expected: Vec<u8> = (3..13).collect();
        assert_eq!(&all[..], &expected[..]);
    }

    #[test]
    fn test_order_preserved_across_wraps() {
        let capacity = 7;
        let mut buffer = PreReadBuffer::with_capacity(capacity).unwrap();
        let mut feeder = Feeder::new(200, 3);
        let mut output = Vec::new();

        let mut drain_sizes = [2usize, 5, 1, 4, 3].iter().cycle();
        while output.len() < 200 {
            buffer.fill_from(|b| feeder.read(b)).unwrap();
            let mut out = vec![0u8; *drain_sizes.next().unwrap()];
            let n = buffer.drain_into(&mut out);
            output.extend_from_slice(&out[..n]);
            assert!(buffer.len() <= capacity);
            assert!(buffer.start() < capacity);
        }

        assert_eq!(output, feeder.source);
    }

    #[test]
    fn test_unconsume_restores_bytes() {
        let mut buffer = PreReadBuffer::with_capacity(8).unwrap();
        let mut feeder = Feeder::new(8, 100);
        buffer.fill_from(|b| feeder.read(b)).unwrap();

        let mut out = [0u8; 5];
        buffer.drain_into(&mut out);
        buffer.fill_from(|b| feeder.read(b)).unwrap();

        let mut out = [0u8; 6];
        assert_eq!(buffer.drain_into(&mut out), 3);
        buffer.unconsume(3);
        assert_eq!(buffer.len(), 3);

        let mut again = [0u8; 3];
        buffer.drain_into(&mut again);
        assert_eq!(again, [5, 6, 7]);
    }
}
