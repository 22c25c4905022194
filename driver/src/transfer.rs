//! # Transfer loop / serializer
//!
//! Turns one block-level request into an ordered, exclusively-locked
//! sequence of byte transactions.
//!
//! The lock is request-scoped, not per-byte: the FIFO registers are
//! unsynchronized shared hardware state, and interleaving two transactions,
//! even from unrelated requests, corrupts the two-byte address encoding. The
//! guard is taken at request entry and released on every exit path,
//! including the early busy abort.
//!
//! A request is not atomic: the first busy transaction aborts it, and bytes
//! already transferred stay transferred. Cancellation mid-sequence is
//! unsupported by construction; the loop only ever stops on a transaction
//! boundary.

use spin::Mutex;

use sbd_hal::RegisterBus;

use crate::disk::DriverStats;
use crate::engine::ProtocolEngine;
use crate::error::DriverResult;
use crate::geometry::SECTOR_SIZE;

/// Transfer direction of a block request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to host.
    Read,
    /// Host to device.
    Write,
}

/// Block driver over a [`RegisterBus`].
///
/// Owns the protocol engine behind the request-scoped exclusive lock and the
/// driver statistics. Dropping the driver tears the stack down in reverse
/// construction order, releasing the bus (and with it a claimed register
/// window).
pub struct BlockDriver<B> {
    engine: Mutex<ProtocolEngine<B>>,
    stats: DriverStats,
}

impl<B: RegisterBus> BlockDriver<B> {
    /// Build a driver on top of a register bus.
    pub const fn new(bus: B) -> Self {
        Self {
            engine: Mutex::new(ProtocolEngine::new(bus)),
            stats: DriverStats::new(),
        }
    }

    /// Driver I/O statistics.
    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    /// Move `sector_count` sectors between `buffer` and the device starting
    /// at `start_sector`.
    ///
    /// `buffer` must hold at least `sector_count * 512` bytes. Sector
    /// numbers are truncated to 16 bits by the wire encoding; no range
    /// check is applied here.
    pub fn transfer(
        &self,
        start_sector: u32,
        sector_count: u32,
        buffer: &mut [u8],
        direction: Direction,
    ) -> DriverResult<()> {
        match direction {
            Direction::Read => self.read_sectors(start_sector, sector_count, buffer),
            Direction::Write => self.write_sectors(start_sector, sector_count, buffer),
        }
    }

    /// Read `sector_count` sectors into `buffer`, sector-major, one byte at
    /// a time, under a single request-scoped lock.
    pub fn read_sectors(
        &self,
        start_sector: u32,
        sector_count: u32,
        buffer: &mut [u8],
    ) -> DriverResult<()> {
        debug_assert!(buffer.len() >= sector_count as usize * SECTOR_SIZE);

        let engine = self.engine.lock();
        let mut cursor = 0;
        for s in 0..sector_count {
            let sector = start_sector.wrapping_add(s) as u16;
            for offset in 0..SECTOR_SIZE as u16 {
                match engine.read_byte(sector, offset) {
                    Ok(byte) => buffer[cursor] = byte,
                    Err(err) => {
                        self.stats.record_busy();
                        log::warn!("read aborted at sector {sector} offset {offset}: {err}");
                        return Err(err);
                    }
                }
                cursor += 1;
            }
        }
        self.stats.record_read(cursor as u64);
        Ok(())
    }

    /// Write `sector_count` sectors from `buffer`, sector-major, one byte at
    /// a time, under a single request-scoped lock.
    pub fn write_sectors(
        &self,
        start_sector: u32,
        sector_count: u32,
        buffer: &[u8],
    ) -> DriverResult<()> {
        debug_assert!(buffer.len() >= sector_count as usize * SECTOR_SIZE);

        let engine = self.engine.lock();
        let mut cursor = 0;
        for s in 0..sector_count {
            let sector = start_sector.wrapping_add(s) as u16;
            for offset in 0..SECTOR_SIZE as u16 {
                if let Err(err) = engine.write_byte(sector, offset, buffer[cursor]) {
                    self.stats.record_busy();
                    log::warn!("write aborted at sector {sector} offset {offset}: {err}");
                    return Err(err);
                }
                cursor += 1;
            }
        }
        self.stats.record_write(cursor as u64);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    use sbd_hal::sim::{RegisterEvent, SimulatedDevice};

    use super::*;
    use crate::error::DriverError;

    /// Decode the journal back into `(sector, offset)` transaction
    /// addresses, in issue order.
    fn decode_addresses(journal: &[RegisterEvent]) -> Vec<(u16, u16)> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < journal.len() {
            if let RegisterEvent::SetOpmode(_) = journal[i] {
                let byte_of = |ev: &RegisterEvent| match ev {
                    RegisterEvent::PushSector(b) | RegisterEvent::PushByte(b) => *b,
                    other => panic!("expected FIFO push, got {other:?}"),
                };
                let sector =
                    u16::from_be_bytes([byte_of(&journal[i + 1]), byte_of(&journal[i + 2])]);
                let offset =
                    u16::from_be_bytes([byte_of(&journal[i + 3]), byte_of(&journal[i + 4])]);
                out.push((sector, offset));
                i += 5;
            } else {
                i += 1;
            }
        }
        out
    }

    fn driver_on(dev: &Arc<SimulatedDevice>) -> BlockDriver<Arc<SimulatedDevice>> {
        BlockDriver::new(Arc::clone(dev))
    }

    #[test]
    fn test_single_sector_round_trip() {
        let dev = Arc::new(SimulatedDevice::new());
        let driver = driver_on(&dev);

        let mut out = [0u8; SECTOR_SIZE];
        out[0] = 0xAB;
        driver.transfer(0, 1, &mut out, Direction::Write).unwrap();

        let mut back = [0u8; SECTOR_SIZE];
        driver.transfer(0, 1, &mut back, Direction::Read).unwrap();
        assert_eq!(back[0], 0xAB);
        assert_eq!(back, out);
    }

    #[test]
    fn test_multi_sector_round_trip() {
        let dev = Arc::new(SimulatedDevice::new());
        let driver = driver_on(&dev);

        let mut out = [0u8; 3 * SECTOR_SIZE];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        driver.write_sectors(40, 3, &out).unwrap();

        let mut back = [0u8; 3 * SECTOR_SIZE];
        driver.read_sectors(40, 3, &mut back).unwrap();
        assert_eq!(back, out);

        // The linear cursor maps buffer position to (sector, offset).
        assert_eq!(dev.peek(41, 0), out[SECTOR_SIZE]);
        assert_eq!(dev.peek(42, 511), out[3 * SECTOR_SIZE - 1]);
    }

    #[test]
    fn test_transactions_ascend_sector_major() {
        let dev = Arc::new(SimulatedDevice::new());
        let driver = driver_on(&dev);

        let mut buf = [0u8; 2 * SECTOR_SIZE];
        driver.read_sectors(5, 2, &mut buf).unwrap();

        let addresses = decode_addresses(&dev.journal());
        assert_eq!(addresses.len(), 2 * SECTOR_SIZE);
        assert_eq!(addresses[0], (5, 0));
        assert_eq!(addresses[SECTOR_SIZE], (6, 0));
        assert_eq!(*addresses.last().unwrap(), (6, 511));
        for pair in addresses.windows(2) {
            // Strictly ascending (sector, offset), sector-major.
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_busy_at_byte_k_attempts_exactly_k() {
        const K: u64 = 700;

        let dev = Arc::new(SimulatedDevice::new());
        let driver = driver_on(&dev);
        dev.inject_busy(K);

        let mut buf = [0x33u8; 2 * SECTOR_SIZE];
        let result = driver.write_sectors(0, 2, &buf);
        assert_eq!(result, Err(DriverError::DeviceBusy));

        // Exactly K transactions were issued before the abort; the rest of
        // the request was never attempted.
        let issued = dev
            .journal()
            .iter()
            .filter(|ev| matches!(ev, RegisterEvent::SetOpmode(_)))
            .count() as u64;
        assert_eq!(issued, K);

        // Transferred prefix stays transferred: no rollback. Byte K-1 landed
        // in sector 1; byte K and everything after never did.
        assert_eq!(dev.peek(1, (K as usize - SECTOR_SIZE - 1) as u16), 0x33);
        assert_eq!(dev.peek(1, (K as usize - SECTOR_SIZE) as u16), 0x00);

        // The abort is visible in the statistics.
        assert_eq!(driver.stats().snapshot().busy_failures, 1);
        assert_eq!(driver.stats().snapshot().bytes_written, 0);

        // A later request proceeds normally.
        buf.fill(0x44);
        driver.write_sectors(0, 1, &buf[..SECTOR_SIZE]).unwrap();
        assert_eq!(dev.peek(0, 0), 0x44);
    }

    #[test]
    fn test_out_of_range_request_is_not_rejected() {
        let dev = Arc::new(SimulatedDevice::new());
        let driver = driver_on(&dev);

        // 2046 + 4 runs past the 2048-sector device. The core applies no
        // bounds check, so this is accepted as-is; range policy lives with
        // the callers above the adapter.
        let mut buf = [0u8; 4 * SECTOR_SIZE];
        assert_eq!(driver.read_sectors(2046, 4, &mut buf), Ok(()));
    }

    #[test]
    fn test_concurrent_transfers_do_not_interleave() {
        let dev = Arc::new(SimulatedDevice::new());
        let driver = Arc::new(driver_on(&dev));

        let writer = |fill: u8, sector: u32| {
            let driver = Arc::clone(&driver);
            move || {
                let buf = [fill; SECTOR_SIZE];
                driver.write_sectors(sector, 1, &buf).unwrap();
            }
        };

        let a = thread::spawn(writer(0xAA, 0));
        let b = thread::spawn(writer(0xBB, 1));
        a.join().unwrap();
        b.join().unwrap();

        // Payload writes identify the issuing request. Whichever request ran
        // second must have issued its first register write after the first
        // request's last one: the two spans may not overlap.
        let journal = dev.journal();
        let span = |fill: u8| {
            let first = journal
                .iter()
                .position(|ev| *ev == RegisterEvent::WriteValue(fill))
                .unwrap();
            let last = journal
                .iter()
                .rposition(|ev| *ev == RegisterEvent::WriteValue(fill))
                .unwrap();
            (first, last)
        };
        let (a_first, a_last) = span(0xAA);
        let (b_first, b_last) = span(0xBB);
        assert!(a_last < b_first || b_last < a_first);

        assert_eq!(dev.peek(0, 511), 0xAA);
        assert_eq!(dev.peek(1, 511), 0xBB);
    }
}
