//! # Block request adapter
//!
//! Boundary between the block layer and the protocol core. Incoming requests
//! that are not plain sector reads or writes are short-circuited with
//! [`DriverError::UnsupportedRequest`] and never reach the transfer loop.
//!
//! The issuer observes whole-request success or failure only. A request that
//! aborts mid-way leaves its transferred prefix on the device; partial
//! transfers are not rolled back and not separately reported.

use sbd_hal::RegisterBus;

use crate::error::{DriverError, DriverResult};
use crate::geometry::SECTOR_SIZE;
use crate::transfer::BlockDriver;

/// One block-level request handed to the driver.
pub enum BlockRequest<'a> {
    /// Read whole sectors into `buffer`, starting at `start_sector`.
    Read {
        /// First sector of the span.
        start_sector: u32,
        /// Destination; length selects the sector count.
        buffer: &'a mut [u8],
    },
    /// Write whole sectors from `buffer`, starting at `start_sector`.
    Write {
        /// First sector of the span.
        start_sector: u32,
        /// Source; length selects the sector count.
        buffer: &'a [u8],
    },
    /// Cache flush. The device has no cache; not a transfer request.
    Flush,
    /// Discard a sector span. Not a transfer request.
    Discard {
        /// First sector of the span.
        start_sector: u32,
        /// Number of sectors.
        sector_count: u32,
    },
}

impl BlockRequest<'_> {
    /// Request kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Flush => "flush",
            Self::Discard { .. } => "discard",
        }
    }
}

impl<B: RegisterBus> BlockDriver<B> {
    /// Dispatch one block request.
    ///
    /// Read and write requests must cover a whole number of sectors; the
    /// sector count is derived from the buffer length. Everything else is
    /// answered with an I/O error without touching the device.
    pub fn submit(&self, request: BlockRequest<'_>) -> DriverResult<()> {
        match request {
            BlockRequest::Read { start_sector, buffer } => {
                let count = whole_sectors(buffer.len())?;
                log::debug!("request: read sectors {} +{}", start_sector, count);
                self.stats().record_request();
                self.read_sectors(start_sector, count, buffer)
            }
            BlockRequest::Write { start_sector, buffer } => {
                let count = whole_sectors(buffer.len())?;
                log::debug!("request: write sectors {} +{}", start_sector, count);
                self.stats().record_request();
                self.write_sectors(start_sector, count, buffer)
            }
            other => {
                log::debug!("request: {} rejected, not a transfer", other.kind());
                Err(DriverError::UnsupportedRequest)
            }
        }
    }
}

/// Sector count covered by a buffer, or `UnsupportedRequest` for an empty or
/// ragged buffer.
fn whole_sectors(len: usize) -> DriverResult<u32> {
    if len == 0 || len % SECTOR_SIZE != 0 {
        return Err(DriverError::UnsupportedRequest);
    }
    Ok((len / SECTOR_SIZE) as u32)
}

// =============================================================================
// Tests
// =============================================================================
