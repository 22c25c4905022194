//! Device geometry constants and the externally reported disk shape.

use static_assertions::const_assert_eq;

pub use sbd_hal::{SECTOR_COUNT, SECTOR_SIZE};

/// Total device capacity in bytes.
pub const TOTAL_BYTES: usize = SECTOR_SIZE * SECTOR_COUNT;

// The protocol encodes addresses in 16 bits; the fixed geometry must fit.
const_assert_eq!(TOTAL_BYTES, 1 << 20);
const_assert_eq!(SECTOR_SIZE, 512);

/// Disk geometry as reported to partitioning tools.
///
/// The device has no physical geometry; this is the conventional made-up
/// shape: a single head with 16 sectors per track, cylinders derived from
/// the capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Cylinder count.
    pub cylinders: u64,
    /// Head count.
    pub heads: u8,
    /// Sectors per track.
    pub sectors: u8,
    /// First sector offset of the data area.
    pub start: u64,
}

impl Geometry {
    /// The reported geometry for the fixed 1 MiB device.
    pub const fn report() -> Self {
        Self {
            cylinders: ((TOTAL_BYTES as u64) & !0x3F) >> 6,
            heads: 1,
            sectors: 16,
            start: 0,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
