//! Disk bookkeeping: identity, flags, and I/O statistics.

use core::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use crate::geometry::Geometry;

/// Short device name used for the disk node.
pub const DISK_NAME: &str = "sb";

/// Device numbers reserved for the disk and its partitions.
pub const DISK_MINORS: u16 = 16;

bitflags! {
    /// Disk attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DiskFlags: u32 {
        /// Disk rejects write requests.
        const READ_ONLY = 1 << 0;
        /// Media can be removed.
        const REMOVABLE = 1 << 1;
        /// Disk is backed by a simulated device.
        const VIRTUAL = 1 << 2;
    }
}

/// Identity of the registered disk.
#[derive(Debug, Clone, Copy)]
pub struct DiskInfo {
    /// Disk node name.
    pub name: &'static str,
    /// Minor numbers reserved for partitions.
    pub minors: u16,
    /// Attribute flags.
    pub flags: DiskFlags,
}

impl DiskInfo {
    /// The standard fixed disk.
    pub const fn new() -> Self {
        Self {
            name: DISK_NAME,
            minors: DISK_MINORS,
            flags: DiskFlags::empty(),
        }
    }

    /// Geometry reported for this disk.
    pub const fn geometry(&self) -> Geometry {
        Geometry::report()
    }
}

impl Default for DiskInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver I/O statistics.
#[derive(Debug, Default)]
pub struct DriverStats {
    /// Bytes moved device-to-host.
    bytes_read: AtomicU64,
    /// Bytes moved host-to-device.
    bytes_written: AtomicU64,
    /// Block requests accepted by the adapter.
    requests: AtomicU64,
    /// Requests aborted on a busy device.
    busy_failures: AtomicU64,
}

impl DriverStats {
    /// Zeroed counters.
    pub const fn new() -> Self {
        Self {
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            busy_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_write(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_busy(&self) {
        self.busy_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent snapshot of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            busy_failures: self.busy_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DriverStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Bytes moved device-to-host.
    pub bytes_read: u64,
    /// Bytes moved host-to-device.
    pub bytes_written: u64,
    /// Block requests accepted by the adapter.
    pub requests: u64,
    /// Requests aborted on a busy device.
    pub busy_failures: u64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_info_defaults() {
        let info = DiskInfo::new();
        assert_eq!(info.name, "sb");
        assert_eq!(info.minors, 16);
        assert!(info.flags.is_empty());
        assert_eq!(info.geometry().heads, 1);
    }

    #[test]
    fn test_disk_flags() {
        let mut flags = DiskFlags::empty();
        flags.insert(DiskFlags::READ_ONLY);
        flags.insert(DiskFlags::VIRTUAL);

        assert!(flags.contains(DiskFlags::READ_ONLY));
        assert!(!flags.contains(DiskFlags::REMOVABLE));
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = DriverStats::new();
        stats.record_read(512);
        stats.record_read(512);
        stats.record_write(1024);
        stats.record_request();
        stats.record_busy();

        let snap = stats.snapshot();
        assert_eq!(snap.bytes_read, 1024);
        assert_eq!(snap.bytes_written, 1024);
        assert_eq!(snap.requests, 1);
        assert_eq!(snap.busy_failures, 1);
    }
}
