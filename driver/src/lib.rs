//! # SimpleBlock Driver
//!
//! Block driver core for the SimpleBlock storage device: a fixed 1 MiB disk
//! of 2048 × 512-byte sectors behind a six-register port I/O window with a
//! bit-banged, polling-based byte protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            Block Request Adapter              │  request::submit
//! ├───────────────────────────────────────────────┤
//! │          Transfer Loop / Serializer           │  transfer::BlockDriver
//! │        (request-scoped exclusive lock)        │
//! ├───────────────────────────────────────────────┤
//! │           Transfer Protocol Engine            │  engine::ProtocolEngine
//! │         (one byte-granular transaction)       │
//! ├───────────────────────────────────────────────┤
//! │              Register Interface               │  sbd_hal::RegisterBus
//! └───────────────────────────────────────────────┘
//! ```
//!
//! One request flows top to bottom: the adapter validates the request kind,
//! the serializer locks the engine for the whole request and walks it
//! sector-major, the engine runs one register-write sequence per byte.
//!
//! Execution is synchronous and polling-based. There are no suspension
//! points inside a transaction, no completion interrupts, and no timeout on
//! the busy check - one poll, immediate failure. Concurrency exists only
//! across distinct requests and is serialized by the engine lock.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod disk;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod request;
pub mod transfer;

pub use disk::{DiskFlags, DiskInfo, DriverStats, StatsSnapshot};
pub use error::{DriverError, DriverResult};
pub use request::BlockRequest;
pub use transfer::{BlockDriver, Direction};

use disk::DISK_NAME;

/// Bring up a driver instance on an already-bound register bus.
///
/// Used by hosts that construct the bus themselves (a simulated device, or a
/// pre-claimed port window). Logs the disk identity and geometry the way the
/// port-window path does.
pub fn init_with_bus<B: sbd_hal::RegisterBus>(bus: B) -> BlockDriver<B> {
    announce();
    BlockDriver::new(bus)
}

/// Claim the register window at `base` and bring up the driver.
///
/// Fails with [`DriverError::ResourceUnavailable`] if the window is already
/// claimed. Dropping the returned driver releases the window again, so
/// teardown mirrors initialization in reverse.
///
/// # Safety
/// `base` must be the port window of a SimpleBlock device.
#[cfg(target_arch = "x86_64")]
pub unsafe fn init(base: u16) -> DriverResult<BlockDriver<sbd_hal::PortRegisterBus>> {
    let bus = unsafe { sbd_hal::PortRegisterBus::claim(base) }
        .ok_or(DriverError::ResourceUnavailable)?;
    announce();
    Ok(BlockDriver::new(bus))
}

/// [`init`] at the standard base port.
///
/// # Safety
/// A SimpleBlock device must be present at [`sbd_hal::DEFAULT_BASE`].
#[cfg(target_arch = "x86_64")]
pub unsafe fn init_default() -> DriverResult<BlockDriver<sbd_hal::PortRegisterBus>> {
    unsafe { init(sbd_hal::DEFAULT_BASE) }
}

fn announce() {
    let geo = DiskInfo::new().geometry();
    log::info!(
        "{}: {} sectors of {} bytes ({} KiB), geometry {}/{}/{}",
        DISK_NAME,
        geometry::SECTOR_COUNT,
        geometry::SECTOR_SIZE,
        geometry::TOTAL_BYTES / 1024,
        geo.cylinders,
        geo.heads,
        geo.sectors,
    );
}
