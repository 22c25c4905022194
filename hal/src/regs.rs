//! # SimpleBlock register interface
//!
//! The device exposes six 8-bit registers at consecutive offsets from a base
//! port. The two location registers are FIFOs: a 16-bit address is delivered
//! as two consecutive byte writes, high byte first.
//!
//! ## Sequencing contract
//!
//! Each address FIFO must receive exactly two writes per transaction, high
//! byte then low byte, before the trigger fires. Any deviation
//! desynchronizes the FIFO and corrupts every subsequent transaction until
//! the device is reset. Nothing at this layer enforces that contract;
//! callers own the sequencing.

/// Base port of the register window at the standard configuration.
pub const DEFAULT_BASE: u16 = 0x3F0;

/// Number of registers in the window, for region claims.
pub const REG_COUNT: u16 = 6;

/// Status byte reported while the device can accept a new transaction.
pub const STATUS_AVAILABLE: u8 = 0x00;

/// Byte written to the trigger register to arm the device.
pub const TRIGGER_ARM: u8 = 0xFF;

/// Register offsets relative to the base port.
pub mod offset {
    /// R: device status
    pub const STATUS: u16 = 0;
    /// R/W: payload byte of the current transaction
    pub const VALUE: u16 = 1;
    /// W: operation mode selector
    pub const OPMODE: u16 = 2;
    /// W: sector-location FIFO, high byte then low byte
    pub const SECTOR_FIFO: u16 = 3;
    /// W: byte-location FIFO, high byte then low byte
    pub const BYTE_FIFO: u16 = 4;
    /// W: operation trigger
    pub const TRIGGER: u16 = 5;
}

/// Operation mode encodings.
pub mod opmode {
    /// Select a read transaction
    pub const READ: u8 = 0x00;
    /// Select a write transaction
    pub const WRITE: u8 = 0xFF;
}

/// Primitive register operations of the SimpleBlock device.
///
/// All operations are unconditional and side-effecting: no buffering, no
/// retries, no validation. Methods take `&self` because the registers are
/// shared mutable hardware state that software never owns, only accesses.
///
/// Production code binds this to physical ports ([`PortRegisterBus`]); tests
/// bind it to a software device ([`crate::sim::SimulatedDevice`]).
pub trait RegisterBus: Send + Sync {
    /// Read the status register. `0x00` means the device is available.
    fn read_status(&self) -> u8;

    /// Read the value register.
    ///
    /// On the read path this both returns the transferred byte and releases
    /// the device back to available.
    fn read_value(&self) -> u8;

    /// Write the payload byte for the next operation.
    fn write_value(&self, byte: u8);

    /// Select the operation mode ([`opmode::READ`] or [`opmode::WRITE`]).
    fn set_opmode(&self, mode: u8);

    /// Push one byte of the 16-bit sector location.
    ///
    /// FIFO register: two consecutive calls deliver the high then low byte.
    fn push_sector(&self, byte: u8);

    /// Push one byte of the 16-bit byte location.
    ///
    /// FIFO register: two consecutive calls deliver the high then low byte.
    fn push_byte(&self, byte: u8);

    /// Arm the device. It executes the programmed operation autonomously and
    /// later returns status to available; there is no synchronous completion
    /// signal.
    fn trigger(&self);
}

// Shared handles forward to the underlying bus, so a device can be observed
// by tests while a driver owns a handle to it.
impl<T: RegisterBus + ?Sized> RegisterBus for alloc::sync::Arc<T> {
    fn read_status(&self) -> u8 {
        (**self).read_status()
    }

    fn read_value(&self) -> u8 {
        (**self).read_value()
    }

    fn write_value(&self, byte: u8) {
        (**self).write_value(byte)
    }

    fn set_opmode(&self, mode: u8) {
        (**self).set_opmode(mode)
    }

    fn push_sector(&self, byte: u8) {
        (**self).push_sector(byte)
    }

    fn push_byte(&self, byte: u8) {
        (**self).push_byte(byte)
    }

    fn trigger(&self) {
        (**self).trigger()
    }
}

// =============================================================================
// Physical binding
// =============================================================================

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        use core::sync::atomic::{AtomicBool, Ordering};

        use crate::portio::{inb, outb};

        /// Has the register window been claimed?
        ///
        /// Models the exclusive I/O region reservation: one SimpleBlock
        /// device exists process-wide, so at most one live [`PortRegisterBus`].
        static REGION_CLAIMED: AtomicBool = AtomicBool::new(false);

        /// [`RegisterBus`] bound to the physical port window.
        pub struct PortRegisterBus {
            base: u16,
        }

        impl PortRegisterBus {
            /// Claim the register window at `base` and bind a bus to it.
            ///
            /// Returns `None` if the window is already claimed. The claim is
            /// released when the bus is dropped.
            ///
            /// # Safety
            /// `base` must be the port window of a SimpleBlock device; all
            /// six registers are accessed relative to it.
            pub unsafe fn claim(base: u16) -> Option<Self> {
                if REGION_CLAIMED
                    .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                    .is_err()
                {
                    log::warn!("register window {:#05x}:{} already claimed", base, REG_COUNT);
                    return None;
                }
                log::debug!("claimed register window {:#05x}:{}", base, REG_COUNT);
                Some(Self { base })
            }

            /// Base port of the claimed window.
            pub fn base(&self) -> u16 {
                self.base
            }

            #[inline]
            fn read(&self, reg: u16) -> u8 {
                // SAFETY: the claim constructor pinned `base` to the device
                // window, and `reg` is one of the fixed offsets within it.
                unsafe { inb(self.base + reg) }
            }

            #[inline]
            fn write(&self, reg: u16, byte: u8) {
                // SAFETY: as in `read`.
                unsafe { outb(self.base + reg, byte) }
            }
        }

        impl Drop for PortRegisterBus {
            fn drop(&mut self) {
                REGION_CLAIMED.store(false, Ordering::Release);
                log::debug!("released register window {:#05x}:{}", self.base, REG_COUNT);
            }
        }

        impl RegisterBus for PortRegisterBus {
            fn read_status(&self) -> u8 {
                let status = self.read(offset::STATUS);
                log::trace!("status -> {:#04x}", status);
                status
            }

            fn read_value(&self) -> u8 {
                let value = self.read(offset::VALUE);
                log::trace!("value -> {:#04x}", value);
                value
            }

            fn write_value(&self, byte: u8) {
                log::trace!("value <- {:#04x}", byte);
                self.write(offset::VALUE, byte);
            }

            fn set_opmode(&self, mode: u8) {
                log::trace!("opmode <- {:#04x}", mode);
                self.write(offset::OPMODE, mode);
            }

            fn push_sector(&self, byte: u8) {
                log::trace!("secloc <- {:#04x}", byte);
                self.write(offset::SECTOR_FIFO, byte);
            }

            fn push_byte(&self, byte: u8) {
                log::trace!("byteloc <- {:#04x}", byte);
                self.write(offset::BYTE_FIFO, byte);
            }

            fn trigger(&self) {
                log::trace!("trigger <- {:#04x}", TRIGGER_ARM);
                self.write(offset::TRIGGER, TRIGGER_ARM);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[cfg(target_arch = "x86_64")]
mod tests {
    use super::*;

    // Single test: the claim flag is process-wide state, so the claim
    // lifecycle has to be exercised in one sequential block.
    #[test]
    fn test_region_claim_lifecycle() {
        // SAFETY: the bus is never used for I/O in this test, so the base
        // port is never touched.
        let bus = unsafe { PortRegisterBus::claim(DEFAULT_BASE) }.unwrap();
        assert_eq!(bus.base(), DEFAULT_BASE);

        // Second claim must fail while the first is live.
        assert!(unsafe { PortRegisterBus::claim(DEFAULT_BASE) }.is_none());

        // Dropping releases the window for a new claim.
        drop(bus);
        let again = unsafe { PortRegisterBus::claim(DEFAULT_BASE) };
        assert!(again.is_some());
    }
}
