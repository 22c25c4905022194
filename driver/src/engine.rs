//! # Transfer protocol engine
//!
//! Executes exactly one byte-granular transaction against the register
//! interface: status poll, opmode, two-byte sector location, two-byte byte
//! location, payload, trigger.
//!
//! The busy check is a single poll with no wait-loop and no retry: a busy
//! device fails the transaction immediately, before any register write is
//! issued. A permanently busy device therefore produces fast failures, never
//! hangs. Retry or backoff policy belongs to callers above this layer, so
//! the primitive's latency contract stays fixed.

use sbd_hal::regs::opmode;
use sbd_hal::{RegisterBus, STATUS_AVAILABLE};

use crate::error::{DriverError, DriverResult};

/// Per-byte transaction engine over a [`RegisterBus`].
pub struct ProtocolEngine<B> {
    bus: B,
}

impl<B: RegisterBus> ProtocolEngine<B> {
    /// Wrap a register bus.
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Access the underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Unwrap the engine, returning the bus.
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Poll the status register once. Anything non-zero is busy.
    fn poll_available(&self) -> DriverResult<()> {
        let status = self.bus.read_status();
        if status != STATUS_AVAILABLE {
            log::debug!("transaction refused, status {:#04x}", status);
            return Err(DriverError::DeviceBusy);
        }
        Ok(())
    }

    /// Deliver a 16-bit value to a FIFO register as exactly two ordered
    /// pushes, high byte then low byte.
    fn push_split(value: u16, mut push: impl FnMut(u8)) {
        push((value >> 8) as u8);
        push((value & 0xFF) as u8);
    }

    /// Program the direction and both location FIFOs. Steps 2-4 of every
    /// transaction; the caller supplies payload and trigger.
    fn program(&self, mode: u8, sector: u16, offset: u16) {
        self.bus.set_opmode(mode);
        Self::push_split(sector, |b| self.bus.push_sector(b));
        Self::push_split(offset, |b| self.bus.push_byte(b));
    }

    /// Write one byte at `(sector, offset)`.
    ///
    /// Returns as soon as the register sequence is issued; device-side
    /// completion is not awaited. Sector and offset are truncated to 16 bits
    /// by the two-push encoding; no bounds checking happens here.
    pub fn write_byte(&self, sector: u16, offset: u16, value: u8) -> DriverResult<()> {
        self.poll_available()?;
        self.program(opmode::WRITE, sector, offset);
        self.bus.write_value(value);
        self.bus.trigger();
        Ok(())
    }

    /// Read one byte at `(sector, offset)`.
    ///
    /// The value register is read immediately after the trigger, without
    /// waiting for a device-reported completion. The device executes the
    /// operation within the trigger write and holds status busy until this
    /// value read, which is what makes the immediate read sound; a device
    /// that completed asynchronously instead would make this a race.
    pub fn read_byte(&self, sector: u16, offset: u16) -> DriverResult<u8> {
        self.poll_available()?;
        self.program(opmode::READ, sector, offset);
        self.bus.trigger();
        Ok(self.bus.read_value())
    }
}

// =============================================================================
// Tests
// =============================================================================
