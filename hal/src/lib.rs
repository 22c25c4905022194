//! # SimpleBlock HAL - Hardware Access Layer
//!
//! This crate defines the register-level interface to the SimpleBlock storage
//! device: a fixed-capacity disk reached through six 8-bit registers in a
//! port I/O window.
//!
//! ## Design Philosophy
//!
//! The access layer is designed to be:
//! - **Minimal**: Seven primitive register operations, nothing more
//! - **Injectable**: One [`RegisterBus`] trait, two bindings - physical ports
//!   for production, a software-simulated device for tests and host work
//! - **Unvalidated**: Register operations are unconditional and side-effecting;
//!   sequencing correctness is owned entirely by the caller
//!
//! ## Register map
//!
//! | Offset | Register | Access | Semantics |
//! |--------|----------|--------|-----------|
//! | 0 | status | R | `0x00` = available, anything else = busy |
//! | 1 | value | R/W | payload byte of the current transaction |
//! | 2 | opmode | W | `0x00` = read, `0xFF` = write |
//! | 3 | sector FIFO | W | two pushes per transaction, high byte first |
//! | 4 | byte FIFO | W | two pushes per transaction, high byte first |
//! | 5 | trigger | W | non-zero byte arms the device |

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod portio;
pub mod regs;
pub mod sim;

pub use regs::{RegisterBus, DEFAULT_BASE, REG_COUNT, STATUS_AVAILABLE};

#[cfg(target_arch = "x86_64")]
pub use regs::PortRegisterBus;

/// Size of one device sector in bytes.
pub const SECTOR_SIZE: usize = 512;

/// Total number of sectors on the device.
pub const SECTOR_COUNT: usize = 2048;
