#![cfg_attr(not(test), no_std)]

//! Firmware core for a matrix-keyboard peripheral exposed to a host over a
//! byte-oriented register protocol.
//!
//! The crate scans a mechanical key matrix plus auxiliary buttons, tracks
//! each press through a small state machine, queues the resulting key events
//! in a FIFO, fans them out to subscribers in registration order, and serves
//! the whole device state to the host one register at a time. Hardware is
//! reached only through `embedded-hal` traits; board bring-up lives outside
//! this crate.

#[macro_use]
mod macros;

pub mod backlight;
pub mod bus;
pub mod event;
pub mod fifo;
pub mod gpioexp;
pub mod interrupt;
pub mod keyboard;
pub mod keycode;
pub mod layout;
pub mod protocol;
pub mod registers;
pub mod touchpad;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Mutex flavor used for state shared between the poll loop and interrupt
/// contexts.
pub type RawMutex = CriticalSectionRawMutex;

/// Capacity of the key event FIFO. Kept within the 5-bit depth field of the
/// key status register so a full queue is reportable to the host.
pub const KEY_FIFO_SIZE: usize = 31;

/// Number of simultaneously tracked key presses. Presses beyond this are
/// silently dropped until a slot frees up.
pub const ACTIVE_KEY_SLOTS: usize = 10;

/// Maximum number of subscribers per event bus list.
pub const MAX_SUBSCRIBERS: usize = 4;

/// Firmware version, reported through the version register as
/// `(major << 4) | minor`.
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 2;
