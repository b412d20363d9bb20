//! The register wire protocol: request framing and per-register dispatch.
//!
//! A request is one or two bytes. The first byte addresses a register in its
//! low seven bits; bit 7 set marks a write, in which case a data byte
//! follows. Reads answer with one or two bytes, writes answer with nothing.

use crate::event::KeyEvent;
use crate::backlight::BacklightDriver;
use crate::fifo::SharedFifo;
use crate::gpioexp::GpioExpander;
use crate::keyboard::ModifierState;
use crate::registers::{FIRMWARE_VERSION, RegId, RegisterFile, key};

/// Bit 7 of the address byte marks a write request.
pub const WRITE_MASK: u8 = 0x80;

/// Response bytes for one request. At most two bytes (the FIFO register).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Response {
    bytes: [u8; 2],
    len: u8,
}

impl Response {
    /// The empty response every write (and unknown register) gets.
    pub const fn empty() -> Self {
        Self {
            bytes: [0; 2],
            len: 0,
        }
    }

    pub const fn byte(value: u8) -> Self {
        Self {
            bytes: [value, 0],
            len: 1,
        }
    }

    pub const fn pair(first: u8, second: u8) -> Self {
        Self {
            bytes: [first, second],
            len: 2,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// Reassembles requests from the byte stream: a read is complete after its
/// address byte, a write after its data byte.
#[derive(Debug, Default)]
pub struct RequestAssembler {
    pending_write: Option<u8>,
}

impl RequestAssembler {
    pub const fn new() -> Self {
        Self {
            pending_write: None,
        }
    }

    /// Feeds one received byte; returns the `(address, data)` pair once a
    /// request is complete. Reads carry a zero data byte.
    pub fn push(&mut self, byte: u8) -> Option<(u8, u8)> {
        match self.pending_write.take() {
            Some(addr) => Some((addr, byte)),
            None if byte & WRITE_MASK != 0 => {
                self.pending_write = Some(byte);
                None
            }
            None => Some((byte, 0)),
        }
    }

    /// Drops a partially received request, e.g. on a bus stop condition.
    pub fn reset(&mut self) {
        self.pending_write = None;
    }
}

/// Board-level operations the protocol can trigger.
pub trait SystemControl {
    /// Re-applies the peripheral bus address register to the transport.
    fn sync_address(&mut self);

    /// Reboots the device.
    fn system_reset(&mut self);
}

/// Serves complete requests against the register file and its attached
/// collaborators.
pub struct ProtocolHandler<'a, B, G, S>
where
    B: BacklightDriver,
    G: GpioExpander,
    S: SystemControl,
{
    regs: &'a RegisterFile,
    fifo: &'a SharedFifo,
    mods: &'a ModifierState,
    backlight: B,
    gpio: G,
    system: S,
}

impl<'a, B, G, S> ProtocolHandler<'a, B, G, S>
where
    B: BacklightDriver,
    G: GpioExpander,
    S: SystemControl,
{
    pub fn new(
        regs: &'a RegisterFile,
        fifo: &'a SharedFifo,
        mods: &'a ModifierState,
        backlight: B,
        gpio: G,
        system: S,
    ) -> Self {
        Self {
            regs,
            fifo,
            mods,
            backlight,
            gpio,
            system,
        }
    }

    /// Serves one request. `data` is ignored for reads.
    pub fn process(&mut self, addr: u8, data: u8) -> Response {
        let is_write = addr & WRITE_MASK != 0;
        let Some(reg) = RegId::from_addr(addr & !WRITE_MASK) else {
            warn!("unknown register 0x{:02x}", addr & !WRITE_MASK);
            return Response::empty();
        };

        trace!("request: reg 0x{:02x}, write: {}", reg as u8, is_write);

        match reg {
            // common R/W registers
            RegId::Cfg
            | RegId::Int
            | RegId::Deb
            | RegId::Frq
            | RegId::Bkl
            | RegId::Bk2
            | RegId::Gic
            | RegId::Gin
            | RegId::Hld
            | RegId::Adr
            | RegId::Ind
            | RegId::Cf2 => {
                if is_write {
                    self.regs.set(reg, data);

                    match reg {
                        RegId::Bkl | RegId::Bk2 => self.backlight.sync(),
                        RegId::Adr => self.system.sync_address(),
                        _ => {}
                    }

                    Response::empty()
                } else {
                    Response::byte(self.regs.get(reg))
                }
            }

            // GPIO mode registers reconfigure pins on write
            RegId::Dir | RegId::Pue | RegId::Pud => {
                if is_write {
                    match reg {
                        RegId::Dir => self.gpio.update_dir(data),
                        RegId::Pue => self.gpio.update_pull(data, self.regs.get(RegId::Pud)),
                        _ => self.gpio.update_pull(self.regs.get(RegId::Pue), data),
                    }
                    Response::empty()
                } else {
                    Response::byte(self.regs.get(reg))
                }
            }

            // GPIO value register reads and drives the pins live
            RegId::Gio => {
                if is_write {
                    self.gpio.set_output(data);
                    Response::empty()
                } else {
                    Response::byte(self.gpio.read_input())
                }
            }

            // touch deltas clear on read; writes are ignored
            RegId::Tox | RegId::Toy => {
                if is_write {
                    Response::empty()
                } else {
                    Response::byte(self.regs.take(reg))
                }
            }

            RegId::Ver => {
                if is_write {
                    Response::empty()
                } else {
                    Response::byte(FIRMWARE_VERSION)
                }
            }

            RegId::Key => {
                if is_write {
                    return Response::empty();
                }

                let count = self.fifo.lock(|fifo| fifo.borrow().count());
                let mut status = count & key::COUNT_MASK;
                if self.mods.numlock() {
                    status |= key::NUMLOCK;
                }
                if self.mods.capslock() {
                    status |= key::CAPSLOCK;
                }
                Response::byte(status)
            }

            RegId::Fif => {
                if is_write {
                    return Response::empty();
                }

                let event: KeyEvent = self.fifo.lock(|fifo| fifo.borrow_mut().dequeue());
                Response::pair(event.state as u8, event.key)
            }

            RegId::Rst => {
                info!("reset requested over the wire");
                self.system.system_reset();
                Response::empty()
            }
        }
    }
}
