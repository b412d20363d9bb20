//! The register file: the addressable byte-array model of device state.
//!
//! Every register is a single `AtomicU8` cell, so the file can be shared
//! freely between the poll loop and interrupt contexts without a lock. Bit
//! updates use read-modify-write atomics; the touch delta registers get an
//! atomic read-and-clear for their swap-on-read wire semantics.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::{VERSION_MAJOR, VERSION_MINOR};

/// Register identifiers as addressed by the wire protocol (low 7 bits of the
/// address byte).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegId {
    /// Firmware version (read-only)
    Ver = 0x01,
    /// Config flags
    Cfg = 0x02,
    /// Interrupt status
    Int = 0x03,
    /// Key status: FIFO depth + lock bits (read-only)
    Key = 0x04,
    /// Backlight level
    Bkl = 0x05,
    /// Key debounce config
    Deb = 0x06,
    /// Key poll frequency config (ms)
    Frq = 0x07,
    /// Trigger a system reset
    Rst = 0x08,
    /// Key FIFO access (read-only)
    Fif = 0x09,
    /// Secondary backlight level
    Bk2 = 0x0A,
    /// GPIO direction
    Dir = 0x0B,
    /// GPIO input pull enable
    Pue = 0x0C,
    /// GPIO input pull direction
    Pud = 0x0D,
    /// GPIO value
    Gio = 0x0E,
    /// GPIO interrupt config
    Gic = 0x0F,
    /// GPIO interrupt status
    Gin = 0x10,
    /// Key hold threshold config (10 ms units)
    Hld = 0x11,
    /// Peripheral bus address
    Adr = 0x12,
    /// Interrupt pin assert duration (ms)
    Ind = 0x13,
    /// Secondary config flags
    Cf2 = 0x14,
    /// Touch delta x since last read (read-and-clear)
    Tox = 0x15,
    /// Touch delta y since last read (read-and-clear)
    Toy = 0x16,
}

pub(crate) const REG_COUNT: usize = 0x17;

impl RegId {
    /// Maps a 7-bit register address to its identifier.
    pub fn from_addr(addr: u8) -> Option<Self> {
        Some(match addr {
            0x01 => Self::Ver,
            0x02 => Self::Cfg,
            0x03 => Self::Int,
            0x04 => Self::Key,
            0x05 => Self::Bkl,
            0x06 => Self::Deb,
            0x07 => Self::Frq,
            0x08 => Self::Rst,
            0x09 => Self::Fif,
            0x0A => Self::Bk2,
            0x0B => Self::Dir,
            0x0C => Self::Pue,
            0x0D => Self::Pud,
            0x0E => Self::Gio,
            0x0F => Self::Gic,
            0x10 => Self::Gin,
            0x11 => Self::Hld,
            0x12 => Self::Adr,
            0x13 => Self::Ind,
            0x14 => Self::Cf2,
            0x15 => Self::Tox,
            0x16 => Self::Toy,
            _ => return None,
        })
    }
}

/// Config register bits.
pub mod cfg {
    /// New FIFO entries overwrite the oldest ones when the FIFO is full
    pub const OVERFLOW_ON: u8 = 1 << 0;
    /// FIFO overflow generates an interrupt
    pub const OVERFLOW_INT: u8 = 1 << 1;
    /// Toggling caps lock generates an interrupt
    pub const CAPSLOCK_INT: u8 = 1 << 2;
    /// Toggling num lock generates an interrupt
    pub const NUMLOCK_INT: u8 = 1 << 3;
    /// Key events generate interrupts
    pub const KEY_INT: u8 = 1 << 4;
    /// Not implemented
    pub const PANIC_INT: u8 = 1 << 5;
    /// Alt, Sym and Shifts are reported as their own key codes
    pub const REPORT_MODS: u8 = 1 << 6;
    /// Alt, Sym and Shifts modify the keys reported
    pub const USE_MODS: u8 = 1 << 7;
}

/// Secondary config register bits.
pub mod cf2 {
    /// Touch events generate interrupts
    pub const TOUCH_INT: u8 = 1 << 0;
    /// Key events are sent over the USB transport
    pub const USB_KEYB_ON: u8 = 1 << 1;
    /// Touch events are sent over the USB transport
    pub const USB_MOUSE_ON: u8 = 1 << 2;
}

/// Interrupt status register bits.
pub mod int {
    pub const OVERFLOW: u8 = 1 << 0;
    pub const CAPSLOCK: u8 = 1 << 1;
    pub const NUMLOCK: u8 = 1 << 2;
    pub const KEY: u8 = 1 << 3;
    pub const PANIC: u8 = 1 << 4;
    pub const GPIO: u8 = 1 << 5;
    pub const TOUCH: u8 = 1 << 6;
}

/// Key status register layout.
pub mod key {
    pub const CAPSLOCK: u8 = 1 << 5;
    pub const NUMLOCK: u8 = 1 << 6;
    pub const COUNT_MASK: u8 = 0x1F;
}

/// Value reported by the version register.
pub const FIRMWARE_VERSION: u8 = (VERSION_MAJOR << 4) | VERSION_MINOR;

/// One byte of state per register, shareable across execution contexts.
pub struct RegisterFile {
    regs: [AtomicU8; REG_COUNT],
}

impl RegisterFile {
    /// Creates a register file holding the power-on defaults.
    pub fn new() -> Self {
        let file = Self {
            regs: [const { AtomicU8::new(0) }; REG_COUNT],
        };

        file.set(RegId::Cfg, cfg::OVERFLOW_INT | cfg::KEY_INT | cfg::USE_MODS);
        file.set(RegId::Bkl, 255);
        file.set(RegId::Deb, 10);
        file.set(RegId::Frq, 10); // ms
        file.set(RegId::Bk2, 255);
        file.set(RegId::Pud, 0xFF);
        file.set(RegId::Hld, 30); // 10 ms units
        file.set(RegId::Adr, 0x1F);
        file.set(RegId::Ind, 1); // ms
        file.set(RegId::Cf2, cf2::TOUCH_INT | cf2::USB_KEYB_ON | cf2::USB_MOUSE_ON);

        file
    }

    pub fn get(&self, reg: RegId) -> u8 {
        self.regs[reg as usize].load(Ordering::Relaxed)
    }

    pub fn set(&self, reg: RegId, value: u8) {
        trace!("reg set: 0x{:02x} = 0x{:02x}", reg as u8, value);
        self.regs[reg as usize].store(value, Ordering::Relaxed);
    }

    pub fn is_bit_set(&self, reg: RegId, mask: u8) -> bool {
        self.get(reg) & mask != 0
    }

    pub fn set_bit(&self, reg: RegId, mask: u8) {
        self.regs[reg as usize].fetch_or(mask, Ordering::Relaxed);
    }

    pub fn clear_bit(&self, reg: RegId, mask: u8) {
        self.regs[reg as usize].fetch_and(!mask, Ordering::Relaxed);
    }

    /// Atomically reads a register and resets it to zero. Backs the
    /// read-and-clear semantics of the touch delta registers.
    pub fn take(&self, reg: RegId) -> u8 {
        self.regs[reg as usize].swap(0, Ordering::Relaxed)
    }

    /// Folds a motion sample into the touch delta registers, saturating at
    /// the i8 range.
    pub fn accumulate_touch(&self, dx: i8, dy: i8) {
        let x = (self.get(RegId::Tox) as i8 as i16 + dx as i16).clamp(i8::MIN as i16, i8::MAX as i16);
        let y = (self.get(RegId::Toy) as i8 as i16 + dy as i16).clamp(i8::MIN as i16, i8::MAX as i16);

        self.set(RegId::Tox, x as i8 as u8);
        self.set(RegId::Toy, y as i8 as u8);
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn power_on_defaults() {
        let regs = RegisterFile::new();
        assert_eq!(regs.get(RegId::Cfg), cfg::OVERFLOW_INT | cfg::KEY_INT | cfg::USE_MODS);
        assert_eq!(regs.get(RegId::Bkl), 255);
        assert_eq!(regs.get(RegId::Frq), 10);
        assert_eq!(regs.get(RegId::Hld), 30);
        assert_eq!(regs.get(RegId::Adr), 0x1F);
        assert_eq!(regs.get(RegId::Int), 0);
    }

    #[test]
    fn bit_operations() {
        let regs = RegisterFile::new();
        regs.set(RegId::Int, 0);
        regs.set_bit(RegId::Int, int::KEY);
        regs.set_bit(RegId::Int, int::OVERFLOW);
        assert!(regs.is_bit_set(RegId::Int, int::KEY));
        assert!(regs.is_bit_set(RegId::Int, int::OVERFLOW));
        regs.clear_bit(RegId::Int, int::KEY);
        assert!(!regs.is_bit_set(RegId::Int, int::KEY));
        assert!(regs.is_bit_set(RegId::Int, int::OVERFLOW));
    }

    #[test]
    fn touch_deltas_accumulate_and_clamp() {
        let regs = RegisterFile::new();
        regs.accumulate_touch(10, -3);
        regs.accumulate_touch(5, -4);
        assert_eq!(regs.get(RegId::Tox) as i8, 15);
        assert_eq!(regs.get(RegId::Toy) as i8, -7);

        for _ in 0..30 {
            regs.accumulate_touch(120, -120);
        }
        assert_eq!(regs.get(RegId::Tox) as i8, i8::MAX);
        assert_eq!(regs.get(RegId::Toy) as i8, i8::MIN);
    }

    #[test]
    fn take_is_read_and_clear() {
        let regs = RegisterFile::new();
        regs.accumulate_touch(7, 0);
        assert_eq!(regs.take(RegId::Tox) as i8, 7);
        assert_eq!(regs.take(RegId::Tox), 0);
    }

    #[test]
    fn addr_round_trip() {
        for addr in 0x01..=0x16u8 {
            let reg = RegId::from_addr(addr).unwrap();
            assert_eq!(reg as u8, addr);
        }
        assert_eq!(RegId::from_addr(0x00), None);
        assert_eq!(RegId::from_addr(0x17), None);
        assert_eq!(RegId::from_addr(0x7F), None);
    }
}
