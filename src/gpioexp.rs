//! The GPIO expander surface: spare MCU pins exposed to the host through the
//! direction, pull and value registers.
//!
//! The direction register is the source of truth for pin modes (1 = input,
//! the power-on state). Reconfiguration is diff-based: a register write only
//! touches the pins whose bits actually changed.

use crate::registers::{RegId, RegisterFile};

/// Pull resistor selection for an input pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    Up,
    Down,
}

/// One reconfigurable expander pin. Board glue adapts the HAL's pin types;
/// configuration errors are the glue's problem, the register model never
/// sees them.
pub trait ExpanderPin {
    /// Switches the pin to input mode with the given pull (floating when
    /// `None`) and enables its edge detection.
    fn set_input(&mut self, pull: Option<Pull>);

    /// Switches the pin to output mode and disables its edge detection.
    fn set_output(&mut self);

    /// Drives an output pin.
    fn set_level(&mut self, high: bool);

    /// Samples the pin.
    fn level(&mut self) -> bool;
}

/// The operations the protocol handler needs from the expander.
pub trait GpioExpander {
    fn update_dir(&mut self, new_dir: u8);
    fn update_pull(&mut self, new_pue: u8, new_pud: u8);
    fn set_output(&mut self, value: u8);
    fn read_input(&mut self) -> u8;
}

/// Register-driven expander over up to eight pins.
pub struct GpioExpanderService<'a, P: ExpanderPin, const N: usize> {
    regs: &'a RegisterFile,
    pins: [P; N],
}

impl<'a, P: ExpanderPin, const N: usize> GpioExpanderService<'a, P, N> {
    /// Wraps the pins and configures them all as inputs.
    pub fn new(regs: &'a RegisterFile, pins: [P; N]) -> Self {
        let mut service = Self { regs, pins };
        service.update_dir(0xFF);
        service
    }

    /// Applies the registered mode and pull to one pin and mirrors the
    /// result into the direction register.
    fn apply(&mut self, idx: usize, input: bool) {
        let mask = 1 << idx;

        if input {
            let pull = if self.regs.is_bit_set(RegId::Pue, mask) {
                if self.regs.is_bit_set(RegId::Pud, mask) {
                    Some(Pull::Up)
                } else {
                    Some(Pull::Down)
                }
            } else {
                None
            };

            self.pins[idx].set_input(pull);
            self.regs.set_bit(RegId::Dir, mask);
        } else {
            self.pins[idx].set_output();
            self.regs.clear_bit(RegId::Dir, mask);
        }
    }
}

impl<P: ExpanderPin, const N: usize> GpioExpander for GpioExpanderService<'_, P, N> {
    fn update_dir(&mut self, new_dir: u8) {
        debug!("gpio dir: 0x{:02x}", new_dir);

        let old_dir = self.regs.get(RegId::Dir);
        for idx in 0..N {
            let mask = 1 << idx;
            if (old_dir ^ new_dir) & mask != 0 {
                self.apply(idx, new_dir & mask != 0);
            }
        }
    }

    fn update_pull(&mut self, new_pue: u8, new_pud: u8) {
        debug!("gpio pull: pue 0x{:02x}, pud 0x{:02x}", new_pue, new_pud);

        let old_pue = self.regs.get(RegId::Pue);
        let old_pud = self.regs.get(RegId::Pud);
        self.regs.set(RegId::Pue, new_pue);
        self.regs.set(RegId::Pud, new_pud);

        for idx in 0..N {
            let mask = 1 << idx;
            if ((old_pue ^ new_pue) | (old_pud ^ new_pud)) & mask != 0 {
                self.apply(idx, self.regs.is_bit_set(RegId::Dir, mask));
            }
        }
    }

    fn set_output(&mut self, value: u8) {
        for idx in 0..N {
            let mask = 1 << idx;
            // output pins have their direction bit cleared
            if !self.regs.is_bit_set(RegId::Dir, mask) {
                self.pins[idx].set_level(value & mask != 0);
            }
        }
    }

    fn read_input(&mut self) -> u8 {
        let mut value = 0;
        for idx in 0..N {
            if self.pins[idx].level() {
                value |= 1 << idx;
            }
        }
        value
    }
}
