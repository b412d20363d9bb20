//! Interrupt pin glue: latches cause bits in the interrupt status registers
//! and pulses the active-low interrupt line towards the host.
//!
//! The controller subscribes to the event bus and must be registered before
//! any host transport, so the cause bits are in place by the time a
//! subscriber forwards the event.

use core::cell::RefCell;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::bus::{KeyEventListener, LockChangeListener, TouchListener};
use crate::event::KeyEvent;
use crate::registers::{RegId, RegisterFile, cf2, cfg, int};

struct IntLine<P, D> {
    pin: P,
    delay: D,
}

/// Owns the interrupt output pin. Bus listeners take `&self`, so the pin and
/// its delay source live behind a `RefCell`.
pub struct InterruptController<'a, P: OutputPin, D: DelayNs> {
    regs: &'a RegisterFile,
    line: RefCell<IntLine<P, D>>,
}

impl<'a, P: OutputPin, D: DelayNs> InterruptController<'a, P, D> {
    /// Wraps the pin, deasserted (high).
    pub fn new(regs: &'a RegisterFile, mut pin: P, delay: D) -> Self {
        pin.set_high().ok();
        Self {
            regs,
            line: RefCell::new(IntLine { pin, delay }),
        }
    }

    /// Asserts the line for the configured duration.
    fn pulse(&self) {
        let duration_ms = self.regs.get(RegId::Ind) as u32;
        let mut line = self.line.borrow_mut();
        line.pin.set_low().ok();
        line.delay.delay_ms(duration_ms);
        line.pin.set_high().ok();
    }

    /// Reports an edge on an expander input pin. Gated per pin by the GPIO
    /// interrupt config register.
    pub fn on_gpio_edge(&self, pin_idx: u8) {
        let mask = 1 << pin_idx;
        if !self.regs.is_bit_set(RegId::Gic, mask) {
            return;
        }

        self.regs.set_bit(RegId::Int, int::GPIO);
        self.regs.set_bit(RegId::Gin, mask);
        self.pulse();
    }
}

impl<P: OutputPin, D: DelayNs> KeyEventListener for InterruptController<'_, P, D> {
    fn on_key_event(&self, _event: KeyEvent) {
        if !self.regs.is_bit_set(RegId::Cfg, cfg::KEY_INT) {
            return;
        }

        self.regs.set_bit(RegId::Int, int::KEY);
        self.pulse();
    }
}

impl<P: OutputPin, D: DelayNs> LockChangeListener for InterruptController<'_, P, D> {
    fn on_lock_change(&self, caps_changed: bool, num_changed: bool) {
        let mut assert_line = false;

        if caps_changed && self.regs.is_bit_set(RegId::Cfg, cfg::CAPSLOCK_INT) {
            self.regs.set_bit(RegId::Int, int::CAPSLOCK);
            assert_line = true;
        }

        if num_changed && self.regs.is_bit_set(RegId::Cfg, cfg::NUMLOCK_INT) {
            self.regs.set_bit(RegId::Int, int::NUMLOCK);
            assert_line = true;
        }

        if assert_line {
            self.pulse();
        }
    }
}

impl<P: OutputPin, D: DelayNs> TouchListener for InterruptController<'_, P, D> {
    fn on_touch(&self, _dx: i8, _dy: i8) {
        if !self.regs.is_bit_set(RegId::Cf2, cf2::TOUCH_INT) {
            return;
        }

        self.regs.set_bit(RegId::Int, int::TOUCH);
        self.pulse();
    }
}
