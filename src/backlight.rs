//! Keyboard backlight control.
//!
//! The backlight level registers are plain bytes; this module pushes them to
//! the PWM hardware whenever the protocol handler reports a write.

use embedded_hal::pwm::SetDutyCycle;

use crate::registers::{RegId, RegisterFile};

/// Re-applies the backlight level registers to the hardware.
pub trait BacklightDriver {
    fn sync(&mut self);
}

/// PWM-backed backlight: one channel per level register.
pub struct PwmBacklight<'a, P: SetDutyCycle> {
    regs: &'a RegisterFile,
    primary: P,
    secondary: P,
}

impl<'a, P: SetDutyCycle> PwmBacklight<'a, P> {
    /// Wraps the two PWM channels and applies the current register values.
    pub fn new(regs: &'a RegisterFile, primary: P, secondary: P) -> Self {
        let mut backlight = Self {
            regs,
            primary,
            secondary,
        };
        backlight.sync();
        backlight
    }
}

impl<P: SetDutyCycle> BacklightDriver for PwmBacklight<'_, P> {
    fn sync(&mut self) {
        let bkl = self.regs.get(RegId::Bkl);
        let bk2 = self.regs.get(RegId::Bk2);
        debug!("backlight sync: {} / {}", bkl, bk2);

        self.primary.set_duty_cycle_fraction(bkl as u16, 255).ok();
        self.secondary.set_duty_cycle_fraction(bk2 as u16, 255).ok();
    }
}
