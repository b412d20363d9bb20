use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{InputPin, OutputPin};
use keywing::backlight::BacklightDriver;
use keywing::gpioexp::GpioExpander;
use keywing::protocol::SystemControl;

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Simulated key matrix wiring: columns are scanned active low, a row line
/// reads low when the key at (row, active column) is held.
#[derive(Clone, Default)]
pub struct Board {
    pressed: Rc<RefCell<HashSet<(usize, usize)>>>,
    buttons: Rc<RefCell<HashSet<usize>>>,
    active_col: Rc<Cell<Option<usize>>>,
}

impl Board {
    pub fn press(&self, row: usize, col: usize) {
        self.pressed.borrow_mut().insert((row, col));
    }

    pub fn release(&self, row: usize, col: usize) {
        self.pressed.borrow_mut().remove(&(row, col));
    }

    pub fn row_pins<const ROWS: usize>(&self) -> [RowPin; ROWS] {
        std::array::from_fn(|row| RowPin {
            line: Line::Row(row),
            board: self.clone(),
        })
    }

    pub fn col_pins<const COLS: usize>(&self) -> [ColPin; COLS] {
        std::array::from_fn(|idx| ColPin {
            idx,
            board: self.clone(),
        })
    }

    pub fn btn_pins<const BTNS: usize>(&self) -> [RowPin; BTNS] {
        std::array::from_fn(|btn| RowPin {
            line: Line::Button(btn),
            board: self.clone(),
        })
    }
}

#[derive(Clone, Copy)]
enum Line {
    Row(usize),
    Button(usize),
}

pub struct RowPin {
    line: Line,
    board: Board,
}

impl embedded_hal::digital::ErrorType for RowPin {
    type Error = Infallible;
}

impl InputPin for RowPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(!self.is_low()?)
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        match self.line {
            Line::Row(row) => {
                let Some(col) = self.board.active_col.get() else {
                    return Ok(false);
                };
                Ok(self.board.pressed.borrow().contains(&(row, col)))
            }
            Line::Button(btn) => Ok(self.board.buttons.borrow().contains(&btn)),
        }
    }
}

pub struct ColPin {
    idx: usize,
    board: Board,
}

impl embedded_hal::digital::ErrorType for ColPin {
    type Error = Infallible;
}

impl OutputPin for ColPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.board.active_col.set(Some(self.idx));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if self.board.active_col.get() == Some(self.idx) {
            self.board.active_col.set(None);
        }
        Ok(())
    }
}

/// Interrupt line stub counting assert pulses.
#[derive(Clone, Default)]
pub struct IntPin {
    pub pulses: Rc<RefCell<usize>>,
}

impl embedded_hal::digital::ErrorType for IntPin {
    type Error = Infallible;
}

impl OutputPin for IntPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        *self.pulses.borrow_mut() += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

#[derive(Default)]
pub struct NoDelay;

impl embedded_hal::delay::DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Records every collaborator call the protocol handler makes.
#[derive(Clone, Default)]
pub struct Probe {
    pub backlight_syncs: Rc<RefCell<usize>>,
    pub addr_syncs: Rc<RefCell<usize>>,
    pub resets: Rc<RefCell<usize>>,
    pub gpio_input: Rc<RefCell<u8>>,
}

impl BacklightDriver for Probe {
    fn sync(&mut self) {
        *self.backlight_syncs.borrow_mut() += 1;
    }
}

impl GpioExpander for Probe {
    fn update_dir(&mut self, _new_dir: u8) {}

    fn update_pull(&mut self, _new_pue: u8, _new_pud: u8) {}

    fn set_output(&mut self, _value: u8) {}

    fn read_input(&mut self) -> u8 {
        *self.gpio_input.borrow()
    }
}

impl SystemControl for Probe {
    fn sync_address(&mut self) {
        *self.addr_syncs.borrow_mut() += 1;
    }

    fn system_reset(&mut self) {
        *self.resets.borrow_mut() += 1;
    }
}
