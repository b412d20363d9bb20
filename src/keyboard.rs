//! Keyboard matrix scanner: polls the matrix and auxiliary buttons, tracks
//! each press through a per-slot state machine, and publishes the resulting
//! key events.
//!
//! A press moves through `Idle -> Pressed -> (Hold ->) Released -> Idle`.
//! The output byte for a press is resolved once, at the `Idle -> Pressed`
//! edge, and reused for the `Hold` and `Released` events of the same press
//! even if the modifier set changes mid-press.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::{InputPin, OutputPin};

use crate::ACTIVE_KEY_SLOTS;
use crate::bus::EventBus;
use crate::event::{KeyEvent, KeyState};
use crate::fifo::SharedFifo;
use crate::keycode::{self, is_button_code};
use crate::layout::{KeyLayout, Modifier};
use crate::registers::{RegId, RegisterFile, cfg, int};

/// Process-wide modifier and lock-latch state.
///
/// Mutated only by the scanner; read concurrently by the protocol handler
/// (key status register) and the touch gesture path (alt check).
pub struct ModifierState {
    // indexed by `Modifier`; slot 0 (None) stays false
    mods: [AtomicBool; 5],
    capslock: AtomicBool,
    numlock: AtomicBool,
    capslock_changed: AtomicBool,
    numlock_changed: AtomicBool,
}

impl ModifierState {
    pub const fn new() -> Self {
        Self {
            mods: [const { AtomicBool::new(false) }; 5],
            capslock: AtomicBool::new(false),
            numlock: AtomicBool::new(false),
            capslock_changed: AtomicBool::new(false),
            numlock_changed: AtomicBool::new(false),
        }
    }

    const fn index(modifier: Modifier) -> usize {
        match modifier {
            Modifier::None => 0,
            Modifier::Sym => 1,
            Modifier::Alt => 2,
            Modifier::LeftShift => 3,
            Modifier::RightShift => 4,
        }
    }

    pub fn is_on(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::None => false,
            _ => self.mods[Self::index(modifier)].load(Ordering::Relaxed),
        }
    }

    pub(crate) fn set(&self, modifier: Modifier, on: bool) {
        if modifier != Modifier::None {
            self.mods[Self::index(modifier)].store(on, Ordering::Relaxed);
        }
    }

    pub fn capslock(&self) -> bool {
        self.capslock.load(Ordering::Relaxed)
    }

    pub fn numlock(&self) -> bool {
        self.numlock.load(Ordering::Relaxed)
    }

    pub(crate) fn set_capslock(&self, on: bool) {
        self.capslock.store(on, Ordering::Relaxed);
        self.capslock_changed.store(true, Ordering::Relaxed);
    }

    pub(crate) fn set_numlock(&self, on: bool) {
        self.numlock.store(on, Ordering::Relaxed);
        self.numlock_changed.store(true, Ordering::Relaxed);
    }

    fn capslock_changed(&self) -> bool {
        self.capslock_changed.load(Ordering::Relaxed)
    }

    fn numlock_changed(&self) -> bool {
        self.numlock_changed.load(Ordering::Relaxed)
    }

    fn clear_changed(&self) {
        self.capslock_changed.store(false, Ordering::Relaxed);
        self.numlock_changed.store(false, Ordering::Relaxed);
    }
}

impl Default for ModifierState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared hand-off point for produced key events: offers every event to the
/// FIFO (applying the configured overflow policy) and then dispatches it to
/// all key event subscribers in registration order.
#[derive(Clone, Copy)]
pub struct EventSink<'a> {
    pub(crate) regs: &'a RegisterFile,
    pub(crate) fifo: &'a SharedFifo,
    pub(crate) bus: &'a EventBus<'a>,
}

impl<'a> EventSink<'a> {
    pub fn new(regs: &'a RegisterFile, fifo: &'a SharedFifo, bus: &'a EventBus<'a>) -> Self {
        Self { regs, fifo, bus }
    }

    /// Publishes an event through the queue/dispatch path. Queue overflow is
    /// never a hard failure: depending on config it raises the overflow
    /// interrupt bit, force-overwrites the oldest event, both, or neither.
    /// Subscribers see the event regardless of the queue outcome.
    pub fn publish(&self, event: KeyEvent) {
        let queued = self.fifo.lock(|fifo| fifo.borrow_mut().enqueue(event));
        if !queued {
            if self.regs.is_bit_set(RegId::Cfg, cfg::OVERFLOW_INT) {
                self.regs.set_bit(RegId::Int, int::OVERFLOW);
            }
            if self.regs.is_bit_set(RegId::Cfg, cfg::OVERFLOW_ON) {
                self.fifo.lock(|fifo| fifo.borrow_mut().enqueue_force(event));
            }
        }

        self.bus.dispatch_key_event(event);
    }

    /// Pushes a synthetic key event (e.g. from gesture synthesis) through
    /// the same path as physical keys.
    pub fn inject(&self, key: u8, state: KeyState) {
        self.publish(KeyEvent::new(key, state));
    }
}

/// One tracked key press.
#[derive(Clone, Copy)]
struct KeySlot {
    /// Stable catalog index of the tracked position, `None` when free.
    key: Option<u16>,
    state: KeyState,
    hold_start: Instant,
    /// Output byte memoized at the `Idle -> Pressed` edge; 0 = suppressed.
    output: u8,
}

impl KeySlot {
    const EMPTY: Self = Self {
        key: None,
        state: KeyState::Idle,
        hold_start: Instant::MIN,
        output: 0,
    };
}

/// The matrix/button scanner. Columns are driven low one at a time; rows
/// are pulled up externally, so a low row line means pressed. Auxiliary
/// buttons are plain active-low inputs.
pub struct Scanner<'a, In, Out, const ROWS: usize, const COLS: usize, const BTNS: usize>
where
    In: InputPin,
    Out: OutputPin,
{
    row_pins: [In; ROWS],
    col_pins: [Out; COLS],
    btn_pins: [In; BTNS],
    layout: &'a KeyLayout<ROWS, COLS, BTNS>,
    mods: &'a ModifierState,
    sink: EventSink<'a>,
    slots: [KeySlot; ACTIVE_KEY_SLOTS],
    last_scan: Option<Instant>,
}

impl<'a, In, Out, const ROWS: usize, const COLS: usize, const BTNS: usize> Scanner<'a, In, Out, ROWS, COLS, BTNS>
where
    In: InputPin,
    Out: OutputPin,
{
    pub fn new(
        row_pins: [In; ROWS],
        col_pins: [Out; COLS],
        btn_pins: [In; BTNS],
        layout: &'a KeyLayout<ROWS, COLS, BTNS>,
        mods: &'a ModifierState,
        sink: EventSink<'a>,
    ) -> Self {
        Self {
            row_pins,
            col_pins,
            btn_pins,
            layout,
            mods,
            sink,
            slots: [KeySlot::EMPTY; ACTIVE_KEY_SLOTS],
            last_scan: None,
        }
    }

    /// Runs the scanner, re-arming from the last *scheduled* instant so the
    /// poll period does not accumulate drift. The timer already paces the
    /// passes, so they bypass the cadence gate.
    pub async fn run(&mut self) {
        let mut next_scan = Instant::now();
        loop {
            self.scan_pass();
            // a poll frequency register value of 0 would re-arm immediately
            let period = self.sink.regs.get(RegId::Frq).max(1);
            next_scan += Duration::from_millis(period as u64);
            Timer::at(next_scan).await;
        }
    }

    /// One scan pass for free-running callers. Returns without touching the
    /// hardware when called again within the configured poll period.
    pub fn scan(&mut self) {
        if let Some(last) = self.last_scan {
            if last.elapsed().as_millis() <= self.sink.regs.get(RegId::Frq) as u64 {
                return;
            }
        }

        self.scan_pass();
    }

    fn scan_pass(&mut self) {
        for col in 0..COLS {
            if let Some(col_pin) = self.col_pins.get_mut(col) {
                col_pin.set_low().ok();
            }

            for row in 0..ROWS {
                let pressed = match self.row_pins.get_mut(row) {
                    Some(row_pin) => row_pin.is_low().ok().unwrap_or_default(),
                    None => continue,
                };
                self.feed(KeyLayout::<ROWS, COLS, BTNS>::key_index(row, col), pressed);
            }

            if let Some(col_pin) = self.col_pins.get_mut(col) {
                col_pin.set_high().ok();
            }
        }

        for btn in 0..BTNS {
            let pressed = match self.btn_pins.get_mut(btn) {
                Some(btn_pin) => btn_pin.is_low().ok().unwrap_or_default(),
                None => continue,
            };
            self.feed(KeyLayout::<ROWS, COLS, BTNS>::button_index(btn), pressed);
        }

        self.last_scan = Some(Instant::now());
    }

    /// Feeds one sampled position into its slot, allocating a free slot for
    /// a fresh press. Pool exhaustion silently drops the press.
    fn feed(&mut self, index: u16, pressed: bool) {
        let slot_i = match self.slots.iter().position(|s| s.key == Some(index)) {
            Some(i) => i,
            None => {
                if !pressed {
                    return;
                }
                match self.slots.iter().position(|s| s.key.is_none()) {
                    Some(i) => {
                        self.slots[i] = KeySlot {
                            key: Some(index),
                            ..KeySlot::EMPTY
                        };
                        i
                    }
                    None => {
                        debug!("key slots exhausted, dropping press at {}", index);
                        return;
                    }
                }
            }
        };

        self.step(slot_i, pressed);
    }

    fn step(&mut self, slot_i: usize, pressed: bool) {
        let Some(index) = self.slots[slot_i].key else {
            return;
        };

        match self.slots[slot_i].state {
            KeyState::Idle => {
                if !pressed {
                    return;
                }

                let entry = self.layout.entry(index);
                if entry.modifier != Modifier::None {
                    self.mods.set(entry.modifier, true);
                    self.update_locks();
                }

                self.slots[slot_i].output = self.resolve(entry);
                self.transition(slot_i, KeyState::Pressed);
                self.slots[slot_i].hold_start = Instant::now();
            }
            KeyState::Pressed => {
                let threshold = Duration::from_millis(self.sink.regs.get(RegId::Hld) as u64 * 10);
                if self.slots[slot_i].hold_start.elapsed() > threshold {
                    self.transition(slot_i, KeyState::Hold);
                } else if !pressed {
                    self.release(slot_i, index);
                }
            }
            KeyState::Hold => {
                if !pressed {
                    self.release(slot_i, index);
                }
            }
            // slots never rest in Released; release() retires them in the
            // same poll
            KeyState::Released => self.retire(slot_i, index),
        }
    }

    fn release(&mut self, slot_i: usize, index: u16) {
        self.transition(slot_i, KeyState::Released);
        self.retire(slot_i, index);
    }

    /// The `Released -> Idle` edge: clears the modifier flag the entry
    /// carried and returns the slot to the free pool. Emits nothing.
    fn retire(&mut self, slot_i: usize, index: u16) {
        let modifier = self.layout.entry(index).modifier;
        if modifier != Modifier::None {
            self.mods.set(modifier, false);
        }

        self.slots[slot_i] = KeySlot::EMPTY;
    }

    fn transition(&mut self, slot_i: usize, next: KeyState) {
        self.slots[slot_i].state = next;

        let key = self.slots[slot_i].output;
        if key != 0 {
            self.sink.publish(KeyEvent::new(key, next));
        }
    }

    /// The lock-latch chord rule, evaluated while a modifier flag is being
    /// set. The cancel checks run after the latch checks and deliberately
    /// ignore alt, so a bare shift can drop a lock the same evaluation
    /// latched for the other shift; this mirrors the device's established
    /// behavior.
    fn update_locks(&mut self) {
        let shl = self.mods.is_on(Modifier::LeftShift);
        let shr = self.mods.is_on(Modifier::RightShift);
        let alt = self.mods.is_on(Modifier::Alt);

        if !self.mods.capslock_changed() && shr && alt {
            self.mods.set_capslock(true);
        }

        if !self.mods.numlock_changed() && shl && alt {
            self.mods.set_numlock(true);
        }

        if !self.mods.capslock_changed() && (shl || shr) {
            self.mods.set_capslock(false);
        }

        if !self.mods.numlock_changed() && (shl || shr) {
            self.mods.set_numlock(false);
        }

        if !alt {
            self.mods.clear_changed();
        }

        if self.mods.capslock_changed() || self.mods.numlock_changed() {
            self.sink
                .bus
                .dispatch_lock_change(self.mods.capslock_changed(), self.mods.numlock_changed());
        }
    }

    /// Resolves the output byte for a fresh press from the current modifier
    /// set and config flags.
    fn resolve(&self, entry: &crate::layout::KeyEntry) -> u8 {
        let report_mods = self.sink.regs.is_bit_set(RegId::Cfg, cfg::REPORT_MODS);

        match entry.modifier {
            Modifier::Alt if report_mods => keycode::KEY_MOD_ALT,
            Modifier::LeftShift if report_mods => keycode::KEY_MOD_SHL,
            Modifier::RightShift if report_mods => keycode::KEY_MOD_SHR,
            Modifier::Sym if report_mods => keycode::KEY_MOD_SYM,
            Modifier::None => {
                let mut chr = entry.chr;
                if self.sink.regs.is_bit_set(RegId::Cfg, cfg::USE_MODS) {
                    let shift =
                        self.mods.is_on(Modifier::LeftShift) || self.mods.is_on(Modifier::RightShift) || self.mods.capslock();
                    let alt = self.mods.is_on(Modifier::Alt) || self.mods.numlock();

                    if alt && !is_button_code(chr) {
                        chr = entry.symb;
                    } else if !shift && chr.is_ascii_uppercase() {
                        chr = chr.to_ascii_lowercase();
                    }
                }
                chr
            }
            // modifier keys stay silent unless REPORT_MODS is on
            _ => entry.chr,
        }
    }
}
