//! Touch motion handling: raw deltas while idle, synthetic joystick swipes
//! while alt is held.

use embassy_time::{Duration, Instant, Timer};

use crate::bus::TouchListener;
use crate::event::KeyState;
use crate::keyboard::{EventSink, ModifierState};
use crate::keycode::{KEY_JOY_DOWN, KEY_JOY_LEFT, KEY_JOY_RIGHT, KEY_JOY_UP};
use crate::layout::Modifier;
use crate::registers::RegisterFile;

/// Minimum time between two synthesized swipes.
pub const SWIPE_COOLDOWN: Duration = Duration::from_millis(100);

/// Delay between the synthetic press and its release, so a host transport
/// gets to forward the press first.
pub const SWIPE_RELEASE_DELAY: Duration = Duration::from_millis(10);

/// A motion sample is a swipe when the major axis is decisive and the minor
/// axis stays near zero.
const fn is_swipe(major: i8, minor: i8) -> bool {
    (major >= 15 || major <= -15) && (minor >= -5 && minor <= 5)
}

/// Classifies a motion sample, vertical axis first.
fn swipe_key(dx: i8, dy: i8) -> Option<u8> {
    if is_swipe(dy, dx) {
        Some(if dy < 0 { KEY_JOY_UP } else { KEY_JOY_DOWN })
    } else if is_swipe(dx, dy) {
        Some(if dx < 0 { KEY_JOY_LEFT } else { KEY_JOY_RIGHT })
    } else {
        None
    }
}

/// Routes motion samples: swipe synthesis while alt is held, raw delta
/// dispatch otherwise.
pub struct TouchProcessor<'a> {
    sink: EventSink<'a>,
    mods: &'a ModifierState,
    last_swipe: Option<Instant>,
}

impl<'a> TouchProcessor<'a> {
    pub fn new(sink: EventSink<'a>, mods: &'a ModifierState) -> Self {
        Self {
            sink,
            mods,
            last_swipe: None,
        }
    }

    /// Feeds one motion sample. When a swipe fires, the synthetic press is
    /// published immediately and the key is returned so the caller can
    /// schedule the release.
    pub fn on_motion(&mut self, dx: i8, dy: i8) -> Option<u8> {
        if !self.mods.is_on(Modifier::Alt) {
            self.sink.bus.dispatch_touch(dx, dy);
            return None;
        }

        if let Some(last) = self.last_swipe {
            if last.elapsed() <= SWIPE_COOLDOWN {
                return None;
            }
        }

        let key = swipe_key(dx, dy)?;
        debug!("swipe: key 0x{:02x}", key);

        self.sink.inject(key, KeyState::Pressed);
        self.last_swipe = Some(Instant::now());

        Some(key)
    }

    /// `on_motion` plus the delayed release.
    pub async fn handle_motion(&mut self, dx: i8, dy: i8) {
        if let Some(key) = self.on_motion(dx, dy) {
            Timer::after(SWIPE_RELEASE_DELAY).await;
            self.sink.inject(key, KeyState::Released);
        }
    }
}

/// Folds raw deltas into the touch delta registers. Subscribed to the touch
/// bus ahead of the interrupt glue.
pub struct DeltaAccumulator<'a> {
    regs: &'a RegisterFile,
}

impl<'a> DeltaAccumulator<'a> {
    pub fn new(regs: &'a RegisterFile) -> Self {
        Self { regs }
    }
}

impl TouchListener for DeltaAccumulator<'_> {
    fn on_touch(&self, dx: i8, dy: i8) {
        self.regs.accumulate_touch(dx, dy);
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use embassy_futures::block_on;
    use embassy_time::MockDriver;
    use rusty_fork::rusty_fork_test;

    use super::*;
    use crate::bus::EventBus;
    use crate::event::KeyEvent;
    use crate::fifo::shared_fifo;
    use crate::registers::RegId;

    #[test]
    fn swipe_classification() {
        assert_eq!(swipe_key(0, -20), Some(KEY_JOY_UP));
        assert_eq!(swipe_key(3, 15), Some(KEY_JOY_DOWN));
        assert_eq!(swipe_key(-16, 5), Some(KEY_JOY_LEFT));
        assert_eq!(swipe_key(30, 0), Some(KEY_JOY_RIGHT));

        // too short on the major axis
        assert_eq!(swipe_key(14, 0), None);
        // too much drift on the minor axis
        assert_eq!(swipe_key(20, 6), None);
        // a diagonal is not a swipe
        assert_eq!(swipe_key(20, 20), None);
    }

    #[test]
    fn accumulator_folds_deltas_into_registers() {
        let regs = RegisterFile::new();
        let acc = DeltaAccumulator::new(&regs);

        acc.on_touch(4, -2);
        acc.on_touch(1, -1);
        assert_eq!(regs.get(RegId::Tox) as i8, 5);
        assert_eq!(regs.get(RegId::Toy) as i8, -3);
    }

    struct TouchTap {
        seen: RefCell<Vec<(i8, i8)>>,
    }

    impl TouchListener for TouchTap {
        fn on_touch(&self, dx: i8, dy: i8) {
            self.seen.borrow_mut().push((dx, dy));
        }
    }

    rusty_fork_test! {

    #[test]
    fn motion_without_alt_reaches_touch_listeners() {
        let regs = RegisterFile::new();
        let fifo = shared_fifo();
        let mods = ModifierState::new();
        let tap = TouchTap {
            seen: RefCell::new(Vec::new()),
        };
        let mut bus = EventBus::new();
        bus.subscribe_touch(&tap);
        let mut tp = TouchProcessor::new(EventSink::new(&regs, &fifo, &bus), &mods);

        assert_eq!(tp.on_motion(20, 0), None);
        assert_eq!(*tap.seen.borrow(), [(20, 0)]);
        assert_eq!(fifo.lock(|f| f.borrow().count()), 0);
    }

    #[test]
    fn alt_held_swipe_injects_press_and_release() {
        let regs = RegisterFile::new();
        let fifo = shared_fifo();
        let mods = ModifierState::new();
        mods.set(Modifier::Alt, true);
        let bus = EventBus::new();
        let mut tp = TouchProcessor::new(EventSink::new(&regs, &fifo, &bus), &mods);

        let driver = MockDriver::get();
        block_on(embassy_futures::join::join(tp.handle_motion(0, -20), async {
            driver.advance(SWIPE_RELEASE_DELAY + Duration::from_millis(1));
        }));

        fifo.lock(|f| {
            let mut f = f.borrow_mut();
            assert_eq!(f.dequeue(), KeyEvent::new(KEY_JOY_UP, KeyState::Pressed));
            assert_eq!(f.dequeue(), KeyEvent::new(KEY_JOY_UP, KeyState::Released));
        });
    }

    #[test]
    fn swipes_respect_the_cooldown() {
        let regs = RegisterFile::new();
        let fifo = shared_fifo();
        let mods = ModifierState::new();
        mods.set(Modifier::Alt, true);
        let bus = EventBus::new();
        let mut tp = TouchProcessor::new(EventSink::new(&regs, &fifo, &bus), &mods);

        assert_eq!(tp.on_motion(20, 0), Some(KEY_JOY_RIGHT));
        assert_eq!(tp.on_motion(20, 0), None);

        MockDriver::get().advance(SWIPE_COOLDOWN + Duration::from_millis(1));
        assert_eq!(tp.on_motion(-20, 0), Some(KEY_JOY_LEFT));
    }

    #[test]
    fn non_swipe_motion_with_alt_is_swallowed() {
        let regs = RegisterFile::new();
        let fifo = shared_fifo();
        let mods = ModifierState::new();
        mods.set(Modifier::Alt, true);
        let tap = TouchTap {
            seen: RefCell::new(Vec::new()),
        };
        let mut bus = EventBus::new();
        bus.subscribe_touch(&tap);
        let mut tp = TouchProcessor::new(EventSink::new(&regs, &fifo, &bus), &mods);

        assert_eq!(tp.on_motion(5, 5), None);
        assert!(tap.seen.borrow().is_empty());
        assert_eq!(fifo.lock(|f| f.borrow().count()), 0);
    }

    }
}
