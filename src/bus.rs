//! Event fan-out to subscribers.
//!
//! Subscribers are registered once at start-up; dispatch walks each list in
//! registration order. The order is a correctness invariant, not a detail:
//! later subscribers (e.g. a host transport) may rely on register bits set
//! by earlier ones (the interrupt glue) for the same event.

use heapless::Vec;

use crate::MAX_SUBSCRIBERS;
use crate::event::KeyEvent;

/// Receives every key event produced by the scanner or injected
/// synthetically, after it has been offered to the FIFO.
pub trait KeyEventListener {
    fn on_key_event(&self, event: KeyEvent);
}

/// Receives caps-lock/num-lock latch changes. The flags tell which latch
/// changed during the current chord evaluation.
pub trait LockChangeListener {
    fn on_lock_change(&self, caps_changed: bool, num_changed: bool);
}

/// Receives raw touch motion deltas that were not intercepted for gesture
/// synthesis.
pub trait TouchListener {
    fn on_touch(&self, dx: i8, dy: i8);
}

/// Ordered subscriber lists for the three event kinds.
pub struct EventBus<'a> {
    key_listeners: Vec<&'a dyn KeyEventListener, MAX_SUBSCRIBERS>,
    lock_listeners: Vec<&'a dyn LockChangeListener, MAX_SUBSCRIBERS>,
    touch_listeners: Vec<&'a dyn TouchListener, MAX_SUBSCRIBERS>,
}

impl<'a> EventBus<'a> {
    pub const fn new() -> Self {
        Self {
            key_listeners: Vec::new(),
            lock_listeners: Vec::new(),
            touch_listeners: Vec::new(),
        }
    }

    /// Appends a key event subscriber; returns `false` when the list is
    /// full.
    pub fn subscribe_key_event(&mut self, listener: &'a dyn KeyEventListener) -> bool {
        self.key_listeners.push(listener).is_ok()
    }

    pub fn subscribe_lock_change(&mut self, listener: &'a dyn LockChangeListener) -> bool {
        self.lock_listeners.push(listener).is_ok()
    }

    pub fn subscribe_touch(&mut self, listener: &'a dyn TouchListener) -> bool {
        self.touch_listeners.push(listener).is_ok()
    }

    pub fn dispatch_key_event(&self, event: KeyEvent) {
        for listener in &self.key_listeners {
            listener.on_key_event(event);
        }
    }

    pub fn dispatch_lock_change(&self, caps_changed: bool, num_changed: bool) {
        for listener in &self.lock_listeners {
            listener.on_lock_change(caps_changed, num_changed);
        }
    }

    pub fn dispatch_touch(&self, dx: i8, dy: i8) {
        for listener in &self.touch_listeners {
            listener.on_touch(dx, dy);
        }
    }
}

impl Default for EventBus<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use super::*;
    use crate::event::KeyState;

    #[test]
    fn dispatch_follows_registration_order() {
        struct Tap<'s> {
            tag: u8,
            log: &'s RefCell<std::vec::Vec<u8>>,
        }
        impl KeyEventListener for Tap<'_> {
            fn on_key_event(&self, _event: KeyEvent) {
                self.log.borrow_mut().push(self.tag);
            }
        }

        let log = RefCell::new(std::vec::Vec::new());
        let tap_a = Tap { tag: 1, log: &log };
        let tap_b = Tap { tag: 2, log: &log };
        let tap_c = Tap { tag: 3, log: &log };

        let mut bus = EventBus::new();
        assert!(bus.subscribe_key_event(&tap_a));
        assert!(bus.subscribe_key_event(&tap_b));
        assert!(bus.subscribe_key_event(&tap_c));

        bus.dispatch_key_event(KeyEvent::new(b'a', KeyState::Pressed));
        assert_eq!(*log.borrow(), [1, 2, 3]);
    }

    #[test]
    fn subscription_is_bounded() {
        struct Nop;
        impl KeyEventListener for Nop {
            fn on_key_event(&self, _event: KeyEvent) {}
        }
        let listeners = [Nop, Nop, Nop, Nop, Nop];

        let mut bus = EventBus::new();
        for l in listeners.iter().take(MAX_SUBSCRIBERS) {
            assert!(bus.subscribe_key_event(l));
        }
        assert!(!bus.subscribe_key_event(&listeners[4]));
    }
}
