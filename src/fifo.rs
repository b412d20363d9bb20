//! Fixed-capacity ring buffer holding key events until the host drains them
//! through the FIFO register.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;

use crate::RawMutex;
use crate::event::KeyEvent;

/// The event FIFO shared between the scanner (producer) and the protocol
/// handler (consumer, interrupt context).
pub type SharedFifo = Mutex<RawMutex, RefCell<EventFifo>>;

/// Creates the shared form of an empty [`EventFifo`].
pub const fn shared_fifo() -> SharedFifo {
    Mutex::new(RefCell::new(EventFifo::new()))
}

/// Ring buffer of key events. All operations are O(1) and non-blocking;
/// overflow handling is the caller's policy decision.
pub struct EventFifo<const N: usize = { crate::KEY_FIFO_SIZE }> {
    items: [KeyEvent; N],
    count: u8,
    read_idx: u8,
    write_idx: u8,
}

impl<const N: usize> EventFifo<N> {
    pub const fn new() -> Self {
        Self {
            items: [KeyEvent::new(0, crate::event::KeyState::Idle); N],
            count: 0,
            read_idx: 0,
            write_idx: 0,
        }
    }

    /// Number of queued events.
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Resets both cursors. Stored bytes are not cleared; `count` alone
    /// gates visibility.
    pub fn flush(&mut self) {
        self.write_idx = 0;
        self.read_idx = 0;
        self.count = 0;
    }

    /// Stores `item`, returning `false` without mutation when full.
    pub fn enqueue(&mut self, item: KeyEvent) -> bool {
        if self.count as usize >= N {
            return false;
        }

        self.items[self.write_idx as usize] = item;
        self.write_idx = (self.write_idx + 1) % N as u8;
        self.count += 1;

        true
    }

    /// Stores `item` unconditionally, dropping the oldest unread event if
    /// the buffer is full.
    pub fn enqueue_force(&mut self, item: KeyEvent) {
        if self.enqueue(item) {
            return;
        }

        self.items[self.write_idx as usize] = item;
        self.write_idx = (self.write_idx + 1) % N as u8;
        self.read_idx = (self.read_idx + 1) % N as u8;
    }

    /// Pops the oldest event, or the zeroed pair when empty.
    pub fn dequeue(&mut self) -> KeyEvent {
        if self.count == 0 {
            return KeyEvent::default();
        }

        let item = self.items[self.read_idx as usize];
        self.read_idx = (self.read_idx + 1) % N as u8;
        self.count -= 1;

        item
    }
}

impl<const N: usize> Default for EventFifo<N> {
    fn default() -> Self {
        Self::new()
    }
}
