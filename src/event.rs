//! Key lifecycle types shared by the scanner, the FIFO and the wire
//! protocol.

/// Lifecycle state of a tracked key press. The discriminants are part of the
/// wire protocol: the FIFO register reports them as the first response byte.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyState {
    #[default]
    Idle = 0,
    Pressed = 1,
    Hold = 2,
    Released = 3,
}

/// A single key event: the resolved output byte plus the lifecycle state
/// that produced it.
///
/// The default value is the zeroed pair `(0, Idle)`, which is also what the
/// FIFO returns when dequeued empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub key: u8,
    pub state: KeyState,
}

impl KeyEvent {
    pub const fn new(key: u8, state: KeyState) -> Self {
        Self { key, state }
    }
}
