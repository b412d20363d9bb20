//! The compiled-in key catalog: one immutable entry per physical position.
//!
//! Positions are addressed by a stable index (`row * COLS + col`, auxiliary
//! buttons offset past the matrix) so the scanner can track "is this
//! position already held" without relying on entry addresses.

use crate::keycode::*;

/// Modifier identity a key may carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Modifier {
    #[default]
    None,
    Sym,
    Alt,
    LeftShift,
    RightShift,
}

/// Immutable per-position key definition: primary character, alternate
/// (sym/alt) character, and the modifier identity if any.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEntry {
    pub chr: u8,
    pub symb: u8,
    pub modifier: Modifier,
}

impl KeyEntry {
    /// A position with no key behind it. Pressing it never emits output.
    pub const fn none() -> Self {
        Self {
            chr: 0,
            symb: 0,
            modifier: Modifier::None,
        }
    }

    /// A regular key with a primary and an alternate character.
    pub const fn key(chr: u8, symb: u8) -> Self {
        Self {
            chr,
            symb,
            modifier: Modifier::None,
        }
    }

    /// A key emitting a reserved button/joystick code.
    pub const fn code(code: u8) -> Self {
        Self {
            chr: code,
            symb: 0,
            modifier: Modifier::None,
        }
    }

    /// A pure modifier key.
    pub const fn modifier(modifier: Modifier) -> Self {
        Self {
            chr: 0,
            symb: 0,
            modifier,
        }
    }
}

/// The full catalog for one board: the matrix plus auxiliary buttons.
pub struct KeyLayout<const ROWS: usize, const COLS: usize, const BTNS: usize> {
    pub keys: [[KeyEntry; COLS]; ROWS],
    pub buttons: [KeyEntry; BTNS],
}

impl<const ROWS: usize, const COLS: usize, const BTNS: usize> KeyLayout<ROWS, COLS, BTNS> {
    /// Total number of addressable positions.
    pub const LEN: usize = ROWS * COLS + BTNS;

    /// Stable index of a matrix position.
    pub const fn key_index(row: usize, col: usize) -> u16 {
        (row * COLS + col) as u16
    }

    /// Stable index of an auxiliary button.
    pub const fn button_index(btn: usize) -> u16 {
        (ROWS * COLS + btn) as u16
    }

    /// Looks up the catalog entry behind a stable index.
    pub fn entry(&self, index: u16) -> &KeyEntry {
        let index = index as usize;
        if index < ROWS * COLS {
            &self.keys[index / COLS][index % COLS]
        } else {
            &self.buttons[index - ROWS * COLS]
        }
    }
}

/// The BB-style 7x6 matrix with one auxiliary button, as routed on the
/// BBQ20 keyboard breakout.
#[rustfmt::skip]
pub static BBQ20_LAYOUT: KeyLayout<7, 6, 1> = KeyLayout {
    keys: [
        [KeyEntry::code(KEY_JOY_CENTER), KeyEntry::key(b'W', b'1'),                KeyEntry::key(b'G', b'/'),                 KeyEntry::key(b'S', b'4'),  KeyEntry::key(b'L', b'"'),    KeyEntry::key(b'H', b':')],
        [KeyEntry::none(),               KeyEntry::key(b'Q', b'#'),                KeyEntry::key(b'R', b'3'),                 KeyEntry::key(b'E', b'2'),  KeyEntry::key(b'O', b'+'),    KeyEntry::key(b'U', b'_')],
        [KeyEntry::code(KEY_BTN_LEFT1),  KeyEntry::key(b'~', b'0'),                KeyEntry::key(b'F', b'6'),                 KeyEntry::modifier(Modifier::LeftShift), KeyEntry::key(b'K', b'\''), KeyEntry::key(b'J', b';')],
        [KeyEntry::none(),               KeyEntry::key(b' ', b'\t'),               KeyEntry::key(b'C', b'9'),                 KeyEntry::key(b'Z', b'7'),  KeyEntry::key(b'M', b'.'),    KeyEntry::key(b'N', b',')],
        [KeyEntry::code(KEY_BTN_LEFT2),  KeyEntry::modifier(Modifier::Sym),        KeyEntry::key(b'T', b'('),                 KeyEntry::key(b'D', b'5'),  KeyEntry::key(b'I', b'-'),    KeyEntry::key(b'Y', b')')],
        [KeyEntry::code(KEY_BTN_RIGHT1), KeyEntry::modifier(Modifier::Alt),        KeyEntry::key(b'V', b'?'),                 KeyEntry::key(b'X', b'8'),  KeyEntry::key(b'$', b'`'),    KeyEntry::key(b'B', b'!')],
        [KeyEntry::none(),               KeyEntry::key(b'A', b'*'),                KeyEntry::modifier(Modifier::RightShift),  KeyEntry::key(b'P', b'@'),  KeyEntry::key(0x08, 0),       KeyEntry::key(b'\n', b'|')],
    ],
    buttons: [KeyEntry::code(KEY_BTN_RIGHT2)],
};

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stable_indices_address_the_whole_catalog() {
        type L = KeyLayout<7, 6, 1>;
        assert_eq!(L::LEN, 43);
        assert_eq!(L::key_index(0, 0), 0);
        assert_eq!(L::key_index(6, 5), 41);
        assert_eq!(L::button_index(0), 42);

        assert_eq!(BBQ20_LAYOUT.entry(L::key_index(0, 1)).chr, b'W');
        assert_eq!(BBQ20_LAYOUT.entry(L::key_index(6, 2)).modifier, Modifier::RightShift);
        assert_eq!(BBQ20_LAYOUT.entry(L::button_index(0)).chr, crate::keycode::KEY_BTN_RIGHT2);
    }
}
